//! Three-tier fuel economy
//!
//! Fill-ups are ordered by odometer reading. Each fill is assumed to top
//! the tank off, so the fuel bought at a fill was burned over the miles
//! since the previous fill. The first fill of any window therefore only
//! marks the starting odometer and its gallons are not counted.
//!
//! A mileage difference above the gap threshold means at least one fill-up
//! was never recorded. Windows spanning such a gap would overstate economy,
//! so the current and recent windows are voided by it. The lifetime figure
//! is still reported, with the gaps listed alongside it.

use crate::parse::round_cents;
use serde::{Deserialize, Serialize};

/// One fill-up as seen by the calculator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillUp {
    pub mileage: i64,
    pub gallons: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct MpgOptions {
    /// Largest mileage difference between consecutive fills still considered continuous
    pub gap_threshold: i64,
    /// Fill-ups in the recent window
    pub recent_window: usize,
}

impl Default for MpgOptions {
    fn default() -> Self {
        Self {
            gap_threshold: 500,
            recent_window: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MpgWindow {
    pub mpg: f64,
    pub miles: i64,
    pub gallons: f64,
    pub fill_ups: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MileageGap {
    pub from_mileage: i64,
    pub to_mileage: i64,
    pub miles: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MpgSummary {
    pub entries_count: usize,
    pub lifetime: Option<MpgWindow>,
    pub current: Option<MpgWindow>,
    pub recent: Option<MpgWindow>,
    pub gaps: Vec<MileageGap>,
    pub gaps_detected: bool,
    pub total_gallons: f64,
    pub total_cost: f64,
    pub cost_per_mile: Option<f64>,
}

/// Economy over an ordered slice; `None` without distance or counted fuel
fn window(entries: &[FillUp]) -> Option<MpgWindow> {
    let (first, last) = (entries.first()?, entries.last()?);
    if entries.len() < 2 {
        return None;
    }

    let miles = last.mileage - first.mileage;
    let gallons: f64 = entries[1..].iter().map(|e| e.gallons).sum();
    if miles <= 0 || gallons <= 0.0 {
        return None;
    }

    Some(MpgWindow {
        mpg: round_cents(miles as f64 / gallons),
        miles,
        gallons: (gallons * 1000.0).round() / 1000.0,
        fill_ups: entries.len(),
    })
}

fn has_gap(entries: &[FillUp], threshold: i64) -> bool {
    entries
        .windows(2)
        .any(|pair| pair[1].mileage - pair[0].mileage > threshold)
}

/// Compute lifetime, most-recent-fill and last-N-fill economy
pub fn calculate(entries: &[FillUp], options: &MpgOptions) -> MpgSummary {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|e| e.mileage);
    let len = sorted.len();

    let gaps: Vec<MileageGap> = sorted
        .windows(2)
        .filter(|pair| pair[1].mileage - pair[0].mileage > options.gap_threshold)
        .map(|pair| MileageGap {
            from_mileage: pair[0].mileage,
            to_mileage: pair[1].mileage,
            miles: pair[1].mileage - pair[0].mileage,
        })
        .collect();

    let lifetime = window(&sorted);

    let current = if len >= 2 && !has_gap(&sorted[len - 2..], options.gap_threshold) {
        window(&sorted[len - 2..])
    } else {
        None
    };

    let n = options.recent_window.min(len);
    let recent_slice = &sorted[len - n..];
    let recent = if n >= 2 && !has_gap(recent_slice, options.gap_threshold) {
        window(recent_slice)
    } else {
        None
    };

    let total_gallons: f64 = sorted.iter().map(|e| e.gallons).sum();
    let total_cost: f64 = sorted.iter().map(|e| e.cost).sum();
    let cost_per_mile = lifetime.as_ref().map(|w| {
        let counted_cost: f64 = sorted[1..].iter().map(|e| e.cost).sum();
        (counted_cost / w.miles as f64 * 1000.0).round() / 1000.0
    });

    MpgSummary {
        entries_count: len,
        lifetime,
        current,
        recent,
        gaps_detected: !gaps.is_empty(),
        gaps,
        total_gallons: (total_gallons * 1000.0).round() / 1000.0,
        total_cost: round_cents(total_cost),
        cost_per_mile,
    }
}
