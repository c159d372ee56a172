//! Row types and input types for every table

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub owner_user_id: String,
    pub name: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vehicle {
    pub id: i64,
    pub account_id: Option<String>,
    pub name: String,
    pub year: i64,
    pub make: String,
    pub model: String,
    pub vin: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when creating or editing a vehicle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVehicle {
    /// Blank means "{year} {make} {model}"
    #[serde(default)]
    pub name: Option<String>,
    pub year: i64,
    pub make: String,
    pub model: String,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VehicleName {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MaintenanceRecord {
    pub id: i64,
    pub vehicle_id: i64,
    pub date: NaiveDate,
    pub date_estimated: bool,
    pub mileage: i64,
    pub description: String,
    pub cost: Option<f64>,
    pub oil_change_interval: Option<i64>,

    pub is_oil_change: bool,
    pub oil_type: Option<String>,
    pub oil_brand: Option<String>,
    pub oil_filter_brand: Option<String>,
    pub oil_filter_part_number: Option<String>,
    pub oil_cost: Option<f64>,
    pub filter_cost: Option<f64>,
    pub labor_cost: Option<f64>,

    pub oil_analysis_date: Option<NaiveDate>,
    pub next_oil_analysis_date: Option<NaiveDate>,
    pub oil_analysis_cost: Option<f64>,
    pub iron_level: Option<f64>,
    pub aluminum_level: Option<f64>,
    pub copper_level: Option<f64>,
    pub viscosity: Option<f64>,
    pub tbn: Option<f64>,
    pub fuel_dilution: Option<f64>,
    pub coolant_contamination: Option<bool>,
    pub driving_conditions: Option<String>,
    pub oil_consumption_notes: Option<String>,
    pub linked_oil_change_id: Option<i64>,

    /// Serialized [`TireMeta`]
    pub tire_meta: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MaintenanceRecord {
    /// Decoded tire measurements; malformed stored JSON reads as absent
    pub fn tire_meta(&self) -> Option<TireMeta> {
        self.tire_meta
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

/// Fields accepted when creating or editing a maintenance record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMaintenanceRecord {
    pub vehicle_id: i64,
    /// `None` stores the placeholder date and flags it as estimated
    pub date: Option<NaiveDate>,
    pub date_estimated: bool,
    pub mileage: i64,
    pub description: String,
    pub cost: Option<f64>,
    pub oil_change_interval: Option<i64>,

    pub is_oil_change: bool,
    pub oil_type: Option<String>,
    pub oil_brand: Option<String>,
    pub oil_filter_brand: Option<String>,
    pub oil_filter_part_number: Option<String>,
    pub oil_cost: Option<f64>,
    pub filter_cost: Option<f64>,
    pub labor_cost: Option<f64>,

    pub oil_analysis_date: Option<NaiveDate>,
    pub next_oil_analysis_date: Option<NaiveDate>,
    pub oil_analysis_cost: Option<f64>,
    pub iron_level: Option<f64>,
    pub aluminum_level: Option<f64>,
    pub copper_level: Option<f64>,
    pub viscosity: Option<f64>,
    pub tbn: Option<f64>,
    pub fuel_dilution: Option<f64>,
    pub coolant_contamination: Option<bool>,
    pub driving_conditions: Option<String>,
    pub oil_consumption_notes: Option<String>,
    pub linked_oil_change_id: Option<i64>,

    pub tire_meta: Option<TireMeta>,
}

/// Maximum tread depth accepted, in 32nds of an inch
pub const MAX_TREAD_DEPTH_32NDS: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotationPattern {
    FrontToRear,
    Cross,
    FiveTire,
    Custom,
    Unknown,
}

impl RotationPattern {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "front-to-rear" => Some(Self::FrontToRear),
            "cross" => Some(Self::Cross),
            "five-tire" => Some(Self::FiveTire),
            "custom" => Some(Self::Custom),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FrontToRear => "front-to-rear",
            Self::Cross => "cross",
            Self::FiveTire => "five-tire",
            Self::Custom => "custom",
            Self::Unknown => "unknown",
        }
    }
}

/// Inner, middle and outer groove depth of one tire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreadReading {
    pub inner: Option<u8>,
    pub middle: Option<u8>,
    pub outer: Option<u8>,
}

impl TreadReading {
    fn is_empty(&self) -> bool {
        self.inner.is_none() && self.middle.is_none() && self.outer.is_none()
    }

    fn depths(&self) -> [Option<u8>; 3] {
        [self.inner, self.middle, self.outer]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreadDepths {
    pub fl: TreadReading,
    pub fr: TreadReading,
    pub rl: TreadReading,
    pub rr: TreadReading,
}

/// Tire measurements attached to a maintenance record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TireMeta {
    pub schema_version: u32,
    pub units: String,
    pub measured_at: Option<NaiveDate>,
    pub rotation_pattern: Option<RotationPattern>,
    pub tread: TreadDepths,
}

impl TireMeta {
    pub fn new(
        measured_at: Option<NaiveDate>,
        rotation_pattern: Option<RotationPattern>,
        tread: TreadDepths,
    ) -> Self {
        Self {
            schema_version: 1,
            units: "32nds".to_string(),
            measured_at,
            rotation_pattern,
            tread,
        }
    }

    /// True when nothing was measured or recorded
    pub fn is_empty(&self) -> bool {
        self.rotation_pattern.is_none()
            && [self.tread.fl, self.tread.fr, self.tread.rl, self.tread.rr]
                .iter()
                .all(TreadReading::is_empty)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != 1 {
            return Err(Error::invalid(format!(
                "Unsupported tire data version {}",
                self.schema_version
            )));
        }
        if self.units != "32nds" {
            return Err(Error::invalid("Tread depth must be recorded in 32nds"));
        }
        let positions = [
            ("front left", self.tread.fl),
            ("front right", self.tread.fr),
            ("rear left", self.tread.rl),
            ("rear right", self.tread.rr),
        ];
        for (position, reading) in positions {
            for depth in reading.depths().into_iter().flatten() {
                if depth > MAX_TREAD_DEPTH_32NDS {
                    return Err(Error::invalid(format!(
                        "Tread depth for {position} must be between 0 and {MAX_TREAD_DEPTH_32NDS}/32"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Oil analysis lab results linked to an earlier oil change
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOilAnalysis {
    pub vehicle_id: i64,
    pub analysis_date: NaiveDate,
    /// Defaults to the linked oil change's mileage
    pub mileage: Option<i64>,
    pub linked_oil_change_id: Option<i64>,
    pub next_analysis_date: Option<NaiveDate>,
    pub cost: Option<f64>,
    pub iron_level: Option<f64>,
    pub aluminum_level: Option<f64>,
    pub copper_level: Option<f64>,
    pub viscosity: Option<f64>,
    pub tbn: Option<f64>,
    pub fuel_dilution: Option<f64>,
    pub coolant_contamination: Option<bool>,
    pub driving_conditions: Option<String>,
    pub oil_consumption_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FuelEntry {
    pub id: i64,
    pub vehicle_id: i64,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub mileage: i64,
    pub fuel_amount: f64,
    pub fuel_cost: f64,
    pub fuel_type: Option<String>,
    pub driving_pattern: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FuelEntry {
    pub fn price_per_gallon(&self) -> Option<f64> {
        (self.fuel_amount > 0.0)
            .then(|| crate::parse::round_cents(self.fuel_cost / self.fuel_amount))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewFuelEntry {
    pub vehicle_id: i64,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub mileage: i64,
    pub fuel_amount: f64,
    pub fuel_cost: f64,
    pub fuel_type: Option<String>,
    pub driving_pattern: Option<String>,
    pub notes: Option<String>,
}

pub const FUEL_TYPES: [&str; 6] = ["87", "89", "91", "93", "diesel", "e85"];
pub const DRIVING_PATTERNS: [&str; 3] = ["highway", "city", "mixed"];

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FutureMaintenance {
    pub id: i64,
    pub vehicle_id: i64,
    pub maintenance_type: String,
    pub target_mileage: Option<i64>,
    pub target_date: Option<NaiveDate>,
    /// Miles before the target at which the item starts showing
    pub mileage_reminder: i64,
    /// Days before the target at which the item starts showing
    pub date_reminder: i64,
    pub estimated_cost: Option<f64>,
    pub parts_link: Option<String>,
    pub notes: Option<String>,
    pub is_recurring: bool,
    pub recurrence_interval_miles: Option<i64>,
    pub recurrence_interval_months: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFutureMaintenance {
    pub vehicle_id: i64,
    pub maintenance_type: String,
    #[serde(default)]
    pub target_mileage: Option<i64>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default = "default_mileage_reminder")]
    pub mileage_reminder: i64,
    #[serde(default = "default_date_reminder")]
    pub date_reminder: i64,
    #[serde(default)]
    pub estimated_cost: Option<f64>,
    #[serde(default)]
    pub parts_link: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_interval_miles: Option<i64>,
    #[serde(default)]
    pub recurrence_interval_months: Option<i64>,
}

fn default_mileage_reminder() -> i64 {
    100
}

fn default_date_reminder() -> i64 {
    30
}

impl Default for NewFutureMaintenance {
    fn default() -> Self {
        Self {
            vehicle_id: 0,
            maintenance_type: String::new(),
            target_mileage: None,
            target_date: None,
            mileage_reminder: default_mileage_reminder(),
            date_reminder: default_date_reminder(),
            estimated_cost: None,
            parts_link: None,
            notes: None,
            is_recurring: false,
            recurrence_interval_miles: None,
            recurrence_interval_months: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmailSubscription {
    pub id: i64,
    pub vehicle_id: i64,
    pub email_address: String,
    pub is_active: bool,
    pub reminder_frequency_days: i64,
    pub last_email_sent: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEmailSubscription {
    pub vehicle_id: i64,
    pub email_address: String,
    #[serde(default = "default_reminder_frequency")]
    pub reminder_frequency_days: i64,
}

fn default_reminder_frequency() -> i64 {
    7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tire_meta_rejects_depth_over_limit() {
        let mut tread = TreadDepths::default();
        tread.fl.inner = Some(21);
        let meta = TireMeta::new(None, None, tread);
        assert!(matches!(meta.validate(), Err(Error::InvalidInput(_))));

        tread.fl.inner = Some(20);
        assert!(TireMeta::new(None, None, tread).validate().is_ok());
    }

    #[test]
    fn tire_meta_json_shape() {
        let mut tread = TreadDepths::default();
        tread.rr = TreadReading {
            inner: Some(7),
            middle: Some(8),
            outer: Some(6),
        };
        let meta = TireMeta::new(None, Some(RotationPattern::FiveTire), tread);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["schema_version"], 1);
        assert_eq!(json["units"], "32nds");
        assert_eq!(json["rotation_pattern"], "five-tire");
        assert_eq!(json["tread"]["rr"]["middle"], 8);
    }

    #[test]
    fn fractional_depth_does_not_decode() {
        let raw = r#"{"schema_version":1,"units":"32nds","measured_at":null,
            "rotation_pattern":null,"tread":{"fl":{"inner":5.5,"middle":null,"outer":null},
            "fr":{"inner":null,"middle":null,"outer":null},
            "rl":{"inner":null,"middle":null,"outer":null},
            "rr":{"inner":null,"middle":null,"outer":null}}}"#;
        assert!(serde_json::from_str::<TireMeta>(raw).is_err());
    }

    #[test]
    fn empty_tire_meta() {
        assert!(TireMeta::new(None, None, TreadDepths::default()).is_empty());
        assert!(!TireMeta::new(None, Some(RotationPattern::Cross), TreadDepths::default()).is_empty());
    }
}
