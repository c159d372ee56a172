//! HTML form decoding helpers
//!
//! Browsers submit every field as text. Form structs keep optional fields
//! as `Option<String>` (blank becomes `None`) and convert them with the
//! field helpers below, so a bad value turns into a readable
//! `InvalidInput` message instead of a bare deserialization rejection.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use vmt_common::parse::{normalize_form_date, parse_checkbox, parse_form_money};
use vmt_common::{Error, Result};

/// Trimmed text; blank or missing reads as `None`
pub fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// A checkbox is true when present with a truthy value
pub fn checkbox<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().is_some_and(parse_checkbox))
}

pub fn int_field(value: Option<&str>, label: &str) -> Result<Option<i64>> {
    value
        .map(|raw| {
            let cleaned: String = raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
            cleaned
                .parse::<i64>()
                .map_err(|_| Error::invalid(format!("{label} must be a whole number")))
        })
        .transpose()
}

pub fn float_field(value: Option<&str>, label: &str) -> Result<Option<f64>> {
    value
        .map(|raw| {
            raw.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| Error::invalid(format!("{label} must be a number")))
        })
        .transpose()
}

pub fn money_field(value: Option<&str>, label: &str) -> Result<Option<f64>> {
    value
        .map(|raw| {
            parse_form_money(raw).ok_or_else(|| Error::invalid(format!("{label} must be an amount")))
        })
        .transpose()
}

pub fn date_field(value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value {
        Some(raw) => normalize_form_date(raw),
        None => Ok(None),
    }
}

pub fn required<T>(value: Option<T>, label: &str) -> Result<T> {
    value.ok_or_else(|| Error::invalid(format!("{label} is required")))
}

/// Tri-state select: blank is unknown, otherwise a checkbox value
pub fn yes_no(value: Option<&str>) -> Option<bool> {
    value.map(parse_checkbox)
}

/// Every field of a large form, looked up by name
///
/// Used where a struct would need dozens of optional fields. The same
/// map also feeds values back into the form when it is re-rendered.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FormFields(HashMap<String, String>);

impl FormFields {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Trimmed value, `None` when blank or missing
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
    }

    pub fn owned(&self, key: &str) -> Option<String> {
        self.text(key).map(str::to_string)
    }

    /// Value echoed into an input, empty when missing
    pub fn raw(&self, key: &str) -> &str {
        self.0.get(key).map_or("", String::as_str)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.text(key).is_some_and(parse_checkbox)
    }

    pub fn int(&self, key: &str, label: &str) -> Result<Option<i64>> {
        int_field(self.text(key), label)
    }

    pub fn float(&self, key: &str, label: &str) -> Result<Option<f64>> {
        float_field(self.text(key), label)
    }

    pub fn money(&self, key: &str, label: &str) -> Result<Option<f64>> {
        money_field(self.text(key), label)
    }

    pub fn date(&self, key: &str) -> Result<Option<NaiveDate>> {
        date_field(self.text(key))
    }
}
