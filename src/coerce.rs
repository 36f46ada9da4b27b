//! Lenient numeric handling for stored invoice data.
//!
//! Anything that is not a usable number becomes zero (or "unset" for rate
//! overrides). Stored blobs may come from older builds that wrote strings,
//! `null`, or nothing at all, and none of that should stop an invoice from
//! loading.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value).unwrap_or_else(|| {
        if !value.is_null() {
            warn!(%value, "non-numeric amount coerced to 0");
        }
        0.0
    }))
}

pub fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let quantity = match value_to_f64(&value) {
        Some(v) if v > 0.0 => v.trunc().min(f64::from(u32::MAX)) as u32,
        Some(_) => 0,
        None => {
            if !value.is_null() {
                warn!(%value, "non-numeric quantity coerced to 0");
            }
            0
        }
    };
    Ok(quantity)
}

/// Rate overrides keep whatever number was stored, including 0. Whether a
/// stored 0 means "no override" is decided by the override policy at
/// computation time, not here.
pub fn lenient_rate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value))
}

pub fn lenient_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = value
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());
    Ok(parsed.unwrap_or_else(|| {
        warn!(%value, "unreadable date replaced with today");
        Local::now().date_naive()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "lenient_f64")]
        price: f64,
        #[serde(default, deserialize_with = "lenient_u32")]
        quantity: u32,
        #[serde(default, deserialize_with = "lenient_rate")]
        rate: Option<f64>,
    }

    fn probe(json: &str) -> Probe {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn non_finite_becomes_zero() {
        assert_eq!(finite_or_zero(f64::NAN), 0.0);
        assert_eq!(finite_or_zero(f64::INFINITY), 0.0);
        assert_eq!(finite_or_zero(12.5), 12.5);
    }

    #[test]
    fn garbage_numbers_are_zeroed() {
        let p = probe(r#"{"price": "abc", "quantity": null, "rate": "x"}"#);
        assert_eq!(p.price, 0.0);
        assert_eq!(p.quantity, 0);
        assert_eq!(p.rate, None);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let p = probe(r#"{"price": "12,50", "quantity": "3", "rate": "20"}"#);
        assert_eq!(p.price, 12.5);
        assert_eq!(p.quantity, 3);
        assert_eq!(p.rate, Some(20.0));
    }

    #[test]
    fn quantity_is_truncated_and_clamped() {
        assert_eq!(probe(r#"{"quantity": 2.9}"#).quantity, 2);
        assert_eq!(probe(r#"{"quantity": -4}"#).quantity, 0);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let p = probe("{}");
        assert_eq!(p.price, 0.0);
        assert_eq!(p.quantity, 0);
        assert_eq!(p.rate, None);
    }

    #[test]
    fn stored_zero_rate_is_kept() {
        assert_eq!(probe(r#"{"rate": 0}"#).rate, Some(0.0));
    }
}
