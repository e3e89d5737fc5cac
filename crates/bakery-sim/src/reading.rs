//! ---
//! bakery_section: "02-simulation"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "Fixed-schema telemetry reading record."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
use std::ops::RangeInclusive;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Wall-clock format used for reading timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const OVEN_TEMPERATURE_RANGE: RangeInclusive<f64> = 180.0..=250.0;
pub const FLOUR_STOCK_RANGE: RangeInclusive<u32> = 0..=100;
pub const EGG_STOCK_RANGE: RangeInclusive<u32> = 0..=200;
pub const MILK_STOCK_RANGE: RangeInclusive<u32> = 0..=50;
pub const CUSTOMERS_PER_HOUR_RANGE: RangeInclusive<u32> = 0..=20;
pub const ENERGY_CONSUMPTION_RANGE: RangeInclusive<f64> = 5.0..=15.0;

/// One simulated bakery observation.
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Local wall-clock time, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    /// Oven temperature in degrees Celsius.
    pub oven_temperature: f64,
    pub flour_stock: u32,
    pub egg_stock: u32,
    pub milk_stock: u32,
    pub customers_per_hour: u32,
    /// Energy draw in kWh.
    pub energy_consumption: f64,
}

impl Reading {
    /// Column names in schema order.
    pub const FIELDS: [&'static str; 7] = [
        "timestamp",
        "oven_temperature",
        "flour_stock",
        "egg_stock",
        "milk_stock",
        "customers_per_hour",
        "energy_consumption",
    ];

    pub fn format_timestamp<Tz>(at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// True when every numeric field lies in its documented range.
    pub fn in_range(&self) -> bool {
        OVEN_TEMPERATURE_RANGE.contains(&self.oven_temperature)
            && FLOUR_STOCK_RANGE.contains(&self.flour_stock)
            && EGG_STOCK_RANGE.contains(&self.egg_stock)
            && MILK_STOCK_RANGE.contains(&self.milk_stock)
            && CUSTOMERS_PER_HOUR_RANGE.contains(&self.customers_per_hour)
            && ENERGY_CONSUMPTION_RANGE.contains(&self.energy_consumption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading() -> Reading {
        Reading {
            timestamp: "2024-05-01 06:30:00".into(),
            oven_temperature: 212.5,
            flour_stock: 40,
            egg_stock: 120,
            milk_stock: 25,
            customers_per_hour: 9,
            energy_consumption: 7.25,
        }
    }

    #[test]
    fn json_keys_follow_schema_order() {
        let value = serde_json::to_value(reading()).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        let mut expected: Vec<_> = Reading::FIELDS.iter().map(|f| f.to_string()).collect();
        expected.sort();
        let mut sorted = keys;
        sorted.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn timestamp_has_second_precision() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(Reading::format_timestamp(&at), "2024-01-02 03:04:05");
    }

    #[test]
    fn range_check_flags_out_of_bounds() {
        assert!(reading().in_range());
        let hot = Reading {
            oven_temperature: 251.0,
            ..reading()
        };
        assert!(!hot.in_range());
        let milk = Reading {
            milk_stock: 51,
            ..reading()
        };
        assert!(!milk.in_range());
    }
}
