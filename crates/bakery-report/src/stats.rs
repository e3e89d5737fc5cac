//! ---
//! bakery_section: "04-reporting"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "Aggregate statistics over a reading batch."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
use bakery_sim::{Batch, SimError};
use serde::ser::Error as _;
use serde::{Serialize, Serializer};

use crate::Result;

/// Aggregates over one batch. Means keep full precision; the serialized and displayed
/// forms are rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchStats {
    #[serde(serialize_with = "one_decimal")]
    pub mean_oven_temperature: f64,
    #[serde(serialize_with = "one_decimal")]
    pub mean_customers_per_hour: f64,
    pub min_flour_stock: u32,
    pub readings: usize,
}

impl BatchStats {
    pub fn oven_temperature_display(&self) -> String {
        one_decimal_text(self.mean_oven_temperature)
    }

    pub fn customers_display(&self) -> String {
        one_decimal_text(self.mean_customers_per_hour)
    }
}

fn one_decimal_text(value: f64) -> String {
    format!("{value:.1}")
}

// Serialized means must equal the displayed text, including ties such as 6.25.
fn one_decimal<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let shown: f64 = one_decimal_text(*value).parse().map_err(S::Error::custom)?;
    serializer.serialize_f64(shown)
}

/// Mean oven temperature, mean customers per hour and minimum flour stock.
pub fn summarize(batch: &Batch) -> Result<BatchStats> {
    let readings = batch.readings();
    let Some(min_flour_stock) = readings.iter().map(|r| r.flour_stock).min() else {
        return Err(SimError::EmptyBatch.into());
    };
    let count = readings.len() as f64;
    let temperature_sum: f64 = readings.iter().map(|r| r.oven_temperature).sum();
    let customer_sum: u64 = readings.iter().map(|r| u64::from(r.customers_per_hour)).sum();

    Ok(BatchStats {
        mean_oven_temperature: temperature_sum / count,
        mean_customers_per_hour: customer_sum as f64 / count,
        min_flour_stock,
        readings: readings.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bakery_sim::{build_batch, RandomReadingSource, Reading};

    fn reading(temperature: f64, flour: u32, customers: u32) -> Reading {
        Reading {
            timestamp: "2024-05-01 06:30:00".into(),
            oven_temperature: temperature,
            flour_stock: flour,
            egg_stock: 100,
            milk_stock: 20,
            customers_per_hour: customers,
            energy_consumption: 10.0,
        }
    }

    #[test]
    fn stubbed_batch_aggregates() {
        let batch = Batch::new(vec![
            reading(200.0, 10, 4),
            reading(210.0, 5, 7),
            reading(221.0, 20, 9),
        ])
        .unwrap();
        let stats = summarize(&batch).unwrap();
        assert_eq!(stats.min_flour_stock, 5);
        assert_eq!(stats.readings, 3);
        assert_eq!(stats.oven_temperature_display(), "210.3");
        assert_eq!(stats.customers_display(), "6.7");
    }

    #[test]
    fn single_reading_is_its_own_mean() {
        let batch = Batch::new(vec![reading(233.33, 42, 11)]).unwrap();
        let stats = summarize(&batch).unwrap();
        assert_eq!(stats.mean_oven_temperature, 233.33);
        assert_eq!(stats.mean_customers_per_hour, 11.0);
        assert_eq!(stats.min_flour_stock, 42);
    }

    #[test]
    fn random_batches_respect_bounds() {
        let source = RandomReadingSource::new();
        for n in [1, 5, 80] {
            let batch = build_batch(&source, n).unwrap();
            let stats = summarize(&batch).unwrap();
            assert!((180.0..=250.0).contains(&stats.mean_oven_temperature));
            assert!(stats.min_flour_stock <= 100);
            assert!(batch.iter().all(|r| stats.min_flour_stock <= r.flour_stock));
        }
    }

    #[test]
    fn serialized_means_are_rounded() {
        let batch = Batch::new(vec![reading(200.0, 1, 1), reading(200.25, 2, 2)]).unwrap();
        let value = serde_json::to_value(summarize(&batch).unwrap()).unwrap();
        assert_eq!(value["mean_oven_temperature"], serde_json::json!(200.1));
        assert_eq!(value["mean_customers_per_hour"], serde_json::json!(1.5));
        assert_eq!(value["min_flour_stock"], serde_json::json!(1));
    }

    #[test]
    fn serialized_means_match_display_on_ties() {
        let batch = Batch::new(vec![
            reading(200.0, 10, 6),
            reading(200.0, 10, 6),
            reading(200.0, 10, 6),
            reading(200.0, 10, 7),
        ])
        .unwrap();
        let stats = summarize(&batch).unwrap();
        assert_eq!(stats.mean_customers_per_hour, 6.25);
        let value = serde_json::to_value(stats).unwrap();
        assert_eq!(stats.customers_display(), "6.2");
        assert_eq!(value["mean_customers_per_hour"].to_string(), stats.customers_display());
    }
}
