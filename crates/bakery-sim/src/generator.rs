//! ---
//! bakery_section: "02-simulation"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "Reading sources: random, seeded and replayed."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
use chrono::Local;
use parking_lot::Mutex;
use rand::prelude::*;

use crate::reading::{
    Reading, CUSTOMERS_PER_HOUR_RANGE, EGG_STOCK_RANGE, ENERGY_CONSUMPTION_RANGE,
    FLOUR_STOCK_RANGE, MILK_STOCK_RANGE, OVEN_TEMPERATURE_RANGE,
};
use crate::{Result, SimError};

/// Produces one reading per call. Implementations must tolerate concurrent callers.
pub trait ReadingSource: Send + Sync {
    fn sample(&self) -> Reading;
}

#[derive(Debug)]
enum RngMode {
    ThreadLocal,
    Seeded(Mutex<StdRng>),
}

/// Uniform random sampler over the documented field ranges.
#[derive(Debug)]
pub struct RandomReadingSource {
    mode: RngMode,
}

impl RandomReadingSource {
    /// Sampler backed by the thread-local RNG; calls share no state.
    pub fn new() -> Self {
        Self {
            mode: RngMode::ThreadLocal,
        }
    }

    /// Deterministic value stream for a given seed. Timestamps still follow the wall clock.
    pub fn seeded(seed: u64) -> Self {
        Self {
            mode: RngMode::Seeded(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map(Self::seeded).unwrap_or_default()
    }
}

impl Default for RandomReadingSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadingSource for RandomReadingSource {
    fn sample(&self) -> Reading {
        let timestamp = Reading::format_timestamp(&Local::now());
        match &self.mode {
            RngMode::ThreadLocal => draw(&mut thread_rng(), timestamp),
            RngMode::Seeded(rng) => draw(&mut *rng.lock(), timestamp),
        }
    }
}

fn draw<R: Rng + ?Sized>(rng: &mut R, timestamp: String) -> Reading {
    Reading {
        timestamp,
        oven_temperature: round2(rng.gen_range(OVEN_TEMPERATURE_RANGE)),
        flour_stock: rng.gen_range(FLOUR_STOCK_RANGE),
        egg_stock: rng.gen_range(EGG_STOCK_RANGE),
        milk_stock: rng.gen_range(MILK_STOCK_RANGE),
        customers_per_hour: rng.gen_range(CUSTOMERS_PER_HOUR_RANGE),
        energy_consumption: round2(rng.gen_range(ENERGY_CONSUMPTION_RANGE)),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Replays a fixed list of readings in order, wrapping around at the end.
#[derive(Debug)]
pub struct ReplayReadingSource {
    readings: Vec<Reading>,
    cursor: Mutex<usize>,
}

impl ReplayReadingSource {
    pub fn new(readings: Vec<Reading>) -> Result<Self> {
        if readings.is_empty() {
            return Err(SimError::EmptyReplay);
        }
        Ok(Self {
            readings,
            cursor: Mutex::new(0),
        })
    }
}

impl ReadingSource for ReplayReadingSource {
    fn sample(&self) -> Reading {
        let mut cursor = self.cursor.lock();
        let reading = self.readings[*cursor].clone();
        *cursor = (*cursor + 1) % self.readings.len();
        reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_samples_stay_in_range() {
        let source = RandomReadingSource::new();
        for _ in 0..500 {
            let reading = source.sample();
            assert!(reading.in_range(), "out of range: {reading:?}");
            assert_eq!(reading.timestamp.len(), "2024-01-01 00:00:00".len());
        }
    }

    #[test]
    fn seeded_sources_repeat_values() {
        let a = RandomReadingSource::seeded(42);
        let b = RandomReadingSource::seeded(42);
        for _ in 0..10 {
            let (ra, rb) = (a.sample(), b.sample());
            assert_eq!(ra.oven_temperature, rb.oven_temperature);
            assert_eq!(ra.flour_stock, rb.flour_stock);
            assert_eq!(ra.energy_consumption, rb.energy_consumption);
        }
    }

    #[test]
    fn floats_are_rounded_to_hundredths() {
        let source = RandomReadingSource::seeded(7);
        for _ in 0..50 {
            let reading = source.sample();
            let scaled = reading.oven_temperature * 100.0;
            assert!((scaled - scaled.round()).abs() < 1e-6);
        }
    }

    #[test]
    fn replay_wraps_around() {
        let base = RandomReadingSource::seeded(1);
        let readings = vec![base.sample(), base.sample()];
        let replay = ReplayReadingSource::new(readings.clone()).unwrap();
        assert_eq!(replay.sample(), readings[0]);
        assert_eq!(replay.sample(), readings[1]);
        assert_eq!(replay.sample(), readings[0]);
    }

    #[test]
    fn replay_rejects_empty_input() {
        assert!(matches!(
            ReplayReadingSource::new(Vec::new()),
            Err(SimError::EmptyReplay)
        ));
    }
}
