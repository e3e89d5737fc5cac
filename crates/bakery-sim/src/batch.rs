//! ---
//! bakery_section: "02-simulation"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "Non-empty reading batches and batch size normalisation."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
use std::num::IntErrorKind;

use tracing::{debug, warn};

use crate::generator::ReadingSource;
use crate::reading::Reading;
use crate::{Result, SimError};

/// Ordered, non-empty sequence of readings for one reporting interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    readings: Vec<Reading>,
}

impl Batch {
    pub fn new(readings: Vec<Reading>) -> Result<Self> {
        if readings.is_empty() {
            return Err(SimError::EmptyBatch);
        }
        Ok(Self { readings })
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reading> {
        self.readings.iter()
    }

    pub fn into_readings(self) -> Vec<Reading> {
        self.readings
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Reading;
    type IntoIter = std::slice::Iter<'a, Reading>;

    fn into_iter(self) -> Self::IntoIter {
        self.readings.iter()
    }
}

/// Turns the raw `n` request parameter into a usable batch size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSizePolicy {
    pub default_size: usize,
    pub max_size: usize,
}

impl BatchSizePolicy {
    pub fn new(default_size: usize, max_size: usize) -> Self {
        Self {
            default_size: default_size.max(1),
            max_size: max_size.max(1),
        }
    }

    /// Absent, non-numeric, zero or negative input yields the default; oversized input is
    /// clamped to `max_size`. Never fails.
    pub fn normalize(&self, raw: Option<&str>) -> usize {
        let Some(raw) = raw else {
            return self.default_size;
        };
        match raw.trim().parse::<u64>() {
            Ok(0) => {
                debug!(requested = raw, "zero batch size requested; using default");
                self.default_size
            }
            Ok(n) if n > self.max_size as u64 => {
                warn!(requested = n, ceiling = self.max_size, "batch size clamped");
                self.max_size
            }
            Ok(n) => n as usize,
            Err(err) if matches!(err.kind(), IntErrorKind::PosOverflow) => {
                warn!(requested = raw, ceiling = self.max_size, "batch size clamped");
                self.max_size
            }
            Err(_) => {
                debug!(requested = raw, "unparsable batch size; using default");
                self.default_size
            }
        }
    }
}

impl Default for BatchSizePolicy {
    fn default() -> Self {
        Self::new(50, 10_000)
    }
}

/// Draw `n` readings in generation order.
pub fn build_batch(source: &dyn ReadingSource, n: usize) -> Result<Batch> {
    let readings = (0..n).map(|_| source.sample()).collect();
    Batch::new(readings)
}
