//! ---
//! bakery_section: "03-persistence-logging"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "CSV codec for reading batches."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
use bakery_sim::{Batch, Reading};
use csv::{ReaderBuilder, Terminator, WriterBuilder};

use crate::Result;

/// Encode a batch as CSV: header row in schema order, one `\n`-terminated row per reading.
pub fn encode_batch(batch: &Batch) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(batch.len() * 64));
    for reading in batch {
        writer.serialize(reading)?;
    }
    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(bytes)
}

/// Decode CSV produced by [`encode_batch`] back into readings.
pub fn decode_readings(bytes: &[u8]) -> Result<Vec<Reading>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(bytes);
    let readings = reader
        .deserialize::<Reading>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(readings)
}
