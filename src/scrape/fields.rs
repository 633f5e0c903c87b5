//! Parsers for the numeric cells found in the modem status tables.
//!
//! Cells come out of the document as text such as `"579000000 Hz"` or
//! `"5.7 dBmV"`. Every parser here is pure; callers decide whether a failure
//! skips the row or leaves the field at its default.

use crate::error::{ExporterError, Result};

const HERTZ_SUFFIX: &str = "Hz";

/// Parse a frequency cell into whole hertz.
pub fn parse_frequency(text: &str) -> Result<i64> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_suffix(HERTZ_SUFFIX)
        .unwrap_or(trimmed)
        .trim_end();

    digits
        .parse::<i64>()
        .map_err(|_| ExporterError::parse_error("frequency", text))
}

/// Parse a decibel cell, discarding the unit (`dBmV`, `dB`, ...).
pub fn parse_decibels(text: &str) -> Result<f64> {
    text.split_whitespace()
        .next()
        .and_then(|token| token.parse::<f64>().ok())
        .ok_or_else(|| ExporterError::parse_error("decibels", text))
}

/// Parse an integer counter or id cell.
pub fn parse_count(text: &str) -> Result<i64> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| ExporterError::parse_error("count", text))
}

/// Parse a channel id cell.
pub fn parse_channel_id(text: &str) -> Result<u32> {
    text.trim()
        .parse::<u32>()
        .map_err(|_| ExporterError::parse_error("channel id", text))
}
