use chrono::{DateTime, SecondsFormat, Utc};
use garmin_libra_sync::common::types::{WeightEntry, WeightRecord};
use std::fmt;

#[derive(Debug, PartialEq)]
pub enum ConvertError {
    MissingField(&'static str),
    InvalidTimestamp(i64),
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::MissingField(field) => write!(f, "missing {field}"),
            ConvertError::InvalidTimestamp(millis) => write!(f, "invalid timestamp {millis}"),
        }
    }
}

impl std::error::Error for ConvertError {}

/// Convert a Garmin measurement into the Libra date key and body.
pub fn convert_record(record: &WeightRecord) -> Result<(String, WeightEntry), ConvertError> {
    let millis = record.date.ok_or(ConvertError::MissingField("date"))?;
    let weight_g = record.weight.ok_or(ConvertError::MissingField("weight"))?;
    let body_fat_pct = record.body_fat.ok_or(ConvertError::MissingField("bodyFat"))?;
    let muscle_mass_g = record
        .muscle_mass
        .ok_or(ConvertError::MissingField("muscleMass"))?;

    let date = iso_date_from_millis(millis)?;
    let weight = grams_to_kg(weight_g);

    let entry = WeightEntry {
        weight,
        body_fat: body_fat_pct / 100.0 * weight,
        muscle_mass: grams_to_kg(muscle_mass_g),
        log: String::new(),
    };

    Ok((date, entry))
}

/// Epoch milliseconds as an ISO-8601 UTC timestamp with an explicit `+00:00`
/// offset; microseconds are only written for sub-second timestamps.
pub fn iso_date_from_millis(millis: i64) -> Result<String, ConvertError> {
    let date: DateTime<Utc> =
        DateTime::from_timestamp_millis(millis).ok_or(ConvertError::InvalidTimestamp(millis))?;

    let format = if date.timestamp_subsec_micros() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    };
    Ok(date.to_rfc3339_opts(format, false))
}

fn grams_to_kg(grams: f64) -> f64 {
    grams / 1000.0
}
