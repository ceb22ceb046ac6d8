use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

/// A CF style time encoding such as `seconds since 1970-01-01T00:00:00Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    step_micros: i64,
    epoch: DateTime<Utc>,
}

const MICROS_PER_SECOND: i64 = 1_000_000;

impl TimeUnits {
    /// Parses `<unit> since <reference>`.
    pub fn parse(units: &str) -> Result<Self> {
        let units = units.trim();
        let (unit, reference) = units
            .split_once(" since ")
            .ok_or_else(|| anyhow!("time units must look like '<unit> since <date>', got {:?}", units))?;

        let step_micros = match unit.trim().to_ascii_lowercase().as_str() {
            "milliseconds" | "millisecond" | "msec" | "ms" => 1_000,
            "seconds" | "second" | "secs" | "sec" | "s" => MICROS_PER_SECOND,
            "minutes" | "minute" | "mins" | "min" => 60 * MICROS_PER_SECOND,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3_600 * MICROS_PER_SECOND,
            "days" | "day" | "d" => 86_400 * MICROS_PER_SECOND,
            other => bail!("unsupported time unit {:?} in {:?}", other, units),
        };

        let epoch = parse_reference(reference.trim())
            .with_context(|| format!("invalid reference date in time units {:?}", units))?;

        Ok(Self { step_micros, epoch })
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Converts an encoded number to an instant.
    ///
    /// Resolution is 1 µs: finer fractions are rounded to the nearest
    /// microsecond, so [`TimeUnits::to_number`] only gives back values
    /// representable at that resolution.
    pub fn to_datetime(&self, value: f64) -> Result<DateTime<Utc>> {
        if !value.is_finite() {
            bail!("cannot convert non-finite time value {}", value);
        }
        let micros = (value * self.step_micros as f64).round();
        if micros.abs() >= i64::MAX as f64 {
            bail!("time value {} is out of range", value);
        }
        self.epoch
            .checked_add_signed(TimeDelta::microseconds(micros as i64))
            .ok_or_else(|| anyhow!("time value {} is out of range", value))
    }

    /// Inverse of [`TimeUnits::to_datetime`].
    pub fn to_number(&self, instant: DateTime<Utc>) -> Result<f64> {
        let micros = (instant - self.epoch)
            .num_microseconds()
            .ok_or_else(|| anyhow!("instant {} is too far from the reference date", instant))?;
        Ok(micros as f64 / self.step_micros as f64)
    }
}

fn parse_reference(reference: &str) -> Result<DateTime<Utc>> {
    // ERDDAP always writes UTC; a trailing Z or explicit offset is accepted too.
    if let Ok(dt) = DateTime::parse_from_rfc3339(reference) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = reference.trim_end_matches('Z').trim_end_matches(" UTC");
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Ok(dt.and_utc());
        }
    }

    let date = NaiveDate::parse_from_str(naive, "%Y-%m-%d")?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| anyhow!("invalid reference date {:?}", reference))
}
