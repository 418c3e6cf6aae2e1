//! CF time decoding (`<unit> since <epoch>`).

use crate::dataset::Coordinate;
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Default label format for decoded times.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Decoder for one CF time units string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    pub seconds_per_unit: f64,
    pub epoch: NaiveDateTime,
}

impl TimeUnits {
    /// Parses strings such as `days since 1950-01-01` or
    /// `seconds since 1970-01-01T00:00:00Z`.
    pub fn parse(units: &str) -> Option<TimeUnits> {
        let lower = units.trim().to_lowercase();
        let (unit, epoch) = lower.split_once(" since ")?;
        let seconds_per_unit = match unit.trim() {
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
            "minutes" | "minute" | "mins" | "min" => 60.0,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3_600.0,
            "days" | "day" | "d" => 86_400.0,
            _ => return None,
        };
        Some(TimeUnits {
            seconds_per_unit,
            epoch: parse_epoch(epoch)?,
        })
    }

    pub fn to_datetime(&self, value: f64) -> Option<NaiveDateTime> {
        if !value.is_finite() {
            return None;
        }
        let millis = (value * self.seconds_per_unit * 1_000.0).round();
        if millis.abs() > i64::MAX as f64 {
            return None;
        }
        let offset = Duration::try_milliseconds(millis as i64)?;
        self.epoch.checked_add_signed(offset)
    }

    pub fn format(&self, value: f64, format: &str) -> String {
        self.to_datetime(value)
            .map(|dt| dt.format(format).to_string())
            .unwrap_or_default()
    }
}

fn parse_epoch(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    let text = text.strip_suffix("utc").unwrap_or(text).trim_end();
    let text = text.strip_suffix('z').unwrap_or(text);
    let text = text.strip_suffix("+00:00").unwrap_or(text);
    let cleaned = text.replace('t', " ").trim().to_string();

    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(dt);
        }
    }
    let date_part = cleaned.split_whitespace().next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Formatted labels for a time coordinate, or `None` when its units are not
/// a CF time reference.
pub fn time_labels(coordinate: &Coordinate, format: &str) -> Option<Vec<String>> {
    let units = TimeUnits::parse(coordinate.descriptor.units()?)?;
    Some(
        coordinate
            .values
            .iter()
            .map(|v| units.format(*v, format))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::VariableDescriptor;

    #[test]
    fn test_parse_units() {
        let units = TimeUnits::parse("days since 1950-01-01").unwrap();
        assert_eq!(units.seconds_per_unit, 86_400.0);
        assert_eq!(units.format(1.5, DEFAULT_TIME_FORMAT), "1950-01-02 12:00");

        let units = TimeUnits::parse("seconds since 1970-01-01T00:00:00Z").unwrap();
        assert_eq!(units.format(3_600.0, DEFAULT_TIME_FORMAT), "1970-01-01 01:00");

        let units = TimeUnits::parse("Hours Since 2000-01-01 06:00:00").unwrap();
        assert_eq!(units.format(-6.0, "%Y-%m-%d %H"), "2000-01-01 00");
    }

    #[test]
    fn test_rejects_non_time_units() {
        assert!(TimeUnits::parse("degrees_north").is_none());
        assert!(TimeUnits::parse("fortnights since 2000-01-01").is_none());
        assert!(TimeUnits::parse("days since yesterday").is_none());
    }

    #[test]
    fn test_nan_formats_empty() {
        let units = TimeUnits::parse("days since 2000-01-01").unwrap();
        assert_eq!(units.format(f64::NAN, DEFAULT_TIME_FORMAT), "");
    }

    #[test]
    fn test_coordinate_labels() {
        let coord = Coordinate {
            descriptor: VariableDescriptor::new("time", &["time"], &[2])
                .with_attribute("units", "days since 2020-03-01"),
            values: vec![0.0, 31.0],
        };
        assert_eq!(
            time_labels(&coord, "%Y-%m-%d").unwrap(),
            vec!["2020-03-01".to_string(), "2020-04-01".to_string()]
        );

        let plain = Coordinate {
            descriptor: VariableDescriptor::new("x", &["x"], &[1]),
            values: vec![0.0],
        };
        assert!(time_labels(&plain, "%Y").is_none());
    }
}
