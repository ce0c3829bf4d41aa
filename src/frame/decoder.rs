//! # Telemetry Frame Decoder
//!
//! Parses one raw serial line into a validated [`TelemetryRecord`].

use super::protocol::*;
use crate::error::{GcsError, Result};

/// Decode one telemetry line
///
/// # Arguments
///
/// * `line` - One complete frame, without the trailing newline
///
/// # Returns
///
/// * `Result<TelemetryRecord>` - Decoded record, or `Decode` error if invalid
///
/// # Errors
///
/// Returns a `Decode` error if:
/// - The field count is neither 8 nor 12
/// - A numeric field fails to parse
/// - A state/weather/health label is outside its enumerated set
///
/// Pure function of its input; the caller discards the frame on failure and
/// continues with the next cycle.
pub fn decode_line(line: &str) -> Result<TelemetryRecord> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(FRAME_DELIMITER).collect();

    if fields.len() != FRAME_BASE_FIELDS && fields.len() != FRAME_FULL_FIELDS {
        return Err(GcsError::Decode(format!(
            "expected {} or {} fields, got {}",
            FRAME_BASE_FIELDS,
            FRAME_FULL_FIELDS,
            fields.len()
        )));
    }

    let timestamp = parse_f64(fields[0], "timestamp")?;
    let state: DroneState = fields[1].parse()?;
    let battery_voltage = parse_f64(fields[2], "battery_voltage")?;
    let temperature = parse_f64(fields[3], "temperature")?;
    let bird_count = fields[4].parse::<u32>().map_err(|_| {
        GcsError::Decode(format!("bird_count is not a non-negative integer: {:?}", fields[4]))
    })?;
    let closest_bird_distance = parse_f64(fields[5], "closest_bird_distance")?;
    let weather_status: WeatherStatus = fields[6].parse()?;
    let system_health: SystemHealth = fields[7].parse()?;

    let position = if fields.len() == FRAME_FULL_FIELDS {
        Some(Position {
            latitude: parse_f64(fields[8], "latitude")?,
            longitude: parse_f64(fields[9], "longitude")?,
            altitude: parse_f64(fields[10], "altitude")?,
            heading: parse_f64(fields[11], "heading")?,
        })
    } else {
        None
    };

    Ok(TelemetryRecord {
        timestamp,
        state,
        battery_voltage,
        temperature,
        bird_count,
        closest_bird_distance,
        weather_status,
        system_health,
        position,
    })
}

fn parse_f64(field: &str, name: &str) -> Result<f64> {
    let value = field
        .parse::<f64>()
        .map_err(|_| GcsError::Decode(format!("{} is not numeric: {:?}", name, field)))?;
    if !value.is_finite() {
        return Err(GcsError::Decode(format!("{} is not finite: {:?}", name, field)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encoder::encode_line;

    #[test]
    fn test_decode_base_frame() {
        let record = decode_line("1700000000,patrolling,12.6,25.0,0,999.0,clear,ok").unwrap();

        assert_eq!(record.timestamp, 1_700_000_000.0);
        assert_eq!(record.state, DroneState::Patrolling);
        assert!((record.battery_voltage - 12.6).abs() < f64::EPSILON);
        assert!((record.temperature - 25.0).abs() < f64::EPSILON);
        assert_eq!(record.bird_count, 0);
        assert_eq!(record.closest_bird_distance, NO_BIRD_DISTANCE_M);
        assert_eq!(record.weather_status, WeatherStatus::Clear);
        assert_eq!(record.system_health, SystemHealth::Ok);
        assert!(record.position.is_none());
        assert!(!record.has_bird_detection());
    }

    #[test]
    fn test_decode_full_frame_with_position() {
        let record = decode_line(
            "1700000010,deterring,10.5,25.0,2,5.0,clear,ok,37.7749,-122.4194,85.5,270.0",
        )
        .unwrap();

        assert_eq!(record.state, DroneState::Deterring);
        assert_eq!(record.bird_count, 2);
        assert!(record.has_bird_detection());

        let position = record.position.unwrap();
        assert!((position.latitude - 37.7749).abs() < 1e-9);
        assert!((position.longitude - (-122.4194)).abs() < 1e-9);
        assert!((position.altitude - 85.5).abs() < 1e-9);
        assert!((position.heading - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_decode_tolerates_trailing_newline() {
        let record = decode_line("1700000000,idle,12.6,25.0,0,999.0,clear,ok\r\n").unwrap();
        assert_eq!(record.state, DroneState::Idle);
    }

    #[test]
    fn test_decode_wrong_field_count() {
        assert!(decode_line("1700000000,idle,12.6").is_err());
        assert!(decode_line("").is_err());
        // 9 fields: position block must be all-or-nothing.
        assert!(decode_line("1700000000,idle,12.6,25.0,0,999.0,clear,ok,37.0").is_err());
    }

    #[test]
    fn test_decode_non_numeric_fields() {
        assert!(decode_line("now,idle,12.6,25.0,0,999.0,clear,ok").is_err());
        assert!(decode_line("1700000000,idle,full,25.0,0,999.0,clear,ok").is_err());
        assert!(decode_line("1700000000,idle,12.6,25.0,many,999.0,clear,ok").is_err());
        // A negative count is malformed, not zero.
        assert!(decode_line("1700000000,idle,12.6,25.0,-1,999.0,clear,ok").is_err());
    }

    #[test]
    fn test_decode_non_finite_numeric_is_rejected() {
        assert!(decode_line("1700000000,idle,NaN,25.0,0,999.0,clear,ok").is_err());
        assert!(decode_line("1700000000,idle,12.6,inf,0,999.0,clear,ok").is_err());
    }

    #[test]
    fn test_decode_unknown_labels() {
        assert!(decode_line("1700000000,hovering,12.6,25.0,0,999.0,clear,ok").is_err());
        assert!(decode_line("1700000000,idle,12.6,25.0,0,999.0,sunny,ok").is_err());
        assert!(decode_line("1700000000,idle,12.6,25.0,0,999.0,clear,fine").is_err());
    }

    #[test]
    fn test_decode_never_panics_on_garbage() {
        for garbage in [",,,,,,,", "\0\0\0", "1,2,3,4,5,6,7,8,9,10,11,12,13", "ok"] {
            assert!(decode_line(garbage).is_err());
        }
    }

    #[test]
    fn test_decode_encode_round_trip_preserves_values() {
        // Field values survive a decode/encode/decode cycle exactly, for
        // both frame shapes.
        for line in [
            "1700000000,patrolling,12.6,25.0,0,999.0,clear,ok",
            "1700000010,deterring,10.5,42.5,2,5.0,high_wind,degraded,37.7749,-122.4194,85.5,270.0",
        ] {
            let record = decode_line(line).unwrap();
            assert_eq!(decode_line(&encode_line(&record)).unwrap(), record);
        }
    }

    #[test]
    fn test_decode_encode_round_trip_preserves_text() {
        // When every float is already in shortest form, the line itself
        // survives byte-for-byte.
        let line = "1700000000.5,patrolling,12.6,25.5,3,8.5,light_rain,degraded,37.7749,-122.4194,85.5,270.5";
        let record = decode_line(line).unwrap();
        assert_eq!(encode_line(&record), line);
    }
}
