//! # Telemetry Frame Encoder
//!
//! Renders a [`TelemetryRecord`] back into wire field order. Used by the
//! frame tests to prove decode round-trips and by tooling that replays
//! captured telemetry.

use super::protocol::*;

/// Encode a record as one telemetry line (no trailing newline)
///
/// Field order matches the wire format; the position block is emitted only
/// when the record carries one. Float fields use the shortest representation
/// that parses back to the same value, so `decode_line(encode_line(r)) == r`.
pub fn encode_line(record: &TelemetryRecord) -> String {
    let mut line = format!(
        "{},{},{},{},{},{},{},{}",
        record.timestamp,
        record.state,
        record.battery_voltage,
        record.temperature,
        record.bird_count,
        record.closest_bird_distance,
        record.weather_status,
        record.system_health,
    );

    if let Some(position) = &record.position {
        line.push_str(&format!(
            ",{},{},{},{}",
            position.latitude, position.longitude, position.altitude, position.heading
        ));
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::decoder::decode_line;

    fn sample_record() -> TelemetryRecord {
        TelemetryRecord {
            timestamp: 1_700_000_000.0,
            state: DroneState::Deterring,
            battery_voltage: 10.5,
            temperature: 25.5,
            bird_count: 2,
            closest_bird_distance: 5.5,
            weather_status: WeatherStatus::Clear,
            system_health: SystemHealth::Ok,
            position: None,
        }
    }

    #[test]
    fn test_encode_base_frame() {
        assert_eq!(
            encode_line(&sample_record()),
            "1700000000,deterring,10.5,25.5,2,5.5,clear,ok"
        );
    }

    #[test]
    fn test_encode_emits_position_block() {
        let mut record = sample_record();
        record.position = Some(Position {
            latitude: 37.7749,
            longitude: -122.4194,
            altitude: 85.5,
            heading: 270.25,
        });

        assert_eq!(
            encode_line(&record),
            "1700000000,deterring,10.5,25.5,2,5.5,clear,ok,37.7749,-122.4194,85.5,270.25"
        );
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let record = sample_record();
        assert_eq!(decode_line(&encode_line(&record)).unwrap(), record);
    }
}
