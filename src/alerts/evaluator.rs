//! # Threshold Evaluator
//!
//! Classifies one telemetry record against the configured alert thresholds.

use super::{AlertEvent, AlertType, Severity};
use crate::config::AlertThresholds;
use crate::frame::protocol::TelemetryRecord;

/// Evaluate one record against the threshold table
///
/// Rules are independent; a record may trigger several alerts in one cycle.
/// The returned order is evaluation order (battery, temperature, proximity,
/// system failure), and every event carries the record's timestamp.
///
/// Deterministic, no hidden state, no I/O.
pub fn evaluate(record: &TelemetryRecord, thresholds: &AlertThresholds) -> Vec<AlertEvent> {
    let mut events = Vec::new();

    if record.battery_voltage < thresholds.battery_low_volts {
        // A low battery on a faulted drone may not make it home.
        let severity = if record.system_health.is_fault() {
            Severity::Critical
        } else {
            Severity::Warning
        };
        events.push(AlertEvent::new(
            record.timestamp,
            AlertType::BatteryLow,
            format!(
                "Battery voltage {:.2}V below threshold {:.2}V",
                record.battery_voltage, thresholds.battery_low_volts
            ),
            severity,
        ));
    }

    if record.temperature > thresholds.temperature_high_c {
        events.push(AlertEvent::new(
            record.timestamp,
            AlertType::TemperatureHigh,
            format!(
                "Temperature {:.1}°C above threshold {:.1}°C",
                record.temperature, thresholds.temperature_high_c
            ),
            Severity::Warning,
        ));
    }

    if record.has_bird_detection() && record.closest_bird_distance < thresholds.bird_close_m {
        events.push(AlertEvent::new(
            record.timestamp,
            AlertType::BirdProximity,
            format!(
                "Bird within {:.1}m ({} tracked)",
                record.closest_bird_distance, record.bird_count
            ),
            Severity::Info,
        ));
    }

    if record.system_health.is_fault() && thresholds.system_failure {
        events.push(AlertEvent::new(
            record.timestamp,
            AlertType::SystemFailure,
            format!("Drone reports system fault while {}", record.state),
            Severity::Critical,
        ));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::protocol::{DroneState, SystemHealth, WeatherStatus, NO_BIRD_DISTANCE_M};

    fn thresholds() -> AlertThresholds {
        AlertThresholds {
            battery_low_volts: 11.0,
            temperature_high_c: 60.0,
            bird_close_m: 10.0,
            system_failure: true,
        }
    }

    fn nominal_record() -> TelemetryRecord {
        TelemetryRecord {
            timestamp: 1_700_000_000.0,
            state: DroneState::Patrolling,
            battery_voltage: 12.6,
            temperature: 25.0,
            bird_count: 0,
            closest_bird_distance: NO_BIRD_DISTANCE_M,
            weather_status: WeatherStatus::Clear,
            system_health: SystemHealth::Ok,
            position: None,
        }
    }

    #[test]
    fn test_nominal_record_produces_no_alerts() {
        assert!(evaluate(&nominal_record(), &thresholds()).is_empty());
    }

    #[test]
    fn test_battery_low_is_warning() {
        let mut record = nominal_record();
        record.battery_voltage = 10.5;

        let events = evaluate(&record, &thresholds());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].alert_type, AlertType::BatteryLow);
        assert_eq!(events[0].severity, Severity::Warning);
        assert_eq!(events[0].timestamp, record.timestamp);
    }

    #[test]
    fn test_battery_at_threshold_is_not_low() {
        let mut record = nominal_record();
        record.battery_voltage = 11.0;
        assert!(evaluate(&record, &thresholds()).is_empty());
    }

    #[test]
    fn test_battery_low_with_fault_escalates_to_critical() {
        let mut record = nominal_record();
        record.battery_voltage = 10.5;
        record.system_health = SystemHealth::Fault;

        let events = evaluate(&record, &thresholds());
        assert_eq!(events[0].alert_type, AlertType::BatteryLow);
        assert_eq!(events[0].severity, Severity::Critical);
    }

    #[test]
    fn test_temperature_high() {
        let mut record = nominal_record();
        record.temperature = 72.5;

        let events = evaluate(&record, &thresholds());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].alert_type, AlertType::TemperatureHigh);
        assert_eq!(events[0].severity, Severity::Warning);
    }

    #[test]
    fn test_bird_proximity_requires_real_detection() {
        let mut record = nominal_record();
        record.bird_count = 2;
        record.closest_bird_distance = 5.0;

        let events = evaluate(&record, &thresholds());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].alert_type, AlertType::BirdProximity);
        assert_eq!(events[0].severity, Severity::Info);

        // The no-detection sentinel never trips proximity, regardless of the
        // configured threshold.
        record.closest_bird_distance = NO_BIRD_DISTANCE_M;
        assert!(evaluate(&record, &thresholds()).is_empty());
    }

    #[test]
    fn test_distant_detection_is_not_proximity() {
        let mut record = nominal_record();
        record.bird_count = 1;
        record.closest_bird_distance = 150.0;
        assert!(evaluate(&record, &thresholds()).is_empty());
    }

    #[test]
    fn test_system_failure_respects_gate() {
        let mut record = nominal_record();
        record.system_health = SystemHealth::Fault;

        let events = evaluate(&record, &thresholds());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].alert_type, AlertType::SystemFailure);
        assert_eq!(events[0].severity, Severity::Critical);

        let mut gated_off = thresholds();
        gated_off.system_failure = false;
        assert!(evaluate(&record, &gated_off).is_empty());
    }

    #[test]
    fn test_degraded_health_alone_is_not_failure() {
        let mut record = nominal_record();
        record.system_health = SystemHealth::Degraded;
        assert!(evaluate(&record, &thresholds()).is_empty());
    }

    #[test]
    fn test_multiple_rules_fire_in_evaluation_order() {
        // Low battery and a close bird in the same frame.
        let mut record = nominal_record();
        record.timestamp = 1_700_000_010.0;
        record.state = DroneState::Deterring;
        record.battery_voltage = 10.5;
        record.bird_count = 2;
        record.closest_bird_distance = 5.0;

        let events = evaluate(&record, &thresholds());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].alert_type, AlertType::BatteryLow);
        assert_eq!(events[1].alert_type, AlertType::BirdProximity);
        assert!(events.iter().all(|e| e.timestamp == 1_700_000_010.0));
    }

    #[test]
    fn test_everything_wrong_at_once() {
        let mut record = nominal_record();
        record.battery_voltage = 9.0;
        record.temperature = 80.0;
        record.bird_count = 4;
        record.closest_bird_distance = 2.0;
        record.system_health = SystemHealth::Fault;

        let types: Vec<AlertType> = evaluate(&record, &thresholds())
            .iter()
            .map(|e| e.alert_type)
            .collect();
        assert_eq!(
            types,
            vec![
                AlertType::BatteryLow,
                AlertType::TemperatureHigh,
                AlertType::BirdProximity,
                AlertType::SystemFailure,
            ]
        );
    }
}
