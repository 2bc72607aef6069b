//! Physical-plausibility validation of canonical device records.
//!
//! Every rule is applied independently: an out-of-range reading on one field
//! never short-circuits the checks on the others. Only identity violations
//! are critical; range violations are advisory and leave the record
//! deliverable.

use serde::Serialize;

use super::record::DeviceRecord;

/// Upper bound for any voltage reading, in volts.
const VOLTAGE_MAX: f64 = 500.0;

/// Plausible mains frequency band, in hertz. Zero is treated as "not
/// reported" and passes; whether that conflates absence with a legitimate
/// zero is a known quirk that is preserved deliberately.
const FREQ_MIN: f64 = 45.0;
const FREQ_MAX: f64 = 65.0;

/// Plausible enclosure temperature band, in degrees Celsius.
const TEMP_MIN: f64 = -20.0;
const TEMP_MAX: f64 = 100.0;

/// How severe a violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Identity violation; the record must not be processed downstream.
    Critical,
    /// Out-of-range measurement; logged, but the record stays deliverable.
    Advisory,
}

/// One failed check.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub field: &'static str,
    pub value: String,
    pub message: String,
    pub severity: Severity,
}

/// Result of validating one record. Violations keep the order in which the
/// checks run, so repeated validation of the same record is identical.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationOutcome {
    pub violations: Vec<Violation>,
}

impl ValidationOutcome {
    /// True when no check failed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// True when any violation touches an identity-level field.
    pub fn has_critical_errors(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.severity == Severity::Critical)
    }
}

/// Validate one canonical record against the fixed plausibility ranges.
pub fn validate(record: &DeviceRecord) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();
    let t = &record.telemetry;

    if record.id.is_empty() {
        outcome.violations.push(Violation {
            field: "id",
            value: String::new(),
            message: "device id must not be empty".to_string(),
            severity: Severity::Critical,
        });
    }

    if record.device_type < 0 {
        advisory(
            &mut outcome,
            "device_type",
            record.device_type as f64,
            "device type code must not be negative",
        );
    }

    let non_negative: [(&'static str, f64, &str); 6] = [
        ("load_total_watt", t.load_total_watt, "power must not be negative"),
        ("load_total_va", t.load_total_va, "power must not be negative"),
        ("output_current1", t.output_current1, "current must not be negative"),
        ("output_current2", t.output_current2, "current must not be negative"),
        ("output_current3", t.output_current3, "current must not be negative"),
        (
            "battery_remain_time",
            t.battery_remain_time,
            "battery remaining time must not be negative",
        ),
    ];
    for (field, value, message) in non_negative {
        if value < 0.0 {
            advisory(&mut outcome, field, value, message);
        }
    }

    let voltages: [(&'static str, f64); 7] = [
        ("input_volt1", t.input_volt1),
        ("input_volt2", t.input_volt2),
        ("input_volt3", t.input_volt3),
        ("output_volt1", t.output_volt1),
        ("output_volt2", t.output_volt2),
        ("output_volt3", t.output_volt3),
        ("battery_volt", t.battery_volt),
    ];
    for (field, value) in voltages {
        if !(0.0..=VOLTAGE_MAX).contains(&value) {
            advisory(&mut outcome, field, value, "voltage outside 0-500 V");
        }
    }

    for (field, value) in [("input_freq", t.input_freq), ("output_freq", t.output_freq)] {
        if value != 0.0 && !(FREQ_MIN..=FREQ_MAX).contains(&value) {
            advisory(&mut outcome, field, value, "frequency outside 45-65 Hz");
        }
    }

    for (field, value) in [
        ("load_percent", t.load_percent),
        ("battery_capacity", t.battery_capacity),
    ] {
        if !(0.0..=100.0).contains(&value) {
            advisory(&mut outcome, field, value, "percentage outside 0-100");
        }
    }

    if !(TEMP_MIN..=TEMP_MAX).contains(&t.temperature) {
        advisory(
            &mut outcome,
            "temperature",
            t.temperature,
            "temperature outside -20-100 C",
        );
    }

    outcome
}

/// Validate a batch of records, one outcome per record, in order.
pub fn validate_batch(records: &[DeviceRecord]) -> Vec<ValidationOutcome> {
    records.iter().map(validate).collect()
}

fn advisory(outcome: &mut ValidationOutcome, field: &'static str, value: f64, message: &str) {
    outcome.violations.push(Violation {
        field,
        value: value.to_string(),
        message: message.to_string(),
        severity: Severity::Advisory,
    });
}
