//! Device domain layer.
//!
//! Converts the appliance's untyped telemetry into the canonical schema and
//! checks it for physical plausibility:
//!
//! - [`fields`]: vendor field vocabulary and the central coercion rules
//! - [`parser`]: tolerant raw-to-canonical conversion
//! - [`validate`]: plausibility ranges with critical/advisory severities

pub mod fields;
pub mod parser;
pub mod record;
pub mod validate;

pub use parser::{parse_record, parse_records};
pub use record::{DeviceRecord, Telemetry};
pub use validate::{Severity, ValidationOutcome, Violation, validate, validate_batch};
