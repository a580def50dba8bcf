//! Descriptor validation subsystem.
//!
//! # Data Flow
//! ```text
//! Settings (parsed, immutable)
//!     → validator.rs (schema.rs table: kinds, ranges, formats)
//!     → Vec<ValidationError> (all violations, ordered by key)
//!
//! Settings
//!     → advisory.rs (relations between settings)
//!     → Vec<Advisory> (non-fatal)
//! ```
//!
//! # Design Decisions
//! - Syntax is the parser's job; this layer only sees well-formed values
//! - Unknown keys are errors unless explicitly allowed
//! - Advisories are reported separately so they never mask violations

pub mod advisory;
pub mod schema;
pub mod validator;

pub use advisory::{advisories, Advisory};
pub use schema::{Constraint, SettingSpec, Subsystem, SCHEMA};
pub use validator::{validate, validate_with, ValidationError, ValidationOptions, Violation};
