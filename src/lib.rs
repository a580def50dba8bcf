//! Loader, validator and renderer for Omnibus-style platform descriptors.

pub mod config;
pub mod deployment;
pub mod descriptor;
pub mod observability;
pub mod report;
pub mod validation;

pub use deployment::Deployment;
pub use descriptor::{load, load_file, render, Settings, Value};
pub use report::Report;
pub use validation::{validate, validate_with, ValidationError, ValidationOptions};
