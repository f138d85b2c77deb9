pub mod stager;

pub use stager::{FailureStager, Severity, DEGRADE_AFTER};
