//! Flat-file readers/writers and classifier persistence.
pub mod flat;
pub mod serialization;
