//! Core types for the positioning pipeline

pub mod types;

pub use types::*;
