//! Connection lifecycle and the per-connection pipeline

pub mod server;

pub use server::{Pipeline, Server};
