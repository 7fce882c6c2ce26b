//! Stream processing: turning raw bytes into ranging frames

pub mod decoder;

pub use decoder::FrameDecoder;
