//! ABOUTME: Alert sink implementations for different outputs
//! ABOUTME: Contains the terminal bell and structured log sinks

pub mod bell;
pub mod log;

pub use bell::BellSink;
pub use log::LogSink;
