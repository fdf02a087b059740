use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum RigError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("telemetry sink failed: {0}")]
    Telemetry(String),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Why a command line was discarded.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    #[error("empty command line")]
    Empty,
    #[error("unknown command {0:?}")]
    UnknownKeyword(String),
    #[error("{keyword} takes {expected} field(s), got {got}")]
    FieldCount {
        keyword: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("field {field} is not a finite number: {text:?}")]
    BadNumber { field: &'static str, text: String },
    #[error("line longer than {0} bytes")]
    LineTooLong(usize),
}

/// Why a telemetry frame could not be decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("frame has {got} hex digits, expected {expected}")]
    Length { expected: usize, got: usize },
    #[error("invalid hex digit at offset {0}")]
    HexDigit(usize),
    #[error("unknown state tag {0}")]
    UnknownState(u32),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
