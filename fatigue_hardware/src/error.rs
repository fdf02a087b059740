use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("i2c error: {0}")]
    I2c(String),
    #[error("spi error: {0}")]
    Spi(String),
    #[error("hx711 data-ready timeout")]
    DataReadyTimeout,
    #[error("angle {raw} outside full scale {full_scale}")]
    AngleOutOfRange { raw: u16, full_scale: u16 },
}

pub type Result<T> = std::result::Result<T, HwError>;
