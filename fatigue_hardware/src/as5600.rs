use rppal::i2c::I2c;

use crate::error::{HwError, Result};
use crate::util::check_raw_angle;

/// RAW ANGLE register (12-bit, big-endian across two bytes).
const RAW_ANGLE: u8 = 0x0E;
pub const FULL_SCALE: u16 = 4096;

pub struct As5600 {
    i2c: I2c,
}

impl As5600 {
    pub fn new(bus: u8, addr: u16) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus).map_err(|e| HwError::I2c(format!("open bus {bus}: {e}")))?;
        i2c.set_slave_address(addr)
            .map_err(|e| HwError::I2c(format!("address {addr:#04x}: {e}")))?;
        Ok(Self { i2c })
    }

    pub fn raw_angle(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(&[RAW_ANGLE], &mut buf)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        // The top nibble reads zero; anything else is a corrupt transfer.
        check_raw_angle(u16::from_be_bytes(buf), FULL_SCALE)
    }
}
