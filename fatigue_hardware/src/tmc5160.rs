//! Minimal TMC5160 motion-controller access over SPI.
//!
//! Only the ramp-generator registers the cycle needs are touched; current,
//! chopper and stallGuard tuning are left to the driver's power-on defaults
//! or an external setup tool.

use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use tracing::trace;

use crate::error::{HwError, Result};

const WRITE: u8 = 0x80;

const RAMPMODE: u8 = 0x20;
const XACTUAL: u8 = 0x21;
const VSTART: u8 = 0x23;
const A1: u8 = 0x24;
const V1: u8 = 0x25;
const AMAX: u8 = 0x26;
const VMAX: u8 = 0x27;
const DMAX: u8 = 0x28;
const D1: u8 = 0x2A;
const VSTOP: u8 = 0x2B;
const XTARGET: u8 = 0x2D;
const RAMP_STAT: u8 = 0x35;
const DRV_STATUS: u8 = 0x6F;

const RAMP_STAT_POSITION_REACHED: u32 = 1 << 9;
const DRV_STATUS_STALLGUARD: u32 = 1 << 24;

pub struct Tmc5160 {
    spi: Spi,
}

impl Tmc5160 {
    pub fn new(bus: u8, cs: u8, clock_hz: u32) -> Result<Self> {
        let bus = match bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            2 => Bus::Spi2,
            other => return Err(HwError::Spi(format!("unsupported spi bus {other}"))),
        };
        let ss = match cs {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            other => return Err(HwError::Spi(format!("unsupported chip select {other}"))),
        };
        let spi = Spi::new(bus, ss, clock_hz, Mode::Mode3).map_err(|e| HwError::Spi(e.to_string()))?;
        let mut drv = Self { spi };
        // Positioning mode, single-stage ramp
        drv.write(RAMPMODE, 0)?;
        drv.write(V1, 0)?;
        drv.write(A1, 1000)?;
        drv.write(D1, 1000)?;
        Ok(drv)
    }

    pub fn write(&mut self, reg: u8, value: u32) -> Result<()> {
        let [b3, b2, b1, b0] = value.to_be_bytes();
        let tx = [reg | WRITE, b3, b2, b1, b0];
        let mut rx = [0u8; 5];
        self.spi
            .transfer(&mut rx, &tx)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        trace!(reg, value, "tmc5160 write");
        Ok(())
    }

    /// Reads are pipelined: the reply to a datagram arrives with the next one.
    pub fn read(&mut self, reg: u8) -> Result<u32> {
        let tx = [reg & !WRITE, 0, 0, 0, 0];
        let mut rx = [0u8; 5];
        for _ in 0..2 {
            self.spi
                .transfer(&mut rx, &tx)
                .map_err(|e| HwError::Spi(e.to_string()))?;
        }
        Ok(u32::from_be_bytes([rx[1], rx[2], rx[3], rx[4]]))
    }

    pub fn set_xtarget(&mut self, microsteps: i32) -> Result<()> {
        self.write(XTARGET, microsteps as u32)
    }

    pub fn set_xactual(&mut self, microsteps: i32) -> Result<()> {
        self.write(XACTUAL, microsteps as u32)
    }

    pub fn set_vmax(&mut self, v: u32) -> Result<()> {
        self.write(VMAX, v)
    }

    pub fn set_amax(&mut self, a: u16) -> Result<()> {
        self.write(AMAX, u32::from(a))
    }

    pub fn set_dmax(&mut self, d: u16) -> Result<()> {
        self.write(DMAX, u32::from(d))
    }

    pub fn set_vstart_vstop(&mut self, start: u32, stop: u32) -> Result<()> {
        self.write(VSTART, start)?;
        // VSTOP must never be below VSTART
        self.write(VSTOP, stop.max(start).max(1))
    }

    pub fn position_reached(&mut self) -> Result<bool> {
        Ok(self.read(RAMP_STAT)? & RAMP_STAT_POSITION_REACHED != 0)
    }

    pub fn stalled(&mut self) -> Result<bool> {
        Ok(self.read(DRV_STATUS)? & DRV_STATUS_STALLGUARD != 0)
    }
}
