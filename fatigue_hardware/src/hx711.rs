use std::time::Duration;
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::{sign_extend_24, wait_until_low_with_timeout};

pub struct Hx711 {
    dt: rppal::gpio::InputPin,
    sck: rppal::gpio::OutputPin,
    gain_pulses: u8, // 1 = A/128, 2 = B/32, 3 = A/64
}

impl Hx711 {
    pub fn new(dt_pin: u8, sck_pin: u8, gain_pulses: u8) -> Result<Self> {
        let gpio = rppal::gpio::Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let dt = gpio
            .get(dt_pin)
            .map_err(|e| HwError::Gpio(format!("open hx711 dt pin {dt_pin}: {e}")))?
            .into_input();
        let mut sck = gpio
            .get(sck_pin)
            .map_err(|e| HwError::Gpio(format!("open hx711 sck pin {sck_pin}: {e}")))?
            .into_output();
        sck.set_low(); // clock idle low
        Ok(Self {
            dt,
            sck,
            gain_pulses,
        })
    }

    pub fn read_with_timeout(&mut self, timeout: Duration) -> Result<i32> {
        // DT goes low when a conversion is ready
        wait_until_low_with_timeout(|| self.dt.is_high(), timeout, Duration::from_micros(200))?;

        let mut value: u32 = 0;
        for _ in 0..24 {
            self.sck.set_high();
            spin_delay_100ns();
            value = (value << 1) | u32::from(self.dt.is_high());
            self.sck.set_low();
            spin_delay_100ns();
        }

        // Extra pulses select gain/channel for the next conversion
        for _ in 0..self.gain_pulses {
            self.sck.set_high();
            spin_delay_100ns();
            self.sck.set_low();
            spin_delay_100ns();
        }

        let raw = sign_extend_24(value);
        trace!(raw, "hx711 raw read");
        Ok(raw)
    }
}

#[inline(always)]
fn spin_delay_100ns() {
    std::hint::spin_loop();
}
