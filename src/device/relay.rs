//! Relay actuator
//!
//! Two backends share the [`RelayActuator`] contract: [`GpioRelay`] drives a
//! real output pin through `rppal`, [`SimulatedRelay`] only remembers the
//! commanded state for hosts without GPIO.

use rppal::gpio::{Gpio, OutputPin};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::{debug, info};

/// Errors raised while driving the relay
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("Relay pin lock poisoned")]
    Poisoned,
}

/// Contract the dispatcher uses to switch the relay.
///
/// Calls take effect synchronously and are idempotent: switching on an
/// already-on relay leaves it on.
pub trait RelayActuator: Send + Sync {
    fn turn_on(&self) -> Result<(), ActuatorError>;

    fn turn_off(&self) -> Result<(), ActuatorError>;

    fn is_on(&self) -> bool;
}

/// Relay wired to a GPIO output pin (BCM numbering).
pub struct GpioRelay {
    pin_number: u8,
    pin: Mutex<OutputPin>,
    on: AtomicBool,
}

impl GpioRelay {
    /// Opens `pin_number` as an output, driven low (relay off).
    pub fn open(pin_number: u8) -> Result<Self, ActuatorError> {
        let gpio = Gpio::new()?;
        let pin = gpio.get(pin_number)?.into_output_low();
        info!("Relay output opened on GPIO {}", pin_number);

        Ok(Self {
            pin_number,
            pin: Mutex::new(pin),
            on: AtomicBool::new(false),
        })
    }

    fn write(&self, high: bool) -> Result<(), ActuatorError> {
        let mut pin = self.pin.lock().map_err(|_| ActuatorError::Poisoned)?;
        if high {
            pin.set_high();
        } else {
            pin.set_low();
        }
        self.on.store(high, Ordering::SeqCst);
        debug!("GPIO {} driven {}", self.pin_number, if high { "high" } else { "low" });
        Ok(())
    }
}

impl RelayActuator for GpioRelay {
    fn turn_on(&self) -> Result<(), ActuatorError> {
        self.write(true)?;
        info!("Relay turned ON");
        Ok(())
    }

    fn turn_off(&self) -> Result<(), ActuatorError> {
        self.write(false)?;
        info!("Relay turned OFF");
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }
}

/// In-memory relay for development hosts.
#[derive(Debug, Default)]
pub struct SimulatedRelay {
    on: AtomicBool,
}

impl RelayActuator for SimulatedRelay {
    fn turn_on(&self) -> Result<(), ActuatorError> {
        self.on.store(true, Ordering::SeqCst);
        info!("Relay turned ON (simulated)");
        Ok(())
    }

    fn turn_off(&self) -> Result<(), ActuatorError> {
        self.on.store(false, Ordering::SeqCst);
        info!("Relay turned OFF (simulated)");
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }
}
