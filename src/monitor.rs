//! Framework-facing endpoints for measurements and alarm state.
//!
//! These are the thin translations a monitoring frontend binds to: a
//! measurement channel read on demand, and an alarm attribute that can be
//! shown and cleared. Neither holds protocol state; both borrow the shared
//! device handle and go through its lock.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::{
    driver::{Bus, Vcnl3020},
    error::Error,
    mutex::IoMutex,
};

/// On-demand proximity measurement channel
pub struct ProximityChannel<'a, M> {
    device: &'a Vcnl3020<M>,
}

impl<'a, M, I2C, D, E> ProximityChannel<'a, M>
where
    M: IoMutex<Bus = Bus<I2C, D>>,
    I2C: I2c<Error = E>,
    D: DelayNs,
{
    /// Bind the channel to a device handle
    #[must_use]
    pub fn new(device: &'a Vcnl3020<M>) -> Self {
        Self { device }
    }

    /// Take a single measurement and return the raw proximity count.
    ///
    /// # Errors
    ///
    /// Forwards [`Vcnl3020::measure_proximity`] errors unchanged.
    pub fn read_raw(&self) -> Result<u16, Error<E>> {
        self.device.measure_proximity()
    }
}

/// Read/clear endpoint for the "object too close" alarm.
///
/// The attribute accepts exactly one written value, the clear sentinel `0`:
/// an alarm can only be cleared, never set, by external request.
pub struct AlarmAttribute<'a, M> {
    device: &'a Vcnl3020<M>,
}

impl<'a, M, I2C, D, E> AlarmAttribute<'a, M>
where
    M: IoMutex<Bus = Bus<I2C, D>>,
    I2C: I2c<Error = E>,
    D: DelayNs,
{
    /// Bind the attribute to a device handle
    #[must_use]
    pub fn new(device: &'a Vcnl3020<M>) -> Self {
        Self { device }
    }

    /// Current alarm state; transport trouble reads as "no alarm"
    #[must_use]
    pub fn read(&self) -> bool {
        self.device.alarm_asserted()
    }

    /// Accept a value written to the attribute.
    ///
    /// `0` clears the latched status bits; any other value is rejected
    /// before it reaches the wire.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRequest`] for a non-zero value, [`Error::Bus`] if
    /// the clear write fails (the alarm stays latched and the write should
    /// be retried).
    pub fn write(&self, value: u32) -> Result<(), Error<E>> {
        if value != 0 {
            return Err(Error::InvalidRequest);
        }
        self.device.clear_alarm()
    }
}

impl<M, I2C, D, E> Vcnl3020<M>
where
    M: IoMutex<Bus = Bus<I2C, D>>,
    I2C: I2c<Error = E>,
    D: DelayNs,
{
    /// Measurement endpoint borrowing this handle
    #[must_use]
    pub fn proximity_channel(&self) -> ProximityChannel<'_, M> {
        ProximityChannel::new(self)
    }

    /// Alarm endpoint borrowing this handle
    #[must_use]
    pub fn alarm_attribute(&self) -> AlarmAttribute<'_, M> {
        AlarmAttribute::new(self)
    }
}
