//! Blocking driver core for the VCNL3020 proximity sensor

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::{
    config::Config,
    error::{Error, InitError, InitStep},
    mutex::IoMutex,
    register::{CommandRegister, InterruptStatus, Register},
};

/// Fixed I2C slave address of the VCNL3020.
pub const DEVICE_ADDRESS: u8 = 0x13;

/// Expected content of the product/revision register
/// (product ID 2 in the high nibble, revision 1 in the low nibble).
pub const PROD_ID: u8 = 0x21;

// COMMAND register bits
const CMD_PROX_ON_DEMAND: u8 = 1 << 3;
const CMD_PROX_EN: u8 = 1 << 1;
const CMD_SELFTIMED_EN: u8 = 1 << 0;

// ISR bits, write-1-to-clear
const ISR_TH_HI: u8 = 1 << 0;
const ISR_TH_LOW: u8 = 1 << 1;
const ISR_PROX_READY: u8 = 1 << 3;

// ICR layout: threshold interrupt enable plus the count-exceed selector field
const ICR_THRES_EN: u8 = 1 << 1;
const ICR_COUNT_EXCEED_SHIFT: u8 = 4;

// A conversion takes up to 100 ms worst case; the ready flag is polled at a
// fixed interval with a bounded attempt budget.
const POLL_ATTEMPTS: u32 = 20;
const POLL_INTERVAL_MS: u32 = 20;

/// The register transport together with the time source its poll loop
/// sleeps on.
///
/// Exclusively owned by one [`Vcnl3020`] behind its lock for the lifetime
/// of the handle.
pub struct Bus<I2C, D> {
    i2c: I2C,
    delay: D,
}

impl<I2C, D, E> Bus<I2C, D>
where
    I2C: I2c<Error = E>,
{
    /// Read an 8-bit register
    fn read_register(&mut self, register: Register) -> Result<u8, E> {
        let mut value = [0u8; 1];
        self.i2c
            .write_read(DEVICE_ADDRESS, &[register.into()], &mut value)?;
        Ok(value[0])
    }

    /// Write an 8-bit register
    fn write_register(&mut self, register: Register, value: u8) -> Result<(), E> {
        self.i2c.write(DEVICE_ADDRESS, &[register.into(), value])
    }
}

/// VCNL3020 driver instance
///
/// One handle exists per physical chip; it is only constructed once the
/// chip's identity has been confirmed and every configuration write has
/// succeeded. All register traffic is serialized through the handle's
/// internal lock, so the handle can be shared by reference between a
/// measurement path and an alarm path.
pub struct Vcnl3020<M> {
    bus: M,
    revision: u8,
}

impl<M, I2C, D, E> Vcnl3020<M>
where
    M: IoMutex<Bus = Bus<I2C, D>>,
    I2C: I2c<Error = E>,
    D: DelayNs,
{
    /// Probe and configure the sensor, yielding a ready-to-use handle.
    ///
    /// The product/revision register is read first; nothing is written
    /// unless it matches [`PROD_ID`]. The configuration writes then happen
    /// in a fixed order (rate, LED current, threshold low/high byte,
    /// interrupt control, command) and the sequence aborts on the first
    /// failure. The final command write enables proximity measurement in
    /// self-timed periodic mode, with the on-demand trigger explicitly
    /// clear.
    ///
    /// # Errors
    ///
    /// [`InitError::IdentityMismatch`] if another chip answers on the bus,
    /// [`InitError::Bus`] naming the step at which a transfer failed. No
    /// handle is returned in either case.
    pub fn new(i2c: I2C, delay: D, config: &Config) -> Result<Self, InitError<E>> {
        let mut bus = Bus { i2c, delay };
        let revision = configure(&mut bus, config)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("proximity sensor ready, rev 0x{:02x}", revision);

        Ok(Self {
            bus: M::create(bus),
            revision,
        })
    }

    /// Product/revision byte read from the chip during construction
    #[must_use]
    pub fn revision(&self) -> u8 {
        self.revision
    }

    /// Trigger a single on-demand measurement and return the raw proximity
    /// count.
    ///
    /// The count is the chip's 12-bit-range reflectance value in a `u16`;
    /// larger means closer, with no defined mapping to physical distance at
    /// this layer.
    ///
    /// The handle's lock is held for the whole call, so a concurrent alarm
    /// read or clear waits until the measurement completes. The previous
    /// command-register value is saved before the trigger and written back
    /// after a successful read-out, which re-arms self-timed mode.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] if the data-ready flag does not appear within the
    /// bounded poll window (20 polls, 20 ms apart); the command register is
    /// left un-restored in that case. [`Error::Bus`] on any transfer
    /// failure.
    pub fn measure_proximity(&self) -> Result<u16, Error<E>> {
        self.bus.lock(|bus| {
            // store command register state before the measurement
            let saved = bus.read_register(Register::Command).map_err(Error::Bus)?;

            bus.write_register(Register::Command, CMD_PROX_ON_DEMAND)
                .map_err(Error::Bus)?;

            // wait for data to become ready
            let mut ready = false;
            for attempt in 0..POLL_ATTEMPTS {
                if attempt > 0 {
                    bus.delay.delay_ms(POLL_INTERVAL_MS);
                }
                let command = bus.read_register(Register::Command).map_err(Error::Bus)?;
                if CommandRegister(command).prox_data_ready() {
                    ready = true;
                    break;
                }
            }
            if !ready {
                #[cfg(feature = "defmt")]
                defmt::warn!("measurement data never became ready");
                return Err(Error::Timeout);
            }

            let hi = bus.read_register(Register::ResultHi).map_err(Error::Bus)?;
            #[cfg(feature = "defmt")]
            defmt::trace!("result high byte 0x{:02x}", hi);

            let lo = bus.read_register(Register::ResultLo).map_err(Error::Bus)?;
            #[cfg(feature = "defmt")]
            defmt::trace!("result low byte 0x{:02x}", lo);

            bus.write_register(Register::Command, saved)
                .map_err(Error::Bus)?;

            Ok((u16::from(hi) << 8) | u16::from(lo))
        })
    }

    /// Whether the low-threshold alarm is currently latched.
    ///
    /// # Errors
    ///
    /// [`Error::Bus`] if the status register cannot be read. Use
    /// [`Self::alarm_asserted`] for the infallible variant that degrades a
    /// read failure to "no alarm".
    pub fn try_alarm_asserted(&self) -> Result<bool, Error<E>> {
        self.bus.lock(|bus| {
            let isr = bus
                .read_register(Register::InterruptStatus)
                .map_err(Error::Bus)?;
            Ok(InterruptStatus(isr).threshold_low())
        })
    }

    /// Whether the low-threshold alarm is currently latched, reporting
    /// `false` when the status register cannot be read.
    ///
    /// The alarm is a best-effort indicator: a caller that needs to
    /// distinguish "no alarm" from "could not ask" should use
    /// [`Self::try_alarm_asserted`] instead.
    #[must_use]
    pub fn alarm_asserted(&self) -> bool {
        match self.try_alarm_asserted() {
            Ok(asserted) => asserted,
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("could not read interrupt status, reporting no alarm");
                false
            }
        }
    }

    /// Clear all latched status bits.
    ///
    /// Writes the high-threshold, low-threshold and measurement-ready bits
    /// in one transaction (write-1-to-clear), regardless of which of them
    /// are currently set.
    ///
    /// # Errors
    ///
    /// [`Error::Bus`] on transfer failure. The alarm bit is still set in
    /// that case and the call should be retried.
    pub fn clear_alarm(&self) -> Result<(), Error<E>> {
        self.bus.lock(|bus| {
            bus.write_register(
                Register::InterruptStatus,
                ISR_TH_HI | ISR_TH_LOW | ISR_PROX_READY,
            )
            .map_err(Error::Bus)
        })
    }

    /// Tear the handle down and hand back the transport and delay
    #[must_use]
    pub fn release(self) -> (I2C, D) {
        let bus = self.bus.into_inner();
        (bus.i2c, bus.delay)
    }
}

fn configure<I2C, D, E>(bus: &mut Bus<I2C, D>, config: &Config) -> Result<u8, InitError<E>>
where
    I2C: I2c<Error = E>,
{
    let prod_rev = bus
        .read_register(Register::ProdRev)
        .map_err(|e| InitError::Bus(InitStep::ProductRevision, e))?;
    if prod_rev != PROD_ID {
        return Err(InitError::IdentityMismatch(prod_rev));
    }

    bus.write_register(Register::ProximityRate, config.proximity_rate)
        .map_err(|e| InitError::Bus(InitStep::ProximityRate, e))?;

    bus.write_register(Register::LedCurrent, config.led_current)
        .map_err(|e| InitError::Bus(InitStep::LedCurrent, e))?;

    // the 16-bit threshold is split across two byte registers
    let [threshold_lo, threshold_hi] = config.threshold.to_le_bytes();
    bus.write_register(Register::LowThresholdLo, threshold_lo)
        .map_err(|e| InitError::Bus(InitStep::ThresholdLow, e))?;
    bus.write_register(Register::LowThresholdHi, threshold_hi)
        .map_err(|e| InitError::Bus(InitStep::ThresholdHigh, e))?;

    // interrupt on threshold crossings, after the configured sample count
    bus.write_register(
        Register::InterruptControl,
        (config.count_exceed << ICR_COUNT_EXCEED_SHIFT) | ICR_THRES_EN,
    )
    .map_err(|e| InitError::Bus(InitStep::InterruptControl, e))?;

    bus.write_register(
        Register::Command,
        (CMD_PROX_EN | CMD_SELFTIMED_EN) & !CMD_PROX_ON_DEMAND,
    )
    .map_err(|e| InitError::Bus(InitStep::Command, e))?;

    Ok(prod_rev)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::vec::Vec;

    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

    use super::*;

    /// Transport spy that answers by register and records every
    /// transaction as `(op, register)`.
    #[derive(Clone, Default)]
    struct SpyBus {
        log: Arc<Mutex<Vec<(char, u8)>>>,
    }

    impl SpyBus {
        fn response(reg: u8) -> u8 {
            match reg {
                0x81 => PROD_ID,
                // ready immediately, self-timed bits active
                0x80 => 0x23,
                0x87 => 0x12,
                0x88 => 0x34,
                _ => 0x00,
            }
        }
    }

    impl ErrorType for SpyBus {
        type Error = ErrorKind;
    }

    impl I2c for SpyBus {
        fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            let mut log = self.log.lock().unwrap();
            match operations {
                [Operation::Write(bytes)] => log.push(('w', bytes[0])),
                [Operation::Write(reg), Operation::Read(data)] => {
                    let reg = reg[0];
                    data[0] = Self::response(reg);
                    log.push(('r', reg));
                }
                _ => return Err(ErrorKind::Other),
            }
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn operations_never_interleave_on_the_wire() {
        let spy = SpyBus::default();
        let log = Arc::clone(&spy.log);

        let sensor = Arc::new(
            Vcnl3020::<Mutex<_>>::new(spy, NoDelay, &Config::default()).unwrap(),
        );
        log.lock().unwrap().clear();

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let sensor = Arc::clone(&sensor);
                thread::spawn(move || {
                    if i % 2 == 0 {
                        sensor.measure_proximity().unwrap();
                    } else {
                        sensor.clear_alarm().unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        // Each measurement must appear as one contiguous block (command
        // save, trigger, ready poll, result bytes, restore); the clears may
        // land before or after a block but never inside one.
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2 * 6 + 2);
        let mut i = 0;
        let mut measurements = 0;
        let mut clears = 0;
        while i < log.len() {
            match log[i] {
                ('r', 0x80) => {
                    assert_eq!(
                        &log[i..i + 6],
                        &[
                            ('r', 0x80),
                            ('w', 0x80),
                            ('r', 0x80),
                            ('r', 0x87),
                            ('r', 0x88),
                            ('w', 0x80),
                        ],
                    );
                    measurements += 1;
                    i += 6;
                }
                ('w', 0x8e) => {
                    clears += 1;
                    i += 1;
                }
                other => panic!("unexpected transaction {other:?}"),
            }
        }
        assert_eq!(measurements, 2);
        assert_eq!(clears, 2);
    }

    #[test]
    fn measurement_result_recombines_from_spy_bytes() {
        let sensor =
            Vcnl3020::<Mutex<_>>::new(SpyBus::default(), NoDelay, &Config::default()).unwrap();
        assert_eq!(sensor.measure_proximity().unwrap(), 0x1234);
    }
}
