/// Error type for VCNL3020 operations
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Communication error on the register bus
    Bus(E),
    /// The data-ready flag never appeared within the bounded poll window
    Timeout,
    /// The caller asked for a state change the device cannot perform
    /// (the alarm can only be cleared, never set)
    InvalidRequest,
}

/// Errors that can occur while bringing the sensor up.
///
/// None of these leave a usable device handle behind; construction either
/// completes every configuration write or yields nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError<E> {
    /// Communication error on the register bus, identifying the
    /// configuration step that failed
    Bus(InitStep, E),
    /// The product/revision register did not read back as
    /// [`PROD_ID`](crate::PROD_ID), so the chip on the bus is not a
    /// VCNL3020. Carries the identifier that was actually read
    IdentityMismatch(u8),
}

/// Steps of the initialization sequence, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitStep {
    /// Reading the product/revision register
    ProductRevision,
    /// Writing the proximity measurement rate
    ProximityRate,
    /// Writing the IR LED current
    LedCurrent,
    /// Writing the low byte of the low threshold
    ThresholdLow,
    /// Writing the high byte of the low threshold
    ThresholdHigh,
    /// Writing the interrupt control register
    InterruptControl,
    /// Writing the command register to enter self-timed mode
    Command,
}
