//! Caller-supplied sensor configuration.

/// Configuration written to the sensor during initialization.
///
/// All four values go to the device verbatim; the driver does not
/// second-guess their ranges. The selector encodings are in the VCNL3020
/// datasheet register tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Proximity measurement rate selector for self-timed mode,
    /// `0` (1.95 measurements/s) through `7` (250 measurements/s)
    pub proximity_rate: u8,
    /// IR LED drive current selector in units of 10 mA, `0` through `20`
    pub led_current: u8,
    /// 16-bit low-threshold value; results staying below it for the
    /// programmed sample count latch the alarm
    pub threshold: u16,
    /// Consecutive-sample count selector for threshold interrupts,
    /// `0` (1 sample) through `7` (128 samples)
    pub count_exceed: u8,
}

impl Default for Config {
    /// The chip's power-on register defaults
    fn default() -> Self {
        Self {
            proximity_rate: 0,
            led_current: 2,
            threshold: 0,
            count_exceed: 0,
        }
    }
}
