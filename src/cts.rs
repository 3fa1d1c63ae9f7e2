//! Clear-to-send readiness sources
//!
//! The EZRadio raises CTS once it has finished processing a command and is
//! able to accept the next one. The host can learn about it in three ways:
//!
//! - [`SpiPolled`]: issue `READ_CMD_BUFF` until the chip answers `0xFF`
//! - [`Gpio1`]: sample GPIO1 configured as the CTS output
//! - [`PacedGpio1`]: the same, waiting a fixed interval after each low sample
//! - [`CtsFlag`]: an interrupt handler records the rising edge of the CTS
//!   line and the driver consumes it
//!
//! The driver only needs [`ClearToSend`], so boards pick whichever source
//! matches their wiring.

use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::{delay::DelayNs, digital::InputPin};

use crate::Error;

/// A source of clear-to-send information.
pub trait ClearToSend {
    /// Sample the readiness source once.
    ///
    /// Returns `Ok(None)` when the source has no out-of-band line and the
    /// driver must fall back to polling `READ_CMD_BUFF` over SPI.
    fn poll(&mut self) -> Result<Option<bool>, Error>;

    /// Forget any readiness observed so far.
    fn clear(&mut self) {}
}

/// CTS is read back over SPI with `READ_CMD_BUFF`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpiPolled;

impl ClearToSend for SpiPolled {
    fn poll(&mut self) -> Result<Option<bool>, Error> {
        Ok(None)
    }
}

/// CTS is sampled from GPIO1 of the radio (high = ready).
///
/// GPIO1 must be configured as the CTS output by the radio configuration,
/// which is the power-on default of the EZRadio.
///
/// Samples are taken back to back, so [`CommConfig::cts_retries`] bounds the
/// wait in pin reads rather than in time. On a fast MCU the default count can
/// run out before slow commands such as `POWER_UP` complete. Use
/// [`PacedGpio1`] to get a wait bounded in time.
///
/// [`CommConfig::cts_retries`]: crate::CommConfig::cts_retries
#[derive(Debug)]
pub struct Gpio1<P>(pub P);

impl<P: InputPin> ClearToSend for Gpio1<P> {
    fn poll(&mut self) -> Result<Option<bool>, Error> {
        self.0.is_high().map(Some).map_err(|_| Error::Pin)
    }
}

/// CTS is sampled from GPIO1, with a delay after every low sample.
///
/// The CTS wait is then bounded by roughly
/// `cts_retries * interval_us` microseconds.
///
/// ```
/// use embedded_hal::{delay::DelayNs, digital::InputPin};
/// use ezradio::{CommConfig, Device, PacedGpio1};
/// # fn board<SPI, P: InputPin, D: DelayNs>(spi: SPI, gpio1: P, delay: D) {
/// // Up to 100 ms for POWER_UP.
/// let _device = Device::with_cts(spi, PacedGpio1::new(gpio1, delay, 10))
///     .with_config(CommConfig { cts_retries: 10_000 });
/// # }
/// ```
#[derive(Debug)]
pub struct PacedGpio1<P, D> {
    pin: P,
    delay: D,
    interval_us: u32,
}

impl<P, D> PacedGpio1<P, D> {
    /// Samples `pin`, waiting `interval_us` on `delay` while it is low.
    pub fn new(pin: P, delay: D, interval_us: u32) -> Self {
        Self {
            pin,
            delay,
            interval_us,
        }
    }

    /// Releases the pin and the delay.
    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }
}

impl<P: InputPin, D: DelayNs> ClearToSend for PacedGpio1<P, D> {
    fn poll(&mut self) -> Result<Option<bool>, Error> {
        if self.pin.is_high().map_err(|_| Error::Pin)? {
            return Ok(Some(true));
        }

        self.delay.delay_us(self.interval_us);
        Ok(Some(false))
    }
}

/// Single-producer, single-consumer CTS edge flag.
///
/// The interrupt handler attached to the CTS line calls [`signal`](Self::signal)
/// on every rising edge. The driver consumes the edge with
/// [`take`](Self::take), which reads and clears the flag in one atomic step so
/// an edge landing between the read and the clear is never lost.
///
/// ```
/// use ezradio::CtsFlag;
///
/// static CTS: CtsFlag = CtsFlag::new();
///
/// // in the GPIO interrupt handler
/// CTS.signal();
///
/// assert!(CTS.take());
/// assert!(!CTS.take());
/// ```
#[derive(Debug, Default)]
pub struct CtsFlag(AtomicBool);

impl CtsFlag {
    /// Creates a cleared flag.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Records a high-going CTS transition.
    pub fn signal(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns whether an edge was recorded since the last call, clearing it.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    /// Returns whether an edge is pending without consuming it.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Drops any pending edge.
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ClearToSend for &CtsFlag {
    fn poll(&mut self) -> Result<Option<bool>, Error> {
        Ok(Some(self.take()))
    }

    fn clear(&mut self) {
        CtsFlag::clear(self)
    }
}
