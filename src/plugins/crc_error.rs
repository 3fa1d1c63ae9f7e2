//! CRC error reporting

use embedded_hal::spi::SpiDevice;

use super::PluginKind;
use crate::{
    commands::{ChangeState, DeviceState, FifoInfo, FifoReset, IntStatus, PacketHandlerFlags},
    cts::ClearToSend,
    Device, Error,
};

/// CRC error plugin
///
/// When the packet handler flags a CRC error the radio is returned to READY
/// and the RX FIFO is flushed before the callback runs. While a mode plugin
/// owns the radio its state is left alone and only the FIFO is flushed. The
/// mode slot is never touched.
#[derive(Debug, Clone, Default)]
pub struct CrcError {
    /// Called once per CRC error event
    pub callback: Option<fn(&IntStatus)>,
}

impl CrcError {
    /// A CRC error plugin without a callback.
    pub const fn new() -> Self {
        Self { callback: None }
    }

    /// A CRC error plugin calling `callback` on every event.
    pub const fn with_callback(callback: fn(&IntStatus)) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// Handles a CRC error in `status`. Returns whether there was one.
    ///
    /// `active` is the mode plugin owning the radio, if any.
    pub(crate) fn handle<SPI, CTS>(
        &mut self,
        device: &mut Device<SPI, CTS>,
        status: &IntStatus,
        active: Option<PluginKind>,
    ) -> Result<bool, Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend,
    {
        if !status.ph_pend.contains(PacketHandlerFlags::CRC_ERROR) {
            return Ok(false);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("ezradio: CRC error");

        if active.is_none() {
            device.execute_command(ChangeState {
                next_state: DeviceState::Ready,
            })?;
        }
        device.execute_command(FifoInfo {
            reset: FifoReset::RX,
        })?;

        if let Some(callback) = self.callback {
            callback(status);
        }
        Ok(true)
    }
}
