//! PN9 pseudo-random transmission

use embedded_hal::spi::SpiDevice;

use super::{enter_tx_mode, leave_tx_mode, ModePlugin, PluginKind};
use crate::{
    cts::ClearToSend,
    properties::{ModSource, ModemModType},
    Device, Error,
};

/// PN9 plugin
///
/// Transmits the output of the chip's internal PN9 generator with the
/// configured modulation until stopped.
#[derive(Debug, Clone, Default)]
pub struct Pn9 {
    /// Transmit channel
    pub channel: u8,
    saved: Option<ModemModType>,
}

impl Pn9 {
    /// A PN9 plugin on `channel`.
    pub const fn with_channel(channel: u8) -> Self {
        Self {
            channel,
            saved: None,
        }
    }
}

impl ModePlugin for Pn9 {
    const KIND: PluginKind = PluginKind::Pn9;

    fn start<SPI, CTS>(&mut self, device: &mut Device<SPI, CTS>) -> Result<(), Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend,
    {
        let saved = enter_tx_mode(device, self.channel, |mod_type| ModemModType {
            source: ModSource::Pseudo,
            ..mod_type
        })?;
        self.saved = Some(saved);
        Ok(())
    }

    fn stop<SPI, CTS>(&mut self, device: &mut Device<SPI, CTS>) -> Result<(), Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend,
    {
        leave_tx_mode(device, self.saved)?;
        self.saved = None;
        Ok(())
    }
}
