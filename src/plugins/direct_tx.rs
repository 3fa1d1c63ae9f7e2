//! Direct mode transmission
//!
//! The modulator is fed asynchronously from the direct mode GPIO instead of
//! the TX FIFO. The modulation type of the loaded configuration is kept.

use embedded_hal::spi::SpiDevice;

use super::{enter_tx_mode, leave_tx_mode, ModePlugin, PluginKind};
use crate::{
    cts::ClearToSend,
    properties::{DirectMode, ModSource, ModemModType},
    Device, Error,
};

/// Direct transmit plugin
#[derive(Debug, Clone, Default)]
pub struct DirectTx {
    /// Transmit channel
    pub channel: u8,
    saved: Option<ModemModType>,
}

impl DirectTx {
    /// A direct transmit plugin on `channel`.
    pub const fn with_channel(channel: u8) -> Self {
        Self {
            channel,
            saved: None,
        }
    }
}

impl ModePlugin for DirectTx {
    const KIND: PluginKind = PluginKind::DirectTx;

    fn start<SPI, CTS>(&mut self, device: &mut Device<SPI, CTS>) -> Result<(), Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend,
    {
        let saved = enter_tx_mode(device, self.channel, |mod_type| ModemModType {
            direct_mode: DirectMode::Asynchronous,
            source: ModSource::Direct,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::Script;

    #[test]
    fn switches_to_async_direct_source() {
        let mut spi = Script::new()
            .cts()
            .cmd(&[0x33])
            .resp(&[0x03, 0x00])
            .cmd(&[0x12, 0x20, 0x01, 0x00])
            .resp(&[0x22])
            .cmd(&[0x11, 0x20, 0x01, 0x00, 0xAA])
            .cts()
            .cmd(&[0x31, 0x01, 0x00, 0x00, 0x00])
            .cts()
            .cmd(&[0x34, 0x03])
            .cts()
            .cmd(&[0x11, 0x20, 0x01, 0x00, 0x22])
            .build();
        let mut device = Device::new(spi.clone());
        let mut plugin = DirectTx::with_channel(1);

        plugin.start(&mut device).unwrap();
        plugin.stop(&mut device).unwrap();

        spi.done();
    }

    #[test]
    fn refuses_while_transmitting() {
        let mut spi = Script::new()
            .cts()
            .cmd(&[0x33])
            .resp(&[0x07, 0x01])
            .build();
        let mut device = Device::new(spi.clone());
        let mut plugin = DirectTx::with_channel(1);

        assert_eq!(Err(Error::ChipBusy), plugin.start(&mut device));

        spi.done();
    }
}
