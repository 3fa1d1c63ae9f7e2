//! Unmodulated carrier transmission

use embedded_hal::spi::SpiDevice;

use super::{enter_tx_mode, leave_tx_mode, ModePlugin, PluginKind};
use crate::{
    cts::ClearToSend,
    properties::{ModSource, ModType, ModemModType},
    Device, Error,
};

/// Unmodulated carrier plugin
///
/// Transmits a continuous wave on the channel frequency until stopped.
#[derive(Debug, Clone, Default)]
pub struct UnmodCarrier {
    /// Transmit channel
    pub channel: u8,
    saved: Option<ModemModType>,
}

impl UnmodCarrier {
    /// An unmodulated carrier plugin on `channel`.
    pub const fn with_channel(channel: u8) -> Self {
        Self {
            channel,
            saved: None,
        }
    }
}

impl ModePlugin for UnmodCarrier {
    const KIND: PluginKind = PluginKind::UnmodCarrier;

    fn start<SPI, CTS>(&mut self, device: &mut Device<SPI, CTS>) -> Result<(), Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend,
    {
        let saved = enter_tx_mode(device, self.channel, |mod_type| ModemModType {
            source: ModSource::Packet,
            mod_type: ModType::Cw,
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
    fn transmits_carrier_and_restores_modulation() {
        let mut spi = Script::new()
            .cts()
            .cmd(&[0x33])
            .resp(&[0x03, 0x00])
            .cmd(&[0x12, 0x20, 0x01, 0x00])
            .resp(&[0x2B])
            .cmd(&[0x11, 0x20, 0x01, 0x00, 0x20])
            .cts()
            .cmd(&[0x31, 0x09, 0x00, 0x00, 0x00])
            .cts()
            .cmd(&[0x34, 0x03])
            .cts()
            .cmd(&[0x11, 0x20, 0x01, 0x00, 0x2B])
            .build();
        let mut device = Device::new(spi.clone());
        let mut plugin = UnmodCarrier::with_channel(9);

        plugin.start(&mut device).unwrap();
        plugin.stop(&mut device).unwrap();

        spi.done();
    }

    #[test]
    fn refuses_while_transmitting() {
        let mut spi = Script::new()
            .cts()
            .cmd(&[0x33])
            .resp(&[0x07, 0x02])
            .build();
        let mut device = Device::new(spi.clone());
        let mut plugin = UnmodCarrier::with_channel(9);

        assert_eq!(Err(Error::ChipBusy), plugin.start(&mut device));

        spi.done();
    }
}
