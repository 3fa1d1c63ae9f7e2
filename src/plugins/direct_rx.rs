//! Direct mode reception
//!
//! The demodulated bit stream is routed to a GPIO instead of the packet
//! handler. The radio stays in RX whatever it receives until the plugin is
//! stopped.

use embedded_hal::spi::SpiDevice;

use super::{ModePlugin, PluginKind};
use crate::{
    commands::{ChangeState, DeviceState, GetIntStatus, IntClear, RxConfig, StartRx},
    cts::ClearToSend,
    Device, Error,
};

/// Direct receive plugin
#[derive(Debug, Clone, Default)]
pub struct DirectRx {
    /// Receive channel
    pub channel: u8,
}

impl DirectRx {
    /// A direct receive plugin on `channel`.
    pub const fn with_channel(channel: u8) -> Self {
        Self { channel }
    }
}

impl ModePlugin for DirectRx {
    const KIND: PluginKind = PluginKind::DirectRx;

    fn start<SPI, CTS>(&mut self, device: &mut Device<SPI, CTS>) -> Result<(), Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend,
    {
        device.execute_command(GetIntStatus {
            clear: IntClear::ALL,
        })?;
        device.execute_command(StartRx {
            config: RxConfig {
                channel: self.channel,
                condition: 0,
                rx_len: 0,
                next_state_timeout: DeviceState::NoChange,
                next_state_valid: DeviceState::Rx,
                next_state_invalid: DeviceState::Rx,
            },
        })?;
        Ok(())
    }

    fn stop<SPI, CTS>(&mut self, device: &mut Device<SPI, CTS>) -> Result<(), Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend,
    {
        device.execute_command(ChangeState {
            next_state: DeviceState::Ready,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::Script;

    #[test]
    fn start_and_stop_sequence() {
        let mut spi = Script::new()
            .cts()
            .cmd(&[0x20, 0x00, 0x00, 0x00])
            .resp(&[0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00])
            .cmd(&[0x32, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x08, 0x08])
            .cts()
            .cmd(&[0x34, 0x03])
            .build();
        let mut device = Device::new(spi.clone());
        let mut plugin = DirectRx::with_channel(10);

        plugin.start(&mut device).unwrap();
        plugin.stop(&mut device).unwrap();

        spi.done();
    }
}
