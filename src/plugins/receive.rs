//! Packet reception
//!
//! Receives packets through the packet handler. Each received packet is
//! copied out of the RX FIFO into the plugin buffer, handed to the callback,
//! and reception is re-armed on the same channel. While a mode plugin owns
//! the radio the packet is still drained but reception is not re-armed.

use core::fmt;

use embedded_hal::spi::SpiDevice;

use super::PluginKind;
use crate::{
    commands::{DeviceState, FifoInfo, FifoReset, IntStatus, PacketHandlerFlags, RxConfig, StartRx},
    cts::ClearToSend,
    device::FIFO_SIZE,
    Device, Error,
};

/// Packet receive plugin
#[derive(Clone)]
pub struct Receive {
    /// Receive channel
    pub channel: u8,
    /// Called with every received packet
    pub callback: Option<fn(&[u8])>,
    buffer: [u8; FIFO_SIZE],
    len: usize,
}

impl Receive {
    /// A receive plugin listening on `channel`.
    pub const fn new(channel: u8) -> Self {
        Self {
            channel,
            callback: None,
            buffer: [0; FIFO_SIZE],
            len: 0,
        }
    }

    /// Sets the callback run for every received packet.
    pub fn with_callback(mut self, callback: fn(&[u8])) -> Self {
        self.callback = Some(callback);
        self
    }

    /// The last received packet.
    pub fn packet(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    pub(crate) fn start<SPI, CTS>(&self, device: &mut Device<SPI, CTS>) -> Result<(), Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend,
    {
        device.execute_command(StartRx {
            config: RxConfig {
                channel: self.channel,
                condition: 0,
                rx_len: 0,
                next_state_timeout: DeviceState::NoChange,
                next_state_valid: DeviceState::Ready,
                next_state_invalid: DeviceState::Rx,
            },
        })?;
        Ok(())
    }

    /// Handles a received packet in `status`. Returns whether there was one.
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
        if !status.ph_pend.contains(PacketHandlerFlags::PACKET_RX) {
            return Ok(false);
        }

        let fifo = device.execute_command(FifoInfo {
            reset: FifoReset::empty(),
        })?;
        let len = usize::from(fifo.rx_fifo_count).min(FIFO_SIZE);

        device.read_rx_fifo(&mut self.buffer[..len])?;
        self.len = len;

        #[cfg(feature = "defmt")]
        defmt::debug!("ezradio: received {=[u8]:x}", self.packet());

        if let Some(callback) = self.callback {
            callback(self.packet());
        }

        device.execute_command(FifoInfo {
            reset: FifoReset::RX,
        })?;
        if active.is_none() {
            self.start(device)?;
        }
        Ok(true)
    }
}

impl Default for Receive {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for Receive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receive")
            .field("channel", &self.channel)
            .field("callback", &self.callback)
            .field("packet", &self.packet())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::test::Script;

    static RECEIVED: AtomicUsize = AtomicUsize::new(0);

    fn on_packet(packet: &[u8]) {
        assert_eq!(&[0xC0, 0xFF, 0xEE], packet);
        RECEIVED.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn packet_is_read_and_rx_rearmed() {
        let mut spi = Script::new()
            .cts()
            .cmd(&[0x15, 0x00])
            .resp(&[0x03, 0x40])
            .read(0x77, &[0xC0, 0xFF, 0xEE])
            .cts()
            .cmd(&[0x15, 0x02])
            .resp(&[0x00, 0x40])
            .cmd(&[0x32, 0x04, 0x00, 0x00, 0x00, 0x00, 0x03, 0x08])
            .build();
        let mut device = Device::new(spi.clone());
        let mut plugin = Receive::new(4).with_callback(on_packet);

        let status = IntStatus {
            ph_pend: PacketHandlerFlags::PACKET_RX,
            ..IntStatus::default()
        };
        assert_eq!(Ok(true), plugin.handle(&mut device, &status, None));
        assert!(RECEIVED.load(Ordering::Relaxed) >= 1);
        assert_eq!(&[0xC0, 0xFF, 0xEE], plugin.packet());

        spi.done();
    }

    #[test]
    fn active_mode_is_not_rearmed() {
        let mut spi = Script::new()
            .cts()
            .cmd(&[0x15, 0x00])
            .resp(&[0x03, 0x40])
            .read(0x77, &[0xC0, 0xFF, 0xEE])
            .cts()
            .cmd(&[0x15, 0x02])
            .resp(&[0x00, 0x40])
            .build();
        let mut device = Device::new(spi.clone());
        let mut plugin = Receive::new(4).with_callback(on_packet);

        let status = IntStatus {
            ph_pend: PacketHandlerFlags::PACKET_RX,
            ..IntStatus::default()
        };
        assert_eq!(
            Ok(true),
            plugin.handle(&mut device, &status, Some(PluginKind::Pn9))
        );
        assert_eq!(&[0xC0, 0xFF, 0xEE], plugin.packet());

        spi.done();
    }
}
