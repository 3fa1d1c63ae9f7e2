//! Radio handle
//!
//! [`Radio`] ties a [`Device`] to its [`PluginManager`] and is the entry point
//! for applications: it loads the configuration, runs the mode plugins and
//! dispatches interrupts to the event plugins.
//!
//! # Example
//! ```no_run
//! use embedded_hal::{digital::InputPin, spi::SpiDevice};
//! use ezradio::{
//!     plugins::{PluginKind, Plugins, Pn9},
//!     Device, Error, Radio, RadioConfiguration,
//! };
//!
//! static CONFIG: &[u8] = &[0x02, 0x34, 0x03, 0x00];
//!
//! fn pn9_burst<SPI: SpiDevice, N: InputPin>(spi: SPI, nirq: &mut N) -> Result<(), Error> {
//!     let mut radio = Radio::new(
//!         Device::new(spi),
//!         Plugins::new().with_pn9(Pn9::with_channel(5)),
//!     );
//!
//!     radio.configure(&RadioConfiguration::new(CONFIG), nirq)?;
//!     radio.start(PluginKind::Pn9)?;
//!     // ...
//!     radio.stop(PluginKind::Pn9)
//! }
//! ```

use embedded_hal::{digital::InputPin, spi::SpiDevice};

use crate::{
    commands::IntStatus,
    config::RadioConfiguration,
    cts::{ClearToSend, SpiPolled},
    plugins::{PluginKind, PluginManager, PluginState, Plugins},
    Device, Error,
};

/// An EZRadio transceiver with its plugins.
pub struct Radio<SPI, CTS = SpiPolled> {
    device: Device<SPI, CTS>,
    plugins: PluginManager,
}

impl<SPI, CTS> Radio<SPI, CTS> {
    /// Wraps `device` with the plugins in `plugins`, none of them active.
    pub fn new(device: Device<SPI, CTS>, plugins: Plugins) -> Self {
        Self {
            device,
            plugins: PluginManager::new(plugins),
        }
    }

    /// Direct access to the device, e.g. for commands without a plugin.
    pub fn device_mut(&mut self) -> &mut Device<SPI, CTS> {
        &mut self.device
    }

    /// The registered plugins.
    pub fn plugins(&self) -> &Plugins {
        self.plugins.plugins()
    }

    /// The mode plugin currently owning the radio.
    pub fn active(&self) -> Option<PluginKind> {
        self.plugins.active()
    }

    /// Lifecycle state of a mode plugin, `None` if it is not registered.
    pub fn state(&self, kind: PluginKind) -> Option<PluginState> {
        self.plugins.state(kind)
    }

    /// Changes the channel a mode plugin uses on its next start.
    pub fn set_channel(&mut self, kind: PluginKind, channel: u8) -> Result<(), Error> {
        self.plugins.set_channel(kind, channel)
    }

    /// Releases the device and the plugin manager.
    pub fn release(self) -> (Device<SPI, CTS>, PluginManager) {
        (self.device, self.plugins)
    }
}

impl<SPI, CTS> Radio<SPI, CTS>
where
    SPI: SpiDevice,
    CTS: ClearToSend,
{
    /// Starts a mode plugin, see [`PluginManager::start`].
    pub fn start(&mut self, kind: PluginKind) -> Result<(), Error> {
        self.plugins.start(kind, &mut self.device)
    }

    /// Stops a mode plugin, see [`PluginManager::stop`].
    pub fn stop(&mut self, kind: PluginKind) -> Result<(), Error> {
        self.plugins.stop(kind, &mut self.device)
    }

    /// Stops whichever mode plugin is active.
    pub fn stop_active(&mut self) -> Result<(), Error> {
        self.plugins.stop_active(&mut self.device)
    }

    /// Arms packet reception, see [`PluginManager::start_receive`].
    pub fn start_receive(&mut self) -> Result<(), Error> {
        self.plugins.start_receive(&mut self.device)
    }

    /// Services the radio interrupt.
    ///
    /// Call this when nIRQ is asserted. The pending interrupts are read and
    /// cleared, then handed to the event plugins.
    pub fn handle_irq(&mut self) -> Result<IntStatus, Error> {
        self.plugins.handle_irq(&mut self.device)
    }

    /// Loads a configuration array and verifies its checksum.
    ///
    /// Any active mode plugin is stopped first. If it cannot be stopped
    /// cleanly its slot is released anyway since the configuration resets
    /// the modem settings it changed. No plugin is active afterwards,
    /// whatever the result.
    pub fn configure<N: InputPin>(
        &mut self,
        config: &RadioConfiguration<'_>,
        nirq: &mut N,
    ) -> Result<(), Error> {
        config.validate()?;

        if let Err(_e) = self.plugins.stop_active(&mut self.device) {
            #[cfg(feature = "defmt")]
            defmt::warn!("ezradio: releasing active plugin after failed stop: {}", _e);
            self.plugins.release_active();
        }

        self.device.configuration_init(config, nirq)?;

        if let Some(checksum) = config.checksum()? {
            self.device.config_checksum_check(checksum)?;
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("ezradio: configuration loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};

    use super::*;
    use crate::{
        plugins::{CrcError, DirectRx, Pn9, Receive, UnmodCarrier},
        test::Script,
    };

    fn pn9_start(script: Script, channel: u8) -> Script {
        script
            .cts()
            .cmd(&[0x33])
            .resp(&[0x03, 0x00])
            .cmd(&[0x12, 0x20, 0x01, 0x00])
            .resp(&[0x03])
            .cmd(&[0x11, 0x20, 0x01, 0x00, 0x13])
            .cts()
            .cmd(&[0x31, channel, 0x00, 0x00, 0x00])
    }

    #[test]
    fn pn9_then_unmodulated_carrier() {
        let script = pn9_start(Script::new(), 5)
            .cts()
            .cmd(&[0x34, 0x03])
            .cts()
            .cmd(&[0x11, 0x20, 0x01, 0x00, 0x03])
            .cts()
            .cmd(&[0x33])
            .resp(&[0x03, 0x00])
            .cmd(&[0x12, 0x20, 0x01, 0x00])
            .resp(&[0x03])
            .cmd(&[0x11, 0x20, 0x01, 0x00, 0x00])
            .cts()
            .cmd(&[0x31, 0x03, 0x00, 0x00, 0x00]);
        let mut spi = script.build();
        let mut radio = Radio::new(
            Device::new(spi.clone()),
            Plugins::new()
                .with_pn9(Pn9::with_channel(5))
                .with_unmod_carrier(UnmodCarrier::with_channel(3)),
        );

        radio.start(PluginKind::Pn9).unwrap();
        assert_eq!(Some(PluginKind::Pn9), radio.active());
        assert_eq!(Some(PluginState::Active), radio.state(PluginKind::Pn9));

        assert_eq!(
            Err(Error::PluginBusy(PluginKind::Pn9)),
            radio.start(PluginKind::UnmodCarrier)
        );
        assert_eq!(Some(PluginState::Active), radio.state(PluginKind::Pn9));

        radio.stop(PluginKind::Pn9).unwrap();
        assert_eq!(None, radio.active());
        assert_eq!(Some(PluginState::Idle), radio.state(PluginKind::Pn9));

        radio.start(PluginKind::UnmodCarrier).unwrap();
        assert_eq!(Some(PluginKind::UnmodCarrier), radio.active());

        spi.done();
    }

    static CRC_ERRORS: AtomicUsize = AtomicUsize::new(0);

    fn count_crc_error(_status: &IntStatus) {
        CRC_ERRORS.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn crc_error_callback_runs_once_per_event() {
        let mut spi = Script::new()
            .cts()
            .cmd(&[0x20, 0x00, 0x00, 0x00])
            .resp(&[0; 8])
            .cmd(&[0x32, 0x00, 0x00, 0x00, 0x00, 0x00, 0x08, 0x08])
            .cts()
            .cmd(&[0x20, 0x00, 0x00, 0x00])
            .resp(&[0x01, 0x01, 0x08, 0x08, 0x00, 0x00, 0x00, 0x00])
            .cmd(&[0x15, 0x02])
            .resp(&[0x00, 0x40])
            .cmd(&[0x20, 0x00, 0x00, 0x00])
            .resp(&[0; 8])
            .build();
        let mut radio = Radio::new(
            Device::new(spi.clone()),
            Plugins::new()
                .with_direct_rx(DirectRx::default())
                .with_crc_error(CrcError::with_callback(count_crc_error)),
        );

        radio.start(PluginKind::DirectRx).unwrap();

        let status = radio.handle_irq().unwrap();
        assert!(status.ph_pend.contains(crate::commands::PacketHandlerFlags::CRC_ERROR));
        assert_eq!(1, CRC_ERRORS.load(Ordering::Relaxed));

        radio.handle_irq().unwrap();
        assert_eq!(1, CRC_ERRORS.load(Ordering::Relaxed));

        assert_eq!(Some(PluginKind::DirectRx), radio.active());
        assert_eq!(Some(PluginState::Active), radio.state(PluginKind::DirectRx));

        spi.done();
    }

    #[test]
    fn packet_during_pn9_does_not_restart_rx() {
        let script = pn9_start(Script::new(), 5)
            .cts()
            .cmd(&[0x20, 0x00, 0x00, 0x00])
            .resp(&[0x01, 0x01, 0x10, 0x10, 0x00, 0x00, 0x00, 0x00])
            .cmd(&[0x15, 0x00])
            .resp(&[0x02, 0x40])
            .read(0x77, &[0xA5, 0x5A])
            .cts()
            .cmd(&[0x15, 0x02])
            .resp(&[0x00, 0x40])
            .cmd(&[0x34, 0x03])
            .cts()
            .cmd(&[0x11, 0x20, 0x01, 0x00, 0x03]);
        let mut spi = script.build();
        let mut radio = Radio::new(
            Device::new(spi.clone()),
            Plugins::new()
                .with_pn9(Pn9::with_channel(5))
                .with_receive(Receive::new(4)),
        );

        radio.start(PluginKind::Pn9).unwrap();
        radio.handle_irq().unwrap();
        assert_eq!(&[0xA5, 0x5A], radio.plugins().receive().unwrap().packet());
        assert_eq!(Some(PluginKind::Pn9), radio.active());
        assert_eq!(Some(PluginState::Active), radio.state(PluginKind::Pn9));

        radio.stop(PluginKind::Pn9).unwrap();
        assert_eq!(None, radio.active());

        spi.done();
    }

    #[test]
    fn checksum_mismatch_leaves_no_plugin_active() {
        let script = pn9_start(Script::new(), 5)
            .cts()
            .cmd(&[0x34, 0x03])
            .cts()
            .cmd(&[0x11, 0x20, 0x01, 0x00, 0x03])
            .cts()
            .cmd(&[0x34, 0x03])
            .cts()
            .cmd(&[0x19, 0xAB, 0xCD])
            .resp(&[0x01]);
        let mut spi = script.build();
        let mut nirq = PinMock::new(&[PinTransaction::get(State::High)]);
        let mut radio = Radio::new(
            Device::new(spi.clone()),
            Plugins::new().with_pn9(Pn9::with_channel(5)),
        );

        radio.start(PluginKind::Pn9).unwrap();

        let config = RadioConfiguration::new(&[0x02, 0x34, 0x03, 0x00, 0xAB, 0xCD]);
        assert_eq!(Err(Error::ConfigIntegrity), radio.configure(&config, &mut nirq));
        assert_eq!(None, radio.active());
        assert_eq!(Some(PluginState::Idle), radio.state(PluginKind::Pn9));

        nirq.done();
        spi.done();
    }

    #[test]
    fn receive_waits_for_mode_plugin() {
        let mut spi = Script::new()
            .cts()
            .cmd(&[0x20, 0x00, 0x00, 0x00])
            .resp(&[0; 8])
            .cmd(&[0x32, 0x00, 0x00, 0x00, 0x00, 0x00, 0x08, 0x08])
            .cts()
            .cmd(&[0x34, 0x03])
            .cts()
            .cmd(&[0x32, 0x04, 0x00, 0x00, 0x00, 0x00, 0x03, 0x08])
            .build();
        let mut radio = Radio::new(
            Device::new(spi.clone()),
            Plugins::new()
                .with_direct_rx(DirectRx::default())
                .with_receive(Receive::new(4)),
        );

        radio.start(PluginKind::DirectRx).unwrap();
        assert_eq!(
            Err(Error::PluginBusy(PluginKind::DirectRx)),
            radio.start_receive()
        );

        radio.stop(PluginKind::DirectRx).unwrap();
        radio.start_receive().unwrap();
        assert_eq!(None, radio.active());

        spi.done();
    }

    #[test]
    fn receive_requires_plugin() {
        let mut spi = Script::new().build();
        let mut radio = Radio::new(Device::new(spi.clone()), Plugins::new());

        assert_eq!(Err(Error::ReceiveNotRegistered), radio.start_receive());

        spi.done();
    }
}
