//! Radio plugins
//!
//! Plugins attach behaviour to the radio state machine. There are two
//! families:
//!
//! - Mode plugins ([`DirectRx`], [`DirectTx`], [`Pn9`], [`UnmodCarrier`])
//!   put the radio into a test mode. They are mutually exclusive: at most one
//!   of them owns the radio at any time.
//! - Event plugins ([`CrcError`], [`Receive`]) react to interrupts reported by
//!   `GET_INT_STATUS` and never own the radio.
//!
//! Which plugins exist is decided once when the [`Plugins`] table is built.
//! The [`PluginManager`] enforces the mode exclusion and drives each mode
//! plugin through its states:
//!
//! ```text
//! Idle --start--> Armed --ok--> Active --stop--> Idle
//!                   |
//!                   +--error--> Idle
//! ```

use embedded_hal::spi::SpiDevice;

use crate::{
    commands::{
        ChangeState, DeviceState, GetIntStatus, IntClear, IntStatus, RequestDeviceState, StartTx,
        TxConfig,
    },
    cts::ClearToSend,
    properties::ModemModType,
    Device, Error,
};

mod crc_error;
mod direct_rx;
mod direct_tx;
mod pn9;
mod receive;
mod unmod_carrier;

pub use crc_error::CrcError;
pub use direct_rx::DirectRx;
pub use direct_tx::DirectTx;
pub use pn9::Pn9;
pub use receive::Receive;
pub use unmod_carrier::UnmodCarrier;

/// Mode plugin identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PluginKind {
    /// Direct mode reception
    DirectRx,
    /// Direct mode transmission
    DirectTx,
    /// PN9 pseudo-random transmission
    Pn9,
    /// Unmodulated carrier transmission
    UnmodCarrier,
}

/// Lifecycle state of a mode plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PluginState {
    /// Not running
    #[default]
    Idle,
    /// Start requested, radio commands in flight
    Armed,
    /// Owns the radio
    Active,
}

/// A mutually exclusive radio mode.
pub trait ModePlugin {
    /// Identifier of this plugin
    const KIND: PluginKind;

    /// Puts the radio into this plugin's mode.
    fn start<SPI, CTS>(&mut self, device: &mut Device<SPI, CTS>) -> Result<(), Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend;

    /// Takes the radio out of this plugin's mode.
    fn stop<SPI, CTS>(&mut self, device: &mut Device<SPI, CTS>) -> Result<(), Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend;
}

/// A registered mode plugin and its lifecycle state.
#[derive(Debug, Clone)]
pub struct Slot<P> {
    plugin: P,
    state: PluginState,
}

impl<P: ModePlugin> Slot<P> {
    fn new(plugin: P) -> Self {
        Self {
            plugin,
            state: PluginState::Idle,
        }
    }

    /// The plugin handle.
    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PluginState {
        self.state
    }

    fn start<SPI, CTS>(&mut self, device: &mut Device<SPI, CTS>) -> Result<(), Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend,
    {
        self.state = PluginState::Armed;
        match self.plugin.start(device) {
            Ok(()) => {
                self.state = PluginState::Active;
                Ok(())
            }
            Err(e) => {
                self.state = PluginState::Idle;
                Err(e)
            }
        }
    }

    fn stop<SPI, CTS>(&mut self, device: &mut Device<SPI, CTS>) -> Result<(), Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend,
    {
        if self.state != PluginState::Active {
            return Ok(());
        }

        self.plugin.stop(device)?;
        self.state = PluginState::Idle;
        Ok(())
    }
}

fn start_slot<P, SPI, CTS>(
    slot: &mut Option<Slot<P>>,
    device: &mut Device<SPI, CTS>,
) -> Result<(), Error>
where
    P: ModePlugin,
    SPI: SpiDevice,
    CTS: ClearToSend,
{
    slot.as_mut()
        .ok_or(Error::PluginNotRegistered(P::KIND))?
        .start(device)
}

fn stop_slot<P, SPI, CTS>(
    slot: &mut Option<Slot<P>>,
    device: &mut Device<SPI, CTS>,
) -> Result<(), Error>
where
    P: ModePlugin,
    SPI: SpiDevice,
    CTS: ClearToSend,
{
    slot.as_mut()
        .ok_or(Error::PluginNotRegistered(P::KIND))?
        .stop(device)
}

/// The plugin table of a radio.
///
/// A plugin that is not added here cannot be started; event plugins that are
/// not added are skipped by interrupt dispatch.
///
/// ```
/// use ezradio::plugins::{CrcError, Pn9, Plugins, UnmodCarrier};
///
/// let plugins = Plugins::new()
///     .with_pn9(Pn9::with_channel(5))
///     .with_unmod_carrier(UnmodCarrier::with_channel(3))
///     .with_crc_error(CrcError::new());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Plugins {
    direct_rx: Option<Slot<DirectRx>>,
    direct_tx: Option<Slot<DirectTx>>,
    pn9: Option<Slot<Pn9>>,
    unmod_carrier: Option<Slot<UnmodCarrier>>,
    crc_error: Option<CrcError>,
    receive: Option<Receive>,
}

impl Plugins {
    /// An empty plugin table.
    pub const fn new() -> Self {
        Self {
            direct_rx: None,
            direct_tx: None,
            pn9: None,
            unmod_carrier: None,
            crc_error: None,
            receive: None,
        }
    }

    /// Registers the direct receive plugin.
    pub fn with_direct_rx(mut self, plugin: DirectRx) -> Self {
        self.direct_rx = Some(Slot::new(plugin));
        self
    }

    /// Registers the direct transmit plugin.
    pub fn with_direct_tx(mut self, plugin: DirectTx) -> Self {
        self.direct_tx = Some(Slot::new(plugin));
        self
    }

    /// Registers the PN9 transmit plugin.
    pub fn with_pn9(mut self, plugin: Pn9) -> Self {
        self.pn9 = Some(Slot::new(plugin));
        self
    }

    /// Registers the unmodulated carrier plugin.
    pub fn with_unmod_carrier(mut self, plugin: UnmodCarrier) -> Self {
        self.unmod_carrier = Some(Slot::new(plugin));
        self
    }

    /// Registers the CRC error event plugin.
    pub fn with_crc_error(mut self, plugin: CrcError) -> Self {
        self.crc_error = Some(plugin);
        self
    }

    /// Registers the packet receive event plugin.
    pub fn with_receive(mut self, plugin: Receive) -> Self {
        self.receive = Some(plugin);
        self
    }

    /// The direct receive slot, if registered.
    pub fn direct_rx(&self) -> Option<&Slot<DirectRx>> {
        self.direct_rx.as_ref()
    }

    /// The direct transmit slot, if registered.
    pub fn direct_tx(&self) -> Option<&Slot<DirectTx>> {
        self.direct_tx.as_ref()
    }

    /// The PN9 slot, if registered.
    pub fn pn9(&self) -> Option<&Slot<Pn9>> {
        self.pn9.as_ref()
    }

    /// The unmodulated carrier slot, if registered.
    pub fn unmod_carrier(&self) -> Option<&Slot<UnmodCarrier>> {
        self.unmod_carrier.as_ref()
    }

    /// The CRC error plugin, if registered.
    pub fn crc_error(&self) -> Option<&CrcError> {
        self.crc_error.as_ref()
    }

    /// The receive plugin, if registered.
    pub fn receive(&self) -> Option<&Receive> {
        self.receive.as_ref()
    }

    /// Lifecycle state of a mode plugin, `None` if it is not registered.
    pub fn state(&self, kind: PluginKind) -> Option<PluginState> {
        match kind {
            PluginKind::DirectRx => self.direct_rx.as_ref().map(Slot::state),
            PluginKind::DirectTx => self.direct_tx.as_ref().map(Slot::state),
            PluginKind::Pn9 => self.pn9.as_ref().map(Slot::state),
            PluginKind::UnmodCarrier => self.unmod_carrier.as_ref().map(Slot::state),
        }
    }

    fn force_idle(&mut self, kind: PluginKind) {
        match kind {
            PluginKind::DirectRx => self.direct_rx.iter_mut().for_each(|s| s.state = PluginState::Idle),
            PluginKind::DirectTx => self.direct_tx.iter_mut().for_each(|s| s.state = PluginState::Idle),
            PluginKind::Pn9 => self.pn9.iter_mut().for_each(|s| s.state = PluginState::Idle),
            PluginKind::UnmodCarrier => self
                .unmod_carrier
                .iter_mut()
                .for_each(|s| s.state = PluginState::Idle),
        }
    }
}

/// Owns the plugin table and the exclusive mode slot.
#[derive(Debug, Clone, Default)]
pub struct PluginManager {
    plugins: Plugins,
    active: Option<PluginKind>,
}

impl PluginManager {
    /// Takes ownership of `plugins` with no mode plugin active.
    pub fn new(plugins: Plugins) -> Self {
        Self {
            plugins,
            active: None,
        }
    }

    /// The registered plugins.
    pub fn plugins(&self) -> &Plugins {
        &self.plugins
    }

    /// The mode plugin currently owning the radio.
    pub fn active(&self) -> Option<PluginKind> {
        self.active
    }

    /// Lifecycle state of a mode plugin, `None` if it is not registered.
    pub fn state(&self, kind: PluginKind) -> Option<PluginState> {
        self.plugins.state(kind)
    }

    /// Starts a mode plugin.
    ///
    /// # Errors
    /// * `Error::PluginNotRegistered` - `kind` is not in the plugin table
    /// * `Error::PluginBusy` - another mode plugin owns the radio; it is left
    ///   untouched and nothing is sent to the chip
    /// * any error of the plugin's start sequence, after which the plugin is
    ///   back to Idle
    pub fn start<SPI, CTS>(
        &mut self,
        kind: PluginKind,
        device: &mut Device<SPI, CTS>,
    ) -> Result<(), Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend,
    {
        if self.state(kind).is_none() {
            return Err(Error::PluginNotRegistered(kind));
        }
        if let Some(active) = self.active {
            #[cfg(feature = "defmt")]
            defmt::debug!("ezradio: {} refused, {} is active", kind, active);
            return Err(Error::PluginBusy(active));
        }

        let result = match kind {
            PluginKind::DirectRx => start_slot(&mut self.plugins.direct_rx, device),
            PluginKind::DirectTx => start_slot(&mut self.plugins.direct_tx, device),
            PluginKind::Pn9 => start_slot(&mut self.plugins.pn9, device),
            PluginKind::UnmodCarrier => start_slot(&mut self.plugins.unmod_carrier, device),
        };

        match result {
            Ok(()) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("ezradio: {} active", kind);
                self.active = Some(kind);
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("ezradio: {} failed to start: {}", kind, _e);
            }
        }
        result
    }

    /// Stops a mode plugin and releases the mode slot.
    ///
    /// Stopping a plugin that is not active succeeds without touching the
    /// chip. If the stop sequence fails the plugin stays active.
    pub fn stop<SPI, CTS>(
        &mut self,
        kind: PluginKind,
        device: &mut Device<SPI, CTS>,
    ) -> Result<(), Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend,
    {
        if self.state(kind).is_none() {
            return Err(Error::PluginNotRegistered(kind));
        }
        if self.active != Some(kind) {
            return Ok(());
        }

        match kind {
            PluginKind::DirectRx => stop_slot(&mut self.plugins.direct_rx, device),
            PluginKind::DirectTx => stop_slot(&mut self.plugins.direct_tx, device),
            PluginKind::Pn9 => stop_slot(&mut self.plugins.pn9, device),
            PluginKind::UnmodCarrier => stop_slot(&mut self.plugins.unmod_carrier, device),
        }?;

        #[cfg(feature = "defmt")]
        defmt::debug!("ezradio: {} stopped", kind);
        self.active = None;
        Ok(())
    }

    /// Stops whichever mode plugin is active.
    pub fn stop_active<SPI, CTS>(&mut self, device: &mut Device<SPI, CTS>) -> Result<(), Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend,
    {
        match self.active {
            Some(kind) => self.stop(kind, device),
            None => Ok(()),
        }
    }

    /// Releases the mode slot without talking to the chip.
    ///
    /// Only for when the radio is being reset or reconfigured anyway.
    pub fn release_active(&mut self) {
        if let Some(kind) = self.active.take() {
            self.plugins.force_idle(kind);
        }
    }

    /// Reads and clears the interrupt status and runs the event plugins.
    ///
    /// While a mode plugin is active the event plugins leave the chip state
    /// alone. They only drain or flush the RX FIFO and run their callbacks.
    pub fn handle_irq<SPI, CTS>(&mut self, device: &mut Device<SPI, CTS>) -> Result<IntStatus, Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend,
    {
        let status = device.execute_command(GetIntStatus {
            clear: IntClear::ALL,
        })?;

        if let Some(crc_error) = self.plugins.crc_error.as_mut() {
            crc_error.handle(device, &status, self.active)?;
        }
        if let Some(receive) = self.plugins.receive.as_mut() {
            receive.handle(device, &status, self.active)?;
        }

        Ok(status)
    }

    /// Arms packet reception on the receive plugin's channel.
    ///
    /// # Errors
    /// * `Error::ReceiveNotRegistered` - there is no receive plugin
    /// * `Error::PluginBusy` - a mode plugin owns the radio
    pub fn start_receive<SPI, CTS>(&mut self, device: &mut Device<SPI, CTS>) -> Result<(), Error>
    where
        SPI: SpiDevice,
        CTS: ClearToSend,
    {
        let receive = self
            .plugins
            .receive
            .as_ref()
            .ok_or(Error::ReceiveNotRegistered)?;
        if let Some(active) = self.active {
            return Err(Error::PluginBusy(active));
        }

        receive.start(device)
    }

    /// Replaces the channel of a mode plugin, taking effect on its next start.
    pub fn set_channel(&mut self, kind: PluginKind, channel: u8) -> Result<(), Error> {
        let slot_channel = match kind {
            PluginKind::DirectRx => self.plugins.direct_rx.as_mut().map(|s| &mut s.plugin.channel),
            PluginKind::DirectTx => self.plugins.direct_tx.as_mut().map(|s| &mut s.plugin.channel),
            PluginKind::Pn9 => self.plugins.pn9.as_mut().map(|s| &mut s.plugin.channel),
            PluginKind::UnmodCarrier => self
                .plugins
                .unmod_carrier
                .as_mut()
                .map(|s| &mut s.plugin.channel),
        };

        *slot_channel.ok_or(Error::PluginNotRegistered(kind))? = channel;
        Ok(())
    }
}

/// Enters a transmit test mode on `channel`.
///
/// Refuses to interrupt an ongoing transmission, then swaps MODEM_MOD_TYPE
/// for the value produced by `modulation` and starts an unbounded TX. Returns
/// the previous MODEM_MOD_TYPE for [`leave_tx_mode`].
fn enter_tx_mode<SPI, CTS>(
    device: &mut Device<SPI, CTS>,
    channel: u8,
    modulation: impl FnOnce(ModemModType) -> ModemModType,
) -> Result<ModemModType, Error>
where
    SPI: SpiDevice,
    CTS: ClearToSend,
{
    if device.execute_command(RequestDeviceState)?.state == DeviceState::Tx {
        return Err(Error::ChipBusy);
    }

    let saved: ModemModType = device.get_property()?;
    device.set_property(modulation(saved))?;

    let started = device.execute_command(StartTx {
        config: TxConfig {
            channel,
            condition: 0,
            tx_len: 0,
        },
    });
    if let Err(e) = started {
        // The start error is the one reported.
        if let Err(_restore) = device.set_property(saved) {
            #[cfg(feature = "defmt")]
            defmt::warn!("ezradio: MODEM_MOD_TYPE not restored: {}", _restore);
        }
        return Err(e);
    }

    Ok(saved)
}

/// Leaves a transmit test mode, restoring MODEM_MOD_TYPE if it was saved.
fn leave_tx_mode<SPI, CTS>(
    device: &mut Device<SPI, CTS>,
    saved: Option<ModemModType>,
) -> Result<(), Error>
where
    SPI: SpiDevice,
    CTS: ClearToSend,
{
    device.execute_command(ChangeState {
        next_state: DeviceState::Ready,
    })?;

    if let Some(saved) = saved {
        device.set_property(saved)?;
    }
    Ok(())
}
