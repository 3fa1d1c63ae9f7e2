//! State machine commands
//!
//! This module contains commands that move the radio between its operating
//! states:
//! - Entering TX and RX
//! - Forcing a state transition
//! - Querying the current state and channel
//!
//! The EZRadio main state machine is SLEEP → SPI_ACTIVE → READY → TX/RX
//! with intermediate tune states. Test modes (PN9, CW, direct mode) are
//! entered with `START_TX`/`START_RX` after the modem has been configured.

use core::convert::Infallible;

use regiface::FromByteArray;

use crate::{Command, NoParameters, ToByteArray};

/// Error type for invalid device state values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidDeviceState(pub u8);

/// Operating state of the radio
///
/// Used both as the reply of `REQUEST_DEVICE_STATE` and as the next-state
/// argument of `CHANGE_STATE`, `START_TX` and `START_RX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// Remain in the current state (next-state arguments only)
    NoChange = 0x0,
    /// Sleep, only the wake-up timer and low battery detector run
    Sleep = 0x1,
    /// SPI active, crystal oscillator off
    SpiActive = 0x2,
    /// Ready, crystal oscillator running
    Ready = 0x3,
    /// Second ready state (reported instead of READY by some revisions)
    Ready2 = 0x4,
    /// Synthesizer tuned for TX
    TxTune = 0x5,
    /// Synthesizer tuned for RX
    RxTune = 0x6,
    /// Transmitting
    Tx = 0x7,
    /// Receiving
    Rx = 0x8,
}

impl TryFrom<u8> for DeviceState {
    type Error = InvalidDeviceState;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x0 => Ok(Self::NoChange),
            0x1 => Ok(Self::Sleep),
            0x2 => Ok(Self::SpiActive),
            0x3 => Ok(Self::Ready),
            0x4 => Ok(Self::Ready2),
            0x5 => Ok(Self::TxTune),
            0x6 => Ok(Self::RxTune),
            0x7 => Ok(Self::Tx),
            0x8 => Ok(Self::Rx),
            invalid => Err(InvalidDeviceState(invalid)),
        }
    }
}

/// START_TX parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct TxConfig {
    /// Channel number, added to the base frequency in channel steps
    pub channel: u8,
    /// Condition byte: bits 7:4 TXCOMPLETE_STATE, bit 1 RETRANSMIT,
    /// bit 0 START (0 = immediately, 1 = on wake-up timer)
    pub condition: u8,
    /// Number of bytes to transmit, 0 = use the packet handler field lengths
    pub tx_len: u16,
}

impl ToByteArray for TxConfig {
    type Error = Infallible;
    type Array = [u8; 4];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let len = self.tx_len.to_be_bytes();
        Ok([self.channel, self.condition, len[0], len[1]])
    }
}

/// START_TX command (0x31)
///
/// Switches to TX on the given channel. In the test modes used by the
/// plugins the length is zero and the transmission runs until the state is
/// changed explicitly.
#[derive(Debug, Clone)]
pub struct StartTx {
    /// Transmit parameters
    pub config: TxConfig,
}

impl Command for StartTx {
    type IdType = u8;
    type CommandParameters = TxConfig;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        0x31
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.config
    }
}

/// START_RX parameters
#[derive(Debug, Clone, Copy)]
pub struct RxConfig {
    /// Channel number
    pub channel: u8,
    /// Condition byte, bit 0 START (0 = immediately, 1 = on wake-up timer)
    pub condition: u8,
    /// Number of bytes to receive, 0 = use the packet handler field lengths
    pub rx_len: u16,
    /// State entered on preamble timeout
    pub next_state_timeout: DeviceState,
    /// State entered after a valid packet
    pub next_state_valid: DeviceState,
    /// State entered after an invalid (CRC error) packet
    pub next_state_invalid: DeviceState,
}

impl ToByteArray for RxConfig {
    type Error = Infallible;
    type Array = [u8; 7];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let len = self.rx_len.to_be_bytes();
        Ok([
            self.channel,
            self.condition,
            len[0],
            len[1],
            self.next_state_timeout as u8,
            self.next_state_valid as u8,
            self.next_state_invalid as u8,
        ])
    }
}

/// START_RX command (0x32)
///
/// Switches to RX on the given channel with the given follow-up states.
#[derive(Debug, Clone)]
pub struct StartRx {
    /// Receive parameters
    pub config: RxConfig,
}

impl Command for StartRx {
    type IdType = u8;
    type CommandParameters = RxConfig;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        0x32
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.config
    }
}

/// Current device state reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStateResponse {
    /// Current main state
    pub state: DeviceState,
    /// Channel currently tuned
    pub channel: u8,
}

impl FromByteArray for DeviceStateResponse {
    type Error = InvalidDeviceState;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            state: DeviceState::try_from(bytes[0] & 0x0F)?,
            channel: bytes[1],
        })
    }
}

/// REQUEST_DEVICE_STATE command (0x33)
#[derive(Debug, Clone)]
pub struct RequestDeviceState;

impl Command for RequestDeviceState {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = DeviceStateResponse;

    fn id() -> Self::IdType {
        0x33
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

impl ToByteArray for DeviceState {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self as u8])
    }
}

/// CHANGE_STATE command (0x34)
///
/// Forces the state machine into the given state. Used by the plugins to
/// leave their test modes by returning to READY.
#[derive(Debug, Clone)]
pub struct ChangeState {
    /// State to enter
    pub next_state: DeviceState,
}

impl Command for ChangeState {
    type IdType = u8;
    type CommandParameters = DeviceState;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        0x34
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.next_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_rx_layout() {
        let config = RxConfig {
            channel: 4,
            condition: 0,
            rx_len: 0x0102,
            next_state_timeout: DeviceState::NoChange,
            next_state_valid: DeviceState::Ready,
            next_state_invalid: DeviceState::Rx,
        };

        assert_eq!(Ok([4, 0, 0x01, 0x02, 0, 3, 8]), config.to_bytes());
        assert_eq!(0x32, StartRx::id());
    }

    #[test]
    fn start_tx_layout() {
        let config = TxConfig {
            channel: 9,
            condition: 0x30,
            tx_len: 300,
        };

        assert_eq!(Ok([9, 0x30, 0x01, 0x2C]), config.to_bytes());
    }

    #[test]
    fn device_state_ignores_upper_nibble() {
        let reply = DeviceStateResponse::from_bytes([0xF7, 0x05]).unwrap();
        assert_eq!(DeviceState::Tx, reply.state);
        assert_eq!(5, reply.channel);

        assert_eq!(
            Err(InvalidDeviceState(0x0C)),
            DeviceStateResponse::from_bytes([0x0C, 0x00])
        );
    }
}
