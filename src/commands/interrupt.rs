//! Interrupt status and FIFO commands
//!
//! The EZRadio groups its interrupt sources into three blocks (packet
//! handler, modem and chip). `GET_INT_STATUS` returns the pending and
//! current status of all three and optionally clears the pending bits.
//! The plugin manager issues it with all clear arguments set to zero, which
//! reads and clears every pending interrupt in one go.

use core::convert::Infallible;

use bitflags::bitflags;
use regiface::FromByteArray;

use crate::{Command, ToByteArray};

bitflags! {
    /// Summary of the interrupt blocks with pending sources
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct IntPending: u8 {
        /// Chip block pending
        const CHIP = 1 << 2;
        /// Modem block pending
        const MODEM = 1 << 1;
        /// Packet handler block pending
        const PACKET_HANDLER = 1;
    }
}

bitflags! {
    /// Packet handler interrupt sources
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PacketHandlerFlags: u8 {
        /// Received packet matched the match filter
        const FILTER_MATCH = 1 << 7;
        /// Received packet failed the match filter
        const FILTER_MISS = 1 << 6;
        /// Packet transmission finished
        const PACKET_SENT = 1 << 5;
        /// Valid packet received
        const PACKET_RX = 1 << 4;
        /// Packet received with a CRC error
        const CRC_ERROR = 1 << 3;
        /// Packet received with an alternate CRC error
        const ALT_CRC_ERROR = 1 << 2;
        /// TX FIFO below the almost-empty threshold
        const TX_FIFO_ALMOST_EMPTY = 1 << 1;
        /// RX FIFO above the almost-full threshold
        const RX_FIFO_ALMOST_FULL = 1;
    }
}

bitflags! {
    /// Modem interrupt sources
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ModemFlags: u8 {
        /// RSSI latched
        const RSSI_LATCH = 1 << 7;
        /// Postamble detected
        const POSTAMBLE_DETECT = 1 << 6;
        /// Invalid sync word
        const INVALID_SYNC = 1 << 5;
        /// RSSI jump detected
        const RSSI_JUMP = 1 << 4;
        /// RSSI above threshold
        const RSSI = 1 << 3;
        /// Invalid preamble
        const INVALID_PREAMBLE = 1 << 2;
        /// Preamble detected
        const PREAMBLE_DETECT = 1 << 1;
        /// Sync word detected
        const SYNC_DETECT = 1;
    }
}

bitflags! {
    /// Chip interrupt sources
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChipFlags: u8 {
        /// Calibration requested
        const CAL = 1 << 6;
        /// FIFO underflow or overflow
        const FIFO_UNDERFLOW_OVERFLOW_ERROR = 1 << 5;
        /// State change completed
        const STATE_CHANGE = 1 << 4;
        /// Last command was invalid
        const CMD_ERROR = 1 << 3;
        /// Chip ready after power-up
        const CHIP_READY = 1 << 2;
        /// Low battery
        const LOW_BATT = 1 << 1;
        /// Wake-up timer expired
        const WUT = 1;
    }
}

/// GET_INT_STATUS parameters
///
/// A zero bit clears the corresponding pending interrupt, a one bit leaves
/// it pending. [`IntClear::ALL`] clears everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntClear {
    /// Packet handler pending bits to keep
    pub ph_keep: PacketHandlerFlags,
    /// Modem pending bits to keep
    pub modem_keep: ModemFlags,
    /// Chip pending bits to keep
    pub chip_keep: ChipFlags,
}

impl IntClear {
    /// Clear every pending interrupt
    pub const ALL: Self = Self {
        ph_keep: PacketHandlerFlags::empty(),
        modem_keep: ModemFlags::empty(),
        chip_keep: ChipFlags::empty(),
    };
}

impl ToByteArray for IntClear {
    type Error = Infallible;
    type Array = [u8; 3];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([
            self.ph_keep.bits(),
            self.modem_keep.bits(),
            self.chip_keep.bits(),
        ])
    }
}

/// Interrupt status reply
///
/// `*_pend` fields hold latched interrupts, `*_status` fields the current
/// level of each source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntStatus {
    /// Blocks with pending interrupts
    pub int_pend: IntPending,
    /// Blocks with active sources
    pub int_status: IntPending,
    /// Pending packet handler interrupts
    pub ph_pend: PacketHandlerFlags,
    /// Packet handler source levels
    pub ph_status: PacketHandlerFlags,
    /// Pending modem interrupts
    pub modem_pend: ModemFlags,
    /// Modem source levels
    pub modem_status: ModemFlags,
    /// Pending chip interrupts
    pub chip_pend: ChipFlags,
    /// Chip source levels
    pub chip_status: ChipFlags,
}

impl FromByteArray for IntStatus {
    type Error = Infallible;
    type Array = [u8; 8];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            int_pend: IntPending::from_bits_retain(bytes[0]),
            int_status: IntPending::from_bits_retain(bytes[1]),
            ph_pend: PacketHandlerFlags::from_bits_retain(bytes[2]),
            ph_status: PacketHandlerFlags::from_bits_retain(bytes[3]),
            modem_pend: ModemFlags::from_bits_retain(bytes[4]),
            modem_status: ModemFlags::from_bits_retain(bytes[5]),
            chip_pend: ChipFlags::from_bits_retain(bytes[6]),
            chip_status: ChipFlags::from_bits_retain(bytes[7]),
        })
    }
}

/// GET_INT_STATUS command (0x20)
///
/// Returns all interrupt status and clears the pending bits selected by
/// [`IntClear`]. Deasserts nIRQ once nothing is pending any more.
#[derive(Debug, Clone)]
pub struct GetIntStatus {
    /// Pending bits to keep
    pub clear: IntClear,
}

impl Command for GetIntStatus {
    type IdType = u8;
    type CommandParameters = IntClear;
    type ResponseParameters = IntStatus;

    fn id() -> Self::IdType {
        0x20
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.clear
    }
}

bitflags! {
    /// FIFO_INFO reset request
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FifoReset: u8 {
        /// Reset the RX FIFO
        const RX = 1 << 1;
        /// Reset the TX FIFO
        const TX = 1;
    }
}

impl ToByteArray for FifoReset {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.bits()])
    }
}

/// FIFO usage reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FifoStatus {
    /// Bytes waiting in the RX FIFO
    pub rx_fifo_count: u8,
    /// Free bytes in the TX FIFO
    pub tx_fifo_space: u8,
}

impl FromByteArray for FifoStatus {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            rx_fifo_count: bytes[0],
            tx_fifo_space: bytes[1],
        })
    }
}

/// FIFO_INFO command (0x15)
///
/// Reports FIFO usage and optionally resets either FIFO. The reported
/// counts are those before the reset.
#[derive(Debug, Clone)]
pub struct FifoInfo {
    /// FIFOs to reset
    pub reset: FifoReset,
}

impl Command for FifoInfo {
    type IdType = u8;
    type CommandParameters = FifoReset;
    type ResponseParameters = FifoStatus;

    fn id() -> Self::IdType {
        0x15
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.reset
    }
}
