//! EZRadio API commands
//!
//! This module contains the typed EZRadio API commands used by the driver.
//! Each command implements [`regiface::Command`] and is executed with
//! [`Device::execute_command`](crate::Device::execute_command):
//!
//! - [`state`]: state machine control (`START_TX`, `START_RX`, `CHANGE_STATE`,
//!   `REQUEST_DEVICE_STATE`)
//! - [`interrupt`]: interrupt status and FIFO bookkeeping (`GET_INT_STATUS`,
//!   `FIFO_INFO`)
//! - [`system`]: chip identification and configuration checks (`PART_INFO`,
//!   `EZCONFIG_CHECK`)
//!
//! # Command Framing
//! Every command is sent as `opcode | parameters` in a single chip-select
//! assertion. Commands with a reply are followed by `READ_CMD_BUFF` (0x44)
//! polling until the chip answers with a `0xFF` CTS byte, immediately followed
//! by the reply payload.
//!
//! The variable-length property and FIFO commands are not modelled here,
//! they are framed directly by the [`Device`](crate::Device).

pub mod interrupt;
pub mod state;
pub mod system;

pub use interrupt::*;
pub use state::*;
pub use system::*;

/// `SET_PROPERTY` opcode
pub const SET_PROPERTY: u8 = 0x11;
/// `GET_PROPERTY` opcode
pub const GET_PROPERTY: u8 = 0x12;
/// `READ_CMD_BUFF` opcode, used to poll CTS and fetch replies
pub const READ_CMD_BUFF: u8 = 0x44;
/// `WRITE_TX_FIFO` opcode
pub const WRITE_TX_FIFO: u8 = 0x66;
/// `READ_RX_FIFO` opcode
pub const READ_RX_FIFO: u8 = 0x77;

/// CTS value returned by `READ_CMD_BUFF` once the chip is ready
pub const CTS_READY: u8 = 0xFF;
