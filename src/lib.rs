#![cfg_attr(not(test), no_std)]
//! EZRadio Radio Driver
//!
//! This crate provides a type-safe interface for the Silicon Labs EZRadio and
//! EZRadioPRO sub-GHz transceivers (Si4455, Si4460/61/63/64). The chips are
//! driven through a command/response API over SPI: every operation is an API
//! command, and the chip signals that it has finished processing a command
//! with a clear-to-send (CTS) flag.
//!
//! # Architecture
//! The driver is organized into several modules:
//!
//! - [`device`]: Communication layer
//!   - SPI transport, one transaction per command or FIFO access
//!   - CTS gating and command/response framing
//!   - Typed command execution and property access
//!
//! - [`cts`]: Clear-to-send sources (SPI polling, GPIO1, interrupt flag)
//!
//! - [`commands`]: Typed API commands
//!   - [`commands::state`]: state machine control
//!   - [`commands::interrupt`]: interrupt status and FIFO info
//!   - [`commands::system`]: part info and configuration check
//!
//! - [`properties`]: Typed properties used by the driver
//!
//! - [`config`]: Loader for configuration arrays generated by the
//!   configuration tool
//!
//! - [`plugins`]: Mutually exclusive test modes and interrupt event handlers
//!
//! - [`radio`]: [`Radio`], which ties a [`Device`] to its plugins
//!
//! # Usage
//! Bring-up follows a fixed sequence:
//!
//! 1. Power-on reset the chip through SDN with [`Device::reset`]
//! 2. Load the configuration array with [`Radio::configure`]
//! 3. Start a mode plugin or packet reception
//! 4. Call [`Radio::handle_irq`] whenever nIRQ is asserted
//!
//! # Important Notes
//! - Commands are not queued; each one waits for the CTS of the previous one
//! - CTS waits are bounded by [`CommConfig::cts_retries`]
//! - Only one mode plugin can own the radio at a time
//! - The RX and TX FIFOs are 64 bytes
//!
//! # Example
//! ```no_run
//! use embedded_hal::spi::SpiDevice;
//! use ezradio::{commands::{ChangeState, DeviceState}, Device, Error};
//!
//! fn park_radio<SPI: SpiDevice>(spi: SPI) -> Result<Device<SPI>, Error> {
//!     let mut device = Device::new(spi);
//!
//!     device.execute_command(ChangeState { next_state: DeviceState::Ready })?;
//!
//!     Ok(device)
//! }
//! ```

use regiface::*;

pub mod commands;
pub mod config;
pub mod cts;
pub mod device;
pub mod error;
pub mod plugins;
pub mod properties;
pub mod radio;

pub use commands::*;
pub use config::RadioConfiguration;
pub use cts::{ClearToSend, CtsFlag, Gpio1, PacedGpio1, SpiPolled};
pub use device::{CommConfig, Device, FIFO_SIZE, MAX_CMD_LEN, MAX_RESPONSE_LEN};
pub use error::Error;
pub use properties::*;
pub use radio::Radio;
