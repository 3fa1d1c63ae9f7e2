//! Driver error type
//!
//! Every fallible operation in this crate returns [`Error`]. Bus and pin
//! failures are flattened into [`Error::Bus`] and [`Error::Pin`]; the
//! remaining variants describe conditions detected by the driver itself.

use core::fmt;

use crate::plugins::PluginKind;

/// Errors reported by the EZRadio driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// SPI communication failed
    Bus,
    /// Reading or driving a GPIO failed
    Pin,
    /// A reply could not be parsed into its response type
    Deserialization,
    /// The chip never reported clear-to-send within the configured attempts
    CtsTimeout,
    /// Command frame exceeds [`MAX_CMD_LEN`](crate::MAX_CMD_LEN)
    CommandTooLong,
    /// Requested reply exceeds [`MAX_RESPONSE_LEN`](crate::MAX_RESPONSE_LEN)
    ResponseTooLong,
    /// The configuration array is not a valid record stream
    MalformedConfig {
        /// Byte offset of the offending record
        offset: usize,
    },
    /// The chip flagged a command error while loading the configuration
    CommandError,
    /// The chip rejected the configuration checksum
    ConfigIntegrity,
    /// Another mode plugin already owns the radio
    PluginBusy(PluginKind),
    /// The requested plugin is not part of the plugin table
    PluginNotRegistered(PluginKind),
    /// Packet reception requested without a receive plugin
    ReceiveNotRegistered,
    /// The chip is already transmitting
    ChipBusy,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "SPI bus error"),
            Self::Pin => write!(f, "GPIO error"),
            Self::Deserialization => write!(f, "malformed reply"),
            Self::CtsTimeout => write!(f, "timed out waiting for CTS"),
            Self::CommandTooLong => write!(f, "command frame too long"),
            Self::ResponseTooLong => write!(f, "reply too long"),
            Self::MalformedConfig { offset } => {
                write!(f, "malformed configuration record at offset {}", offset)
            }
            Self::CommandError => write!(f, "chip reported a command error"),
            Self::ConfigIntegrity => write!(f, "configuration checksum mismatch"),
            Self::PluginBusy(kind) => write!(f, "{:?} plugin is active", kind),
            Self::PluginNotRegistered(kind) => write!(f, "{:?} plugin is not registered", kind),
            Self::ReceiveNotRegistered => write!(f, "receive plugin is not registered"),
            Self::ChipBusy => write!(f, "radio is already transmitting"),
        }
    }
}
