//! Modem properties (group 0x20)
//!
//! The test-mode plugins switch the modulation source and type of the modem
//! to produce PN9 data, an unmodulated carrier or direct-mode data, and put
//! the previous value back when they stop.

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Error type for reserved MODEM_MOD_TYPE encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidModType(pub u8);

/// Direct mode timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectMode {
    /// Synchronous, the chip outputs a TX clock on a GPIO
    #[default]
    Synchronous = 0,
    /// Asynchronous, data is sampled without a clock
    Asynchronous = 1,
}

/// Source of the modulation data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModSource {
    /// Data comes from the packet handler and TX FIFO
    #[default]
    Packet = 0,
    /// Data comes from a GPIO pin (direct mode)
    Direct = 1,
    /// Data comes from the internal PN9 pseudo-random generator
    Pseudo = 2,
}

/// Modulation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModType {
    /// Continuous wave, unmodulated carrier
    Cw = 0,
    /// On-off keying
    Ook = 1,
    /// 2-level FSK
    #[default]
    Fsk2 = 2,
    /// 2-level Gaussian FSK
    Gfsk2 = 3,
    /// 4-level FSK
    Fsk4 = 4,
    /// 4-level Gaussian FSK
    Gfsk4 = 5,
}

/// MODEM_MOD_TYPE property (group 0x20, index 0x00)
///
/// Selects the modulation type and where the modulation data comes from.
///
/// # Bit Layout
/// - Bit 7: TX_DIRECT_MODE_TYPE
/// - Bits 6:5: TX_DIRECT_MODE_GPIO
/// - Bits 4:3: MOD_SOURCE
/// - Bits 2:0: MOD_TYPE
#[register(0x2000u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub struct ModemModType {
    /// Direct mode timing
    pub direct_mode: DirectMode,
    /// GPIO carrying direct mode data (0..=3)
    pub direct_gpio: u8,
    /// Modulation data source
    pub source: ModSource,
    /// Modulation type
    pub mod_type: ModType,
}

impl FromByteArray for ModemModType {
    type Error = InvalidModType;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        let raw = bytes[0];
        let source = match (raw >> 3) & 0x3 {
            0 => ModSource::Packet,
            1 => ModSource::Direct,
            2 => ModSource::Pseudo,
            _ => return Err(InvalidModType(raw)),
        };
        let mod_type = match raw & 0x7 {
            0 => ModType::Cw,
            1 => ModType::Ook,
            2 => ModType::Fsk2,
            3 => ModType::Gfsk2,
            4 => ModType::Fsk4,
            5 => ModType::Gfsk4,
            _ => return Err(InvalidModType(raw)),
        };

        Ok(Self {
            direct_mode: if raw & 0x80 != 0 {
                DirectMode::Asynchronous
            } else {
                DirectMode::Synchronous
            },
            direct_gpio: (raw >> 5) & 0x3,
            source,
            mod_type,
        })
    }
}

impl ToByteArray for ModemModType {
    type Error = core::convert::Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([(self.direct_mode as u8) << 7
            | (self.direct_gpio & 0x3) << 5
            | (self.source as u8) << 3
            | self.mod_type as u8])
    }
}
