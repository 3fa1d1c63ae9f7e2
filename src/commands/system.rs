//! Chip identification and configuration check commands

use core::convert::Infallible;

use regiface::FromByteArray;

use crate::{Command, NoParameters, ToByteArray};

/// Part information reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PartInfo {
    /// Chip mask revision
    pub chip_rev: u8,
    /// Part number, e.g. `0x4463`
    pub part: u16,
    /// Part build
    pub part_build: u8,
    /// Chip id
    pub id: u16,
    /// Customer id
    pub customer: u8,
    /// ROM id
    pub rom_id: u8,
}

impl FromByteArray for PartInfo {
    type Error = Infallible;
    type Array = [u8; 8];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            chip_rev: bytes[0],
            part: u16::from_be_bytes([bytes[1], bytes[2]]),
            part_build: bytes[3],
            id: u16::from_be_bytes([bytes[4], bytes[5]]),
            customer: bytes[6],
            rom_id: bytes[7],
        })
    }
}

/// PART_INFO command (0x01)
#[derive(Debug, Clone)]
pub struct GetPartInfo;

impl Command for GetPartInfo {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = PartInfo;

    fn id() -> Self::IdType {
        0x01
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// Checksum of a configuration array, as produced by the configuration tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigChecksum(pub u16);

impl ToByteArray for ConfigChecksum {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.0.to_be_bytes())
    }
}

/// Result of a configuration check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigCheckResult {
    /// The loaded configuration matches the checksum
    Valid,
    /// The checksum computed by the chip differs
    BadChecksum,
    /// The check was issued in a state where it cannot run
    InvalidState,
    /// Result code not known to the driver
    Unknown(u8),
}

impl FromByteArray for ConfigCheckResult {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(match bytes[0] {
            0 => Self::Valid,
            1 => Self::BadChecksum,
            2 => Self::InvalidState,
            other => Self::Unknown(other),
        })
    }
}

/// EZCONFIG_CHECK command (0x19)
///
/// Asks the chip to compare the checksum of the configuration it received
/// against the one computed by the configuration tool.
#[derive(Debug, Clone)]
pub struct EzConfigCheck {
    /// Expected checksum
    pub checksum: ConfigChecksum,
}

impl Command for EzConfigCheck {
    type IdType = u8;
    type CommandParameters = ConfigChecksum;
    type ResponseParameters = ConfigCheckResult;

    fn id() -> Self::IdType {
        0x19
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.checksum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_info_is_big_endian() {
        let info =
            PartInfo::from_bytes([0x22, 0x44, 0x63, 0x00, 0x86, 0x00, 0x00, 0x06]).unwrap();

        assert_eq!(0x4463, info.part);
        assert_eq!(0x8600, info.id);
        assert_eq!(0x06, info.rom_id);
    }

    #[test]
    fn config_check_result_codes() {
        assert_eq!(Ok(ConfigCheckResult::Valid), ConfigCheckResult::from_bytes([0]));
        assert_eq!(
            Ok(ConfigCheckResult::BadChecksum),
            ConfigCheckResult::from_bytes([1])
        );
        assert_eq!(
            Ok(ConfigCheckResult::Unknown(7)),
            ConfigCheckResult::from_bytes([7])
        );
    }
}
