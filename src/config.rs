//! Radio configuration loader
//!
//! The EZRadio configuration tool emits the radio setup as a flat array of
//! command records:
//!
//! ```text
//! LEN | CMD | PARAMS ... | LEN | CMD | PARAMS ... | 0x00 | CHECKSUM (BE, optional)
//! ```
//!
//! Every record is an ordinary API command (mostly `SET_PROPERTY`) and is
//! sent through the framer as-is. The array ends with a zero length byte,
//! optionally followed by the 16 bit checksum the chip verifies with
//! `EZCONFIG_CHECK`.

use embedded_hal::digital::InputPin;

use crate::{
    commands::{ChipFlags, ConfigCheckResult, ConfigChecksum, EzConfigCheck, GetIntStatus, IntClear, WRITE_TX_FIFO},
    cts::ClearToSend,
    device::MAX_CMD_LEN,
    Device, Error,
};

/// A configuration array produced by the configuration tool.
#[derive(Debug, Clone, Copy)]
pub struct RadioConfiguration<'a> {
    bytes: &'a [u8],
}

impl<'a> RadioConfiguration<'a> {
    /// Wraps a configuration array.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// The raw configuration bytes.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Iterates over the command records of the array.
    pub fn records(&self) -> Records<'a> {
        Records {
            bytes: self.bytes,
            offset: 0,
            done: false,
        }
    }

    /// Checks that the array is a well formed record stream.
    pub fn validate(&self) -> Result<(), Error> {
        self.terminator().map(|_| ())
    }

    /// Checksum following the terminating zero, if the array carries one.
    pub fn checksum(&self) -> Result<Option<ConfigChecksum>, Error> {
        let end = self.terminator()?;
        Ok(match self.bytes.get(end + 1..end + 3) {
            Some(&[hi, lo]) => Some(ConfigChecksum(u16::from_be_bytes([hi, lo]))),
            _ => None,
        })
    }

    fn terminator(&self) -> Result<usize, Error> {
        let mut records = self.records();
        for record in &mut records {
            record?;
        }
        Ok(records.offset)
    }
}

/// Iterator over the records of a [`RadioConfiguration`].
///
/// Yields each record without its length byte. A record longer than
/// [`MAX_CMD_LEN`], a truncated record or a missing terminator yields
/// `Error::MalformedConfig` once and ends the iteration.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    bytes: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<&'a [u8], Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let offset = self.offset;
        let len = match self.bytes.get(offset) {
            Some(0) => {
                self.done = true;
                return None;
            }
            Some(&len) => len as usize,
            None => {
                self.done = true;
                return Some(Err(Error::MalformedConfig { offset }));
            }
        };

        match self.bytes.get(offset + 1..offset + 1 + len) {
            Some(record) if len <= MAX_CMD_LEN => {
                self.offset += len + 1;
                Some(Ok(record))
            }
            _ => {
                self.done = true;
                Some(Err(Error::MalformedConfig { offset }))
            }
        }
    }
}

impl<SPI, CTS> Device<SPI, CTS>
where
    SPI: embedded_hal::spi::SpiDevice,
    CTS: ClearToSend,
{
    /// Loads a configuration array into the chip record by record.
    ///
    /// The array is validated before anything is sent. A record whose CTS
    /// never arrives is sent once more before giving up. After each record
    /// the nIRQ line is checked; if it is asserted the interrupts are read
    /// and cleared, and a pending command error aborts the load.
    ///
    /// # Errors
    /// * `Error::MalformedConfig` - the array is not a valid record stream
    /// * `Error::CtsTimeout` - a record failed twice
    /// * `Error::CommandError` - the chip rejected a record
    /// * `Error::Bus` / `Error::Pin` - bus or nIRQ access failed
    pub fn configuration_init<N: InputPin>(
        &mut self,
        config: &RadioConfiguration<'_>,
        nirq: &mut N,
    ) -> Result<(), Error> {
        config.validate()?;

        for record in config.records() {
            let record = record?;

            match self.send_cmd_get_resp(record, &mut []) {
                Err(Error::CtsTimeout) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("ezradio: retrying config record {=[u8]:x}", record);

                    self.clear_cts();
                    self.send_cmd_get_resp(record, &mut [])?;
                }
                result => result?,
            }

            if nirq.is_low().map_err(|_| Error::Pin)? {
                let status = self.execute_command(GetIntStatus {
                    clear: IntClear::ALL,
                })?;
                if status.chip_pend.contains(ChipFlags::CMD_ERROR) {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("ezradio: config record {=[u8]:x} rejected", record);
                    return Err(Error::CommandError);
                }
            }
        }

        Ok(())
    }

    /// Streams raw configuration bytes in a single `WRITE_TX_FIFO` burst.
    ///
    /// This is the bulk path used by patch and provisioning images that are
    /// loaded through the TX FIFO instead of record by record.
    pub fn write_config_array(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.write_data(WRITE_TX_FIFO, true, bytes)
    }

    /// Asks the chip to verify the loaded configuration against `expected`.
    ///
    /// # Errors
    /// * `Error::ConfigIntegrity` - the chip reports any result but valid
    pub fn config_checksum_check(&mut self, expected: ConfigChecksum) -> Result<(), Error> {
        match self.execute_command(EzConfigCheck { checksum: expected })? {
            ConfigCheckResult::Valid => Ok(()),
            _result => {
                #[cfg(feature = "defmt")]
                defmt::warn!("ezradio: configuration check failed: {}", _result);
                Err(Error::ConfigIntegrity)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};

    use super::*;
    use crate::{device::CommConfig, test::Script};

    const CONFIG: &[u8] = &[
        0x02, 0x34, 0x03, // CHANGE_STATE READY
        0x05, 0x11, 0x20, 0x01, 0x00, 0x03, // MODEM_MOD_TYPE = GFSK
        0x00, // end
        0xAB, 0xCD, // checksum
    ];

    #[test]
    fn records_and_checksum() {
        let config = RadioConfiguration::new(CONFIG);
        let mut records = config.records();

        assert_eq!(Some(Ok(&[0x34, 0x03][..])), records.next());
        assert_eq!(Some(Ok(&[0x11, 0x20, 0x01, 0x00, 0x03][..])), records.next());
        assert_eq!(None, records.next());
        assert_eq!(Ok(Some(ConfigChecksum(0xABCD))), config.checksum());

        let unchecked = RadioConfiguration::new(&CONFIG[..10]);
        assert_eq!(Ok(None), unchecked.checksum());
    }

    #[test]
    fn malformed_arrays_are_rejected() {
        let too_long = RadioConfiguration::new(&[0x11, 0x00]);
        assert_eq!(
            Err(Error::MalformedConfig { offset: 0 }),
            too_long.validate()
        );

        let truncated = RadioConfiguration::new(&[0x02, 0x34, 0x03, 0x05, 0x11]);
        assert_eq!(
            Err(Error::MalformedConfig { offset: 3 }),
            truncated.validate()
        );

        let unterminated = RadioConfiguration::new(&[0x02, 0x34, 0x03]);
        let mut records = unterminated.records();
        assert!(records.next().unwrap().is_ok());
        assert_eq!(
            Some(Err(Error::MalformedConfig { offset: 3 })),
            records.next()
        );
        assert_eq!(None, records.next());
    }

    #[test]
    fn malformed_array_sends_nothing() {
        let mut spi = Script::new().build();
        let mut nirq = PinMock::new(&[]);
        let mut device = Device::new(spi.clone());

        let config = RadioConfiguration::new(&[0x02, 0x34, 0x03, 0x20]);
        assert_eq!(
            Err(Error::MalformedConfig { offset: 3 }),
            device.configuration_init(&config, &mut nirq)
        );

        nirq.done();
        spi.done();
    }

    #[test]
    fn record_is_retried_once() {
        let mut spi = Script::new()
            .cts()
            .cmd(&[0x34, 0x03])
            .busy(0)
            .busy(0)
            .cts()
            .cmd(&[0x34, 0x03])
            .cts()
            .cmd(&[0x11, 0x20, 0x01, 0x00, 0x03])
            .cts()
            .build();
        let mut nirq = PinMock::new(&[
            PinTransaction::get(State::High),
            PinTransaction::get(State::High),
        ]);
        let mut device = Device::new(spi.clone()).with_config(CommConfig { cts_retries: 2 });

        device
            .configuration_init(&RadioConfiguration::new(CONFIG), &mut nirq)
            .unwrap();

        nirq.done();
        spi.done();
    }

    #[test]
    fn second_timeout_aborts() {
        let mut spi = Script::new()
            .cts()
            .cmd(&[0x34, 0x03])
            .busy(0)
            .busy(0)
            .build();
        let mut nirq = PinMock::new(&[]);
        let mut device = Device::new(spi.clone()).with_config(CommConfig { cts_retries: 1 });

        assert_eq!(
            Err(Error::CtsTimeout),
            device.configuration_init(&RadioConfiguration::new(CONFIG), &mut nirq)
        );

        nirq.done();
        spi.done();
    }

    #[test]
    fn command_error_aborts() {
        let mut spi = Script::new()
            .cts()
            .cmd(&[0x34, 0x03])
            .cts()
            .cmd(&[0x20, 0x00, 0x00, 0x00])
            .resp(&[0x04, 0x04, 0x00, 0x00, 0x00, 0x00, 0x08, 0x00])
            .build();
        let mut nirq = PinMock::new(&[PinTransaction::get(State::Low)]);
        let mut device = Device::new(spi.clone());

        assert_eq!(
            Err(Error::CommandError),
            device.configuration_init(&RadioConfiguration::new(CONFIG), &mut nirq)
        );

        nirq.done();
        spi.done();
    }

    #[test]
    fn checksum_mismatch_is_an_integrity_error() {
        let mut spi = Script::new()
            .cts()
            .cmd(&[0x19, 0xAB, 0xCD])
            .resp(&[0x01])
            .cmd(&[0x19, 0xAB, 0xCD])
            .resp(&[0x00])
            .build();
        let mut device = Device::new(spi.clone());

        assert_eq!(
            Err(Error::ConfigIntegrity),
            device.config_checksum_check(ConfigChecksum(0xABCD))
        );
        device.config_checksum_check(ConfigChecksum(0xABCD)).unwrap();

        spi.done();
    }

    #[test]
    fn bulk_write_waits_for_cts() {
        let mut spi = Script::new()
            .cts()
            .write(0x66, &[0x04, 0x11, 0x00, 0x01])
            .build();
        let mut device = Device::new(spi.clone());

        device
            .write_config_array(&[0x04, 0x11, 0x00, 0x01])
            .unwrap();

        spi.done();
    }
}
