//! EZRadio Device Interface
//!
//! This module provides the communication layer between the host and an
//! EZRadio transceiver. It covers three concerns:
//!
//! - Bus transport: every command, FIFO access and reply read is exactly one
//!   SPI transaction, so chip-select is asserted once per call and released
//!   on every path, including errors
//! - Readiness gating: commands are only sent once the chip has reported
//!   clear-to-send (CTS), through the configured [`ClearToSend`] source
//! - Command/response framing: `opcode | parameters` out, then
//!   `READ_CMD_BUFF` until the chip answers `0xFF` followed by the reply
//!
//! Both blocking (`embedded-hal`) and async (`embedded-hal-async`) SPI
//! devices are supported; the async methods carry an `_async` suffix.
//!
//! # Example
//! ```no_run
//! use embedded_hal::spi::SpiDevice;
//! use ezradio::{Device, Error};
//!
//! fn identify<SPI: SpiDevice>(spi: SPI) -> Result<u16, Error> {
//!     let mut device = Device::new(spi);
//!     Ok(device.part_info()?.part)
//! }
//! ```

use core::convert::Infallible;

use embedded_hal::{delay::DelayNs, digital::OutputPin};
use regiface::{ByteArray, Command, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

use crate::{
    commands::{GetPartInfo, PartInfo, CTS_READY, GET_PROPERTY, READ_CMD_BUFF, READ_RX_FIFO, SET_PROPERTY, WRITE_TX_FIFO},
    cts::{ClearToSend, SpiPolled},
    properties::split_id,
    Error,
};

/// Longest command frame (opcode included) accepted by the chip
pub const MAX_CMD_LEN: usize = 16;
/// Longest reply returned through `READ_CMD_BUFF`
pub const MAX_RESPONSE_LEN: usize = 16;
/// Size of the TX and RX FIFOs
pub const FIFO_SIZE: usize = 64;

/// Communication layer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommConfig {
    /// Number of CTS polls before a command is considered lost.
    ///
    /// Each poll is one SPI transaction (or one sample of the CTS line), so
    /// the resulting timeout scales with the SPI clock. Pin samples from
    /// [`Gpio1`](crate::cts::Gpio1) are taken back to back and can exhaust
    /// this count long before `POWER_UP` finishes on a fast MCU. Use
    /// [`PacedGpio1`](crate::cts::PacedGpio1) there, or raise the count.
    pub cts_retries: u16,
}

impl Default for CommConfig {
    fn default() -> Self {
        Self { cts_retries: 10_000 }
    }
}

/// Communication interface for one EZRadio transceiver.
///
/// Wraps the SPI device and the CTS source and tracks whether CTS has been
/// observed since the last command was sent.
pub struct Device<SPI, CTS = SpiPolled> {
    spi: SPI,
    cts: CTS,
    cts_went_high: bool,
    config: CommConfig,
}

impl<SPI> Device<SPI> {
    /// Creates a new Device polling CTS over SPI.
    pub fn new(spi: SPI) -> Self {
        Self::with_cts(spi, SpiPolled)
    }
}

impl<SPI, CTS> Device<SPI, CTS> {
    /// Creates a new Device using the given CTS source.
    pub fn with_cts(spi: SPI, cts: CTS) -> Self {
        Self {
            spi,
            cts,
            cts_went_high: false,
            config: CommConfig::default(),
        }
    }

    /// Replaces the communication settings.
    pub fn with_config(mut self, config: CommConfig) -> Self {
        self.config = config;
        self
    }

    /// Current communication settings.
    pub fn config(&self) -> &CommConfig {
        &self.config
    }

    /// Whether CTS has been observed since the last command was sent.
    pub fn cts_went_high(&self) -> bool {
        self.cts_went_high
    }

    /// Releases the underlying SPI device and CTS source.
    pub fn release(self) -> (SPI, CTS) {
        (self.spi, self.cts)
    }
}

impl<SPI, CTS: ClearToSend> Device<SPI, CTS> {
    /// Forgets any CTS observed so far.
    pub fn clear_cts(&mut self) {
        self.cts_went_high = false;
        self.cts.clear();
    }

    /// Power-on resets the chip through its SDN pin.
    ///
    /// SDN is held high for 10 µs, released, and the 10 ms power-on-reset
    /// time is waited out before returning.
    pub fn reset<P, D>(&mut self, sdn: &mut P, delay: &mut D) -> Result<(), Error>
    where
        P: OutputPin,
        D: DelayNs,
    {
        sdn.set_high().map_err(|_| Error::Pin)?;
        delay.delay_us(10);
        sdn.set_low().map_err(|_| Error::Pin)?;
        delay.delay_ms(10);

        self.clear_cts();
        Ok(())
    }

    fn sample_cts(&mut self) -> Result<Option<bool>, Error> {
        for _ in 0..self.config.cts_retries {
            match self.cts.poll()? {
                Some(true) => return Ok(Some(true)),
                Some(false) => continue,
                None => return Ok(None),
            }
        }

        #[cfg(feature = "defmt")]
        defmt::warn!("ezradio: CTS line never went high");
        Ok(Some(false))
    }
}

fn frame_command<CMD>(command: CMD, frame: &mut [u8; MAX_CMD_LEN]) -> Result<usize, Error>
where
    CMD: Command<IdType = u8>,
    CMD::CommandParameters: ToByteArray<Error = Infallible>,
{
    let params = command
        .invoking_parameters()
        .to_bytes()
        .unwrap_or_else(|never| match never {});
    let params = params.as_ref();

    let len = params.len() + 1;
    if len > MAX_CMD_LEN {
        return Err(Error::CommandTooLong);
    }

    frame[0] = CMD::id();
    frame[1..len].copy_from_slice(params);
    Ok(len)
}

fn frame_set_property<R>(value: R, frame: &mut [u8; MAX_CMD_LEN]) -> Result<usize, Error>
where
    R: WritableRegister<IdType = u16, Error = Infallible>,
{
    let (group, index) = split_id(R::id());
    let raw_value = value.to_bytes().unwrap_or_else(|never| match never {});
    let data = raw_value.as_ref();

    let len = data.len() + 4;
    if len > MAX_CMD_LEN {
        return Err(Error::CommandTooLong);
    }

    frame[..4].copy_from_slice(&[SET_PROPERTY, group, data.len() as u8, index]);
    frame[4..len].copy_from_slice(data);
    Ok(len)
}

impl<SPI, CTS> Device<SPI, CTS>
where
    SPI: embedded_hal::spi::SpiDevice,
    CTS: ClearToSend,
{
    /// Waits until the chip reports clear-to-send.
    ///
    /// # Errors
    /// * `Error::CtsTimeout` - CTS not observed within `cts_retries` polls
    /// * `Error::Bus` - SPI communication failed
    pub fn poll_cts(&mut self) -> Result<(), Error> {
        match self.sample_cts()? {
            Some(true) => {
                self.cts_went_high = true;
                Ok(())
            }
            Some(false) => Err(Error::CtsTimeout),
            None => self.get_resp(&mut []),
        }
    }

    /// Reads the reply of the last command into `buf`.
    ///
    /// Issues `READ_CMD_BUFF` until the CTS byte reads `0xFF`; the reply
    /// follows the CTS byte within the same transaction.
    ///
    /// # Errors
    /// * `Error::ResponseTooLong` - `buf` is longer than [`MAX_RESPONSE_LEN`]
    /// * `Error::CtsTimeout` - CTS not observed within `cts_retries` polls
    /// * `Error::Bus` - SPI communication failed
    pub fn get_resp(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        if buf.len() > MAX_RESPONSE_LEN {
            return Err(Error::ResponseTooLong);
        }

        let mut response = [0u8; MAX_RESPONSE_LEN + 1];
        let len = buf.len() + 1;

        for _ in 0..self.config.cts_retries {
            self.spi
                .transaction(&mut [
                    embedded_hal::spi::Operation::Write(&[READ_CMD_BUFF]),
                    embedded_hal::spi::Operation::Read(&mut response[..len]),
                ])
                .map_err(|_| Error::Bus)?;

            if response[0] == CTS_READY {
                buf.copy_from_slice(&response[1..len]);
                self.cts_went_high = true;
                return Ok(());
            }
        }

        #[cfg(feature = "defmt")]
        defmt::warn!("ezradio: no CTS after {} polls", self.config.cts_retries);
        Err(Error::CtsTimeout)
    }

    /// Sends a raw command frame once the chip is ready for it.
    ///
    /// # Errors
    /// * `Error::CommandTooLong` - `cmd` is longer than [`MAX_CMD_LEN`]
    /// * `Error::CtsTimeout` - the previous command never completed
    /// * `Error::Bus` - SPI communication failed
    pub fn send_cmd(&mut self, cmd: &[u8]) -> Result<(), Error> {
        if cmd.len() > MAX_CMD_LEN {
            return Err(Error::CommandTooLong);
        }
        if !self.cts_went_high {
            self.poll_cts()?;
        }

        // The next CTS edge belongs to this command.
        self.cts.clear();
        let result = self
            .spi
            .transaction(&mut [embedded_hal::spi::Operation::Write(cmd)])
            .map_err(|_| Error::Bus);
        self.cts_went_high = false;

        result
    }

    /// Sends a raw command frame and reads its reply into `resp`.
    pub fn send_cmd_get_resp(&mut self, cmd: &[u8], resp: &mut [u8]) -> Result<(), Error> {
        self.send_cmd(cmd)?;
        self.get_resp(resp)
    }

    /// Writes `data` after a single command byte, e.g. to fill the TX FIFO.
    ///
    /// With `poll_cts` set the chip must have reported CTS first.
    pub fn write_data(&mut self, cmd: u8, poll_cts: bool, data: &[u8]) -> Result<(), Error> {
        if poll_cts && !self.cts_went_high {
            self.poll_cts()?;
        }

        self.cts.clear();
        let result = self
            .spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&[cmd]),
                embedded_hal::spi::Operation::Write(data),
            ])
            .map_err(|_| Error::Bus);
        self.cts_went_high = false;

        result
    }

    /// Reads `buf.len()` bytes after a single command byte, e.g. from the RX FIFO.
    ///
    /// With `poll_cts` set the chip must have reported CTS first.
    pub fn read_data(&mut self, cmd: u8, poll_cts: bool, buf: &mut [u8]) -> Result<(), Error> {
        if poll_cts && !self.cts_went_high {
            self.poll_cts()?;
        }

        self.cts.clear();
        let result = self
            .spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&[cmd]),
                embedded_hal::spi::Operation::Read(buf),
            ])
            .map_err(|_| Error::Bus);
        self.cts_went_high = false;

        result
    }

    /// Writes a packet into the TX FIFO.
    pub fn write_tx_fifo(&mut self, data: &[u8]) -> Result<(), Error> {
        if data.len() > FIFO_SIZE {
            return Err(Error::CommandTooLong);
        }
        self.write_data(WRITE_TX_FIFO, false, data)
    }

    /// Reads `buf.len()` bytes from the RX FIFO.
    pub fn read_rx_fifo(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        if buf.len() > FIFO_SIZE {
            return Err(Error::ResponseTooLong);
        }
        self.read_data(READ_RX_FIFO, false, buf)
    }

    /// Executes a command on the device.
    ///
    /// Commands without response parameters are only sent; their completion
    /// is awaited by the CTS poll in front of the next command.
    ///
    /// # Errors
    /// * `Error::CtsTimeout` - CTS not observed before or after the command
    /// * `Error::Bus` - SPI communication failed
    /// * `Error::Deserialization` - Failed to parse command response
    pub fn execute_command<CMD>(&mut self, command: CMD) -> Result<CMD::ResponseParameters, Error>
    where
        CMD: Command<IdType = u8>,
        CMD::CommandParameters: ToByteArray<Error = Infallible>,
    {
        let mut frame = [0u8; MAX_CMD_LEN];
        let len = frame_command(command, &mut frame)?;

        let mut raw_response = <CMD::ResponseParameters as FromByteArray>::Array::new();
        if raw_response.as_ref().is_empty() {
            self.send_cmd(&frame[..len])?;
        } else {
            self.send_cmd_get_resp(&frame[..len], raw_response.as_mut())?;
        }

        CMD::ResponseParameters::from_bytes(raw_response).map_err(|_| Error::Deserialization)
    }

    /// Reads a property from the device.
    ///
    /// # Type Parameters
    /// * `R` - Property type with a `group << 8 | index` id
    pub fn get_property<R>(&mut self) -> Result<R, Error>
    where
        R: ReadableRegister<IdType = u16>,
    {
        let (group, index) = split_id(R::id());
        let mut raw_value = R::Array::new();
        let count = raw_value.as_ref().len() as u8;

        self.send_cmd_get_resp(&[GET_PROPERTY, group, count, index], raw_value.as_mut())?;

        R::from_bytes(raw_value).map_err(|_| Error::Deserialization)
    }

    /// Writes a property to the device.
    pub fn set_property<R>(&mut self, value: R) -> Result<(), Error>
    where
        R: WritableRegister<IdType = u16, Error = Infallible>,
    {
        let mut frame = [0u8; MAX_CMD_LEN];
        let len = frame_set_property(value, &mut frame)?;
        self.send_cmd(&frame[..len])
    }

    /// Reads the part information of the chip.
    pub fn part_info(&mut self) -> Result<PartInfo, Error> {
        self.execute_command(GetPartInfo)
    }
}

impl<SPI, CTS> Device<SPI, CTS>
where
    SPI: embedded_hal_async::spi::SpiDevice,
    CTS: ClearToSend,
{
    /// Asynchronously waits until the chip reports clear-to-send.
    ///
    /// This is the async version of [`poll_cts`](Device::poll_cts).
    pub async fn poll_cts_async(&mut self) -> Result<(), Error> {
        match self.sample_cts()? {
            Some(true) => {
                self.cts_went_high = true;
                Ok(())
            }
            Some(false) => Err(Error::CtsTimeout),
            None => self.get_resp_async(&mut []).await,
        }
    }

    /// Asynchronously reads the reply of the last command.
    ///
    /// This is the async version of [`get_resp`](Device::get_resp).
    pub async fn get_resp_async(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        if buf.len() > MAX_RESPONSE_LEN {
            return Err(Error::ResponseTooLong);
        }

        let mut response = [0u8; MAX_RESPONSE_LEN + 1];
        let len = buf.len() + 1;

        for _ in 0..self.config.cts_retries {
            self.spi
                .transaction(&mut [
                    embedded_hal_async::spi::Operation::Write(&[READ_CMD_BUFF]),
                    embedded_hal_async::spi::Operation::Read(&mut response[..len]),
                ])
                .await
                .map_err(|_| Error::Bus)?;

            if response[0] == CTS_READY {
                buf.copy_from_slice(&response[1..len]);
                self.cts_went_high = true;
                return Ok(());
            }
        }

        #[cfg(feature = "defmt")]
        defmt::warn!("ezradio: no CTS after {} polls", self.config.cts_retries);
        Err(Error::CtsTimeout)
    }

    /// Asynchronously sends a raw command frame.
    ///
    /// This is the async version of [`send_cmd`](Device::send_cmd).
    pub async fn send_cmd_async(&mut self, cmd: &[u8]) -> Result<(), Error> {
        if cmd.len() > MAX_CMD_LEN {
            return Err(Error::CommandTooLong);
        }
        if !self.cts_went_high {
            self.poll_cts_async().await?;
        }

        self.cts.clear();
        let result = self
            .spi
            .transaction(&mut [embedded_hal_async::spi::Operation::Write(cmd)])
            .await
            .map_err(|_| Error::Bus);
        self.cts_went_high = false;

        result
    }

    /// Asynchronously sends a raw command frame and reads its reply.
    ///
    /// This is the async version of [`send_cmd_get_resp`](Device::send_cmd_get_resp).
    pub async fn send_cmd_get_resp_async(
        &mut self,
        cmd: &[u8],
        resp: &mut [u8],
    ) -> Result<(), Error> {
        self.send_cmd_async(cmd).await?;
        self.get_resp_async(resp).await
    }

    /// Asynchronously writes `data` after a single command byte.
    ///
    /// This is the async version of [`write_data`](Device::write_data).
    pub async fn write_data_async(
        &mut self,
        cmd: u8,
        poll_cts: bool,
        data: &[u8],
    ) -> Result<(), Error> {
        if poll_cts && !self.cts_went_high {
            self.poll_cts_async().await?;
        }

        self.cts.clear();
        let result = self
            .spi
            .transaction(&mut [
                embedded_hal_async::spi::Operation::Write(&[cmd]),
                embedded_hal_async::spi::Operation::Write(data),
            ])
            .await
            .map_err(|_| Error::Bus);
        self.cts_went_high = false;

        result
    }

    /// Asynchronously reads bytes after a single command byte.
    ///
    /// This is the async version of [`read_data`](Device::read_data).
    pub async fn read_data_async(
        &mut self,
        cmd: u8,
        poll_cts: bool,
        buf: &mut [u8],
    ) -> Result<(), Error> {
        if poll_cts && !self.cts_went_high {
            self.poll_cts_async().await?;
        }

        self.cts.clear();
        let result = self
            .spi
            .transaction(&mut [
                embedded_hal_async::spi::Operation::Write(&[cmd]),
                embedded_hal_async::spi::Operation::Read(buf),
            ])
            .await
            .map_err(|_| Error::Bus);
        self.cts_went_high = false;

        result
    }

    /// Asynchronously executes a command on the device.
    ///
    /// This is the async version of [`execute_command`](Device::execute_command).
    pub async fn execute_command_async<CMD>(
        &mut self,
        command: CMD,
    ) -> Result<CMD::ResponseParameters, Error>
    where
        CMD: Command<IdType = u8>,
        CMD::CommandParameters: ToByteArray<Error = Infallible>,
    {
        let mut frame = [0u8; MAX_CMD_LEN];
        let len = frame_command(command, &mut frame)?;

        let mut raw_response = <CMD::ResponseParameters as FromByteArray>::Array::new();
        if raw_response.as_ref().is_empty() {
            self.send_cmd_async(&frame[..len]).await?;
        } else {
            self.send_cmd_get_resp_async(&frame[..len], raw_response.as_mut())
                .await?;
        }

        CMD::ResponseParameters::from_bytes(raw_response).map_err(|_| Error::Deserialization)
    }

    /// Asynchronously reads a property from the device.
    ///
    /// This is the async version of [`get_property`](Device::get_property).
    pub async fn get_property_async<R>(&mut self) -> Result<R, Error>
    where
        R: ReadableRegister<IdType = u16>,
    {
        let (group, index) = split_id(R::id());
        let mut raw_value = R::Array::new();
        let count = raw_value.as_ref().len() as u8;

        self.send_cmd_get_resp_async(&[GET_PROPERTY, group, count, index], raw_value.as_mut())
            .await?;

        R::from_bytes(raw_value).map_err(|_| Error::Deserialization)
    }

    /// Asynchronously writes a property to the device.
    ///
    /// This is the async version of [`set_property`](Device::set_property).
    pub async fn set_property_async<R>(&mut self, value: R) -> Result<(), Error>
    where
        R: WritableRegister<IdType = u16, Error = Infallible>,
    {
        let mut frame = [0u8; MAX_CMD_LEN];
        let len = frame_set_property(value, &mut frame)?;
        self.send_cmd_async(&frame[..len]).await
    }
}
