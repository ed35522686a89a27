mod caps;
mod config;
mod transfer;

pub use caps::{HostBusWidth, HostCapability, HostCapabilityFlags};
pub use config::{EndianMode, HostConfig};
pub use transfer::{CommandType, DataBuffer, HostCmd, HostData, HostTransfer, ResponseType};

use log::{debug, trace};

use crate::constants::*;
use crate::err::{HostStatus, SdmmcError, SdmmcResult};

/// Controller driver the card layer runs on.
///
/// Every call is synchronous. R2 responses are delivered with word 0
/// holding register bits 31:0 and word 3 holding bits 127:96.
pub trait SdmmcHostDevice {
    /// Runs a command and its data phase to completion, filling `content.cmd.response`.
    fn transfer_function(&mut self, content: &mut HostTransfer<'_>) -> HostStatus;

    fn capability(&self) -> HostCapability;

    /// Programs the card clock and returns the frequency actually reached.
    fn set_bus_clock(&mut self, source_clock_hz: u32, bus_clock_hz: u32) -> u32;

    fn set_bus_width(&mut self, width: HostBusWidth);

    /// Sends the 80 initialization clocks.
    fn set_card_active(&mut self, timeout_us: u32) -> bool;

    /// Level of DAT0, low while the card is busy programming.
    fn data0_level(&self) -> bool;

    fn delay_us(&mut self, _us: u32) {}
}

pub struct SdmmcHost<D: SdmmcHostDevice> {
    pub(crate) dev: D,
    pub(crate) config: HostConfig,
    pub(crate) source_clock_hz: u32,
    pub(crate) capability: HostCapability,
}

impl<D: SdmmcHostDevice> SdmmcHost<D> {
    pub fn new(dev: D, config: HostConfig, source_clock_hz: u32) -> Self {
        SdmmcHost {
            dev,
            config,
            source_clock_hz,
            capability: HostCapability::empty(),
        }
    }

    pub fn dev(&self) -> &D {
        &self.dev
    }

    pub fn dev_mut(&mut self) -> &mut D {
        &mut self.dev
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn capability(&self) -> &HostCapability {
        &self.capability
    }

    pub fn source_clock_hz(&self) -> u32 {
        self.source_clock_hz
    }

    pub fn endian_mode(&self) -> EndianMode {
        self.config.endian_mode
    }

    pub(crate) fn capability_refresh(&mut self) -> HostCapability {
        self.capability = self.dev.capability();
        debug!(
            "host capability: max block length {}, max block count {}, flags {:?}",
            self.capability.max_block_length, self.capability.max_block_count, self.capability.flags
        );
        self.capability
    }

    pub(crate) fn clock_set(&mut self, bus_clock_hz: u32) -> u32 {
        let actual = self.dev.set_bus_clock(self.source_clock_hz, bus_clock_hz);
        debug!("bus clock: requested {} Hz, got {} Hz", bus_clock_hz, actual);
        actual
    }

    pub(crate) fn bus_width_set(&mut self, width: HostBusWidth) {
        debug!("host bus width: {:?}", width);
        self.dev.set_bus_width(width);
    }

    /// Runs a transfer, mapping any host failure to `TransferFailed`.
    pub fn transfer(&mut self, content: &mut HostTransfer<'_>) -> SdmmcResult {
        trace!(
            "cmd{} arg {:#x} {:?}",
            content.cmd.index, content.cmd.argument, content.cmd.response_type
        );
        self.dev.transfer_function(content).map_err(|err| {
            debug!("cmd{} failed: {}", content.cmd.index, err);
            SdmmcError::TransferFailed
        })
    }

    /// Runs a transfer and rejects an R1 carrying any error bit.
    pub fn transfer_r1(&mut self, content: &mut HostTransfer<'_>) -> SdmmcResult {
        self.transfer(content)?;
        if content.cmd.r1() & CardStatusFlag::ALL_ERROR_FLAG.bits() != 0 {
            debug!("cmd{} status error: {:#x}", content.cmd.index, content.cmd.r1());
            return Err(SdmmcError::TransferFailed);
        }
        Ok(())
    }

    pub fn card_select(&mut self, relative_address: u32, is_selected: bool) -> SdmmcResult {
        let command = if is_selected {
            HostCmd::new(
                SdmmcCmd::SelectCard as u32,
                relative_address << 16,
                ResponseType::R1,
            )
        } else {
            HostCmd::new(SdmmcCmd::SelectCard as u32, 0, ResponseType::None)
        };

        let mut content = HostTransfer::new(command);
        self.transfer_r1(&mut content)
    }

    /// Polls SEND_STATUS until the card is ready for data and out of the programming state.
    pub fn write_complete_wait(&mut self, relative_address: u32) -> SdmmcResult {
        for _ in 0..self.config.busy_poll_retries {
            let mut content = HostTransfer::new(HostCmd::new(
                SdmmcCmd::SendStatus as u32,
                relative_address << 16,
                ResponseType::R1,
            ));
            self.transfer_r1(&mut content)?;

            let status = content.cmd.r1();
            if status & CardStatusFlag::READY_FOR_DATA.bits() != 0
                && CardState::from_r1(status) != CardState::Program
            {
                return Ok(());
            }
            self.dev.delay_us(self.config.busy_poll_interval_us);
        }

        Err(SdmmcError::Timeout)
    }

    pub fn application_command_send(&mut self, relative_address: u32) -> SdmmcResult {
        let mut content = HostTransfer::new(HostCmd::new(
            SdmmcCmd::ApplicationCommand as u32,
            relative_address << 16,
            ResponseType::R1,
        ));
        self.transfer_r1(&mut content)?;

        if content.cmd.r1() & CardStatusFlag::APPLICATION_COMMAND.bits() == 0 {
            return Err(SdmmcError::CardNotSupport);
        }

        Ok(())
    }

    pub fn block_count_set(&mut self, block_count: u32) -> SdmmcResult {
        let mut content = HostTransfer::new(HostCmd::new(
            SdmmcCmd::SetBlockCount as u32,
            block_count,
            ResponseType::R1,
        ));
        self.transfer_r1(&mut content)
    }

    pub fn go_idle(&mut self) -> SdmmcResult {
        let mut content = HostTransfer::new(HostCmd::new(
            SdmmcCmd::GoIdleState as u32,
            0,
            ResponseType::None,
        ));
        self.transfer(&mut content)
    }

    pub fn stop_transmission(&mut self) -> SdmmcResult {
        let command = HostCmd::new(SdmmcCmd::StopTransmission as u32, 0, ResponseType::R1b)
            .with_type(CommandType::Abort);
        let mut content = HostTransfer::new(command);
        self.transfer_r1(&mut content)
    }

    pub fn block_size_set(&mut self, block_size: u32) -> SdmmcResult {
        let mut content = HostTransfer::new(HostCmd::new(
            SdmmcCmd::SetBlockLength as u32,
            block_size,
            ResponseType::R1,
        ));
        self.transfer_r1(&mut content)
    }

    /// Waits for DAT0 to go high, i.e. the card buffer has room for more data.
    pub fn data0_release_wait(&mut self) -> SdmmcResult {
        for _ in 0..self.config.busy_poll_retries {
            if self.dev.data0_level() {
                return Ok(());
            }
            self.dev.delay_us(self.config.busy_poll_interval_us);
        }

        Err(SdmmcError::Timeout)
    }
}
