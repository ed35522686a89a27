mod block;
mod erase;

pub mod cid;
pub mod csd;
pub mod ext_csd;
pub mod scr;

pub(crate) use block::{BlockTransferMode, check_range};
pub(crate) use erase::EraseCommands;

use crate::constants::{SDMMC_DEFAULT_BLOCK_SIZE, SdmmcCmd};
use crate::err::{SdmmcError, SdmmcResult};
use crate::host::{HostCmd, HostTransfer, ResponseType, SdmmcHost, SdmmcHostDevice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardType {
    Sd,
    Mmc,
}

/// How a block index is put on the wire, fixed once the capacity class is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressingMode {
    /// Standard capacity: byte offset.
    #[default]
    Byte,
    /// High capacity: block index.
    Block,
}

impl AddressingMode {
    pub fn from_high_capacity(high_capacity: bool) -> Self {
        if high_capacity {
            AddressingMode::Block
        } else {
            AddressingMode::Byte
        }
    }

    /// Wire argument for `block`. `InvalidArgument` when the byte offset
    /// does not fit the 32-bit argument.
    #[inline]
    pub fn address(self, block: u32) -> SdmmcResult<u32> {
        match self {
            AddressingMode::Byte => block
                .checked_mul(SDMMC_DEFAULT_BLOCK_SIZE)
                .ok_or(SdmmcError::InvalidArgument),
            AddressingMode::Block => Ok(block),
        }
    }
}

/// State shared by SD and MMC cards.
pub struct CardBase<D: SdmmcHostDevice> {
    pub host: SdmmcHost<D>,
    pub bus_clock_hz: u32,
    pub relative_address: u32,
    pub ocr: u32,
    pub block_size: u32,
    pub addressing: AddressingMode,
    pub raw_cid: [u32; 4],
    pub raw_csd: [u32; 4],
}

impl<D: SdmmcHostDevice> CardBase<D> {
    pub fn new(host: SdmmcHost<D>) -> Self {
        CardBase {
            host,
            bus_clock_hz: 0,
            relative_address: 0,
            ocr: 0,
            block_size: 0,
            addressing: AddressingMode::default(),
            raw_cid: [0; 4],
            raw_csd: [0; 4],
        }
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Clears the identity of the previous card. The host is left alone.
    pub(crate) fn reset_card_state(&mut self) {
        self.relative_address = 0;
        self.ocr = 0;
        self.block_size = 0;
        self.addressing = AddressingMode::default();
        self.raw_cid = [0; 4];
        self.raw_csd = [0; 4];
    }

    pub fn set_bus_clock(&mut self, bus_clock_hz: u32) {
        self.bus_clock_hz = self.host.clock_set(bus_clock_hz);
    }

    pub fn select(&mut self, is_selected: bool) -> SdmmcResult {
        self.host.card_select(self.relative_address, is_selected)
    }

    /// Waits for the card to leave the programming state.
    pub fn wait_write_complete(&mut self) -> SdmmcResult {
        self.host
            .write_complete_wait(self.relative_address)
            .map_err(|err| timeout_or(err, SdmmcError::WaitWriteCompleteFailed))
    }

    pub fn send_application_command(&mut self) -> SdmmcResult {
        self.host.application_command_send(self.relative_address)
    }

    /// ALL_SEND_CID, keeps the raw register.
    pub(crate) fn all_send_cid(&mut self) -> SdmmcResult<[u32; 4]> {
        let mut content = HostTransfer::new(HostCmd::new(
            SdmmcCmd::AllSendCid as u32,
            0,
            ResponseType::R2,
        ));
        self.host.transfer(&mut content)?;
        self.raw_cid = content.cmd.response;
        Ok(self.raw_cid)
    }

    /// SEND_CSD to the addressed card, keeps the raw register.
    pub(crate) fn send_csd(&mut self) -> SdmmcResult<[u32; 4]> {
        let mut content = HostTransfer::new(HostCmd::new(
            SdmmcCmd::SendCsd as u32,
            self.relative_address << 16,
            ResponseType::R2,
        ));
        self.host.transfer(&mut content)?;
        self.raw_csd = content.cmd.response;
        Ok(self.raw_csd)
    }
}

/// Keeps `Timeout` visible, folds anything else into `err`.
pub(crate) fn timeout_or(cause: SdmmcError, err: SdmmcError) -> SdmmcError {
    match cause {
        SdmmcError::Timeout => SdmmcError::Timeout,
        _ => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_per_mode() {
        for block in [0u32, 1, 7, 0x3F_FFFF, 0x7F_FFFF] {
            assert_eq!(AddressingMode::Block.address(block), Ok(block));
            assert_eq!(AddressingMode::Byte.address(block), Ok(block * 512));
        }
        assert_eq!(AddressingMode::Block.address(u32::MAX), Ok(u32::MAX));
        assert_eq!(AddressingMode::Byte.address(0x80_0000), Err(SdmmcError::InvalidArgument));
        assert_eq!(AddressingMode::Byte.address(u32::MAX), Err(SdmmcError::InvalidArgument));
        assert_eq!(AddressingMode::from_high_capacity(true), AddressingMode::Block);
        assert_eq!(AddressingMode::from_high_capacity(false), AddressingMode::Byte);
    }
}
