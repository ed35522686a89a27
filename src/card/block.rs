use log::trace;

use super::{CardBase, timeout_or};
use crate::constants::*;
use crate::err::{SdmmcError, SdmmcResult};
use crate::host::{HostCmd, HostData, HostTransfer, ResponseType, SdmmcHostDevice};

/// Checks `[start, start + count)` against a card or partition of `limit` blocks.
pub(crate) fn check_range(start: u32, count: u32, limit: u32) -> SdmmcResult {
    if count == 0 {
        return Err(SdmmcError::InvalidArgument);
    }
    match start.checked_add(count) {
        Some(end) if end <= limit => Ok(()),
        _ => Err(SdmmcError::InvalidArgument),
    }
}

/// Options of a block transfer that depend on the card family.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BlockTransferMode {
    /// Announce the length with SET_BLOCK_COUNT instead of ending with STOP_TRANSMISSION.
    pub pre_defined_count: bool,
}

impl<D: SdmmcHostDevice> CardBase<D> {
    fn block_transfer_check(&self, buffer_len: usize, count: u32) -> SdmmcResult<usize> {
        let block_size = self.block_size;
        if block_size > self.host.capability().max_block_length {
            return Err(SdmmcError::CardNotSupport);
        }

        let needed = count as usize * block_size as usize;
        if count == 0 || buffer_len < needed {
            return Err(SdmmcError::InvalidArgument);
        }

        Ok(self.host.capability().max_block_count.max(1) as usize)
    }

    fn multiple_block_prologue(&mut self, count: u32, mode: BlockTransferMode) -> SdmmcResult<bool> {
        let use_block_count = count > 1 && mode.pre_defined_count && !self.host.config().enable_auto_command12;
        if use_block_count {
            self.host
                .block_count_set(count)
                .map_err(|_| SdmmcError::SetBlockCountFailed)?;
        }
        Ok(use_block_count)
    }

    fn multiple_block_epilogue(&mut self, count: u32, block_count_sent: bool) -> SdmmcResult {
        if count > 1 && !block_count_sent && !self.host.config().enable_auto_command12 {
            self.host
                .stop_transmission()
                .map_err(|_| SdmmcError::StopTransmissionFailed)?;
        }
        Ok(())
    }

    fn read_once(&mut self, buffer: &mut [u8], block: u32, count: u32, mode: BlockTransferMode) -> SdmmcResult {
        // Reads and writes share one card buffer.
        self.wait_write_complete()?;

        let block_count_sent = self.multiple_block_prologue(count, mode)?;

        let index = if count == 1 {
            SdmmcCmd::ReadSingleBlock
        } else {
            SdmmcCmd::ReadMultipleBlock
        };
        let argument = self.addressing.address(block)?;
        trace!("read {} block(s) at {:#x}", count, argument);

        let mut data = HostData::read(self.block_size, count, buffer);
        data.enable_auto_command12 = self.host.config().enable_auto_command12;
        let mut content =
            HostTransfer::with_data(HostCmd::new(index as u32, argument, ResponseType::R1), data);
        self.host.transfer_r1(&mut content)?;

        self.multiple_block_epilogue(count, block_count_sent)
    }

    fn write_once(&mut self, buffer: &[u8], block: u32, count: u32, mode: BlockTransferMode) -> SdmmcResult {
        self.host
            .data0_release_wait()
            .map_err(|err| timeout_or(err, SdmmcError::WaitWriteCompleteFailed))?;

        let block_count_sent = self.multiple_block_prologue(count, mode)?;

        let index = if count == 1 {
            SdmmcCmd::WriteSingleBlock
        } else {
            SdmmcCmd::WriteMultipleBlock
        };
        let argument = self.addressing.address(block)?;
        trace!("write {} block(s) at {:#x}", count, argument);

        let mut data = HostData::write(self.block_size, count, buffer);
        data.enable_auto_command12 = self.host.config().enable_auto_command12;
        let mut content =
            HostTransfer::with_data(HostCmd::new(index as u32, argument, ResponseType::R1), data);
        self.host.transfer_r1(&mut content)?;

        self.multiple_block_epilogue(count, block_count_sent)
    }

    /// Reads `count` blocks from `start`, split into sub-transfers of at most
    /// `max_block_count` blocks. The caller has checked the range.
    pub(crate) fn read_blocks(
        &mut self,
        buffer: &mut [u8],
        start: u32,
        count: u32,
        mode: BlockTransferMode,
    ) -> SdmmcResult {
        let per_transfer = self.block_transfer_check(buffer.len(), count)?;
        let block_size = self.block_size as usize;

        let mut block = start;
        let total = count as usize * block_size;
        for chunk in buffer[..total].chunks_mut(per_transfer * block_size) {
            let blocks = (chunk.len() / block_size) as u32;
            self.read_once(chunk, block, blocks, mode)?;
            block += blocks;
        }
        Ok(())
    }

    pub(crate) fn write_blocks(
        &mut self,
        buffer: &[u8],
        start: u32,
        count: u32,
        mode: BlockTransferMode,
    ) -> SdmmcResult {
        let per_transfer = self.block_transfer_check(buffer.len(), count)?;
        let block_size = self.block_size as usize;

        let mut block = start;
        let total = count as usize * block_size;
        for chunk in buffer[..total].chunks(per_transfer * block_size) {
            let blocks = (chunk.len() / block_size) as u32;
            self.write_once(chunk, block, blocks, mode)?;
            block += blocks;
        }
        Ok(())
    }
}
