use log::trace;

use super::{CardBase, timeout_or};
use crate::constants::SdmmcCmd;
use crate::err::{SdmmcError, SdmmcResult};
use crate::host::{HostCmd, HostTransfer, ResponseType, SdmmcHostDevice};

/// Opcodes marking the first and last unit of an erase.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EraseCommands {
    pub start: u32,
    pub end: u32,
}

impl<D: SdmmcHostDevice> CardBase<D> {
    /// Issues START, END and ERASE for blocks `first..=last`.
    pub(crate) fn erase_range(&mut self, commands: EraseCommands, first: u32, last: u32) -> SdmmcResult {
        self.host
            .data0_release_wait()
            .map_err(|err| timeout_or(err, SdmmcError::WaitWriteCompleteFailed))?;

        let start = self.addressing.address(first)?;
        let end = self.addressing.address(last)?;
        trace!("erase {:#x}..={:#x}", start, end);

        let mut content = HostTransfer::new(HostCmd::new(commands.start, start, ResponseType::R1));
        self.host.transfer_r1(&mut content)?;

        let mut content = HostTransfer::new(HostCmd::new(commands.end, end, ResponseType::R1));
        self.host.transfer_r1(&mut content)?;

        let mut content = HostTransfer::new(HostCmd::new(
            SdmmcCmd::Erase as u32,
            0,
            ResponseType::R1b,
        ));
        self.host.transfer_r1(&mut content)
    }
}
