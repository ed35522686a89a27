use log::debug;

use super::SdCard;
use crate::card::csd::CardCmdClass;
use crate::constants::{SD_SWITCH_STATUS_BYTES, SdCmd};
use crate::err::{SdmmcError, SdmmcResult};
use crate::host::{HostCmd, HostData, HostTransfer, ResponseType, SdmmcHostDevice};
use crate::tools::host_word;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchMode {
    Check = 0,
    Set = 1,
}

/// Function group 1, access mode.
const ACCESS_MODE_GROUP: u32 = 0;
const HIGH_SPEED_FUNCTION: u32 = 1;
/// Selection nibble reported for a function the card cannot switch to.
const FUNCTION_NOT_SUPPORTED: u32 = 0xF;

/// Group 1 support bits, in bits 23:16 of status word 3 (MSB first).
fn group1_supports(status_word3: u32, function: u32) -> bool {
    status_word3 & (1 << (16 + function)) != 0
}

/// Group 1 selection, the low nibble of status byte 16.
fn group1_selection(status_word4: u32) -> u32 {
    (status_word4 >> 24) & 0xF
}

impl<D: SdmmcHostDevice> SdCard<D> {
    /// CMD6 with a 64 byte status read.
    pub(crate) fn switch_function(
        &mut self,
        mode: SwitchMode,
        group: u32,
        number: u32,
        status: &mut [u8; SD_SWITCH_STATUS_BYTES],
    ) -> SdmmcResult {
        self.base
            .host
            .block_size_set(SD_SWITCH_STATUS_BYTES as u32)
            .map_err(|_| SdmmcError::SetCardBlockSizeFailed)?;

        let mut argument = ((mode as u32) << 31) | 0x00FF_FFFF;
        argument &= !(0xF << (group * 4));
        argument |= number << (group * 4);

        let data = HostData::read(SD_SWITCH_STATUS_BYTES as u32, 1, status);
        let mut content = HostTransfer::with_data(
            HostCmd::new(SdCmd::Switch as u32, argument, ResponseType::R1),
            data,
        );
        self.base.host.transfer_r1(&mut content)
    }

    /// Status words 3 and 4, MSB first.
    fn switch_status_words(&self, status: &[u8; SD_SWITCH_STATUS_BYTES]) -> SdmmcResult<(u32, u32)> {
        let mode = self.base.host.endian_mode();
        Ok((
            mode.msb_first(host_word(status, 3)?),
            mode.msb_first(host_word(status, 4)?),
        ))
    }

    /// Moves the card to the 50 MHz access mode. `CardNotSupport` when it has none.
    pub(crate) fn switch_high_speed(&mut self) -> SdmmcResult {
        if self.version.is_none() || !self.csd.card_command_classes.contains(CardCmdClass::SWITCH) {
            return Err(SdmmcError::CardNotSupport);
        }

        let mut status = [0u8; SD_SWITCH_STATUS_BYTES];
        self.switch_function(SwitchMode::Check, ACCESS_MODE_GROUP, HIGH_SPEED_FUNCTION, &mut status)
            .map_err(|_| SdmmcError::SwitchFailed)?;

        let (support, selection) = self.switch_status_words(&status)?;
        if !group1_supports(support, HIGH_SPEED_FUNCTION)
            || group1_selection(selection) == FUNCTION_NOT_SUPPORTED
        {
            debug!("high speed not offered: support {:#x}, selection {:#x}", support, selection);
            return Err(SdmmcError::CardNotSupport);
        }

        self.switch_function(SwitchMode::Set, ACCESS_MODE_GROUP, HIGH_SPEED_FUNCTION, &mut status)
            .map_err(|_| SdmmcError::SwitchFailed)?;

        let (_, selection) = self.switch_status_words(&status)?;
        if group1_selection(selection) != HIGH_SPEED_FUNCTION {
            debug!("high speed switch refused: selection {:#x}", selection);
            return Err(SdmmcError::CardNotSupport);
        }

        Ok(())
    }
}
