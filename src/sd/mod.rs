mod switch;

use bitflags::bitflags;
use log::{debug, error, info, warn};

use crate::card::cid::SdCid;
use crate::card::csd::{CsdFlags, SdCsd};
use crate::card::scr::{SdScr, SdSpecVersion};
use crate::card::{AddressingMode, BlockTransferMode, CardBase, EraseCommands, check_range};
use crate::constants::*;
use crate::err::{SdmmcError, SdmmcResult};
use crate::host::{
    HostBusWidth, HostCapabilityFlags, HostCmd, HostData, HostTransfer, ResponseType, SdmmcHost,
    SdmmcHostDevice,
};
use crate::tools::host_word;

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct SdCardFlags: u32 {
        const SUPPORT_HIGH_CAPACITY = 1 << 1;
        const SUPPORT_4BIT_WIDTH = 1 << 2;
        /// Answered SEND_IF_COND, i.e. a 2.0 card.
        const SUPPORT_SDHC = 1 << 3;
        const SUPPORT_SDXC = 1 << 4;
    }
}

/// ACMD6 argument selecting a 4-bit bus.
const SD_BUS_WIDTH_4BIT_ARG: u32 = 2;

pub struct SdCard<D: SdmmcHostDevice> {
    base: CardBase<D>,
    version: Option<SdSpecVersion>,
    flags: SdCardFlags,
    raw_scr: [u32; 2],
    cid: SdCid,
    csd: SdCsd,
    scr: SdScr,
    block_count: u32,
}

impl<D: SdmmcHostDevice> SdCard<D> {
    pub fn new(host: SdmmcHost<D>) -> Self {
        SdCard {
            base: CardBase::new(host),
            version: None,
            flags: SdCardFlags::empty(),
            raw_scr: [0; 2],
            cid: SdCid::default(),
            csd: SdCsd::default(),
            scr: SdScr::default(),
            block_count: 0,
        }
    }

    pub fn host(&self) -> &SdmmcHost<D> {
        &self.base.host
    }

    pub fn host_mut(&mut self) -> &mut SdmmcHost<D> {
        &mut self.base.host
    }

    pub fn flags(&self) -> SdCardFlags {
        self.flags
    }

    pub fn version(&self) -> Option<SdSpecVersion> {
        self.version
    }

    pub fn cid(&self) -> &SdCid {
        &self.cid
    }

    pub fn csd(&self) -> &SdCsd {
        &self.csd
    }

    pub fn scr(&self) -> &SdScr {
        &self.scr
    }

    pub fn raw_scr(&self) -> [u32; 2] {
        self.raw_scr
    }

    pub fn ocr(&self) -> u32 {
        self.base.ocr
    }

    pub fn relative_address(&self) -> u32 {
        self.base.relative_address
    }

    pub fn bus_clock_hz(&self) -> u32 {
        self.base.bus_clock_hz
    }

    pub fn addressing(&self) -> AddressingMode {
        self.base.addressing
    }

    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    pub fn block_size(&self) -> u32 {
        self.base.block_size()
    }

    /// Erase granularity in blocks.
    pub fn erase_sector_blocks(&self) -> u32 {
        self.csd.erase_sector_size as u32 + 1
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.block_count as u64 * self.base.block_size as u64
    }

    /// Forgets everything learned from the previous card.
    fn reset_card_state(&mut self) {
        self.version = None;
        self.flags = SdCardFlags::empty();
        self.raw_scr = [0; 2];
        self.cid = SdCid::default();
        self.csd = SdCsd::default();
        self.scr = SdScr::default();
        self.block_count = 0;
        self.base.reset_card_state();
    }

    /// Brings the card from power-up to the transfer state.
    pub fn init(&mut self) -> SdmmcResult {
        info!("SD card init");

        if self.base.host.config().card_detect_dat3 {
            return Err(SdmmcError::NotSupportYet);
        }
        self.reset_card_state();

        self.base.set_bus_clock(SDMMC_CLOCK_400KHZ);
        self.base.host.dev.set_card_active(SDMMC_CARD_ACTIVE_TIMEOUT_US);

        self.base
            .host
            .go_idle()
            .map_err(|_| SdmmcError::GoIdleFailed)?;

        let capability = self.base.host.capability_refresh();
        let mut argument = SdOcrFlag::empty();
        if capability.supports(HostCapabilityFlags::SUPPORT_V330) {
            argument |= SdOcrFlag::VDD_32_33 | SdOcrFlag::VDD_33_34;
        }
        if capability.supports(HostCapabilityFlags::SUPPORT_V300) {
            argument |= SdOcrFlag::VDD_29_30;
        }

        match self.send_interface_condition() {
            Ok(()) => {
                argument |= SdOcrFlag::CARD_CAPACITY_SUPPORT;
                self.flags |= SdCardFlags::SUPPORT_SDHC;
            }
            Err(err) => {
                debug!("no answer to SEND_IF_COND ({}), legacy card", err);
                self.base
                    .host
                    .go_idle()
                    .map_err(|_| SdmmcError::GoIdleFailed)?;
            }
        }

        self.application_send_operation_condition(argument.bits())?;

        let raw_cid = self
            .base
            .all_send_cid()
            .map_err(|_| SdmmcError::AllSendCidFailed)?;
        self.cid = SdCid::decode(&raw_cid);

        self.send_relative_address()
            .map_err(|_| SdmmcError::SendRelativeAddressFailed)?;

        self.send_csd().map_err(|_| SdmmcError::SendCsdFailed)?;

        self.base
            .select(true)
            .map_err(|_| SdmmcError::SelectCardFailed)?;

        self.send_scr().map_err(|_| SdmmcError::SendScrFailed)?;

        self.base.set_bus_clock(SD_CLOCK_25MHZ);

        if capability.supports(HostCapabilityFlags::SUPPORT_4BIT)
            && self.flags.contains(SdCardFlags::SUPPORT_4BIT_WIDTH)
        {
            self.set_data_bus_width_4bit()
                .map_err(|_| SdmmcError::SetDataBusWidthFailed)?;
            self.base.host.bus_width_set(HostBusWidth::FourBit);
        }

        if capability.supports(HostCapabilityFlags::SUPPORT_HIGH_SPEED) {
            match self.switch_high_speed() {
                Ok(()) => self.base.set_bus_clock(SD_CLOCK_50MHZ),
                Err(SdmmcError::CardNotSupport) => {
                    warn!("SD card without high speed, staying at {} Hz", self.base.bus_clock_hz);
                }
                Err(err) => {
                    error!("SD high speed switch failed: {}", err);
                    return Err(SdmmcError::SwitchHighSpeedFailed);
                }
            }
        }

        self.base
            .host
            .block_size_set(SDMMC_DEFAULT_BLOCK_SIZE)
            .map_err(|_| SdmmcError::SetCardBlockSizeFailed)?;

        info!(
            "SD card ready: {} blocks of {} bytes, rca {:#x}, {} Hz",
            self.block_count, self.base.block_size, self.base.relative_address, self.base.bus_clock_hz
        );
        Ok(())
    }

    /// Puts the card back to the stand-by state.
    pub fn deinit(&mut self) -> SdmmcResult {
        self.base.select(false)
    }

    pub fn wait_write_complete(&mut self) -> SdmmcResult {
        self.base.wait_write_complete()
    }

    pub fn check_read_only(&self) -> bool {
        self.csd
            .flags
            .intersects(CsdFlags::PERMANENT_WRITE_PROTECT | CsdFlags::TEMPORARY_WRITE_PROTECT)
    }

    pub fn read_blocks(&mut self, buffer: &mut [u8], start_block: u32, block_count: u32) -> SdmmcResult {
        check_range(start_block, block_count, self.block_count)?;
        self.base
            .read_blocks(buffer, start_block, block_count, BlockTransferMode::default())
    }

    pub fn write_blocks(&mut self, buffer: &[u8], start_block: u32, block_count: u32) -> SdmmcResult {
        check_range(start_block, block_count, self.block_count)?;
        self.base
            .write_blocks(buffer, start_block, block_count, BlockTransferMode::default())
    }

    /// Erases in chunks of one erase sector.
    pub fn erase_blocks(&mut self, start_block: u32, block_count: u32) -> SdmmcResult {
        check_range(start_block, block_count, self.block_count)?;

        let commands = EraseCommands {
            start: SdCmd::EraseWriteBlockStart as u32,
            end: SdCmd::EraseWriteBlockEnd as u32,
        };
        let sector_blocks = self.erase_sector_blocks();

        let mut block = start_block;
        let mut left = block_count;
        while left > 0 {
            let blocks = left.min(sector_blocks);
            self.base.erase_range(commands, block, block + blocks - 1)?;
            block += blocks;
            left -= blocks;
        }
        Ok(())
    }

    fn send_interface_condition(&mut self) -> SdmmcResult {
        let mut content = HostTransfer::new(HostCmd::new(
            SdCmd::SendInterfaceCondition as u32,
            SD_INTERFACE_CONDITION_ARG,
            ResponseType::R7,
        ));
        self.base.host.transfer(&mut content)?;

        if content.cmd.response[0] & 0xFF != SD_INTERFACE_CONDITION_ECHO {
            return Err(SdmmcError::CardNotSupport);
        }
        Ok(())
    }

    /// ACMD41 until the card reports the end of its power-up.
    fn application_send_operation_condition(&mut self, argument: u32) -> SdmmcResult {
        for _ in 0..self.base.host.config().voltage_retries {
            self.base
                .send_application_command()
                .map_err(|_| SdmmcError::SendApplicationCommandFailed)?;

            let mut content = HostTransfer::new(HostCmd::new(
                SdAppCmd::SendOperationCondition as u32,
                argument,
                ResponseType::R3,
            ));
            self.base
                .host
                .transfer(&mut content)
                .map_err(|_| SdmmcError::HandShakeOperationConditionFailed)?;

            let ocr = SdOcrFlag::from_bits_retain(content.cmd.response[0]);
            if ocr.contains(SdOcrFlag::POWER_UP_BUSY) {
                if ocr.contains(SdOcrFlag::CARD_CAPACITY_SUPPORT) {
                    self.flags |= SdCardFlags::SUPPORT_HIGH_CAPACITY;
                }
                self.base.ocr = ocr.bits();
                self.base.addressing = AddressingMode::from_high_capacity(
                    self.flags.contains(SdCardFlags::SUPPORT_HIGH_CAPACITY),
                );
                debug!("SD OCR {:#x}, addressing {:?}", self.base.ocr, self.base.addressing);
                return Ok(());
            }
            self.base.host.dev.delay_us(self.base.host.config().busy_poll_interval_us);
        }

        error!("SD card stays busy after ACMD41");
        Err(SdmmcError::Timeout)
    }

    fn send_relative_address(&mut self) -> SdmmcResult {
        let mut content = HostTransfer::new(HostCmd::new(
            SdCmd::SendRelativeAddress as u32,
            0,
            ResponseType::R6,
        ));
        self.base.host.transfer(&mut content)?;

        self.base.relative_address = content.cmd.response[0] >> 16;
        debug!("SD rca {:#x}", self.base.relative_address);
        Ok(())
    }

    fn send_csd(&mut self) -> SdmmcResult {
        let raw = self.base.send_csd()?;
        self.csd = SdCsd::decode(&raw);

        let geometry = self.csd.geometry()?;
        self.block_count = geometry.block_count;
        self.base.block_size = geometry.block_size;
        if self.csd.is_sdxc() {
            self.flags |= SdCardFlags::SUPPORT_SDXC;
        }
        debug!(
            "SD CSD v{}: {} blocks, ccc {:?}",
            self.csd.csd_structure + 1,
            self.block_count,
            self.csd.card_command_classes
        );
        Ok(())
    }

    fn send_scr(&mut self) -> SdmmcResult {
        self.base
            .send_application_command()
            .map_err(|_| SdmmcError::SendApplicationCommandFailed)?;

        let mut raw = [0u8; SD_SCR_BYTES];
        let data = HostData::read(SD_SCR_BYTES as u32, 1, &mut raw);
        let mut content = HostTransfer::with_data(
            HostCmd::new(SdAppCmd::SendScr as u32, 0, ResponseType::R1),
            data,
        );
        self.base.host.transfer_r1(&mut content)?;

        let mode = self.base.host.endian_mode();
        self.raw_scr = [
            mode.msb_first(host_word(&raw, 0)?),
            mode.msb_first(host_word(&raw, 1)?),
        ];
        self.scr = SdScr::decode(&self.raw_scr);
        self.version = self.scr.version();
        if self.scr.supports_4bit() {
            self.flags |= SdCardFlags::SUPPORT_4BIT_WIDTH;
        }
        debug!("SD SCR {:#x?}, version {:?}", self.raw_scr, self.version);
        Ok(())
    }

    fn set_data_bus_width_4bit(&mut self) -> SdmmcResult {
        self.base
            .send_application_command()
            .map_err(|_| SdmmcError::SendApplicationCommandFailed)?;

        let mut content = HostTransfer::new(HostCmd::new(
            SdAppCmd::SetBusWidth as u32,
            SD_BUS_WIDTH_4BIT_ARG,
            ResponseType::R1,
        ));
        self.base.host.transfer_r1(&mut content)
    }
}
