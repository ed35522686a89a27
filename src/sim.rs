//! Simulated SD/MMC card behind a host controller, for tests.
//!
//! Data phases are modelled on the wire: the bytes handed to the card layer
//! are the bus bytes rearranged the way the configured endian mode packs them.

use alloc::vec;
use alloc::vec::Vec;
use core::cell::Cell;

use crate::card::cid::{
    MMC_CID_MANUFACTURER_ID, MMC_CID_PRODUCT_NAME, MMC_CID_SERIAL_NUMBER, SD_CID_MANUFACTURER_ID,
    SD_CID_PRODUCT_NAME, SD_CID_SERIAL_NUMBER,
};
use crate::card::csd::{
    CSD_C_SIZE, CSD_C_SIZE_MULT, CSD_CCC, CSD_READ_BL_LEN, CSD_STRUCTURE, CSD_TRAN_SPEED,
    MMC_CSD_C_SIZE_HIGH_CAPACITY, MMC_CSD_ERASE_GRP_MULT, MMC_CSD_ERASE_GRP_SIZE, MMC_CSD_SPEC_VERS,
    SD_CSD_SECTOR_SIZE, SD_CSD_V2_C_SIZE,
};
use crate::card::ext_csd::{
    BOOT_INFO_ALT_BOOT, CARD_TYPE_HS_26MHZ, CARD_TYPE_HS_52MHZ, index,
};
use crate::constants::*;
use crate::err::{HostError, HostStatus};
use crate::host::{
    CommandType, DataBuffer, EndianMode, HostBusWidth, HostCapability, HostCapabilityFlags,
    HostTransfer, ResponseType, SdmmcHostDevice,
};
use crate::regs::reg_to_words;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimCardKind {
    /// Legacy card, silent on SEND_IF_COND, byte addressed.
    SdStandardCapacity,
    SdHighCapacity,
    /// Sector addressed eMMC with two boot partitions.
    Mmc,
}

/// One command as seen on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimCommand {
    pub index: u32,
    pub argument: u32,
    pub response_type: ResponseType,
    pub cmd_type: CommandType,
    pub is_application: bool,
    /// Blocks of the data phase, 0 without one.
    pub block_count: u32,
}

const SD_RELATIVE_ADDRESS: u32 = 0xB368;
const SD_CARD_BLOCKS: u32 = 1024;
const MMC_USER_BLOCKS: u32 = 4096;
/// BOOT_SIZE_MULT of the simulated eMMC, 256 KiB per boot partition.
const MMC_BOOT_SIZE_MULT: u8 = 2;
const MMC_BOOT_BLOCKS: u32 = MMC_BOOT_SIZE_MULT as u32 * 128 * 1024 / 512;
const OCR_VOLTAGE_WINDOW: u32 = 0x00FF_8000;
const BUS_TEST_BYTES: usize = 8;

pub struct SimCard {
    kind: SimCardKind,
    capability: HostCapability,
    endian_mode: EndianMode,
    commands: Vec<SimCommand>,

    raw_cid: [u32; 4],
    raw_csd: [u32; 4],
    raw_scr: [u32; 2],
    ext_csd: [u8; MMC_EXTENDED_CSD_BYTES],
    storage: Vec<u8>,

    relative_address: u32,
    selected: bool,
    application_command: bool,
    power_up_polls: u32,
    power_up_left: u32,
    busy_polls: u32,
    busy_left: u32,
    data0_busy_left: Cell<u32>,
    status_errors: Vec<(u32, u32)>,
    failing_commands: Vec<u32>,

    block_length: u32,
    block_count: u32,
    bus_clock_hz: u32,
    bus_width: HostBusWidth,
    wired_width: HostBusWidth,
    bus_test_sent: [u8; BUS_TEST_BYTES],
    sd_high_speed_supported: bool,
    sd_high_speed: bool,
    erase_start: Option<u32>,
    erase_end: Option<u32>,
    erases: Vec<(u32, u32)>,
}

fn line_count(width: HostBusWidth) -> u32 {
    match width {
        HostBusWidth::OneBit => 1,
        HostBusWidth::FourBit => 4,
        HostBusWidth::EightBit => 8,
    }
}

fn sd_cid() -> [u32; 4] {
    let mut reg = 0u128;
    reg = SD_CID_MANUFACTURER_ID.write(reg, 0x03);
    reg = SD_CID_PRODUCT_NAME.write_bytes(reg, b"SU08G");
    reg = SD_CID_SERIAL_NUMBER.write(reg, 0x1234_ABCD);
    reg_to_words(reg)
}

fn mmc_cid() -> [u32; 4] {
    let mut reg = 0u128;
    reg = MMC_CID_MANUFACTURER_ID.write(reg, 0x15);
    reg = MMC_CID_PRODUCT_NAME.write_bytes(reg, b"8GTF4R");
    reg = MMC_CID_SERIAL_NUMBER.write(reg, 0x0BAD_CAFE);
    reg_to_words(reg)
}

fn sd_csd(kind: SimCardKind) -> [u32; 4] {
    let mut reg = 0u128;
    reg = CSD_TRAN_SPEED.write(reg, 0x32);
    reg = CSD_CCC.write(reg, 0x5B5);
    reg = CSD_READ_BL_LEN.write(reg, 9);
    if kind == SimCardKind::SdHighCapacity {
        reg = CSD_STRUCTURE.write(reg, 1);
        reg = SD_CSD_V2_C_SIZE.write(reg, SD_CARD_BLOCKS / 1024 - 1);
        reg = SD_CSD_SECTOR_SIZE.write(reg, 0x7F);
    } else {
        // (255 + 1) << (0 + 2) blocks.
        reg = CSD_C_SIZE.write(reg, 255);
        reg = CSD_C_SIZE_MULT.write(reg, 0);
        reg = SD_CSD_SECTOR_SIZE.write(reg, 0x1F);
    }
    reg_to_words(reg)
}

fn mmc_csd() -> [u32; 4] {
    let mut reg = 0u128;
    reg = CSD_STRUCTURE.write(reg, 3);
    reg = MMC_CSD_SPEC_VERS.write(reg, 4);
    reg = CSD_TRAN_SPEED.write(reg, 0x32);
    reg = CSD_CCC.write(reg, 0x8F5);
    reg = CSD_READ_BL_LEN.write(reg, 9);
    reg = CSD_C_SIZE.write(reg, MMC_CSD_C_SIZE_HIGH_CAPACITY);
    reg = CSD_C_SIZE_MULT.write(reg, 7);
    reg = MMC_CSD_ERASE_GRP_SIZE.write(reg, 31);
    reg = MMC_CSD_ERASE_GRP_MULT.write(reg, 15);
    reg_to_words(reg)
}

fn mmc_ext_csd() -> [u8; MMC_EXTENDED_CSD_BYTES] {
    let mut raw = [0u8; MMC_EXTENDED_CSD_BYTES];
    raw[index::EXT_CSD_REV] = 5;
    raw[index::CSD_STRUCTURE] = 2;
    raw[index::CARD_TYPE] = CARD_TYPE_HS_26MHZ | CARD_TYPE_HS_52MHZ;
    raw[index::PWR_CL_52_360] = 0x87;
    raw[index::PWR_CL_26_360] = 0x43;
    raw[index::SEC_COUNT..index::SEC_COUNT + 4].copy_from_slice(&MMC_USER_BLOCKS.to_le_bytes());
    raw[index::ERASE_TIMEOUT_MULT] = 1;
    raw[index::HC_ERASE_GRP_SIZE] = 1;
    raw[index::BOOT_SIZE_MULT] = MMC_BOOT_SIZE_MULT;
    raw[index::BOOT_INFO] = BOOT_INFO_ALT_BOOT;
    raw
}

impl SimCard {
    pub fn new(kind: SimCardKind) -> Self {
        let mut flags = HostCapabilityFlags::SUPPORT_V330
            | HostCapabilityFlags::SUPPORT_V300
            | HostCapabilityFlags::SUPPORT_4BIT
            | HostCapabilityFlags::SUPPORT_HIGH_SPEED;
        let (raw_cid, raw_csd, blocks, wired_width) = match kind {
            SimCardKind::Mmc => {
                flags |= HostCapabilityFlags::SUPPORT_8BIT;
                (mmc_cid(), mmc_csd(), MMC_USER_BLOCKS + 2 * MMC_BOOT_BLOCKS, HostBusWidth::EightBit)
            }
            _ => (sd_cid(), sd_csd(kind), SD_CARD_BLOCKS, HostBusWidth::FourBit),
        };

        SimCard {
            kind,
            capability: HostCapability {
                spec_version: 3,
                vendor_version: 0,
                max_block_length: 2048,
                max_block_count: 256,
                flags,
            },
            endian_mode: EndianMode::Little,
            commands: Vec::new(),
            raw_cid,
            raw_csd,
            raw_scr: [0x0235_8002, 0x0000_0000],
            ext_csd: mmc_ext_csd(),
            storage: vec![0; blocks as usize * SDMMC_DEFAULT_BLOCK_SIZE as usize],
            relative_address: 0,
            selected: false,
            application_command: false,
            power_up_polls: 2,
            power_up_left: 2,
            busy_polls: 0,
            busy_left: 0,
            data0_busy_left: Cell::new(0),
            status_errors: Vec::new(),
            failing_commands: Vec::new(),
            block_length: SDMMC_DEFAULT_BLOCK_SIZE,
            block_count: 0,
            bus_clock_hz: 0,
            bus_width: HostBusWidth::OneBit,
            wired_width,
            bus_test_sent: [0; BUS_TEST_BYTES],
            sd_high_speed_supported: true,
            sd_high_speed: false,
            erase_start: None,
            erase_end: None,
            erases: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[SimCommand] {
        &self.commands
    }

    pub fn commands_with(&self, index: u32) -> Vec<&SimCommand> {
        self.commands.iter().filter(|c| c.index == index && !c.is_application).collect()
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn capability_mut(&mut self) -> &mut HostCapability {
        &mut self.capability
    }

    pub fn set_endian_mode(&mut self, mode: EndianMode) {
        self.endian_mode = mode;
    }

    /// CMD13 reports the programming state for `polls` polls after each write.
    /// `u32::MAX` keeps the card busy for good.
    pub fn set_busy_polls(&mut self, polls: u32) {
        self.busy_polls = polls;
        self.busy_left = polls;
    }

    /// DAT0 reads low for the next `polls` samples.
    pub fn set_data0_busy(&mut self, polls: u32) {
        self.data0_busy_left.set(polls);
    }

    /// Number of ACMD41/CMD1 answers with the power-up bit still clear.
    pub fn set_power_up_polls(&mut self, polls: u32) {
        self.power_up_polls = polls;
        self.power_up_left = polls;
    }

    /// ORs `bits` into every R1 answer to `index`.
    pub fn inject_status_error(&mut self, index: u32, bits: u32) {
        self.status_errors.push((index, bits));
    }

    /// The host reports a command error for every `index`.
    pub fn fail_command(&mut self, index: u32) {
        self.failing_commands.push(index);
    }

    /// Lines actually connected; the bus test fails on anything wider.
    pub fn set_wired_width(&mut self, width: HostBusWidth) {
        self.wired_width = width;
    }

    pub fn set_sd_high_speed_supported(&mut self, supported: bool) {
        self.sd_high_speed_supported = supported;
    }

    pub fn set_ext_csd_revision(&mut self, revision: u8) {
        self.ext_csd[index::EXT_CSD_REV] = revision;
    }

    pub fn ext_csd(&self) -> &[u8; MMC_EXTENDED_CSD_BYTES] {
        &self.ext_csd
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// CURRENT_STATE a SEND_STATUS would report now.
    pub fn card_state(&self) -> CardState {
        CardState::from_r1(self.status())
    }

    pub fn is_sd_high_speed(&self) -> bool {
        self.sd_high_speed
    }

    pub fn bus_clock_hz(&self) -> u32 {
        self.bus_clock_hz
    }

    pub fn bus_width(&self) -> HostBusWidth {
        self.bus_width
    }

    pub fn block_length(&self) -> u32 {
        self.block_length
    }

    /// Last SET_BLOCK_COUNT argument.
    pub fn pre_defined_block_count(&self) -> u32 {
        self.block_count
    }

    /// Erased `(first, last)` blocks, in order.
    pub fn erases(&self) -> &[(u32, u32)] {
        &self.erases
    }

    /// Raw storage of the user area, blocks as they sit on the card.
    pub fn storage(&self) -> &[u8] {
        &self.storage
    }

    fn is_high_capacity(&self) -> bool {
        self.kind != SimCardKind::SdStandardCapacity
    }

    fn block_of(&self, argument: u32) -> Option<u32> {
        if self.is_high_capacity() {
            Some(argument)
        } else if argument % SDMMC_DEFAULT_BLOCK_SIZE == 0 {
            Some(argument / SDMMC_DEFAULT_BLOCK_SIZE)
        } else {
            None
        }
    }

    /// First block and size of the partition data commands reach.
    fn partition(&self) -> (u32, u32) {
        if self.kind != SimCardKind::Mmc {
            return (0, SD_CARD_BLOCKS);
        }
        match self.ext_csd[index::BOOT_CONFIG] & MMC_BOOT_CONFIG_PARTITION_ACCESS_MASK {
            1 => (MMC_USER_BLOCKS, MMC_BOOT_BLOCKS),
            2 => (MMC_USER_BLOCKS + MMC_BOOT_BLOCKS, MMC_BOOT_BLOCKS),
            _ => (0, MMC_USER_BLOCKS),
        }
    }

    fn status(&self) -> u32 {
        let state = if self.busy_left > 0 {
            CardState::Program
        } else if self.selected {
            CardState::Transfer
        } else {
            CardState::Standby
        };
        let mut status = (state as u32) << 9;
        if self.busy_left == 0 {
            status |= CardStatusFlag::READY_FOR_DATA.bits();
        }
        status
    }

    fn start_programming(&mut self) {
        self.busy_left = self.busy_polls;
    }

    fn read_phase(&self, content: &mut HostTransfer<'_>, bus: &[u8]) -> HostStatus {
        match content.data.as_mut().map(|data| &mut data.buffer) {
            Some(DataBuffer::Read(buffer)) => {
                let len = bus.len().min(buffer.len());
                buffer[..len].copy_from_slice(&bus[..len]);
                self.endian_mode.to_bus_order(&mut buffer[..len]);
                Ok(())
            }
            _ => Err(HostError::DataError),
        }
    }

    fn write_phase(&self, content: &HostTransfer<'_>) -> HostStatus<Vec<u8>> {
        match content.data.as_ref().map(|data| &data.buffer) {
            Some(DataBuffer::Write(buffer)) => {
                let mut bus = buffer.to_vec();
                self.endian_mode.to_bus_order(&mut bus);
                Ok(bus)
            }
            _ => Err(HostError::DataError),
        }
    }

    /// Byte range of a block transfer, or the R1 error bit refusing it.
    fn block_range(&self, argument: u32, count: u32) -> Result<core::ops::Range<usize>, u32> {
        let block = self.block_of(argument).ok_or(CardStatusFlag::ADDRESS_ERROR.bits())?;
        let (first, blocks) = self.partition();
        if count == 0 || block + count > blocks {
            return Err(CardStatusFlag::OUT_OF_RANGE.bits());
        }
        let size = SDMMC_DEFAULT_BLOCK_SIZE as usize;
        let start = (first + block) as usize * size;
        Ok(start..start + count as usize * size)
    }

    fn read_blocks(&mut self, content: &mut HostTransfer<'_>) -> HostStatus<u32> {
        let count = content.data.as_ref().map_or(0, |data| data.block_count);
        match self.block_range(content.cmd.argument, count) {
            Ok(range) => {
                let bus = self.storage[range].to_vec();
                self.read_phase(content, &bus)?;
                Ok(self.status())
            }
            Err(bits) => Ok(self.status() | bits),
        }
    }

    fn write_blocks(&mut self, content: &mut HostTransfer<'_>) -> HostStatus<u32> {
        let count = content.data.as_ref().map_or(0, |data| data.block_count);
        match self.block_range(content.cmd.argument, count) {
            Ok(range) => {
                let bus = self.write_phase(content)?;
                if bus.len() != range.len() {
                    return Err(HostError::DataError);
                }
                self.storage[range].copy_from_slice(&bus);
                let status = self.status();
                self.start_programming();
                Ok(status)
            }
            Err(bits) => Ok(self.status() | bits),
        }
    }

    fn erase(&mut self) -> u32 {
        let status = self.status();
        let (Some(first), Some(last)) = (self.erase_start.take(), self.erase_end.take()) else {
            return status | CardStatusFlag::ERASE_SEQUENCE_ERROR.bits();
        };
        let size = SDMMC_DEFAULT_BLOCK_SIZE as usize;
        let end = ((last as usize + 1) * size).min(self.storage.len());
        if let Some(bytes) = self.storage.get_mut(first as usize * size..end) {
            bytes.fill(0);
        }
        self.erases.push((first, last));
        self.start_programming();
        status
    }

    fn erase_address(&mut self, argument: u32) -> Result<u32, u32> {
        self.block_of(argument).ok_or(CardStatusFlag::ADDRESS_ERROR.bits())
    }

    /// 64 byte switch status, in bus order.
    fn sd_switch(&mut self, content: &mut HostTransfer<'_>) -> HostStatus<u32> {
        let argument = content.cmd.argument;
        let set = argument & (1 << 31) != 0;
        let function = argument & 0xF;

        let mut status = [0u8; SD_SWITCH_STATUS_BYTES];
        status[13] = if self.sd_high_speed_supported { 0x03 } else { 0x01 };
        let selection = match function {
            0xF => self.sd_high_speed as u8,
            1 if self.sd_high_speed_supported => 1,
            0 => 0,
            _ => 0xF,
        };
        status[16] = selection;
        if set && selection == 1 {
            self.sd_high_speed = true;
        }

        self.read_phase(content, &status)?;
        Ok(self.status())
    }

    fn mmc_switch(&mut self, argument: u32) -> u32 {
        let access = (argument >> MMC_SWITCH_ACCESS_MODE_SHIFT) & 0x3;
        let slot = ((argument >> MMC_SWITCH_BYTE_INDEX_SHIFT) & 0xFF) as usize;
        let value = ((argument >> MMC_SWITCH_VALUE_SHIFT) & 0xFF) as u8;

        match access {
            1 => self.ext_csd[slot] |= value,
            2 => self.ext_csd[slot] &= !value,
            3 => self.ext_csd[slot] = value,
            _ => {}
        }
        let status = self.status();
        self.start_programming();
        status
    }

    fn bus_test_reply(&self, len: usize) -> Vec<u8> {
        let sent = self.bus_test_sent;
        let mut reply = vec![0u8; len];
        if line_count(self.bus_width) > line_count(self.wired_width) {
            return reply;
        }
        match self.bus_width {
            HostBusWidth::OneBit => reply[0] = !sent[0] & 0xC0,
            HostBusWidth::FourBit => reply[0] = !sent[0],
            HostBusWidth::EightBit => {
                reply[0] = !sent[0];
                reply[1] = !sent[1];
            }
        }
        reply
    }

    fn operation_condition(&mut self, high_capacity: bool) -> u32 {
        if self.power_up_left > 0 {
            if self.power_up_left != u32::MAX {
                self.power_up_left -= 1;
            }
            return OCR_VOLTAGE_WINDOW;
        }
        let mut ocr = OCR_VOLTAGE_WINDOW | SdOcrFlag::POWER_UP_BUSY.bits();
        if high_capacity {
            ocr |= SdOcrFlag::CARD_CAPACITY_SUPPORT.bits();
        }
        ocr
    }

    fn application_command(&mut self, content: &mut HostTransfer<'_>) -> HostStatus<u32> {
        let argument = content.cmd.argument;
        match content.cmd.index {
            6 => Ok(self.status()),
            41 => {
                let requested = argument & SdOcrFlag::CARD_CAPACITY_SUPPORT.bits() != 0;
                Ok(self.operation_condition(requested && self.is_high_capacity()))
            }
            51 => {
                let mut bus = [0u8; SD_SCR_BYTES];
                bus[..4].copy_from_slice(&self.raw_scr[0].to_be_bytes());
                bus[4..].copy_from_slice(&self.raw_scr[1].to_be_bytes());
                self.read_phase(content, &bus)?;
                Ok(self.status())
            }
            _ => Err(HostError::CommandError),
        }
    }

    fn command(&mut self, content: &mut HostTransfer<'_>) -> HostStatus<u32> {
        let argument = content.cmd.argument;
        let is_mmc = self.kind == SimCardKind::Mmc;

        match content.cmd.index {
            0 => {
                self.selected = false;
                self.relative_address = 0;
                self.power_up_left = self.power_up_polls;
                Ok(0)
            }
            1 if is_mmc => Ok(self.operation_condition(true) | (2 << MMC_OCR_ACCESS_MODE_SHIFT)),
            2 => {
                content.cmd.response = self.raw_cid;
                Ok(self.raw_cid[0])
            }
            3 if is_mmc => {
                self.relative_address = argument >> 16;
                Ok(self.status())
            }
            3 => {
                self.relative_address = SD_RELATIVE_ADDRESS;
                Ok((SD_RELATIVE_ADDRESS << 16) | (self.status() & 0x1FFF))
            }
            6 if is_mmc => Ok(self.mmc_switch(argument)),
            6 => self.sd_switch(content),
            7 => {
                self.selected = argument != 0 && argument >> 16 == self.relative_address;
                Ok(self.status())
            }
            8 if is_mmc => {
                let bus = self.ext_csd;
                self.read_phase(content, &bus)?;
                Ok(self.status())
            }
            8 if self.kind == SimCardKind::SdHighCapacity => Ok(argument & 0xFFF),
            9 => {
                content.cmd.response = self.raw_csd;
                Ok(self.raw_csd[0])
            }
            12 => Ok(self.status()),
            13 => {
                let status = self.status();
                if self.busy_left > 0 && self.busy_left != u32::MAX {
                    self.busy_left -= 1;
                }
                Ok(status)
            }
            14 if is_mmc => {
                let len = content.data.as_ref().map_or(0, |data| data.block_size as usize);
                let reply = self.bus_test_reply(len);
                self.read_phase(content, &reply)?;
                Ok(self.status())
            }
            16 => {
                self.block_length = argument;
                Ok(self.status())
            }
            17 | 18 => self.read_blocks(content),
            19 if is_mmc => {
                let bus = self.write_phase(content)?;
                let len = bus.len().min(BUS_TEST_BYTES);
                self.bus_test_sent = [0; BUS_TEST_BYTES];
                self.bus_test_sent[..len].copy_from_slice(&bus[..len]);
                Ok(self.status())
            }
            23 => {
                self.block_count = argument;
                Ok(self.status())
            }
            24 | 25 => self.write_blocks(content),
            32 | 35 => Ok(match self.erase_address(argument) {
                Ok(block) => {
                    self.erase_start = Some(block);
                    self.status()
                }
                Err(bits) => self.status() | bits,
            }),
            33 | 36 => Ok(match self.erase_address(argument) {
                Ok(block) => {
                    self.erase_end = Some(block);
                    self.status()
                }
                Err(bits) => self.status() | bits,
            }),
            38 => Ok(self.erase()),
            55 if !is_mmc => {
                self.application_command = true;
                Ok(self.status() | CardStatusFlag::APPLICATION_COMMAND.bits())
            }
            _ => Err(HostError::Timeout),
        }
    }
}

impl SdmmcHostDevice for SimCard {
    fn transfer_function(&mut self, content: &mut HostTransfer<'_>) -> HostStatus {
        let is_application = core::mem::take(&mut self.application_command);
        self.commands.push(SimCommand {
            index: content.cmd.index,
            argument: content.cmd.argument,
            response_type: content.cmd.response_type,
            cmd_type: content.cmd.cmd_type,
            is_application,
            block_count: content.data.as_ref().map_or(0, |data| data.block_count),
        });

        if self.failing_commands.contains(&content.cmd.index) {
            return Err(HostError::CommandError);
        }

        let mut response = if is_application {
            self.application_command(content)?
        } else {
            self.command(content)?
        };

        if !matches!(content.cmd.response_type, ResponseType::R2 | ResponseType::R3) {
            for (index, bits) in &self.status_errors {
                if *index == content.cmd.index {
                    response |= bits;
                }
            }
        }
        if content.cmd.response_type != ResponseType::R2 {
            content.cmd.response = [response, 0, 0, 0];
        }
        Ok(())
    }

    fn capability(&self) -> HostCapability {
        self.capability
    }

    fn set_bus_clock(&mut self, source_clock_hz: u32, bus_clock_hz: u32) -> u32 {
        self.bus_clock_hz = bus_clock_hz.min(source_clock_hz);
        self.bus_clock_hz
    }

    fn set_bus_width(&mut self, width: HostBusWidth) {
        self.bus_width = width;
    }

    fn set_card_active(&mut self, _timeout_us: u32) -> bool {
        true
    }

    fn data0_level(&self) -> bool {
        let left = self.data0_busy_left.get();
        if left == 0 {
            return true;
        }
        if left != u32::MAX {
            self.data0_busy_left.set(left - 1);
        }
        false
    }
}
