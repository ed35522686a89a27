mod ext;

pub use ext::{ExtCsdAccessMode, ExtCsdConfig, MMC_COMMAND_SET_STANDARD};

use bitflags::bitflags;
use log::{debug, error, info};

use crate::card::cid::MmcCid;
use crate::card::csd::{CsdFlags, MmcCsd};
use crate::card::ext_csd::{MmcExtCsd, index};
use crate::card::{AddressingMode, BlockTransferMode, CardBase, EraseCommands, check_range};
use crate::constants::*;
use crate::err::{SdmmcError, SdmmcResult};
use crate::host::{
    HostBusWidth, HostCapabilityFlags, HostCmd, HostTransfer, ResponseType, SdmmcHost,
    SdmmcHostDevice,
};

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct MmcCardFlags: u32 {
        /// CSD spec version 4, later confirmed by the HS_TIMING switch.
        const SUPPORT_HIGH_SPEED = 1 << 0;
        const SUPPORT_HIGH_SPEED_26MHZ = 1 << 1;
        const SUPPORT_HIGH_SPEED_52MHZ = 1 << 2;
        const SUPPORT_HIGH_CAPACITY = 1 << 3;
        const SUPPORT_ALTERNATE_BOOT = 1 << 4;
    }
}

/// Partition reached by data commands, PARTITION_ACCESS of BOOT_CONFIG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessPartition {
    #[default]
    User = 0,
    Boot1 = 1,
    Boot2 = 2,
}

/// Voltage range offered to the card in CMD1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoltageWindow {
    V170to195,
    #[default]
    V270to360,
}

impl VoltageWindow {
    fn ocr_bits(self) -> u32 {
        match self {
            VoltageWindow::V170to195 => 0x01 << MMC_OCR_V170TO195_SHIFT,
            VoltageWindow::V270to360 => 0x1FF << MMC_OCR_V270TO360_SHIFT,
        }
    }
}

/// OCR access mode field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OcrAccessMode {
    Byte = 0,
    Sector = 2,
}

/// Partition the card boots from, BOOT_PARTITION_ENABLE of BOOT_CONFIG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootPartitionEnable {
    NotEnabled = 0,
    Boot1 = 1,
    Boot2 = 2,
    User = 7,
}

/// Bus width during boot, BOOT_BUS_WIDTH bits 1:0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootBusWidth {
    OneBit = 0,
    FourBit = 1,
    EightBit = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootConfig {
    pub enable_boot_ack: bool,
    pub boot_partition: BootPartitionEnable,
    /// Keep the boot bus width after boot instead of resetting to 1-bit.
    pub retain_boot_bus_width: bool,
    pub boot_data_bus_width: BootBusWidth,
}

pub struct MmcCard<D: SdmmcHostDevice> {
    base: CardBase<D>,
    flags: MmcCardFlags,
    enable_pre_defined_block_count: bool,
    raw_ext_csd: [u8; MMC_EXTENDED_CSD_BYTES],
    cid: MmcCid,
    csd: MmcCsd,
    ext_csd: MmcExtCsd,
    user_partition_blocks: u32,
    boot_partition_blocks: u32,
    erase_group_blocks: u32,
    current_partition: AccessPartition,
    host_voltage_window: VoltageWindow,
    bus_width: HostBusWidth,
}

impl<D: SdmmcHostDevice> MmcCard<D> {
    pub fn new(host: SdmmcHost<D>) -> Self {
        MmcCard {
            base: CardBase::new(host),
            flags: MmcCardFlags::empty(),
            enable_pre_defined_block_count: false,
            raw_ext_csd: [0; MMC_EXTENDED_CSD_BYTES],
            cid: MmcCid::default(),
            csd: MmcCsd::default(),
            ext_csd: MmcExtCsd::default(),
            user_partition_blocks: 0,
            boot_partition_blocks: 0,
            erase_group_blocks: 0,
            current_partition: AccessPartition::User,
            host_voltage_window: VoltageWindow::default(),
            bus_width: HostBusWidth::OneBit,
        }
    }

    pub fn host(&self) -> &SdmmcHost<D> {
        &self.base.host
    }

    pub fn host_mut(&mut self) -> &mut SdmmcHost<D> {
        &mut self.base.host
    }

    pub fn flags(&self) -> MmcCardFlags {
        self.flags
    }

    pub fn cid(&self) -> &MmcCid {
        &self.cid
    }

    pub fn csd(&self) -> &MmcCsd {
        &self.csd
    }

    pub fn ext_csd(&self) -> &MmcExtCsd {
        &self.ext_csd
    }

    pub fn raw_ext_csd(&self) -> &[u8; MMC_EXTENDED_CSD_BYTES] {
        &self.raw_ext_csd
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

    pub fn bus_width(&self) -> HostBusWidth {
        self.bus_width
    }

    pub fn addressing(&self) -> AddressingMode {
        self.base.addressing
    }

    pub fn block_size(&self) -> u32 {
        self.base.block_size()
    }

    pub fn user_partition_blocks(&self) -> u32 {
        self.user_partition_blocks
    }

    pub fn boot_partition_blocks(&self) -> u32 {
        self.boot_partition_blocks
    }

    pub fn erase_group_blocks(&self) -> u32 {
        self.erase_group_blocks
    }

    pub fn current_partition(&self) -> AccessPartition {
        self.current_partition
    }

    pub fn host_voltage_window(&self) -> VoltageWindow {
        self.host_voltage_window
    }

    /// Use SET_BLOCK_COUNT ahead of multiple block transfers instead of STOP_TRANSMISSION.
    pub fn set_pre_defined_block_count(&mut self, enable: bool) {
        self.enable_pre_defined_block_count = enable;
    }

    /// Block count of the partition data commands currently reach.
    pub fn partition_blocks(&self) -> u32 {
        match self.current_partition {
            AccessPartition::User => self.user_partition_blocks,
            AccessPartition::Boot1 | AccessPartition::Boot2 => self.boot_partition_blocks,
        }
    }

    /// Brings the card from power-up to the transfer state on the user partition.
    pub fn init(&mut self) -> SdmmcResult {
        info!("MMC card init");
        self.flags = MmcCardFlags::empty();
        self.base.reset_card_state();

        self.base.set_bus_clock(SDMMC_CLOCK_400KHZ);

        self.base
            .host
            .go_idle()
            .map_err(|_| SdmmcError::GoIdleFailed)?;

        let access_mode = self
            .host_operation_condition()
            .map_err(|_| SdmmcError::HandShakeOperationConditionFailed)?;
        self.send_operation_condition(access_mode)?;

        let raw_cid = self
            .base
            .all_send_cid()
            .map_err(|_| SdmmcError::AllSendCidFailed)?;
        self.cid = MmcCid::decode(&raw_cid);

        self.set_relative_address()
            .map_err(|_| SdmmcError::SetRelativeAddressFailed)?;

        self.send_csd().map_err(|_| SdmmcError::SendCsdFailed)?;

        self.base.set_bus_clock(self.csd.max_transfer_clock_hz());

        self.base
            .select(true)
            .map_err(|_| SdmmcError::SelectCardFailed)?;

        self.send_extended_csd()
            .map_err(|_| SdmmcError::SendExtendedCsdFailed)?;

        if self
            .base
            .host
            .capability()
            .supports(HostCapabilityFlags::SUPPORT_HIGH_SPEED)
        {
            self.switch_high_speed().map_err(|err| {
                error!("MMC high speed switch failed: {}", err);
                SdmmcError::SwitchHighSpeedFailed
            })?;
        }

        self.bus_width = self.set_max_data_bus_width();

        self.base
            .host
            .block_size_set(SDMMC_DEFAULT_BLOCK_SIZE)
            .map_err(|_| SdmmcError::SetCardBlockSizeFailed)?;

        self.set_max_erase_unit_size()
            .map_err(|_| SdmmcError::EnableHighCapacityEraseFailed)?;

        self.current_partition = AccessPartition::User;

        info!(
            "MMC card ready: {} user blocks, erase group {} blocks, {:?}, {} Hz",
            self.user_partition_blocks, self.erase_group_blocks, self.bus_width, self.base.bus_clock_hz
        );
        Ok(())
    }

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

    pub fn select_partition(&mut self, partition: AccessPartition) -> SdmmcResult {
        let boot_config =
            (self.ext_csd.boot_config & !MMC_BOOT_CONFIG_PARTITION_ACCESS_MASK) | partition as u8;

        self.switch_ext_csd(ExtCsdConfig::write_byte(index::BOOT_CONFIG, boot_config))
            .map_err(|_| SdmmcError::ConfigureExtendedCsdFailed)?;

        self.current_partition = partition;
        debug!("MMC partition {:?}", partition);
        Ok(())
    }

    /// Programs boot acknowledge, boot partition and boot bus width.
    pub fn set_boot_config(&mut self, config: &BootConfig) -> SdmmcResult {
        if self.ext_csd.extended_csd_version < MMC_EXT_CSD_REVISION_FAST_BOOT {
            return Err(SdmmcError::NotSupportYet);
        }

        let mut boot_config = self.ext_csd.boot_config;
        boot_config &= !(MMC_BOOT_CONFIG_ACK_MASK | MMC_BOOT_CONFIG_PARTITION_ENABLE_MASK);
        boot_config |= (config.enable_boot_ack as u8) << MMC_BOOT_CONFIG_ACK_SHIFT;
        boot_config |= (config.boot_partition as u8) << MMC_BOOT_CONFIG_PARTITION_ENABLE_SHIFT;
        self.switch_ext_csd(ExtCsdConfig::write_byte(index::BOOT_CONFIG, boot_config))
            .map_err(|_| SdmmcError::ConfigureExtendedCsdFailed)?;

        let mut boot_bus_width = self.ext_csd.boot_data_bus_width;
        boot_bus_width &= !(MMC_BOOT_BUS_WIDTH_RESET_MASK | MMC_BOOT_BUS_WIDTH_WIDTH_MASK);
        boot_bus_width |= (config.retain_boot_bus_width as u8) << MMC_BOOT_BUS_WIDTH_RESET_SHIFT;
        boot_bus_width |= config.boot_data_bus_width as u8;
        self.switch_ext_csd(ExtCsdConfig::write_byte(index::BOOT_BUS_WIDTH, boot_bus_width))
            .map_err(|_| SdmmcError::ConfigureBootFailed)
    }

    pub fn read_blocks(&mut self, buffer: &mut [u8], start_block: u32, block_count: u32) -> SdmmcResult {
        check_range(start_block, block_count, self.partition_blocks())?;
        let mode = self.block_transfer_mode();
        self.base.read_blocks(buffer, start_block, block_count, mode)
    }

    pub fn write_blocks(&mut self, buffer: &[u8], start_block: u32, block_count: u32) -> SdmmcResult {
        check_range(start_block, block_count, self.partition_blocks())?;
        let mode = self.block_transfer_mode();
        self.base.write_blocks(buffer, start_block, block_count, mode)
    }

    /// Erases groups `start_group..=end_group` with one command triple.
    pub fn erase_groups(&mut self, start_group: u32, end_group: u32) -> SdmmcResult {
        if end_group < start_group || self.erase_group_blocks == 0 {
            return Err(SdmmcError::InvalidArgument);
        }

        let first = start_group
            .checked_mul(self.erase_group_blocks)
            .ok_or(SdmmcError::InvalidArgument)?;
        let count = (end_group - start_group + 1)
            .checked_mul(self.erase_group_blocks)
            .ok_or(SdmmcError::InvalidArgument)?;
        check_range(first, count, self.partition_blocks())?;

        let commands = EraseCommands {
            start: MmcCmd::EraseGroupStart as u32,
            end: MmcCmd::EraseGroupEnd as u32,
        };
        self.base
            .erase_range(commands, first, end_group * self.erase_group_blocks)
    }

    /// Erases whole groups, one command triple per group.
    pub fn erase_blocks(&mut self, start_block: u32, block_count: u32) -> SdmmcResult {
        let group = self.erase_group_blocks;
        if group == 0 || block_count == 0 || start_block % group != 0 || block_count % group != 0 {
            return Err(SdmmcError::InvalidArgument);
        }
        check_range(start_block, block_count, self.partition_blocks())?;

        let first_group = start_block / group;
        for erase_group in first_group..first_group + block_count / group {
            self.erase_groups(erase_group, erase_group)?;
        }
        Ok(())
    }

    fn block_transfer_mode(&self) -> BlockTransferMode {
        BlockTransferMode {
            pre_defined_count: self.enable_pre_defined_block_count,
        }
    }

    /// Voltage window and access mode the host can offer.
    fn host_operation_condition(&mut self) -> SdmmcResult<OcrAccessMode> {
        let capability = self.base.host.capability_refresh();

        self.host_voltage_window = if capability
            .flags
            .intersects(HostCapabilityFlags::SUPPORT_V330 | HostCapabilityFlags::SUPPORT_V300)
        {
            VoltageWindow::V270to360
        } else if capability.supports(HostCapabilityFlags::SUPPORT_V180) {
            VoltageWindow::V170to195
        } else {
            return Err(SdmmcError::HostNotSupport);
        };

        if capability.max_block_length >= SDMMC_DEFAULT_BLOCK_SIZE {
            Ok(OcrAccessMode::Sector)
        } else {
            Ok(OcrAccessMode::Byte)
        }
    }

    /// CMD1 until the card reports the end of its power-up.
    fn send_operation_condition(&mut self, access_mode: OcrAccessMode) -> SdmmcResult {
        let argument = self.host_voltage_window.ocr_bits()
            | ((access_mode as u32) << MMC_OCR_ACCESS_MODE_SHIFT);

        for _ in 0..self.base.host.config().voltage_retries {
            let mut content = HostTransfer::new(HostCmd::new(
                MmcCmd::SendOperationCondition as u32,
                argument,
                ResponseType::R3,
            ));
            self.base
                .host
                .transfer(&mut content)
                .map_err(|_| SdmmcError::HandShakeOperationConditionFailed)?;

            if content.cmd.response[0] & MMC_OCR_BUSY_MASK != 0 {
                self.base.ocr = content.cmd.response[0];
                debug!("MMC OCR {:#x}", self.base.ocr);
                return Ok(());
            }
            self.base.host.dev.delay_us(self.base.host.config().busy_poll_interval_us);
        }

        error!("MMC card stays busy after CMD1");
        Err(SdmmcError::Timeout)
    }

    fn set_relative_address(&mut self) -> SdmmcResult {
        let mut content = HostTransfer::new(HostCmd::new(
            MmcCmd::SetRelativeAddress as u32,
            MMC_DEFAULT_RELATIVE_ADDRESS << 16,
            ResponseType::R1,
        ));
        self.base.host.transfer_r1(&mut content)?;
        self.base.relative_address = MMC_DEFAULT_RELATIVE_ADDRESS;
        Ok(())
    }

    fn send_csd(&mut self) -> SdmmcResult {
        let raw = self.base.send_csd()?;
        self.csd = MmcCsd::decode(&raw);

        if self.csd.system_specification_version == 4 {
            self.flags |= MmcCardFlags::SUPPORT_HIGH_SPEED;
        }
        match self.csd.user_partition_blocks() {
            Some(blocks) => self.user_partition_blocks = blocks,
            None => self.flags |= MmcCardFlags::SUPPORT_HIGH_CAPACITY,
        }
        self.base.block_size = SDMMC_DEFAULT_BLOCK_SIZE;
        self.base.addressing =
            AddressingMode::from_high_capacity(self.flags.contains(MmcCardFlags::SUPPORT_HIGH_CAPACITY));

        debug!(
            "MMC CSD spec v{}, addressing {:?}, tran speed {:#x}",
            self.csd.system_specification_version, self.base.addressing, self.csd.transfer_speed
        );
        Ok(())
    }
}
