use bitflags::bitflags;

pub const SDMMC_CLOCK_400KHZ: u32 = 400_000;
pub const SD_CLOCK_25MHZ: u32 = 25_000_000;
pub const SD_CLOCK_50MHZ: u32 = 50_000_000;
pub const MMC_CLOCK_26MHZ: u32 = 26_000_000;
pub const MMC_CLOCK_52MHZ: u32 = 52_000_000;

pub const SDMMC_DEFAULT_BLOCK_SIZE: u32 = 512;
pub const SDMMC_MAX_VOLTAGE_RETRIES: u32 = 1000;

/// Clocks of card-active (initialization) sequence, in microseconds.
pub const SDMMC_CARD_ACTIVE_TIMEOUT_US: u32 = 100;

pub const SD_INTERFACE_CONDITION_ARG: u32 = 0x1AA;
pub const SD_INTERFACE_CONDITION_ECHO: u32 = 0xAA;
pub const SD_SWITCH_STATUS_BYTES: usize = 64;
pub const SD_SCR_BYTES: usize = 8;

pub const MMC_DEFAULT_RELATIVE_ADDRESS: u32 = 2;
pub const MMC_EXTENDED_CSD_BYTES: usize = 512;

/// Commands shared by SD and MMC.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdmmcCmd {
    GoIdleState = 0,
    AllSendCid = 2,
    SelectCard = 7,
    SendCsd = 9,
    StopTransmission = 12,
    SendStatus = 13,
    SetBlockLength = 16,
    ReadSingleBlock = 17,
    ReadMultipleBlock = 18,
    SetBlockCount = 23,
    WriteSingleBlock = 24,
    WriteMultipleBlock = 25,
    Erase = 38,
    ApplicationCommand = 55,
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdCmd {
    SendRelativeAddress = 3,
    Switch = 6,
    SendInterfaceCondition = 8,
    EraseWriteBlockStart = 32,
    EraseWriteBlockEnd = 33,
}

/// Commands valid only after APP_CMD.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdAppCmd {
    SetBusWidth = 6,
    SendOperationCondition = 41,
    SendScr = 51,
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmcCmd {
    SendOperationCondition = 1,
    SetRelativeAddress = 3,
    Switch = 6,
    SendExtendedCsd = 8,
    BusTestRead = 14,
    BusTestWrite = 19,
    EraseGroupStart = 35,
    EraseGroupEnd = 36,
}

bitflags! {
    /// R1 card status.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CardStatusFlag: u32 {
        const OUT_OF_RANGE = 1 << 31;
        const ADDRESS_ERROR = 1 << 30;
        const BLOCK_LENGTH_ERROR = 1 << 29;
        const ERASE_SEQUENCE_ERROR = 1 << 28;
        const ERASE_PARAMETER_ERROR = 1 << 27;
        const WRITE_PROTECT_VIOLATION = 1 << 26;
        const CARD_IS_LOCKED = 1 << 25;
        const LOCK_UNLOCK_FAILED = 1 << 24;
        const COMMAND_CRC_ERROR = 1 << 23;
        const ILLEGAL_COMMAND = 1 << 22;
        const CARD_ECC_FAILED = 1 << 21;
        const CARD_CONTROLLER_ERROR = 1 << 20;
        const ERROR = 1 << 19;
        const CID_CSD_OVERWRITE = 1 << 16;
        const WRITE_PROTECT_ERASE_SKIP = 1 << 15;
        const CARD_ECC_DISABLED = 1 << 14;
        const ERASE_RESET = 1 << 13;
        const READY_FOR_DATA = 1 << 8;
        const SWITCH_ERROR = 1 << 7;
        const APPLICATION_COMMAND = 1 << 5;
        const AUTHENTICATION_SEQUENCE_ERROR = 1 << 3;

        const ALL_ERROR_FLAG = Self::OUT_OF_RANGE.bits()
            | Self::ADDRESS_ERROR.bits()
            | Self::BLOCK_LENGTH_ERROR.bits()
            | Self::ERASE_SEQUENCE_ERROR.bits()
            | Self::ERASE_PARAMETER_ERROR.bits()
            | Self::WRITE_PROTECT_VIOLATION.bits()
            | Self::CARD_IS_LOCKED.bits()
            | Self::LOCK_UNLOCK_FAILED.bits()
            | Self::COMMAND_CRC_ERROR.bits()
            | Self::ILLEGAL_COMMAND.bits()
            | Self::CARD_ECC_FAILED.bits()
            | Self::CARD_CONTROLLER_ERROR.bits()
            | Self::ERROR.bits()
            | Self::CID_CSD_OVERWRITE.bits()
            | Self::AUTHENTICATION_SEQUENCE_ERROR.bits();
    }
}

/// CURRENT_STATE field of an R1 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardState {
    Idle = 0,
    Ready = 1,
    Identify = 2,
    Standby = 3,
    Transfer = 4,
    SendData = 5,
    ReceiveData = 6,
    Program = 7,
    Disconnect = 8,
    Reserved,
}

impl CardState {
    pub fn from_r1(response: u32) -> Self {
        match (response & 0x1E00) >> 9 {
            0 => CardState::Idle,
            1 => CardState::Ready,
            2 => CardState::Identify,
            3 => CardState::Standby,
            4 => CardState::Transfer,
            5 => CardState::SendData,
            6 => CardState::ReceiveData,
            7 => CardState::Program,
            8 => CardState::Disconnect,
            _ => CardState::Reserved,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SdOcrFlag: u32 {
        const VDD_29_30 = 1 << 17;
        const VDD_30_31 = 1 << 18;
        const VDD_31_32 = 1 << 19;
        const VDD_32_33 = 1 << 20;
        const VDD_33_34 = 1 << 21;
        const VDD_34_35 = 1 << 22;
        const VDD_35_36 = 1 << 23;
        /// HCS in the request, CCS in the response.
        const CARD_CAPACITY_SUPPORT = 1 << 30;
        /// Set once the card has finished its power-up routine.
        const POWER_UP_BUSY = 1 << 31;
    }
}

pub const MMC_OCR_V170TO195_SHIFT: u32 = 7;
pub const MMC_OCR_V270TO360_SHIFT: u32 = 15;
pub const MMC_OCR_ACCESS_MODE_SHIFT: u32 = 29;
pub const MMC_OCR_BUSY_MASK: u32 = 1 << 31;

pub const MMC_SWITCH_COMMAND_SET_SHIFT: u32 = 0;
pub const MMC_SWITCH_VALUE_SHIFT: u32 = 8;
pub const MMC_SWITCH_BYTE_INDEX_SHIFT: u32 = 16;
pub const MMC_SWITCH_ACCESS_MODE_SHIFT: u32 = 24;

pub const MMC_POWER_CLASS_4BIT_MASK: u8 = 0x0F;
pub const MMC_POWER_CLASS_8BIT_MASK: u8 = 0xF0;

pub const MMC_BOOT_CONFIG_PARTITION_ACCESS_MASK: u8 = 0x07;
pub const MMC_BOOT_CONFIG_PARTITION_ENABLE_SHIFT: u8 = 3;
pub const MMC_BOOT_CONFIG_PARTITION_ENABLE_MASK: u8 = 0x38;
pub const MMC_BOOT_CONFIG_ACK_SHIFT: u8 = 6;
pub const MMC_BOOT_CONFIG_ACK_MASK: u8 = 0x40;
pub const MMC_BOOT_BUS_WIDTH_WIDTH_MASK: u8 = 0x03;
pub const MMC_BOOT_BUS_WIDTH_RESET_SHIFT: u8 = 2;
pub const MMC_BOOT_BUS_WIDTH_RESET_MASK: u8 = 0x04;

/// Extended CSD revision from which the fast boot configuration is available.
pub const MMC_EXT_CSD_REVISION_FAST_BOOT: u8 = 3;

/// Frequency unit of TRAN_SPEED, already divided by ten.
pub const MMC_TRANSFER_SPEED_FREQUENCY_UNIT: [u32; 4] = [100_000, 1_000_000, 10_000_000, 100_000_000];
/// Multiplier of TRAN_SPEED, scaled by ten.
pub const MMC_TRANSFER_SPEED_MULTIPLIER: [u32; 16] =
    [0, 10, 12, 13, 15, 20, 26, 30, 35, 40, 45, 52, 55, 60, 70, 80];
pub const MMC_TRANSFER_SPEED_DIVIDER: u32 = 10;
