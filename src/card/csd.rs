use bitflags::bitflags;

use crate::constants::SDMMC_DEFAULT_BLOCK_SIZE;
use crate::err::{SdmmcError, SdmmcResult};
use crate::regs::{RegField, words_to_reg};

crate::register_fields! {
    CSD_STRUCTURE: [127:126];
    CSD_TAAC: [119:112];
    CSD_NSAC: [111:104];
    CSD_TRAN_SPEED: [103:96];
    CSD_CCC: [95:84];
    CSD_READ_BL_LEN: [83:80];
    CSD_READ_BL_PARTIAL: [79:79];
    CSD_WRITE_BLK_MISALIGN: [78:78];
    CSD_READ_BLK_MISALIGN: [77:77];
    CSD_DSR_IMP: [76:76];
    CSD_C_SIZE: [73:62];
    CSD_VDD_R_CURR_MIN: [61:59];
    CSD_VDD_R_CURR_MAX: [58:56];
    CSD_VDD_W_CURR_MIN: [55:53];
    CSD_VDD_W_CURR_MAX: [52:50];
    CSD_C_SIZE_MULT: [49:47];
    CSD_WP_GRP_ENABLE: [31:31];
    CSD_R2W_FACTOR: [28:26];
    CSD_WRITE_BL_LEN: [25:22];
    CSD_WRITE_BL_PARTIAL: [21:21];
    CSD_FILE_FORMAT_GRP: [15:15];
    CSD_COPY: [14:14];
    CSD_PERM_WRITE_PROTECT: [13:13];
    CSD_TMP_WRITE_PROTECT: [12:12];
    CSD_FILE_FORMAT: [11:10];

    /// C_SIZE of CSD version 2.0 (SDHC/SDXC).
    SD_CSD_V2_C_SIZE: [69:48];
    SD_CSD_ERASE_BLK_EN: [46:46];
    SD_CSD_SECTOR_SIZE: [45:39];
    SD_CSD_WP_GRP_SIZE: [38:32];

    MMC_CSD_SPEC_VERS: [125:122];
    MMC_CSD_ERASE_GRP_SIZE: [46:42];
    MMC_CSD_ERASE_GRP_MULT: [41:37];
    MMC_CSD_WP_GRP_SIZE: [36:32];
    MMC_CSD_DEFAULT_ECC: [30:29];
    MMC_CSD_CONTENT_PROT_APP: [16:16];
    MMC_CSD_ECC: [9:8];
}

/// C_SIZE value marking an MMC whose capacity lives in EXT_CSD SEC_COUNT.
pub const MMC_CSD_C_SIZE_HIGH_CAPACITY: u32 = 0xFFF;
/// SD v2 C_SIZE from which the card is SDXC.
pub const SD_CSD_SDXC_C_SIZE: u32 = 0xFFFF;

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct CsdFlags: u16 {
        const READ_BLOCK_PARTIAL = 1 << 0;              /* Partial blocks for read allowed [79:79] */
        const WRITE_BLOCK_MISALIGN = 1 << 1;            /* Write block misalignment [78:78] */
        const READ_BLOCK_MISALIGN = 1 << 2;             /* Read block misalignment [77:77] */
        const DSR_IMPLEMENTED = 1 << 3;                 /* DSR implemented [76:76] */
        const ERASE_BLOCK_ENABLED = 1 << 4;             /* Erase single block enabled [46:46], SD only */
        const WRITE_PROTECT_GROUP_ENABLED = 1 << 5;     /* Write protect group enabled [31:31] */
        const WRITE_BLOCK_PARTIAL = 1 << 6;             /* Partial blocks for write allowed [21:21] */
        const FILE_FORMAT_GROUP = 1 << 7;               /* File format group [15:15] */
        const COPY = 1 << 8;                            /* Copy flag [14:14] */
        const PERMANENT_WRITE_PROTECT = 1 << 9;         /* Permanent write protection [13:13] */
        const TEMPORARY_WRITE_PROTECT = 1 << 10;        /* Temporary write protection [12:12] */
        const CONTENT_PROTECT_APP = 1 << 11;            /* Content protection application [16:16], MMC only */
    }
}

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct CardCmdClass: u16 {
        const BASIC = 1 << 0;
        const BLOCK_READ = 1 << 2;
        const BLOCK_WRITE = 1 << 4;
        const ERASE = 1 << 5;
        const WRITE_PROTECT = 1 << 6;
        const LOCK_CARD = 1 << 7;
        const APPLICATION_SPECIFIC = 1 << 8;
        const INPUT_OUTPUT_MODE = 1 << 9;
        const SWITCH = 1 << 10;
    }
}

/// Capacity derived from a CSD, always in 512 byte blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardGeometry {
    pub block_count: u32,
    pub block_size: u32,
}

fn common_flags(reg: u128) -> CsdFlags {
    let table: [(RegField, CsdFlags); 10] = [
        (CSD_READ_BL_PARTIAL, CsdFlags::READ_BLOCK_PARTIAL),
        (CSD_WRITE_BLK_MISALIGN, CsdFlags::WRITE_BLOCK_MISALIGN),
        (CSD_READ_BLK_MISALIGN, CsdFlags::READ_BLOCK_MISALIGN),
        (CSD_DSR_IMP, CsdFlags::DSR_IMPLEMENTED),
        (CSD_WP_GRP_ENABLE, CsdFlags::WRITE_PROTECT_GROUP_ENABLED),
        (CSD_WRITE_BL_PARTIAL, CsdFlags::WRITE_BLOCK_PARTIAL),
        (CSD_FILE_FORMAT_GRP, CsdFlags::FILE_FORMAT_GROUP),
        (CSD_COPY, CsdFlags::COPY),
        (CSD_PERM_WRITE_PROTECT, CsdFlags::PERMANENT_WRITE_PROTECT),
        (CSD_TMP_WRITE_PROTECT, CsdFlags::TEMPORARY_WRITE_PROTECT),
    ];

    table
        .iter()
        .filter(|(field, _)| field.is_set(reg))
        .fold(CsdFlags::empty(), |flags, (_, flag)| flags | *flag)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SdCsd {
    pub csd_structure: u8,
    pub data_read_access_time1: u8,
    pub data_read_access_time2: u8,
    pub transfer_speed: u8,
    pub card_command_classes: CardCmdClass,
    pub read_block_length: u8,
    pub flags: CsdFlags,
    pub device_size: u32,
    pub read_current_vdd_min: u8,
    pub read_current_vdd_max: u8,
    pub write_current_vdd_min: u8,
    pub write_current_vdd_max: u8,
    pub device_size_multiplier: u8,
    pub erase_sector_size: u8,
    pub write_protect_group_size: u8,
    pub write_speed_factor: u8,
    pub write_block_length: u8,
    pub file_format: u8,
}

impl SdCsd {
    pub fn decode(raw: &[u32; 4]) -> Self {
        let reg = words_to_reg(raw);
        let csd_structure = CSD_STRUCTURE.read(reg) as u8;

        let mut csd = SdCsd {
            csd_structure,
            data_read_access_time1: CSD_TAAC.read(reg) as u8,
            data_read_access_time2: CSD_NSAC.read(reg) as u8,
            transfer_speed: CSD_TRAN_SPEED.read(reg) as u8,
            card_command_classes: CardCmdClass::from_bits_retain(CSD_CCC.read(reg) as u16),
            read_block_length: CSD_READ_BL_LEN.read(reg) as u8,
            flags: common_flags(reg),
            erase_sector_size: SD_CSD_SECTOR_SIZE.read(reg) as u8,
            write_protect_group_size: SD_CSD_WP_GRP_SIZE.read(reg) as u8,
            write_speed_factor: CSD_R2W_FACTOR.read(reg) as u8,
            write_block_length: CSD_WRITE_BL_LEN.read(reg) as u8,
            file_format: CSD_FILE_FORMAT.read(reg) as u8,
            ..Default::default()
        };

        if SD_CSD_ERASE_BLK_EN.is_set(reg) {
            csd.flags |= CsdFlags::ERASE_BLOCK_ENABLED;
        }

        if csd_structure == 0 {
            csd.device_size = CSD_C_SIZE.read(reg);
            csd.read_current_vdd_min = CSD_VDD_R_CURR_MIN.read(reg) as u8;
            csd.read_current_vdd_max = CSD_VDD_R_CURR_MAX.read(reg) as u8;
            csd.write_current_vdd_min = CSD_VDD_W_CURR_MIN.read(reg) as u8;
            csd.write_current_vdd_max = CSD_VDD_W_CURR_MAX.read(reg) as u8;
            csd.device_size_multiplier = CSD_C_SIZE_MULT.read(reg) as u8;
        } else {
            csd.device_size = SD_CSD_V2_C_SIZE.read(reg);
        }

        csd
    }

    /// Block count and size, normalized to 512 byte blocks. `CardNotSupport`
    /// when the count does not fit a 32-bit block index.
    pub fn geometry(&self) -> SdmmcResult<CardGeometry> {
        let blocks = match self.csd_structure {
            0 => {
                let native = (self.device_size as u64 + 1) << (self.device_size_multiplier + 2);
                let block_size = 1u64 << self.read_block_length;
                native * block_size / SDMMC_DEFAULT_BLOCK_SIZE as u64
            }
            _ => (self.device_size as u64 + 1) * 1024,
        };
        let block_count = u32::try_from(blocks).map_err(|_| SdmmcError::CardNotSupport)?;
        Ok(CardGeometry {
            block_count,
            block_size: SDMMC_DEFAULT_BLOCK_SIZE,
        })
    }

    pub fn is_sdxc(&self) -> bool {
        self.csd_structure == 1 && self.device_size >= SD_CSD_SDXC_C_SIZE
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MmcCsd {
    pub csd_structure: u8,
    pub system_specification_version: u8,
    pub data_read_access_time1: u8,
    pub data_read_access_time2: u8,
    pub transfer_speed: u8,
    pub card_command_classes: CardCmdClass,
    pub read_block_length: u8,
    pub flags: CsdFlags,
    pub device_size: u32,
    pub read_current_vdd_min: u8,
    pub read_current_vdd_max: u8,
    pub write_current_vdd_min: u8,
    pub write_current_vdd_max: u8,
    pub device_size_multiplier: u8,
    pub erase_group_size: u8,
    pub erase_group_size_multiplier: u8,
    pub write_protect_group_size: u8,
    pub default_ecc: u8,
    pub write_speed_factor: u8,
    pub max_write_block_length: u8,
    pub file_format: u8,
    pub ecc: u8,
}

impl MmcCsd {
    pub fn decode(raw: &[u32; 4]) -> Self {
        let reg = words_to_reg(raw);

        let mut csd = MmcCsd {
            csd_structure: CSD_STRUCTURE.read(reg) as u8,
            system_specification_version: MMC_CSD_SPEC_VERS.read(reg) as u8,
            data_read_access_time1: CSD_TAAC.read(reg) as u8,
            data_read_access_time2: CSD_NSAC.read(reg) as u8,
            transfer_speed: CSD_TRAN_SPEED.read(reg) as u8,
            card_command_classes: CardCmdClass::from_bits_retain(CSD_CCC.read(reg) as u16),
            read_block_length: CSD_READ_BL_LEN.read(reg) as u8,
            flags: common_flags(reg),
            device_size: CSD_C_SIZE.read(reg),
            read_current_vdd_min: CSD_VDD_R_CURR_MIN.read(reg) as u8,
            read_current_vdd_max: CSD_VDD_R_CURR_MAX.read(reg) as u8,
            write_current_vdd_min: CSD_VDD_W_CURR_MIN.read(reg) as u8,
            write_current_vdd_max: CSD_VDD_W_CURR_MAX.read(reg) as u8,
            device_size_multiplier: CSD_C_SIZE_MULT.read(reg) as u8,
            erase_group_size: MMC_CSD_ERASE_GRP_SIZE.read(reg) as u8,
            erase_group_size_multiplier: MMC_CSD_ERASE_GRP_MULT.read(reg) as u8,
            write_protect_group_size: MMC_CSD_WP_GRP_SIZE.read(reg) as u8,
            default_ecc: MMC_CSD_DEFAULT_ECC.read(reg) as u8,
            write_speed_factor: CSD_R2W_FACTOR.read(reg) as u8,
            max_write_block_length: CSD_WRITE_BL_LEN.read(reg) as u8,
            file_format: CSD_FILE_FORMAT.read(reg) as u8,
            ecc: MMC_CSD_ECC.read(reg) as u8,
        };

        if MMC_CSD_CONTENT_PROT_APP.is_set(reg) {
            csd.flags |= CsdFlags::CONTENT_PROTECT_APP;
        }

        csd
    }

    /// Above 2 GB the C_SIZE field saturates and SEC_COUNT takes over.
    pub fn is_high_capacity(&self) -> bool {
        self.device_size == MMC_CSD_C_SIZE_HIGH_CAPACITY
    }

    /// User area size in 512 byte blocks, `None` for high capacity devices.
    pub fn user_partition_blocks(&self) -> Option<u32> {
        if self.is_high_capacity() {
            return None;
        }
        let blocks = (self.device_size + 1) << (self.device_size_multiplier + 2);
        let bytes = (blocks as u64) << self.read_block_length;
        Some((bytes / SDMMC_DEFAULT_BLOCK_SIZE as u64) as u32)
    }

    /// Erase group in blocks as described by the CSD.
    pub fn erase_group_blocks(&self) -> u32 {
        (self.erase_group_size as u32 + 1) * (self.erase_group_size_multiplier as u32 + 1)
    }

    /// Highest clock of the legacy timing from TRAN_SPEED.
    pub fn max_transfer_clock_hz(&self) -> u32 {
        use crate::constants::{
            MMC_TRANSFER_SPEED_DIVIDER, MMC_TRANSFER_SPEED_FREQUENCY_UNIT,
            MMC_TRANSFER_SPEED_MULTIPLIER,
        };

        // Units 4..7 are reserved.
        let unit = MMC_TRANSFER_SPEED_FREQUENCY_UNIT
            .get((self.transfer_speed & 0x7) as usize)
            .copied()
            .unwrap_or(0);
        let multiplier = MMC_TRANSFER_SPEED_MULTIPLIER[((self.transfer_speed & 0x78) >> 3) as usize];
        unit * multiplier / MMC_TRANSFER_SPEED_DIVIDER
    }
}
