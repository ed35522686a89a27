use crate::constants::SDMMC_DEFAULT_BLOCK_SIZE;

/// Byte offsets into the 512 byte Extended CSD.
pub mod index {
    pub const ERASE_GROUP_DEF: usize = 175;
    pub const BOOT_BUS_WIDTH: usize = 177;
    pub const BOOT_CONFIG: usize = 179;
    pub const ERASED_MEM_CONT: usize = 181;
    pub const BUS_WIDTH: usize = 183;
    pub const HS_TIMING: usize = 185;
    pub const POWER_CLASS: usize = 187;
    pub const CMD_SET_REV: usize = 189;
    pub const CMD_SET: usize = 191;
    pub const EXT_CSD_REV: usize = 192;
    pub const CSD_STRUCTURE: usize = 194;
    pub const CARD_TYPE: usize = 196;
    pub const PWR_CL_52_195: usize = 200;
    pub const PWR_CL_26_195: usize = 201;
    pub const PWR_CL_52_360: usize = 202;
    pub const PWR_CL_26_360: usize = 203;
    pub const MIN_PERF_R_4_26: usize = 205;
    pub const MIN_PERF_W_4_26: usize = 206;
    pub const MIN_PERF_R_8_26_4_52: usize = 207;
    pub const MIN_PERF_W_8_26_4_52: usize = 208;
    pub const MIN_PERF_R_8_52: usize = 209;
    pub const MIN_PERF_W_8_52: usize = 210;
    pub const SEC_COUNT: usize = 212;
    pub const S_A_TIMEOUT: usize = 217;
    pub const S_C_VCCQ: usize = 219;
    pub const S_C_VCC: usize = 220;
    pub const HC_WP_GRP_SIZE: usize = 221;
    pub const REL_WR_SEC_C: usize = 222;
    pub const ERASE_TIMEOUT_MULT: usize = 223;
    pub const HC_ERASE_GRP_SIZE: usize = 224;
    pub const ACC_SIZE: usize = 225;
    pub const BOOT_SIZE_MULT: usize = 226;
    pub const BOOT_INFO: usize = 228;
    pub const S_CMD_SET: usize = 504;
}

pub const CARD_TYPE_HS_26MHZ: u8 = 1 << 0;
pub const CARD_TYPE_HS_52MHZ: u8 = 1 << 1;
pub const BOOT_INFO_ALT_BOOT: u8 = 1 << 0;
pub const HS_TIMING_HIGH_SPEED: u8 = 1;
pub const ERASE_GROUP_DEF_ENABLE: u8 = 1;

/// One boot partition holds BOOT_SIZE_MULT units of 128 KiB.
const BOOT_SIZE_UNIT_BYTES: u32 = 128 * 1024;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MmcExtCsd {
    pub high_density_erase_group_definition: u8,
    pub boot_data_bus_width: u8,
    pub boot_config: u8,
    pub erase_memory_content: u8,
    pub data_bus_width: u8,
    pub high_speed_timing: u8,
    pub power_class: u8,
    pub command_set_revision: u8,
    pub command_set: u8,
    pub extended_csd_version: u8,
    pub csd_structure_version: u8,
    pub card_type: u8,
    pub power_class_52mhz_195v: u8,
    pub power_class_26mhz_195v: u8,
    pub power_class_52mhz_360v: u8,
    pub power_class_26mhz_360v: u8,
    pub min_read_performance_4bit_26mhz: u8,
    pub min_write_performance_4bit_26mhz: u8,
    pub min_read_performance_8bit_26mhz_4bit_52mhz: u8,
    pub min_write_performance_8bit_26mhz_4bit_52mhz: u8,
    pub min_read_performance_8bit_52mhz: u8,
    pub min_write_performance_8bit_52mhz: u8,
    pub sector_count: u32,
    pub sleep_awake_timeout: u8,
    pub sleep_current_vccq: u8,
    pub sleep_current_vcc: u8,
    pub high_capacity_write_protect_group_size: u8,
    pub reliable_write_sector_count: u8,
    pub high_capacity_erase_timeout: u8,
    pub high_capacity_erase_unit_size: u8,
    pub access_size: u8,
    pub boot_size_multiplier: u8,
    pub boot_information: u8,
    pub supported_command_set: u8,
}

impl MmcExtCsd {
    /// Decodes the register from its bytes in bus order.
    pub fn decode(raw: &[u8; 512]) -> Self {
        MmcExtCsd {
            high_density_erase_group_definition: raw[index::ERASE_GROUP_DEF],
            boot_data_bus_width: raw[index::BOOT_BUS_WIDTH],
            boot_config: raw[index::BOOT_CONFIG],
            erase_memory_content: raw[index::ERASED_MEM_CONT],
            data_bus_width: raw[index::BUS_WIDTH],
            high_speed_timing: raw[index::HS_TIMING],
            power_class: raw[index::POWER_CLASS],
            command_set_revision: raw[index::CMD_SET_REV],
            command_set: raw[index::CMD_SET],
            extended_csd_version: raw[index::EXT_CSD_REV],
            csd_structure_version: raw[index::CSD_STRUCTURE],
            card_type: raw[index::CARD_TYPE],
            power_class_52mhz_195v: raw[index::PWR_CL_52_195],
            power_class_26mhz_195v: raw[index::PWR_CL_26_195],
            power_class_52mhz_360v: raw[index::PWR_CL_52_360],
            power_class_26mhz_360v: raw[index::PWR_CL_26_360],
            min_read_performance_4bit_26mhz: raw[index::MIN_PERF_R_4_26],
            min_write_performance_4bit_26mhz: raw[index::MIN_PERF_W_4_26],
            min_read_performance_8bit_26mhz_4bit_52mhz: raw[index::MIN_PERF_R_8_26_4_52],
            min_write_performance_8bit_26mhz_4bit_52mhz: raw[index::MIN_PERF_W_8_26_4_52],
            min_read_performance_8bit_52mhz: raw[index::MIN_PERF_R_8_52],
            min_write_performance_8bit_52mhz: raw[index::MIN_PERF_W_8_52],
            sector_count: u32::from_le_bytes([
                raw[index::SEC_COUNT],
                raw[index::SEC_COUNT + 1],
                raw[index::SEC_COUNT + 2],
                raw[index::SEC_COUNT + 3],
            ]),
            sleep_awake_timeout: raw[index::S_A_TIMEOUT],
            sleep_current_vccq: raw[index::S_C_VCCQ],
            sleep_current_vcc: raw[index::S_C_VCC],
            high_capacity_write_protect_group_size: raw[index::HC_WP_GRP_SIZE],
            reliable_write_sector_count: raw[index::REL_WR_SEC_C],
            high_capacity_erase_timeout: raw[index::ERASE_TIMEOUT_MULT],
            high_capacity_erase_unit_size: raw[index::HC_ERASE_GRP_SIZE],
            access_size: raw[index::ACC_SIZE],
            boot_size_multiplier: raw[index::BOOT_SIZE_MULT],
            boot_information: raw[index::BOOT_INFO],
            supported_command_set: raw[index::S_CMD_SET],
        }
    }

    pub fn boot_partition_blocks(&self) -> u32 {
        BOOT_SIZE_UNIT_BYTES * self.boot_size_multiplier as u32 / SDMMC_DEFAULT_BLOCK_SIZE
    }

    pub fn supports_alternate_boot(&self) -> bool {
        self.boot_information & BOOT_INFO_ALT_BOOT != 0
    }
}
