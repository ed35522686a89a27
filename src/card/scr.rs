use bitflags::bitflags;

crate::register_fields! {
    SCR_STRUCTURE: [63:60];
    SCR_SD_SPEC: [59:56];
    SCR_DATA_STAT_AFTER_ERASE: [55:55];
    SCR_SD_SECURITY: [54:52];
    SCR_SD_BUS_WIDTHS: [51:48];
    SCR_SD_SPEC3: [47:47];
    SCR_EX_SECURITY: [46:43];
    SCR_CMD_SUPPORT: [33:32];
    SCR_RESERVED_FOR_MANUFACTURER: [31:0];
}

/// Bit of SD_BUS_WIDTHS advertising 4-bit support.
pub const SCR_BUS_WIDTH_4BIT: u8 = 1 << 2;

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct ScrFlags: u16 {
        const DATA_STATUS_AFTER_ERASE = 1 << 0; /* Data status after erases [55:55] */
        const SD_SPECIFICATION3 = 1 << 1; /* SD specification 3.00 or higher [47:47] */
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SdSpecVersion {
    V1_0,
    V1_1,
    V2_0,
    V3_0,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SdScr {
    // SCR Structure [63:60]
    pub scr_structure: u8,
    // SD memory card specification version [59:56]
    pub sd_specification: u8,
    pub flags: ScrFlags,
    // Security specification supported [54:52]
    pub sd_security: u8,
    // Data bus widths supported [51:48]
    pub sd_bus_widths: u8,
    // Extended security support [46:43]
    pub extended_security: u8,
    // Command support bits [33:32] 33-support CMD23, 32-support cmd20
    pub command_support: u8,
    // Reserved for manufacturer usage [31:0]
    pub reserved_for_manufacturer: u32,
}

impl SdScr {
    /// Decodes the register from its two words in bus order, MSB first.
    pub fn decode(raw: &[u32; 2]) -> Self {
        let reg = ((raw[0] as u128) << 32) | raw[1] as u128;

        let mut flags = ScrFlags::empty();
        if SCR_DATA_STAT_AFTER_ERASE.is_set(reg) {
            flags |= ScrFlags::DATA_STATUS_AFTER_ERASE;
        }
        if SCR_SD_SPEC3.is_set(reg) {
            flags |= ScrFlags::SD_SPECIFICATION3;
        }

        SdScr {
            scr_structure: SCR_STRUCTURE.read(reg) as u8,
            sd_specification: SCR_SD_SPEC.read(reg) as u8,
            flags,
            sd_security: SCR_SD_SECURITY.read(reg) as u8,
            sd_bus_widths: SCR_SD_BUS_WIDTHS.read(reg) as u8,
            extended_security: SCR_EX_SECURITY.read(reg) as u8,
            command_support: SCR_CMD_SUPPORT.read(reg) as u8,
            reserved_for_manufacturer: SCR_RESERVED_FOR_MANUFACTURER.read(reg),
        }
    }

    pub fn version(&self) -> Option<SdSpecVersion> {
        match self.sd_specification {
            0 => Some(SdSpecVersion::V1_0),
            1 => Some(SdSpecVersion::V1_1),
            2 if self.flags.contains(ScrFlags::SD_SPECIFICATION3) => Some(SdSpecVersion::V3_0),
            2 => Some(SdSpecVersion::V2_0),
            _ => None,
        }
    }

    pub fn supports_4bit(&self) -> bool {
        self.sd_bus_widths & SCR_BUS_WIDTH_4BIT != 0
    }
}
