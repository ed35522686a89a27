use log::{debug, warn};

use super::{MmcCard, MmcCardFlags, VoltageWindow};
use crate::card::ext_csd::{
    CARD_TYPE_HS_26MHZ, CARD_TYPE_HS_52MHZ, ERASE_GROUP_DEF_ENABLE, HS_TIMING_HIGH_SPEED, MmcExtCsd, index,
};
use crate::constants::*;
use crate::err::{SdmmcError, SdmmcResult};
use crate::host::{
    HostBusWidth, HostCapabilityFlags, HostCmd, HostData, HostTransfer, ResponseType, SdmmcHostDevice,
};

/// Access field of the SWITCH argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtCsdAccessMode {
    CommandSet = 0,
    SetBits = 1,
    ClearBits = 2,
    WriteByte = 3,
}

/// Standard MMC command set.
pub const MMC_COMMAND_SET_STANDARD: u8 = 0;

/// One SWITCH of an Extended CSD byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtCsdConfig {
    pub access_mode: ExtCsdAccessMode,
    pub index: u8,
    pub value: u8,
    pub command_set: u8,
}

impl ExtCsdConfig {
    pub fn write_byte(index: usize, value: u8) -> Self {
        ExtCsdConfig {
            access_mode: ExtCsdAccessMode::WriteByte,
            index: index as u8,
            value,
            command_set: MMC_COMMAND_SET_STANDARD,
        }
    }

    pub fn set_bits(index: usize, value: u8) -> Self {
        ExtCsdConfig {
            access_mode: ExtCsdAccessMode::SetBits,
            ..Self::write_byte(index, value)
        }
    }

    pub fn argument(&self) -> u32 {
        ((self.command_set as u32) << MMC_SWITCH_COMMAND_SET_SHIFT)
            | ((self.value as u32) << MMC_SWITCH_VALUE_SHIFT)
            | ((self.index as u32) << MMC_SWITCH_BYTE_INDEX_SHIFT)
            | ((self.access_mode as u32) << MMC_SWITCH_ACCESS_MODE_SHIFT)
    }

    /// The byte as the card holds it after the switch.
    fn apply(&self, current: u8) -> u8 {
        match self.access_mode {
            ExtCsdAccessMode::CommandSet => current,
            ExtCsdAccessMode::SetBits => current | self.value,
            ExtCsdAccessMode::ClearBits => current & !self.value,
            ExtCsdAccessMode::WriteByte => self.value,
        }
    }
}

/// BUS_WIDTH value for a data bus width.
fn bus_width_value(width: HostBusWidth) -> u8 {
    match width {
        HostBusWidth::OneBit => 0,
        HostBusWidth::FourBit => 1,
        HostBusWidth::EightBit => 2,
    }
}

impl<D: SdmmcHostDevice> MmcCard<D> {
    /// SWITCH then wait for the card to leave the programming state.
    pub fn switch_ext_csd(&mut self, config: ExtCsdConfig) -> SdmmcResult {
        let mut content = HostTransfer::new(HostCmd::new(
            MmcCmd::Switch as u32,
            config.argument(),
            ResponseType::R1b,
        ));
        self.base.host.transfer_r1(&mut content)?;
        self.base.wait_write_complete()?;

        let slot = &mut self.raw_ext_csd[config.index as usize];
        *slot = config.apply(*slot);
        self.ext_csd = MmcExtCsd::decode(&self.raw_ext_csd);
        Ok(())
    }

    pub(crate) fn send_extended_csd(&mut self) -> SdmmcResult {
        let mut raw = [0u8; MMC_EXTENDED_CSD_BYTES];
        let data = HostData::read(MMC_EXTENDED_CSD_BYTES as u32, 1, &mut raw);
        let mut content = HostTransfer::with_data(
            HostCmd::new(MmcCmd::SendExtendedCsd as u32, 0, ResponseType::R1),
            data,
        );
        self.base.host.transfer_r1(&mut content)?;

        self.base.host.endian_mode().to_bus_order(&mut raw);
        self.raw_ext_csd = raw;
        self.ext_csd = MmcExtCsd::decode(&self.raw_ext_csd);

        if self.ext_csd.card_type & CARD_TYPE_HS_26MHZ != 0 {
            self.flags |= MmcCardFlags::SUPPORT_HIGH_SPEED_26MHZ;
        }
        if self.ext_csd.card_type & CARD_TYPE_HS_52MHZ != 0 {
            self.flags |= MmcCardFlags::SUPPORT_HIGH_SPEED_52MHZ;
        }
        if self.flags.contains(MmcCardFlags::SUPPORT_HIGH_CAPACITY) {
            self.user_partition_blocks = self.ext_csd.sector_count;
        }
        self.boot_partition_blocks = self.ext_csd.boot_partition_blocks();
        if self.ext_csd.supports_alternate_boot() {
            self.flags |= MmcCardFlags::SUPPORT_ALTERNATE_BOOT;
        }

        debug!(
            "EXT_CSD rev {}, card type {:#x}, sectors {}, boot blocks {}",
            self.ext_csd.extended_csd_version,
            self.ext_csd.card_type,
            self.ext_csd.sector_count,
            self.boot_partition_blocks
        );
        Ok(())
    }

    /// POWER_CLASS value for `width` at the voltage and speed in use.
    pub(crate) fn power_class(&self, width: HostBusWidth) -> u8 {
        let (hs52, hs26) = match self.host_voltage_window {
            VoltageWindow::V170to195 => (
                self.ext_csd.power_class_52mhz_195v,
                self.ext_csd.power_class_26mhz_195v,
            ),
            VoltageWindow::V270to360 => (
                self.ext_csd.power_class_52mhz_360v,
                self.ext_csd.power_class_26mhz_360v,
            ),
        };

        let class = if self.flags.contains(MmcCardFlags::SUPPORT_HIGH_SPEED_52MHZ) {
            hs52
        } else if self.flags.contains(MmcCardFlags::SUPPORT_HIGH_SPEED_26MHZ) {
            hs26
        } else {
            0
        };

        match width {
            HostBusWidth::OneBit => 0,
            HostBusWidth::FourBit => class & MMC_POWER_CLASS_4BIT_MASK,
            HostBusWidth::EightBit => (class & MMC_POWER_CLASS_8BIT_MASK) >> 4,
        }
    }

    fn set_data_bus_width(&mut self, width: HostBusWidth) -> SdmmcResult {
        let power_class = self.power_class(width);
        self.switch_ext_csd(ExtCsdConfig::write_byte(index::POWER_CLASS, power_class))
            .map_err(|_| SdmmcError::ConfigureExtendedCsdFailed)?;
        self.switch_ext_csd(ExtCsdConfig::write_byte(index::BUS_WIDTH, bus_width_value(width)))
            .map_err(|_| SdmmcError::ConfigureExtendedCsdFailed)
    }

    fn try_data_bus_width(&mut self, width: HostBusWidth) -> SdmmcResult {
        self.base.host.bus_width_set(width);
        self.base.bus_test(width)?;
        self.set_data_bus_width(width)
    }

    /// Widest bus both sides handle; falls back to 1-bit.
    pub(crate) fn set_max_data_bus_width(&mut self) -> HostBusWidth {
        let capability = *self.base.host.capability();
        let candidates = [
            (HostCapabilityFlags::SUPPORT_8BIT, HostBusWidth::EightBit),
            (HostCapabilityFlags::SUPPORT_4BIT, HostBusWidth::FourBit),
        ];

        for (flag, width) in candidates {
            if !capability.supports(flag) {
                continue;
            }
            match self.try_data_bus_width(width) {
                Ok(()) => {
                    debug!("MMC bus width {:?}", width);
                    return width;
                }
                Err(err) => warn!("MMC bus width {:?} rejected: {}", width, err),
            }
        }

        self.base.host.bus_width_set(HostBusWidth::OneBit);
        debug!("MMC bus width {:?}", HostBusWidth::OneBit);
        HostBusWidth::OneBit
    }

    pub(crate) fn switch_high_speed(&mut self) -> SdmmcResult {
        if !self
            .flags
            .intersects(MmcCardFlags::SUPPORT_HIGH_SPEED_26MHZ | MmcCardFlags::SUPPORT_HIGH_SPEED_52MHZ)
        {
            debug!("MMC card type {:#x} has no high speed tier", self.ext_csd.card_type);
            return Ok(());
        }

        self.switch_ext_csd(ExtCsdConfig::write_byte(index::HS_TIMING, HS_TIMING_HIGH_SPEED))
            .map_err(|_| SdmmcError::ConfigureExtendedCsdFailed)?;

        let clock = if self.flags.contains(MmcCardFlags::SUPPORT_HIGH_SPEED_52MHZ) {
            MMC_CLOCK_52MHZ
        } else {
            MMC_CLOCK_26MHZ
        };
        self.base.set_bus_clock(clock);
        self.flags |= MmcCardFlags::SUPPORT_HIGH_SPEED;
        Ok(())
    }

    /// Picks the erase group size, enabling the high capacity unit when the card has one.
    pub(crate) fn set_max_erase_unit_size(&mut self) -> SdmmcResult {
        let unit = self.ext_csd.high_capacity_erase_unit_size as u32;
        let use_high_capacity_unit = self.flags.contains(MmcCardFlags::SUPPORT_HIGH_CAPACITY)
            && unit != 0
            && self.ext_csd.high_capacity_erase_timeout != 0;

        if !use_high_capacity_unit {
            self.erase_group_blocks = self.csd.erase_group_blocks();
            return Ok(());
        }

        // HC_ERASE_GRP_SIZE counts units of 512 KiB.
        self.erase_group_blocks = unit * 1024;
        self.switch_ext_csd(ExtCsdConfig::set_bits(index::ERASE_GROUP_DEF, ERASE_GROUP_DEF_ENABLE))
            .map_err(|_| SdmmcError::ConfigureExtendedCsdFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_argument_layout() {
        let config = ExtCsdConfig::write_byte(index::BUS_WIDTH, 2);
        assert_eq!(config.argument(), 0x03B7_0200);

        let config = ExtCsdConfig::set_bits(index::ERASE_GROUP_DEF, ERASE_GROUP_DEF_ENABLE);
        assert_eq!(config.argument(), 0x01AF_0100);
    }

    #[test]
    fn test_switch_cache_update() {
        let write = ExtCsdConfig::write_byte(index::BOOT_CONFIG, 0x09);
        assert_eq!(write.apply(0x48), 0x09);
        let set = ExtCsdConfig::set_bits(index::ERASE_GROUP_DEF, 1);
        assert_eq!(set.apply(0x10), 0x11);
        let clear = ExtCsdConfig {
            access_mode: ExtCsdAccessMode::ClearBits,
            ..set
        };
        assert_eq!(clear.apply(0x11), 0x10);
    }
}
