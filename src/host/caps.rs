use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HostCapabilityFlags: u32 {
        const SUPPORT_ADMA = 1 << 0;
        const SUPPORT_HIGH_SPEED = 1 << 1;
        const SUPPORT_DMA = 1 << 2;
        const SUPPORT_SUSPEND_RESUME = 1 << 3;
        const SUPPORT_V330 = 1 << 4;
        const SUPPORT_V300 = 1 << 5;
        const SUPPORT_V180 = 1 << 6;
        const SUPPORT_4BIT = 1 << 7;
        const SUPPORT_8BIT = 1 << 8;
        const SUPPORT_AUTO_CMD12 = 1 << 9;
    }
}

/// Capability snapshot of the host controller, taken once per bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapability {
    pub spec_version: u32,
    pub vendor_version: u32,
    pub max_block_length: u32,
    pub max_block_count: u32,
    pub flags: HostCapabilityFlags,
}

impl HostCapability {
    pub const fn empty() -> Self {
        Self {
            spec_version: 0,
            vendor_version: 0,
            max_block_length: 0,
            max_block_count: 0,
            flags: HostCapabilityFlags::empty(),
        }
    }

    pub fn supports(&self, flags: HostCapabilityFlags) -> bool {
        self.flags.contains(flags)
    }
}

impl Default for HostCapability {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostBusWidth {
    OneBit,
    FourBit,
    EightBit,
}
