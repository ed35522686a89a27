/// How the host assembles data-phase bytes into 32-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndianMode {
    /// First bus byte lands in bits 7:0.
    #[default]
    Little,
    /// First bus byte lands in bits 31:24.
    Big,
    /// First bus byte lands in bits 23:16.
    HalfWordBig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub endian_mode: EndianMode,
    /// Card detection through DAT3, not handled by the SD bring-up.
    pub card_detect_dat3: bool,
    /// Let the host issue STOP_TRANSMISSION after multiple block transfers.
    pub enable_auto_command12: bool,
    /// Ceiling for the ACMD41/CMD1 operating condition handshake.
    pub voltage_retries: u32,
    /// Ceiling for busy polls (SEND_STATUS and DAT0 level).
    pub busy_poll_retries: u32,
    pub busy_poll_interval_us: u32,
}

impl HostConfig {
    pub fn new(endian_mode: EndianMode) -> Self {
        Self {
            endian_mode,
            ..Default::default()
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            endian_mode: EndianMode::Little,
            card_detect_dat3: false,
            enable_auto_command12: false,
            voltage_retries: crate::constants::SDMMC_MAX_VOLTAGE_RETRIES,
            busy_poll_retries: 100_000,
            busy_poll_interval_us: 10,
        }
    }
}
