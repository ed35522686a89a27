//! MMC bus width test (BUS_TEST_W / BUS_TEST_R).
//!
//! The card answers BUS_TEST_R with the bit inversion of what it latched on
//! the first two bus cycles. XORing both blocks under a mask therefore tells
//! whether every line of the intended width is wired.

use log::debug;

use crate::card::CardBase;
use crate::constants::MmcCmd;
use crate::err::{SdmmcError, SdmmcResult};
use crate::host::{EndianMode, HostBusWidth, HostCmd, HostData, HostTransfer, ResponseType, SdmmcHostDevice};
use crate::tools::host_word;

/// Largest test block, the 8-bit one.
const BUS_TEST_MAX_BYTES: usize = 8;

/// Test block for one bus width, written LSB first as it goes on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusTestPattern {
    pub block_size: u32,
    pub pattern: u32,
    pub xor_mask: u32,
    pub xor_result: u32,
}

impl BusTestPattern {
    pub const fn for_width(width: HostBusWidth) -> Self {
        match width {
            HostBusWidth::EightBit => BusTestPattern {
                block_size: 8,
                pattern: 0xAA55,
                xor_mask: 0xFFFF,
                xor_result: 0xFFFF,
            },
            HostBusWidth::FourBit => BusTestPattern {
                block_size: 4,
                pattern: 0x5A,
                xor_mask: 0xFF,
                xor_result: 0xFF,
            },
            HostBusWidth::OneBit => BusTestPattern {
                block_size: 4,
                pattern: 0x80,
                xor_mask: 0xFF,
                xor_result: 0xC0,
            },
        }
    }

    /// First word of the send buffer as the host expects it in `mode`.
    pub fn send_word(&self, mode: EndianMode) -> u32 {
        mode.lsb_first(self.pattern)
    }

    /// Compares a received first word against the sent one.
    pub fn verify(&self, mode: EndianMode, received: u32) -> bool {
        let mask = mode.lsb_first(self.xor_mask);
        let result = mode.lsb_first(self.xor_result);
        (self.send_word(mode) ^ received) & mask == result
    }
}

impl<D: SdmmcHostDevice> CardBase<D> {
    fn bus_test_transfer(&mut self, index: MmcCmd, mut data: HostData<'_>) -> SdmmcResult {
        data.enable_ignore_error = true;
        let mut content =
            HostTransfer::with_data(HostCmd::new(index as u32, 0, ResponseType::R1), data);
        self.host.transfer_r1(&mut content)
    }

    /// Runs the test pattern exchange on the bus width the host is set to.
    pub(crate) fn bus_test(&mut self, width: HostBusWidth) -> SdmmcResult {
        let mode = self.host.endian_mode();
        let test = BusTestPattern::for_width(width);
        let len = test.block_size as usize;

        let mut send = [0u8; BUS_TEST_MAX_BYTES];
        send[..4].copy_from_slice(&test.send_word(mode).to_le_bytes());
        self.bus_test_transfer(MmcCmd::BusTestWrite, HostData::write(test.block_size, 1, &send[..len]))
            .map_err(|_| SdmmcError::SendTestPatternFailed)?;

        let mut received = [0u8; BUS_TEST_MAX_BYTES];
        self.bus_test_transfer(
            MmcCmd::BusTestRead,
            HostData::read(test.block_size, 1, &mut received[..len]),
        )
        .map_err(|_| SdmmcError::ReceiveTestPatternFailed)?;

        let word = host_word(&received, 0)?;
        if !test.verify(mode, word) {
            debug!("bus test {:?}: sent {:#x}, got {:#x}", width, test.send_word(mode), word);
            return Err(SdmmcError::Fail);
        }
        Ok(())
    }
}
