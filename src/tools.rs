use crate::err::{SdmmcError, SdmmcResult};
use crate::host::EndianMode;

/// Swaps the two bytes inside each 16-bit half word (`REV16`).
pub fn swap_half_word_byte_sequence_u32(value: u32) -> u32 {
    ((value & 0x00FF00FF) << 8) | ((value & 0xFF00FF00) >> 8)
}

/// Reverses the four bytes of a word (`REV`).
pub fn swap_word_byte_sequence_u32(value: u32) -> u32 {
    ((value & 0x000000FF) << 24)
        | ((value & 0x0000FF00) << 8)
        | ((value & 0x00FF0000) >> 8)
        | ((value & 0xFF000000) >> 24)
}

pub fn swap_half_word_sequence_u32(value: u32) -> u32 {
    value.rotate_left(16)
}

impl EndianMode {
    /// Host word to a word whose bits 31:24 hold the first byte on the bus.
    /// Used for registers the card sends MSB first (SCR, switch status).
    pub fn msb_first(self, word: u32) -> u32 {
        match self {
            EndianMode::Little => swap_word_byte_sequence_u32(word),
            EndianMode::Big => word,
            EndianMode::HalfWordBig => swap_half_word_byte_sequence_u32(word),
        }
    }

    /// Host word to a word whose bits 7:0 hold the first byte on the bus.
    /// Involutive, so the same call prepares a word for transmission.
    pub fn lsb_first(self, word: u32) -> u32 {
        match self {
            EndianMode::Little => word,
            EndianMode::Big => swap_word_byte_sequence_u32(word),
            EndianMode::HalfWordBig => swap_half_word_sequence_u32(word),
        }
    }

    /// Rewrites a received buffer in place so bytes appear in bus order.
    pub fn to_bus_order(self, buffer: &mut [u8]) {
        for chunk in buffer.chunks_exact_mut(4) {
            let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            chunk.copy_from_slice(&self.lsb_first(word).to_le_bytes());
        }
    }
}

/// Reads the host word at `index` of a received data buffer.
pub fn host_word(buffer: &[u8], index: usize) -> SdmmcResult<u32> {
    let word = buffer
        .chunks_exact(4)
        .nth(index)
        .ok_or(SdmmcError::InvalidArgument)?;
    Ok(u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
}
