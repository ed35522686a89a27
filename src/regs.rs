/// A bit range `[msb:lsb]` of a card register, numbered as in the
/// physical layer specifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegField {
    pub msb: u32,
    pub lsb: u32,
}

impl RegField {
    pub const fn new(msb: u32, lsb: u32) -> Self {
        Self { msb, lsb }
    }

    pub const fn width(&self) -> u32 {
        self.msb - self.lsb + 1
    }

    const fn mask(&self) -> u128 {
        (1u128 << self.width()) - 1
    }

    #[inline]
    pub fn read(&self, reg: u128) -> u32 {
        ((reg >> self.lsb) & self.mask()) as u32
    }

    #[inline]
    pub fn is_set(&self, reg: u128) -> bool {
        self.read(reg) != 0
    }

    /// Returns `reg` with this field replaced by `value`, truncated to the field width.
    #[inline]
    pub fn write(&self, reg: u128, value: u32) -> u128 {
        let mask = self.mask() << self.lsb;
        (reg & !mask) | (((value as u128) << self.lsb) & mask)
    }

    /// Byte-wide field read MSB first, e.g. a product name.
    pub fn read_bytes<const N: usize>(&self, reg: u128) -> [u8; N] {
        let mut bytes = [0u8; N];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let lsb = self.msb + 1 - 8 * (i as u32 + 1);
            *byte = (reg >> lsb) as u8;
        }
        bytes
    }

    pub fn write_bytes(&self, mut reg: u128, bytes: &[u8]) -> u128 {
        for (i, byte) in bytes.iter().enumerate() {
            let lsb = self.msb + 1 - 8 * (i as u32 + 1);
            reg = RegField::new(lsb + 7, lsb).write(reg, *byte as u32);
        }
        reg
    }
}

/// Declares a table of register fields, one `pub const` per entry.
#[macro_export]
macro_rules! register_fields {
    ($($(#[$meta:meta])* $name:ident: [$msb:literal : $lsb:literal];)*) => {
        $(
            $(#[$meta])*
            pub const $name: $crate::regs::RegField = $crate::regs::RegField::new($msb, $lsb);
        )*
    };
}

/// Packs an R2 capture, word 0 holding bits 31:0.
pub fn words_to_reg(raw: &[u32; 4]) -> u128 {
    raw.iter()
        .rev()
        .fold(0u128, |reg, word| (reg << 32) | *word as u128)
}

pub fn reg_to_words(reg: u128) -> [u32; 4] {
    [
        reg as u32,
        (reg >> 32) as u32,
        (reg >> 64) as u32,
        (reg >> 96) as u32,
    ]
}
