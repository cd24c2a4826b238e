use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of 16KB windows (and bank registers) on the board.
pub const BANK_COUNT: usize = 4;

/// Size of one window and one memory page.
pub const PAGE_SIZE: usize = 0x4000;

/// Bits 0-6 select the page.
pub const PAGE_MASK: u8 = 0x7F;

/// Bit 7 set means the window discards writes.
pub const PROTECT_BIT: u8 = 0x80;

/// Register values after reset: protected boot page at 0x0000, RAM elsewhere.
pub const POWER_ON_BANKS: [u8; BANK_COUNT] = [0x80, 0x00, 0x02, 0x03];

/// One bank register value.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct BankRegister(pub u8);

impl BankRegister {
    pub fn page(self) -> usize {
        (self.0 & PAGE_MASK) as usize
    }

    pub fn protected(self) -> bool {
        self.0 & PROTECT_BIT != 0
    }

    /// Offset of the selected page inside the memory image.
    pub fn base(self) -> usize {
        self.page() * PAGE_SIZE
    }
}

impl fmt::Display for BankRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X} (page {:#04X}{})",
            self.0,
            self.page(),
            if self.protected() { ", protected" } else { "" }
        )
    }
}

/// The four bank registers. Pure state; the mapper recomputes its windows
/// whenever one of these changes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BankRegisters {
    registers: [BankRegister; BANK_COUNT],
}

impl Default for BankRegisters {
    fn default() -> Self {
        Self::from_raw(POWER_ON_BANKS)
    }
}

impl BankRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_raw(values: [u8; BANK_COUNT]) -> Self {
        Self {
            registers: values.map(BankRegister),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Stores `value` in register `index & 3`.
    pub fn set(&mut self, index: usize, value: u8) {
        self.registers[index & (BANK_COUNT - 1)] = BankRegister(value);
    }

    pub fn get(&self, index: usize) -> BankRegister {
        self.registers[index & (BANK_COUNT - 1)]
    }

    pub fn raw(&self) -> [u8; BANK_COUNT] {
        self.registers.map(|r| r.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = BankRegister> + '_ {
        self.registers.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_values() {
        let banks = BankRegisters::new();
        assert_eq!(banks.raw(), [0x80, 0x00, 0x02, 0x03]);
        assert!(banks.get(0).protected());
        assert!(!banks.get(1).protected());
        assert_eq!(banks.get(0).page(), 0);
        assert_eq!(banks.get(3).base(), 3 * PAGE_SIZE);
    }

    #[test]
    fn test_page_ignores_protect_bit() {
        let reg = BankRegister(0xC5);
        assert_eq!(reg.page(), 0x45);
        assert!(reg.protected());
        assert_eq!(reg.base(), 0x45 * 0x4000);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut banks = BankRegisters::new();
        banks.set(0, 0x00);
        banks.set(2, 0xFF);
        banks.reset();
        assert_eq!(banks.raw(), POWER_ON_BANKS);
    }
}
