use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    banks::{BankRegister, BankRegisters, BANK_COUNT, PAGE_SIZE},
    error::WiringError,
    memory::MemoryImage,
};

/// A fixed 16KB slice of the CPU address space and the bank register that
/// selects its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressWindow {
    pub start: u16,
    pub end: u16,
    pub bank: usize,
}

pub const WINDOWS: [AddressWindow; BANK_COUNT] = [
    AddressWindow { start: 0x0000, end: 0x3FFF, bank: 0 },
    AddressWindow { start: 0x4000, end: 0x7FFF, bank: 1 },
    AddressWindow { start: 0x8000, end: 0xBFFF, bank: 2 },
    AddressWindow { start: 0xC000, end: 0xFFFF, bank: 3 },
];

/// Checks that a window table tiles the 64KB space in 16KB steps and binds
/// every bank register exactly once.
pub fn validate_windows(windows: &[AddressWindow; BANK_COUNT]) -> Result<(), WiringError> {
    let mut bound = [false; BANK_COUNT];

    for (n, window) in windows.iter().enumerate() {
        let conflict = |reason| WiringError::ConflictingWindowBinding {
            window: n,
            start: window.start,
            reason,
        };

        if window.start as usize != n * PAGE_SIZE || window.end as usize != (n + 1) * PAGE_SIZE - 1
        {
            return Err(conflict("range is not the expected 16KB slot"));
        }
        if window.bank >= BANK_COUNT {
            return Err(conflict("bank register does not exist"));
        }
        if bound[window.bank] {
            return Err(conflict("bank register already bound to another window"));
        }
        bound[window.bank] = true;
    }

    Ok(())
}

/// Current binding of one window.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct WindowMapping {
    pub start: u16,
    pub end: u16,
    pub page: usize,
    /// Offset of the page in the memory image, before any wrap.
    pub read_base: usize,
    /// `None` while the window is write protected.
    pub write_base: Option<usize>,
}

impl WindowMapping {
    fn bind(window: &AddressWindow, register: BankRegister) -> Self {
        let base = register.base();
        Self {
            start: window.start,
            end: window.end,
            page: register.page(),
            read_base: base,
            write_base: (!register.protected()).then_some(base),
        }
    }

    pub fn writable(&self) -> bool {
        self.write_base.is_some()
    }
}

impl fmt::Display for WindowMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:04X} - 0x{:04X} - page {:#04X} base: 0x{:06X} ({})",
            self.start,
            self.end,
            self.page,
            self.read_base,
            if self.writable() { "rw" } else { "ro" }
        )
    }
}

/// Banked MMU: resolves CPU addresses through the bank registers into the
/// memory image it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapper {
    image: MemoryImage,
    banks: BankRegisters,
    windows: [WindowMapping; BANK_COUNT],
}

impl Mapper {
    pub fn new(image: MemoryImage) -> Result<Self, WiringError> {
        validate_windows(&WINDOWS)?;
        if image.size() == 0 {
            return Err(WiringError::EmptyImage);
        }

        let banks = BankRegisters::new();
        let mut mapper = Self {
            image,
            banks,
            windows: WINDOWS.map(|w| WindowMapping::bind(&w, banks.get(w.bank))),
        };
        mapper.remap();
        Ok(mapper)
    }

    pub fn reset(&mut self) {
        self.banks.reset();
        self.remap();
    }

    pub fn write_bank(&mut self, index: usize, value: u8) {
        self.banks.set(index, value);
        tracing::debug!("[MMU] Bank {} <- {}", index & 3, self.banks.get(index));
        self.remap();
    }

    /// Replaces all four registers at once, as when restoring a snapshot.
    pub fn load_banks(&mut self, values: [u8; BANK_COUNT]) {
        self.banks = BankRegisters::from_raw(values);
        self.remap();
    }

    pub fn banks(&self) -> &BankRegisters {
        &self.banks
    }

    pub fn windows(&self) -> &[WindowMapping; BANK_COUNT] {
        &self.windows
    }

    pub fn window(&self, index: usize) -> &WindowMapping {
        &self.windows[index & (BANK_COUNT - 1)]
    }

    pub fn image(&self) -> &MemoryImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut MemoryImage {
        &mut self.image
    }

    fn remap(&mut self) {
        for (mapping, window) in self.windows.iter_mut().zip(WINDOWS.iter()) {
            *mapping = WindowMapping::bind(window, self.banks.get(window.bank));

            if mapping.read_base + PAGE_SIZE > self.image.size() {
                tracing::debug!(
                    "[MMU] Window 0x{:04X} selects page {:#04X} past the {:#X} byte image, wrapping",
                    window.start,
                    mapping.page,
                    self.image.size()
                );
            }
        }
    }

    fn translate(address: u16) -> (usize, usize) {
        let window = (address as usize) / PAGE_SIZE;
        let offset = (address as usize) & (PAGE_SIZE - 1);
        (window, offset)
    }

    pub fn read_byte(&self, address: u16) -> u8 {
        let (window, offset) = Self::translate(address);
        self.image.read(self.windows[window].read_base + offset)
    }

    pub fn write_byte(&mut self, address: u16, data: u8) {
        let (window, offset) = Self::translate(address);
        match self.windows[window].write_base {
            Some(base) => self.image.write(base + offset, data),
            None => tracing::trace!(
                "[MMU] Discarded write to protected address {:#06X} = {:02X}",
                address,
                data
            ),
        }
    }

    pub fn read_word(&self, address: u16) -> u16 {
        let low_byte = self.read_byte(address) as u16;
        let high_byte = self.read_byte(address.wrapping_add(1)) as u16;
        (high_byte << 8) | low_byte
    }

    pub fn write_word(&mut self, address: u16, value: u16) {
        let low_byte = (value & 0x00FF) as u8;
        let high_byte = ((value & 0xFF00) >> 8) as u8;
        self.write_byte(address, low_byte);
        self.write_byte(address.wrapping_add(1), high_byte);
    }
}
