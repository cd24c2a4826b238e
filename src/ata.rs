use derivative::Derivative;

use crate::peripheral::AtaInterface;

/// Offsets 0-7 of the command block.
pub const ATA_OFFSET_MASK: u8 = 0x07;

/// Byte-wide access to the 16-bit ATA command block.
///
/// IDE is a 16-bit bus, but ATA also defines an 8-bit transfer mode. Hard
/// drives rarely implement it; CF cards and SD-to-IDE adapters usually do, and
/// that is what the board talks to. Only the low data lines are wired, so reads
/// keep the low byte of the word and writes put the byte on the low lines.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct AtaAdapter {
    #[derivative(Debug = "ignore")]
    interface: Box<dyn AtaInterface>,
}

impl AtaAdapter {
    pub fn new(interface: Box<dyn AtaInterface>) -> Self {
        Self { interface }
    }

    pub fn read(&mut self, offset: u8) -> u8 {
        let word = self.interface.cs0_read(offset & ATA_OFFSET_MASK);
        (word & 0x00FF) as u8
    }

    pub fn write(&mut self, offset: u8, data: u8) {
        self.interface
            .cs0_write(offset & ATA_OFFSET_MASK, data as u16);
    }

    pub fn reset(&mut self) {
        self.interface.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[derive(Default)]
    struct Registers {
        words: [u16; 8],
        writes: Vec<(u8, u16)>,
    }

    struct SharedBlock(Rc<RefCell<Registers>>);

    impl AtaInterface for SharedBlock {
        fn cs0_read(&mut self, offset: u8) -> u16 {
            self.0.borrow().words[offset as usize]
        }

        fn cs0_write(&mut self, offset: u8, data: u16) {
            let mut regs = self.0.borrow_mut();
            regs.words[offset as usize] = data;
            regs.writes.push((offset, data));
        }
    }

    #[test]
    fn test_reads_low_byte() {
        let regs = Rc::new(RefCell::new(Registers::default()));
        regs.borrow_mut().words[0] = 0xA55A;
        regs.borrow_mut().words[7] = 0x0050;

        let mut adapter = AtaAdapter::new(Box::new(SharedBlock(regs.clone())));
        assert_eq!(adapter.read(0), 0x5A);
        assert_eq!(adapter.read(7), 0x50);
    }

    #[test]
    fn test_writes_zero_extend() {
        let regs = Rc::new(RefCell::new(Registers::default()));
        let mut adapter = AtaAdapter::new(Box::new(SharedBlock(regs.clone())));

        adapter.write(6, 0xE0);
        adapter.write(7, 0xEC);
        assert_eq!(regs.borrow().writes, vec![(6, 0x00E0), (7, 0x00EC)]);
    }

    #[test]
    fn test_offset_is_masked() {
        let regs = Rc::new(RefCell::new(Registers::default()));
        regs.borrow_mut().words[1] = 0x0011;

        let mut adapter = AtaAdapter::new(Box::new(SharedBlock(regs.clone())));
        assert_eq!(adapter.read(9), 0x11);
    }
}
