/// Byte-wide register interface of a chip on the I/O bus.
///
/// `offset` is relative to the start of the chip's port range.
pub trait Peripheral {
    fn read8(&mut self, offset: u8) -> u8;
    fn write8(&mut self, offset: u8, data: u8);

    fn reset(&mut self) {}

    /// Raw level of the chip's interrupt output, `true` meaning asserted.
    /// `None` for chips without one.
    fn interrupt_output(&self) -> Option<bool> {
        None
    }
}

/// The Z80 CTC: a peripheral whose channel trigger inputs are driven by the
/// interrupt fabric.
pub trait CounterTimer: Peripheral {
    fn trigger(&mut self, channel: u8, level: bool);
}

/// 16-bit ATA command block, chip select 0.
pub trait AtaInterface {
    fn cs0_read(&mut self, offset: u8) -> u16;
    fn cs0_write(&mut self, offset: u8, data: u16);

    fn reset(&mut self) {}
}

/// Stands in for a chip the host did not attach: reads float high, writes
/// vanish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenBus;

impl Peripheral for OpenBus {
    fn read8(&mut self, _offset: u8) -> u8 {
        0xFF
    }

    fn write8(&mut self, offset: u8, data: u8) {
        tracing::trace!("[BUS] Open bus write +{} = {:02X}", offset, data);
    }
}

impl CounterTimer for OpenBus {
    fn trigger(&mut self, _channel: u8, _level: bool) {}
}

/// An ATA interface with no drive attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoDrive;

impl AtaInterface for NoDrive {
    fn cs0_read(&mut self, _offset: u8) -> u16 {
        0xFFFF
    }

    fn cs0_write(&mut self, _offset: u8, _data: u16) {}
}
