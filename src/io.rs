use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WiringError;

/// Value seen on reads nobody answers.
pub const IDLE_VALUE: u8 = 0xFF;

/// Where a decoded port access goes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PortTarget {
    /// ATA command block through the 8-bit adapter
    Disk,
    /// YM3812
    Sound,
    /// NS16550
    Uart,
    /// Z80 CTC
    Ctc,
    /// V9958
    Video,
    /// Bank registers, write only
    Bank,
}

impl fmt::Display for PortTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PortTarget::Disk => "disk",
            PortTarget::Sound => "sound",
            PortTarget::Uart => "UART",
            PortTarget::Ctc => "CTC",
            PortTarget::Video => "video",
            PortTarget::Bank => "bank registers",
        };
        f.write_str(name)
    }
}

/// An inclusive port range and the device behind it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortHandler {
    pub start: u8,
    pub end: u8,
    pub target: PortTarget,
}

impl PortHandler {
    pub const fn new(start: u8, end: u8, target: PortTarget) -> Self {
        Self { start, end, target }
    }

    pub fn contains(&self, port: u8) -> bool {
        (self.start..=self.end).contains(&port)
    }
}

// +-----------+------------------------------------------------+
// | Range     | Description                                    |
// +-----------+------------------------------------------------+
// | 0x08-0x0F | ATA command block (CS0), 8-bit transfers       |
// | 0x10-0x11 | YM3812 FM sound - address / data               |
// | 0x18-0x1F | NS16550 UART                                   |
// | 0x20-0x23 | Z80 CTC channels 0-3                           |
// | 0x98-0x9B | V9958 video                                    |
// | 0xFC-0xFF | Bank registers 0-3 (write only)                |
// +-----------+------------------------------------------------+
pub const FTX_PORTS: [PortHandler; 6] = [
    PortHandler::new(0x08, 0x0F, PortTarget::Disk),
    PortHandler::new(0x10, 0x11, PortTarget::Sound),
    PortHandler::new(0x18, 0x1F, PortTarget::Uart),
    PortHandler::new(0x20, 0x23, PortTarget::Ctc),
    PortHandler::new(0x98, 0x9B, PortTarget::Video),
    PortHandler::new(0xFC, 0xFF, PortTarget::Bank),
];

/// A decoded access: the target and the offset relative to its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub target: PortTarget,
    pub offset: u8,
}

/// Flattened port table: one lookup per access, validated once when built.
#[derive(Clone, PartialEq, Eq)]
pub struct PortMap {
    handlers: Vec<PortHandler>,
    lookup: [Option<u8>; 256],
}

impl fmt::Debug for PortMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortMap")
            .field("handlers", &self.handlers)
            .finish()
    }
}

impl PortMap {
    pub fn new(handlers: &[PortHandler]) -> Result<Self, WiringError> {
        let mut lookup: [Option<u8>; 256] = [None; 256];

        for (index, handler) in handlers.iter().enumerate() {
            if handler.start > handler.end {
                return Err(WiringError::InvalidPortRange {
                    start: handler.start,
                    end: handler.end,
                    target: handler.target,
                });
            }

            for port in handler.start..=handler.end {
                if let Some(other) = lookup[port as usize] {
                    return Err(WiringError::ConflictingPortRange {
                        port,
                        first: handlers[other as usize].target,
                        second: handler.target,
                    });
                }
                lookup[port as usize] = Some(index as u8);
            }
        }

        Ok(Self {
            handlers: handlers.to_vec(),
            lookup,
        })
    }

    pub fn ftx() -> Result<Self, WiringError> {
        Self::new(&FTX_PORTS)
    }

    pub fn handlers(&self) -> &[PortHandler] {
        &self.handlers
    }

    pub fn decode(&self, port: u8) -> Option<Decoded> {
        self.lookup[port as usize].map(|index| {
            let handler = &self.handlers[index as usize];
            Decoded {
                target: handler.target,
                offset: port - handler.start,
            }
        })
    }
}
