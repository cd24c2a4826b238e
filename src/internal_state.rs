use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{banks::BANK_COUNT, interrupt::SignalSource};

/// Flat snapshot of the board core: what a host needs to persist to put the
/// machine back where it was. How it is stored is up to the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachineState {
    pub banks: [u8; BANK_COUNT],
    /// Raw source levels, before polarity.
    pub lines: Vec<(SignalSource, bool)>,
    pub irq: bool,
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BANK0: #{:02X} BANK1: #{:02X} BANK2: #{:02X} BANK3: #{:02X} - IRQ: {}",
            self.banks[0],
            self.banks[1],
            self.banks[2],
            self.banks[3],
            if self.irq { "1" } else { "0" }
        )?;

        for (source, asserted) in &self.lines {
            write!(f, " {:?}: {}", source, if *asserted { "1" } else { "0" })?;
        }
        Ok(())
    }
}
