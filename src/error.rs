// Board wiring error types

use thiserror::Error;

use crate::{
    interrupt::{SignalSink, SignalSource},
    io::PortTarget,
};

/// Configuration faults detected while the machine is being wired.
///
/// None of these can happen once the machine is running: runtime anomalies
/// (unmapped ports, pages past the end of the image) degrade silently instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WiringError {
    #[error("port range {start:#04X}-{end:#04X} for {target} is inverted")]
    InvalidPortRange { start: u8, end: u8, target: PortTarget },

    #[error("port {port:#04X} is claimed by both {first} and {second}")]
    ConflictingPortRange {
        port: u8,
        first: PortTarget,
        second: PortTarget,
    },

    #[error("window {window} at {start:#06X} conflicts with the window table: {reason}")]
    ConflictingWindowBinding {
        window: usize,
        start: u16,
        reason: &'static str,
    },

    #[error("interrupt source {0:?} is already connected")]
    DuplicateSignalSource(SignalSource),

    #[error("interrupt sink {0:?} already has a driver")]
    DuplicateSignalSink(SignalSink),

    #[error("CTC trigger channel {0} does not exist")]
    InvalidTriggerChannel(u8),

    #[error("memory image is empty")]
    EmptyImage,

    #[error("memory image of {size:#X} bytes exceeds the {max:#X} bytes the bank registers can address")]
    ImageTooLarge { size: usize, max: usize },

    #[error("{len:#X} bytes at offset {offset:#X} do not fit a {size:#X} byte memory image")]
    BlobOutOfRange {
        offset: usize,
        len: usize,
        size: usize,
    },
}
