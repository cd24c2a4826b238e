//! Interrupt routing between the board's peripherals, the CTC and the CPU.
//!
//! Every peripheral interrupt output on the FTX goes into a CTC trigger input
//! rather than straight to the CPU; the CTC's own interrupt output is the only
//! thing wired to the Z80 /INT line. Each connection is an [`InterruptLine`]
//! with exactly one writer and one reader.
//!
//! Levels are carried with the "asserted = true" convention. Most chips on the
//! board drive active-low outputs, so some connections invert the level before
//! it reaches the CTC. Which ones do is recorded in a [`PolarityTable`] that is
//! kept apart from the routing code: the current choices have not been checked
//! against the board schematics and may need correcting.

use serde::{Deserialize, Serialize};

use crate::error::WiringError;

/// Number of CTC channels, and therefore trigger inputs.
pub const CTC_CHANNELS: u8 = 4;

/// A peripheral that drives an interrupt output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SignalSource {
    Video,
    Sound,
    Uart,
    Ctc,
}

/// An input that observes exactly one interrupt line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SignalSink {
    CtcTrigger(u8),
    CpuIrq,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Normal,
    Inverted,
}

impl Polarity {
    pub fn apply(self, level: bool) -> bool {
        match self {
            Polarity::Normal => level,
            Polarity::Inverted => !level,
        }
    }
}

/// Per-source polarity applied between a peripheral and its sink.
///
/// Defaults, not yet checked against the schematics: video and sound are
/// inverted because their chips are active-low, the UART and the CTC output
/// pass through unchanged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PolarityTable {
    pub video: Polarity,
    pub sound: Polarity,
    pub uart: Polarity,
    pub ctc: Polarity,
}

impl Default for PolarityTable {
    fn default() -> Self {
        Self {
            video: Polarity::Inverted,
            sound: Polarity::Inverted,
            uart: Polarity::Normal,
            ctc: Polarity::Normal,
        }
    }
}

impl PolarityTable {
    pub fn get(&self, source: SignalSource) -> Polarity {
        match source {
            SignalSource::Video => self.video,
            SignalSource::Sound => self.sound,
            SignalSource::Uart => self.uart,
            SignalSource::Ctc => self.ctc,
        }
    }
}

/// One connection of the board's interrupt topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub source: SignalSource,
    pub sink: SignalSink,
}

/// Where each interrupt output goes on the FTX. The CTC channel 2 trigger is
/// left unconnected.
pub const FTX_ROUTES: [Route; 4] = [
    Route { source: SignalSource::Video, sink: SignalSink::CtcTrigger(0) },
    Route { source: SignalSource::Sound, sink: SignalSink::CtcTrigger(1) },
    Route { source: SignalSource::Uart, sink: SignalSink::CtcTrigger(3) },
    Route { source: SignalSource::Ctc, sink: SignalSink::CpuIrq },
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterruptLine {
    /// Level as driven by the source, before polarity.
    pub asserted: bool,
    pub polarity: Polarity,
}

impl InterruptLine {
    pub fn new(polarity: Polarity) -> Self {
        Self {
            asserted: false,
            polarity,
        }
    }

    /// Level seen by the reader.
    pub fn sink_level(&self) -> bool {
        self.polarity.apply(self.asserted)
    }
}

/// A level to hand to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub sink: SignalSink,
    pub level: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Connection {
    source: SignalSource,
    sink: SignalSink,
    line: InterruptLine,
}

impl Connection {
    fn delivery(&self) -> Delivery {
        Delivery {
            sink: self.sink,
            level: self.line.sink_level(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterruptFabric {
    connections: Vec<Connection>,
}

impl InterruptFabric {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the board topology with the given polarities.
    pub fn ftx(polarity: &PolarityTable) -> Result<Self, WiringError> {
        let mut fabric = Self::new();
        for route in FTX_ROUTES {
            fabric.connect(route.source, route.sink, polarity.get(route.source))?;
        }
        Ok(fabric)
    }

    pub fn connect(
        &mut self,
        source: SignalSource,
        sink: SignalSink,
        polarity: Polarity,
    ) -> Result<(), WiringError> {
        if let SignalSink::CtcTrigger(channel) = sink {
            if channel >= CTC_CHANNELS {
                return Err(WiringError::InvalidTriggerChannel(channel));
            }
        }
        if self.connections.iter().any(|c| c.source == source) {
            return Err(WiringError::DuplicateSignalSource(source));
        }
        if self.connections.iter().any(|c| c.sink == sink) {
            return Err(WiringError::DuplicateSignalSink(sink));
        }

        tracing::info!("[INT] {:?} -> {:?} ({:?})", source, sink, polarity);
        self.connections.push(Connection {
            source,
            sink,
            line: InterruptLine::new(polarity),
        });
        Ok(())
    }

    /// Records the raw level driven by `source` and returns what its sink
    /// should now observe. Unconnected sources return `None`.
    pub fn on_signal_change(&mut self, source: SignalSource, asserted: bool) -> Option<Delivery> {
        let Some(connection) = self.connections.iter_mut().find(|c| c.source == source) else {
            tracing::trace!("[INT] Ignoring unconnected source {:?}", source);
            return None;
        };

        connection.line.asserted = asserted;
        let delivery = connection.delivery();
        tracing::debug!(
            "[INT] {:?} {} -> {:?} sees {}",
            source,
            asserted,
            delivery.sink,
            delivery.level
        );
        Some(delivery)
    }

    pub fn line(&self, source: SignalSource) -> Option<&InterruptLine> {
        self.connections
            .iter()
            .find(|c| c.source == source)
            .map(|c| &c.line)
    }

    pub fn sink_of(&self, source: SignalSource) -> Option<SignalSink> {
        self.connections
            .iter()
            .find(|c| c.source == source)
            .map(|c| c.sink)
    }

    /// Current level of every connection, in wiring order.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.connections.iter().map(Connection::delivery).collect()
    }

    pub fn levels(&self) -> Vec<(SignalSource, bool)> {
        self.connections
            .iter()
            .map(|c| (c.source, c.line.asserted))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_routes() {
        let fabric = InterruptFabric::ftx(&PolarityTable::default()).unwrap();

        assert_eq!(
            fabric.sink_of(SignalSource::Video),
            Some(SignalSink::CtcTrigger(0))
        );
        assert_eq!(
            fabric.sink_of(SignalSource::Sound),
            Some(SignalSink::CtcTrigger(1))
        );
        assert_eq!(
            fabric.sink_of(SignalSource::Uart),
            Some(SignalSink::CtcTrigger(3))
        );
        assert_eq!(fabric.sink_of(SignalSource::Ctc), Some(SignalSink::CpuIrq));
    }

    #[test]
    fn test_uart_is_not_inverted() {
        let mut fabric = InterruptFabric::ftx(&PolarityTable::default()).unwrap();
        let delivery = fabric.on_signal_change(SignalSource::Uart, true).unwrap();
        assert_eq!(
            delivery,
            Delivery { sink: SignalSink::CtcTrigger(3), level: true }
        );

        let delivery = fabric.on_signal_change(SignalSource::Uart, false).unwrap();
        assert!(!delivery.level);
    }

    // Unverified against hardware: video and sound are assumed active-low.
    #[test]
    fn test_video_and_sound_are_inverted() {
        let mut fabric = InterruptFabric::ftx(&PolarityTable::default()).unwrap();

        let delivery = fabric.on_signal_change(SignalSource::Video, true).unwrap();
        assert_eq!(
            delivery,
            Delivery { sink: SignalSink::CtcTrigger(0), level: false }
        );
        let delivery = fabric.on_signal_change(SignalSource::Video, false).unwrap();
        assert!(delivery.level);

        let delivery = fabric.on_signal_change(SignalSource::Sound, true).unwrap();
        assert_eq!(
            delivery,
            Delivery { sink: SignalSink::CtcTrigger(1), level: false }
        );
    }

    #[test]
    fn test_polarity_override() {
        let table = PolarityTable {
            video: Polarity::Normal,
            ..PolarityTable::default()
        };
        let mut fabric = InterruptFabric::ftx(&table).unwrap();
        let delivery = fabric.on_signal_change(SignalSource::Video, true).unwrap();
        assert!(delivery.level);
    }

    #[test]
    fn test_single_writer_and_reader() {
        let mut fabric = InterruptFabric::new();
        fabric
            .connect(SignalSource::Uart, SignalSink::CtcTrigger(3), Polarity::Normal)
            .unwrap();

        assert_eq!(
            fabric.connect(SignalSource::Uart, SignalSink::CtcTrigger(2), Polarity::Normal),
            Err(WiringError::DuplicateSignalSource(SignalSource::Uart))
        );
        assert_eq!(
            fabric.connect(SignalSource::Video, SignalSink::CtcTrigger(3), Polarity::Normal),
            Err(WiringError::DuplicateSignalSink(SignalSink::CtcTrigger(3)))
        );
        assert_eq!(
            fabric.connect(SignalSource::Video, SignalSink::CtcTrigger(4), Polarity::Normal),
            Err(WiringError::InvalidTriggerChannel(4))
        );
    }

    #[test]
    fn test_unconnected_source() {
        let mut fabric = InterruptFabric::new();
        assert_eq!(fabric.on_signal_change(SignalSource::Sound, true), None);
        assert!(fabric.line(SignalSource::Sound).is_none());
    }

    #[test]
    fn test_idle_levels() {
        let fabric = InterruptFabric::ftx(&PolarityTable::default()).unwrap();
        let levels: Vec<bool> = fabric.deliveries().iter().map(|d| d.level).collect();
        assert_eq!(levels, vec![true, true, false, false]);
    }
}
