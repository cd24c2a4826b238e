use derivative::Derivative;

use crate::{
    ata::AtaAdapter,
    banks::{BankRegisters, BANK_COUNT},
    config::BoardConfig,
    error::WiringError,
    hexdump,
    internal_state::MachineState,
    interrupt::{Delivery, InterruptFabric, PolarityTable, SignalSink, SignalSource},
    io::{PortHandler, PortMap, PortTarget, FTX_PORTS, IDLE_VALUE},
    mapper::{Mapper, WindowMapping},
    memory::MemoryImage,
    peripheral::{AtaInterface, CounterTimer, NoDrive, OpenBus, Peripheral},
};

/// What a Z80 core needs from the board: one call per bus cycle.
pub trait CpuBus {
    fn read_byte(&self, address: u16) -> u8;
    fn write_byte(&mut self, address: u16, value: u8);
    fn port_in(&mut self, port: u16) -> u8;
    fn port_out(&mut self, port: u16, value: u8);
}

/// The whole board core. Owns the mapper (and through it the memory image),
/// the port map, the interrupt fabric and one instance of each peripheral.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Machine {
    mapper: Mapper,
    ports: PortMap,
    fabric: InterruptFabric,
    ata: AtaAdapter,
    #[derivative(Debug = "ignore")]
    video: Box<dyn Peripheral>,
    #[derivative(Debug = "ignore")]
    sound: Box<dyn Peripheral>,
    #[derivative(Debug = "ignore")]
    uart: Box<dyn Peripheral>,
    #[derivative(Debug = "ignore")]
    ctc: Box<dyn CounterTimer>,
    irq: bool,
}

impl Machine {
    /// A board with the given memory image and nothing attached to the I/O bus.
    pub fn new(image: MemoryImage) -> Result<Self, WiringError> {
        MachineBuilder::new().image(image).build()
    }

    pub fn reset(&mut self) {
        tracing::info!("[Machine] Reset");
        self.mapper.reset();
        self.ata.reset();
        self.video.reset();
        self.sound.reset();
        self.uart.reset();
        self.ctc.reset();
        self.poll_interrupts();
    }

    pub fn read_byte(&self, address: u16) -> u8 {
        self.mapper.read_byte(address)
    }

    pub fn write_byte(&mut self, address: u16, data: u8) {
        self.mapper.write_byte(address, data);
    }

    pub fn read_word(&self, address: u16) -> u16 {
        self.mapper.read_word(address)
    }

    pub fn write_word(&mut self, address: u16, value: u16) {
        self.mapper.write_word(address, value);
    }

    pub fn write_bank(&mut self, index: usize, value: u8) {
        self.mapper.write_bank(index, value);
    }

    pub fn io_read(&mut self, port: u8) -> u8 {
        let Some(decoded) = self.ports.decode(port) else {
            tracing::trace!("[BUS] Invalid port {:02X} read", port);
            return IDLE_VALUE;
        };

        let offset = decoded.offset;
        let value = match decoded.target {
            PortTarget::Disk => self.ata.read(offset),
            PortTarget::Sound => self.sound.read8(offset),
            PortTarget::Uart => self.uart.read8(offset),
            PortTarget::Ctc => self.ctc.read8(offset),
            PortTarget::Video => self.video.read8(offset),
            PortTarget::Bank => {
                tracing::trace!("[BUS] Read from write-only bank port {:02X}", port);
                IDLE_VALUE
            }
        };
        tracing::trace!("[BUS] IN {:02X} ({}) = {:02X}", port, decoded.target, value);

        self.sample_target(decoded.target);
        value
    }

    pub fn io_write(&mut self, port: u8, data: u8) {
        let Some(decoded) = self.ports.decode(port) else {
            tracing::trace!("[BUS] Invalid port {:02X} write = {:02X}", port, data);
            return;
        };

        tracing::trace!("[BUS] OUT {:02X} ({}) <- {:02X}", port, decoded.target, data);
        let offset = decoded.offset;
        match decoded.target {
            PortTarget::Disk => self.ata.write(offset, data),
            PortTarget::Sound => self.sound.write8(offset, data),
            PortTarget::Uart => self.uart.write8(offset, data),
            PortTarget::Ctc => self.ctc.write8(offset, data),
            PortTarget::Video => self.video.write8(offset, data),
            PortTarget::Bank => self.mapper.write_bank((port & 0x03) as usize, data),
        }

        self.sample_target(decoded.target);
    }

    /// Called when a peripheral's interrupt output changes level.
    pub fn on_signal_change(&mut self, source: SignalSource, asserted: bool) {
        if let Some(delivery) = self.fabric.on_signal_change(source, asserted) {
            self.deliver(delivery);
        }
    }

    /// Samples every peripheral's interrupt output and forwards the ones that
    /// changed. Hosts call this after advancing their peripheral models.
    pub fn poll_interrupts(&mut self) {
        for source in [
            SignalSource::Video,
            SignalSource::Sound,
            SignalSource::Uart,
            SignalSource::Ctc,
        ] {
            self.sample(source);
        }
    }

    /// Level of the CPU interrupt request line, `true` meaning asserted.
    pub fn irq_asserted(&self) -> bool {
        self.irq
    }

    pub fn banks(&self) -> &BankRegisters {
        self.mapper.banks()
    }

    pub fn windows(&self) -> &[WindowMapping; BANK_COUNT] {
        self.mapper.windows()
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn image(&self) -> &MemoryImage {
        self.mapper.image()
    }

    pub fn image_mut(&mut self) -> &mut MemoryImage {
        self.mapper.image_mut()
    }

    pub fn ports(&self) -> &PortMap {
        &self.ports
    }

    pub fn fabric(&self) -> &InterruptFabric {
        &self.fabric
    }

    pub fn print_window_info(&self) {
        for (n, window) in self.windows().iter().enumerate() {
            tracing::info!("Window {}: {}", n, window);
        }
    }

    /// Hexdump of the CPU's current view of `start..=end`.
    pub fn memory_dump(&self, start: u16, end: u16) -> String {
        hexdump(|address| self.read_byte(address), start, end)
    }

    pub fn state(&self) -> MachineState {
        MachineState {
            banks: self.mapper.banks().raw(),
            lines: self.fabric.levels(),
            irq: self.irq,
        }
    }

    pub fn restore(&mut self, state: &MachineState) {
        tracing::info!("[Machine] Restoring {}", state);
        self.mapper.load_banks(state.banks);
        for &(source, asserted) in &state.lines {
            self.on_signal_change(source, asserted);
        }

        // the CPU line follows the CTC line; the saved level only fills in
        // when the snapshot carries no CTC line
        self.irq = match self.fabric.line(SignalSource::Ctc) {
            Some(line) if state.lines.iter().any(|(s, _)| *s == SignalSource::Ctc) => {
                if line.sink_level() != state.irq {
                    tracing::warn!(
                        "[Machine] Snapshot IRQ {} disagrees with its CTC line, using {}",
                        state.irq,
                        line.sink_level()
                    );
                }
                line.sink_level()
            }
            _ => state.irq,
        };
    }

    fn deliver(&mut self, delivery: Delivery) {
        match delivery.sink {
            SignalSink::CtcTrigger(channel) => {
                self.ctc.trigger(channel, delivery.level);
                self.sample(SignalSource::Ctc);
            }
            SignalSink::CpuIrq => {
                if self.irq != delivery.level {
                    tracing::debug!("[Machine] CPU /INT {}", delivery.level);
                }
                self.irq = delivery.level;
            }
        }
    }

    fn sample_target(&mut self, target: PortTarget) {
        let source = match target {
            PortTarget::Sound => SignalSource::Sound,
            PortTarget::Uart => SignalSource::Uart,
            PortTarget::Ctc => SignalSource::Ctc,
            PortTarget::Video => SignalSource::Video,
            PortTarget::Disk | PortTarget::Bank => return,
        };
        self.sample(source);
    }

    fn sample(&mut self, source: SignalSource) {
        let output = match source {
            SignalSource::Video => self.video.interrupt_output(),
            SignalSource::Sound => self.sound.interrupt_output(),
            SignalSource::Uart => self.uart.interrupt_output(),
            SignalSource::Ctc => self.ctc.interrupt_output(),
        };
        let Some(level) = output else {
            return;
        };

        let current = self.fabric.line(source).map(|line| line.asserted);
        if current.is_some() && current != Some(level) {
            self.on_signal_change(source, level);
        }
    }

    fn prime(&mut self) {
        for delivery in self.fabric.deliveries() {
            self.deliver(delivery);
        }
        self.poll_interrupts();
    }
}

impl CpuBus for Machine {
    fn read_byte(&self, address: u16) -> u8 {
        Machine::read_byte(self, address)
    }

    fn write_byte(&mut self, address: u16, value: u8) {
        Machine::write_byte(self, address, value);
    }

    fn port_in(&mut self, port: u16) -> u8 {
        self.io_read(port as u8)
    }

    fn port_out(&mut self, port: u16, value: u8) {
        self.io_write(port as u8, value)
    }
}

/// Wires the board once: memory, port table, interrupt topology and the
/// peripherals the host supplies. Anything not supplied is left floating.
pub struct MachineBuilder {
    image: Option<MemoryImage>,
    ports: Vec<PortHandler>,
    polarity: PolarityTable,
    video: Box<dyn Peripheral>,
    sound: Box<dyn Peripheral>,
    uart: Box<dyn Peripheral>,
    ctc: Box<dyn CounterTimer>,
    ata: Box<dyn AtaInterface>,
}

impl Default for MachineBuilder {
    fn default() -> Self {
        Self {
            image: None,
            ports: FTX_PORTS.to_vec(),
            polarity: PolarityTable::default(),
            video: Box::new(OpenBus),
            sound: Box::new(OpenBus),
            uart: Box::new(OpenBus),
            ctc: Box::new(OpenBus),
            ata: Box::new(NoDrive),
        }
    }
}

impl MachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &BoardConfig) -> anyhow::Result<Self> {
        Ok(Self::new()
            .image(config.memory_image()?)
            .polarity(config.polarity))
    }

    pub fn image(mut self, image: MemoryImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn ports(mut self, ports: &[PortHandler]) -> Self {
        self.ports = ports.to_vec();
        self
    }

    pub fn polarity(mut self, polarity: PolarityTable) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn video(mut self, video: impl Peripheral + 'static) -> Self {
        self.video = Box::new(video);
        self
    }

    pub fn sound(mut self, sound: impl Peripheral + 'static) -> Self {
        self.sound = Box::new(sound);
        self
    }

    pub fn uart(mut self, uart: impl Peripheral + 'static) -> Self {
        self.uart = Box::new(uart);
        self
    }

    pub fn ctc(mut self, ctc: impl CounterTimer + 'static) -> Self {
        self.ctc = Box::new(ctc);
        self
    }

    pub fn ata(mut self, ata: impl AtaInterface + 'static) -> Self {
        self.ata = Box::new(ata);
        self
    }

    pub fn build(self) -> Result<Machine, WiringError> {
        let image = self.image.unwrap_or_default();
        tracing::info!("Initializing FTX with a {:#X} byte memory image", image.size());

        let mapper = Mapper::new(image)?;
        let ports = PortMap::new(&self.ports)?;
        let fabric = InterruptFabric::ftx(&self.polarity)?;

        let mut machine = Machine {
            mapper,
            ports,
            fabric,
            ata: AtaAdapter::new(self.ata),
            video: self.video,
            sound: self.sound,
            uart: self.uart,
            ctc: self.ctc,
            irq: false,
        };
        machine.prime();
        Ok(machine)
    }
}
