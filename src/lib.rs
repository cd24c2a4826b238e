pub mod ata;
pub mod banks;
pub mod config;
pub mod error;
pub mod internal_state;
pub mod interrupt;
pub mod io;
pub mod machine;
pub mod mapper;
pub mod memory;
pub mod peripheral;
pub mod utils;

pub use config::BoardConfig;
pub use error::WiringError;
pub use internal_state::MachineState;
pub use interrupt::{Polarity, PolarityTable, SignalSink, SignalSource};
pub use machine::{CpuBus, Machine, MachineBuilder};
pub use memory::MemoryImage;
pub use utils::hexdump;

use tracing_subscriber::{fmt, EnvFilter};
use wasm_bindgen::prelude::*;

/// Installs a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter`. Safe to call more than once.
pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

pub fn get_machine(image_data: &[u8]) -> Result<Machine, WiringError> {
    let mut image = MemoryImage::default();
    image.load_at(0, image_data)?;
    Machine::new(image)
}

#[wasm_bindgen(js_name = Machine)]
pub struct JsMachine(Machine);

#[wasm_bindgen(js_class = Machine)]
impl JsMachine {
    #[wasm_bindgen(constructor)]
    pub fn new(image_data: &[u8]) -> Result<JsMachine, JsError> {
        console_error_panic_hook::set_once();
        let _ = tracing_wasm::try_set_as_global_default();

        Ok(Self(get_machine(image_data)?))
    }

    pub fn reset(&mut self) {
        self.0.reset();
    }

    #[wasm_bindgen(js_name = readByte)]
    pub fn read_byte(&self, address: u16) -> u8 {
        self.0.read_byte(address)
    }

    #[wasm_bindgen(js_name = writeByte)]
    pub fn write_byte(&mut self, address: u16, data: u8) {
        self.0.write_byte(address, data);
    }

    #[wasm_bindgen(js_name = portIn)]
    pub fn port_in(&mut self, port: u16) -> u8 {
        self.0.port_in(port)
    }

    #[wasm_bindgen(js_name = portOut)]
    pub fn port_out(&mut self, port: u16, data: u8) {
        self.0.port_out(port, data);
    }

    #[wasm_bindgen(getter)]
    pub fn banks(&self) -> Vec<u8> {
        self.0.banks().raw().to_vec()
    }

    #[wasm_bindgen(getter)]
    pub fn irq(&self) -> bool {
        self.0.irq_asserted()
    }

    #[wasm_bindgen(getter)]
    pub fn windows(&self) -> String {
        self.0
            .windows()
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn state(&self) -> Result<String, JsError> {
        Ok(serde_json::to_string(&self.0.state())?)
    }

    pub fn restore(&mut self, json: &str) -> Result<(), JsError> {
        let state: MachineState = serde_json::from_str(json)?;
        self.0.restore(&state);
        Ok(())
    }

    #[wasm_bindgen(js_name = memoryDump)]
    pub fn memory_dump(&self, start: u16, end: u16) -> String {
        self.0.memory_dump(start, end)
    }
}
