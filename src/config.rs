use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    interrupt::PolarityTable,
    memory::{MemoryImage, MAX_IMAGE_SIZE},
};

/// Host-side board settings, usually read from a JSON file.
///
/// ```json
/// {
///   "image_size": 2097152,
///   "rom": { "path": "roms/ftx_monitor.rom", "offset": 0 },
///   "polarity": { "video": "inverted", "sound": "inverted", "uart": "normal" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoardConfig {
    pub image_size: usize,
    pub rom: Option<RomConfig>,
    pub polarity: PolarityTable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RomConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub offset: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            image_size: MAX_IMAGE_SIZE,
            rom: None,
            polarity: PolarityTable::default(),
        }
    }
}

impl BoardConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("parsing board configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading board configuration {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Allocates the memory image and loads the ROM, if one is configured.
    pub fn memory_image(&self) -> anyhow::Result<MemoryImage> {
        let mut image = MemoryImage::new(self.image_size)?;
        if let Some(rom) = &self.rom {
            image.load_file(&rom.path, rom.offset)?;
        }
        Ok(image)
    }
}
