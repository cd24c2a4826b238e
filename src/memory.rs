use std::{fs::File, io::Read, path::Path};

use anyhow::Context;
use derivative::Derivative;
use serde::{Deserialize, Serialize};

use crate::{
    banks::{PAGE_MASK, PAGE_SIZE},
    error::WiringError,
};

/// Largest image the 7-bit page index can reach (128 pages of 16KB).
pub const MAX_IMAGE_SIZE: usize = (PAGE_MASK as usize + 1) * PAGE_SIZE;

/// Backing store for every page the bank registers can select.
///
/// Fresh images read as 0xFF, like erased flash.
#[derive(Derivative, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
#[derivative(Clone, Debug, PartialEq)]
pub struct MemoryImage {
    #[derivative(Debug = "ignore")]
    data: Vec<u8>,
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self {
            data: vec![0xFF; MAX_IMAGE_SIZE],
        }
    }
}

impl TryFrom<Vec<u8>> for MemoryImage {
    type Error = WiringError;

    fn try_from(data: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_bytes(data)
    }
}

impl From<MemoryImage> for Vec<u8> {
    fn from(image: MemoryImage) -> Self {
        image.data
    }
}

impl MemoryImage {
    pub fn new(size: usize) -> Result<Self, WiringError> {
        Self::from_bytes(vec![0xFF; size])
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, WiringError> {
        if data.is_empty() {
            return Err(WiringError::EmptyImage);
        }
        if data.len() > MAX_IMAGE_SIZE {
            return Err(WiringError::ImageTooLarge {
                size: data.len(),
                max: MAX_IMAGE_SIZE,
            });
        }

        Ok(Self { data })
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Number of pages present, counting a partial trailing page.
    pub fn pages(&self) -> usize {
        self.data.len().div_ceil(PAGE_SIZE)
    }

    /// Copies `blob` into the image starting at `offset`.
    pub fn load_at(&mut self, offset: usize, blob: &[u8]) -> Result<(), WiringError> {
        let end = offset
            .checked_add(blob.len())
            .filter(|end| *end <= self.data.len())
            .ok_or(WiringError::BlobOutOfRange {
                offset,
                len: blob.len(),
                size: self.data.len(),
            })?;

        self.data[offset..end].copy_from_slice(blob);
        tracing::info!(
            "[MEM] Loaded {:#X} bytes at {:#08X}-{:#08X}",
            blob.len(),
            offset,
            end - 1
        );
        Ok(())
    }

    /// Reads a file and copies it into the image at `offset`.
    pub fn load_file(&mut self, path: impl AsRef<Path>, offset: usize) -> anyhow::Result<()> {
        let path = path.as_ref();
        let mut file =
            File::open(path).with_context(|| format!("opening image file {}", path.display()))?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .with_context(|| format!("reading image file {}", path.display()))?;

        self.load_at(offset, &buffer)
            .with_context(|| format!("placing {} in the memory image", path.display()))
    }

    /// Wraps an offset past the end of the image back into it.
    pub fn clamp(&self, offset: usize) -> usize {
        offset % self.data.len()
    }

    pub fn read(&self, offset: usize) -> u8 {
        self.data[self.clamp(offset)]
    }

    pub fn write(&mut self, offset: usize, value: u8) {
        let offset = self.clamp(offset);
        self.data[offset] = value;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_image_is_erased() {
        let image = MemoryImage::new(PAGE_SIZE * 2).unwrap();
        assert_eq!(image.pages(), 2);
        assert!(image.as_slice().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_rejects_bad_sizes() {
        assert_eq!(MemoryImage::new(0), Err(WiringError::EmptyImage));
        assert!(matches!(
            MemoryImage::new(MAX_IMAGE_SIZE + 1),
            Err(WiringError::ImageTooLarge { .. })
        ));
    }

    #[test]
    fn test_deserialize_checks_size() {
        assert!(serde_json::from_str::<MemoryImage>("[]").is_err());

        let image: MemoryImage = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(image.as_slice(), &[1, 2, 3]);
        assert_eq!(serde_json::to_string(&image).unwrap(), "[1,2,3]");
    }

    #[test]
    fn test_mapper_rejects_empty_image() {
        let image = MemoryImage { data: Vec::new() };
        assert_eq!(
            crate::mapper::Mapper::new(image).unwrap_err(),
            WiringError::EmptyImage
        );
    }

    #[test]
    fn test_offsets_wrap() {
        let mut image = MemoryImage::new(PAGE_SIZE).unwrap();
        image.write(PAGE_SIZE + 3, 0x5A);
        assert_eq!(image.read(3), 0x5A);
        assert_eq!(image.read(PAGE_SIZE * 7 + 3), 0x5A);
    }

    #[test]
    fn test_load_at() {
        let mut image = MemoryImage::new(PAGE_SIZE).unwrap();
        image.load_at(0x10, &[1, 2, 3]).unwrap();
        assert_eq!(&image.as_slice()[0x10..0x13], &[1, 2, 3]);

        let err = image.load_at(PAGE_SIZE - 1, &[1, 2]).unwrap_err();
        assert_eq!(
            err,
            WiringError::BlobOutOfRange {
                offset: PAGE_SIZE - 1,
                len: 2,
                size: PAGE_SIZE
            }
        );
    }
}
