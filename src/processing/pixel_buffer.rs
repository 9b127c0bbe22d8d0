//! Owned, tightly packed 8-bit pixel storage shared by every pipeline stage.

use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Interleaved 8-bit pixels (`channels` bytes per pixel, no row padding).
///
/// A zero-sized buffer with no data is the "empty" sentinel: it stands for a
/// decode that failed or an image that is not available yet, and every stage
/// is expected to pass it through rather than fail.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl PixelBuffer {
    /// The empty sentinel.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
            channels: 0,
        }
    }

    /// Allocate a zero-filled buffer.
    ///
    /// # Errors
    /// [`Error::InvalidBuffer`] for an unsupported channel count and
    /// [`Error::Allocation`] when the memory cannot be reserved.
    pub fn new(width: u32, height: u32, channels: u8) -> Result<Self> {
        check_channels(channels)?;
        let bytes = byte_len(width, height, channels)?;
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|_| Error::Allocation { bytes })?;
        data.resize(bytes, 0);
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Adopt already-decoded pixels without copying them.
    ///
    /// Trailing bytes beyond `width * height * channels` are dropped.
    ///
    /// # Errors
    /// [`Error::InvalidBuffer`] when `data` is too short or `channels` is not 3 or 4.
    pub fn from_raw(mut data: Vec<u8>, width: u32, height: u32, channels: u8) -> Result<Self> {
        check_channels(channels)?;
        let bytes = byte_len(width, height, channels)?;
        if data.len() < bytes {
            return Err(Error::InvalidBuffer(format!(
                "{width}x{height}x{channels} needs {bytes} bytes, got {}",
                data.len()
            )));
        }
        data.truncate(bytes);
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Decode `path` into a new buffer; see [`crate::tasks::loader::decode`].
    #[must_use]
    pub fn from_file(path: &Path) -> Self {
        crate::tasks::loader::decode(path)
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn channels(&self) -> u8 {
        self.channels
    }

    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether this is the empty sentinel (or otherwise holds no pixels).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.width == 0 || self.height == 0
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Channel values of the pixel at (`x`, `y`), or `None` when out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        let start = self.offset(x, y)?;
        self.data.get(start..start + usize::from(self.channels))
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> Option<&mut [u8]> {
        let start = self.offset(x, y)?;
        let end = start + usize::from(self.channels);
        self.data.get_mut(start..end)
    }

    /// Paint every pixel with `color`; extra channels beyond `color` are left alone.
    pub fn fill(&mut self, color: &[u8]) {
        let channels = usize::from(self.channels);
        if channels == 0 {
            return;
        }
        let n = color.len().min(channels);
        for px in self.data.chunks_exact_mut(channels) {
            px[..n].copy_from_slice(&color[..n]);
        }
    }

    /// Expand to RGBA8 (opaque alpha for RGB input), as GPU upload wants it.
    #[must_use]
    pub fn to_rgba8(&self) -> Vec<u8> {
        match self.channels {
            4 => self.data.clone(),
            3 => {
                let mut out = Vec::with_capacity(self.data.len() / 3 * 4);
                for px in self.data.chunks_exact(3) {
                    out.extend_from_slice(&[px[0], px[1], px[2], 255]);
                }
                out
            }
            _ => Vec::new(),
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let row = y as usize * self.width as usize;
        Some((row + x as usize) * usize::from(self.channels))
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("bytes", &self.data.len())
            .finish()
    }
}

fn check_channels(channels: u8) -> Result<()> {
    if matches!(channels, 3 | 4) {
        Ok(())
    } else {
        Err(Error::InvalidBuffer(format!(
            "unsupported channel count {channels}"
        )))
    }
}

fn byte_len(width: u32, height: u32, channels: u8) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(usize::from(channels)))
        .ok_or(Error::Allocation { bytes: usize::MAX })
}
