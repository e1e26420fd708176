//! Texture images: the decoder seam and a built-in PNM decoder.

use std::path::Path;
use thiserror::Error;
use vrml_core::Image;

/// Decoded pixels, row-major from the bottom row up as VRML stores them,
/// `components` bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub components: u8,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Unpack an inline `SFImage`. Each packed pixel holds its components
    /// in the low bytes, most significant first.
    #[must_use]
    pub fn from_sfimage(image: &Image) -> Self {
        let components = image.components.min(4) as u8;
        let mut pixels = Vec::with_capacity(image.pixels.len() * components as usize);
        for &packed in &image.pixels {
            for c in (0..components).rev() {
                pixels.push((packed >> (8 * u32::from(c))) as u8);
            }
        }
        Self {
            width: image.width,
            height: image.height,
            components,
            pixels,
        }
    }
}

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("cannot read image {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no image transport for {0}")]
    Unreachable(String),

    #[error("unsupported image format \"{0}\"")]
    Unsupported(String),

    #[error("corrupt image: {0}")]
    Corrupt(String),
}

/// Turns image bytes into pixels.
pub trait ImageDecoder {
    /// Decode `bytes`. `hint` is the lowercase file extension, possibly empty.
    fn decode(&self, bytes: &[u8], hint: &str) -> Result<DecodedImage, ImageError>;

    /// Read a local image by path or `file://` URL and decode it.
    fn load(&self, url: &str) -> Result<DecodedImage, ImageError> {
        let path = match url.strip_prefix("file://") {
            Some(path) => path,
            None if url.contains("://") => return Err(ImageError::Unreachable(url.to_string())),
            None => url,
        };
        let bytes = std::fs::read(path).map_err(|source| ImageError::Io {
            url: url.to_string(),
            source,
        })?;
        let hint = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        self.decode(&bytes, &hint)
    }
}

// ─── PNM ─────────────────────────────────────────────────────────────────

/// Binary PGM (`P5`) and PPM (`P6`) with 8-bit samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct PnmDecoder;

impl ImageDecoder for PnmDecoder {
    fn decode(&self, bytes: &[u8], hint: &str) -> Result<DecodedImage, ImageError> {
        let components = match bytes.get(..2) {
            Some(b"P5") => 1,
            Some(b"P6") => 3,
            _ => return Err(ImageError::Unsupported(hint.to_string())),
        };
        let mut header = PnmHeader { bytes, pos: 2 };
        let width = header.number()?;
        let height = header.number()?;
        let max = header.number()?;
        if max == 0 || max > 255 {
            return Err(ImageError::Corrupt(format!("sample maximum {max}")));
        }
        // Exactly one whitespace byte separates the header from the raster.
        let start = header.pos + 1;
        let len = width as usize * height as usize * components as usize;
        let raster = bytes
            .get(start..start + len)
            .ok_or_else(|| ImageError::Corrupt(format!("raster shorter than {len} bytes")))?;

        // PNM rows run top to bottom; flip to bottom-up.
        let row = width as usize * components as usize;
        let mut pixels = Vec::with_capacity(len);
        if row > 0 {
            for line in raster.chunks(row).rev() {
                pixels.extend_from_slice(line);
            }
        }
        Ok(DecodedImage {
            width,
            height,
            components,
            pixels,
        })
    }
}

struct PnmHeader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl PnmHeader<'_> {
    fn number(&mut self) -> Result<u32, ImageError> {
        loop {
            match self.bytes.get(self.pos) {
                Some(b'#') => {
                    while self.bytes.get(self.pos).is_some_and(|&b| b != b'\n') {
                        self.pos += 1;
                    }
                }
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                _ => break,
            }
        }
        let start = self.pos;
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ImageError::Corrupt(format!("bad header at byte {start}")))
    }
}
