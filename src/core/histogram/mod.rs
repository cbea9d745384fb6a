//! # Histogram Module
//!
//! Compact color fingerprints used for near-duplicate detection.
//!
//! ## How It Works
//! 1. Decode the image into 8-bit RGBA pixels
//! 2. Bin every channel into 32 buckets (`value / 8`)
//! 3. Normalize each bin by the pixel count, so every channel sums to 1.0
//! 4. Compare two histograms by their total absolute bin difference
//!
//! ## Similarity
//! `1 - (Σ|Δalpha| + Σ|Δred| + Σ|Δgreen| + Σ|Δblue|) / 8`
//!
//! Each channel contributes at most 2.0, so the score is always in `[0, 1]`.

mod decode;

pub use decode::{decode_bytes, decode_file};

use crate::error::HistogramError;
use image::DynamicImage;
use std::path::Path;
use std::sync::OnceLock;

/// Number of bins per channel
pub const BIN_COUNT: usize = 32;

/// Size of one serialized channel (32 big-endian f64 values)
pub const CHANNEL_BLOB_LEN: usize = BIN_COUNT * 8;

/// Sum of per-bin channel spread at which an image counts as colorful
const COLORFUL_THRESHOLD: f64 = 0.25;

/// Tolerance used when comparing bins for equality
const BIN_EPSILON: f64 = 1e-9;

type Bins = [f64; BIN_COUNT];

/// Color channels stored in a histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Alpha,
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Alpha, Channel::Red, Channel::Green, Channel::Blue];
}

/// An immutable, normalized 32-bin ARGB histogram
#[derive(Debug, Clone)]
pub struct Histogram {
    alpha: Bins,
    red: Bins,
    green: Bins,
    blue: Bins,
    colorful: OnceLock<bool>,
}

impl Histogram {
    /// Build from raw bins. Callers are responsible for normalization.
    pub fn from_bins(alpha: Bins, red: Bins, green: Bins, blue: Bins) -> Self {
        Self {
            alpha,
            red,
            green,
            blue,
            colorful: OnceLock::new(),
        }
    }

    /// Build from a tightly packed RGBA8 buffer.
    ///
    /// Fails if the image has no pixels or the buffer holds fewer than
    /// `width * height` pixels (a partially loaded image).
    pub fn from_rgba(width: u32, height: u32, pixels: &[u8]) -> Result<Self, HistogramError> {
        let total = width as usize * height as usize;
        if total == 0 {
            return Err(HistogramError::decode("pixel buffer", "image has no pixels"));
        }
        if pixels.len() < total * 4 {
            return Err(HistogramError::decode(
                "pixel buffer",
                format!(
                    "pixel buffer is incomplete ({} of {} bytes)",
                    pixels.len(),
                    total * 4
                ),
            ));
        }

        let mut counts = [[0u64; BIN_COUNT]; 4];
        for pixel in pixels.chunks_exact(4).take(total) {
            let [r, g, b, a] = [pixel[0], pixel[1], pixel[2], pixel[3]];
            counts[0][(a / 8) as usize] += 1;
            counts[1][(r / 8) as usize] += 1;
            counts[2][(g / 8) as usize] += 1;
            counts[3][(b / 8) as usize] += 1;
        }

        let normalize = |channel: &[u64; BIN_COUNT]| -> Bins {
            let mut bins = [0.0; BIN_COUNT];
            for (bin, count) in bins.iter_mut().zip(channel) {
                *bin = *count as f64 / total as f64;
            }
            bins
        };

        Ok(Self::from_bins(
            normalize(&counts[0]),
            normalize(&counts[1]),
            normalize(&counts[2]),
            normalize(&counts[3]),
        ))
    }

    /// Build from a decoded image
    pub fn from_image(image: &DynamicImage) -> Result<Self, HistogramError> {
        let rgba = image.to_rgba8();
        Self::from_rgba(rgba.width(), rgba.height(), rgba.as_raw())
    }

    /// Decode and build from an image file
    pub fn from_file(path: &Path) -> Result<Self, HistogramError> {
        Self::from_image(&decode_file(path)?)
    }

    /// Decode and build from in-memory image data
    pub fn from_encoded(bytes: &[u8], source_name: &str) -> Result<Self, HistogramError> {
        Self::from_image(&decode_bytes(bytes, source_name)?)
    }

    /// Bins for one channel
    pub fn channel(&self, channel: Channel) -> &Bins {
        match channel {
            Channel::Alpha => &self.alpha,
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
        }
    }

    /// Similarity in `[0, 1]`; symmetric, and 1.0 against itself.
    pub fn similarity(&self, other: &Histogram) -> f64 {
        let difference: f64 = Channel::ALL
            .iter()
            .map(|&channel| {
                self.channel(channel)
                    .iter()
                    .zip(other.channel(channel))
                    .map(|(a, b)| (a - b).abs())
                    .sum::<f64>()
            })
            .sum();

        (1.0 - difference / 8.0).clamp(0.0, 1.0)
    }

    /// Whether the image carries meaningful color, computed once.
    pub fn is_colorful(&self) -> bool {
        *self.colorful.get_or_init(|| {
            let spread: f64 = (0..BIN_COUNT)
                .map(|i| {
                    let (r, g, b) = (self.red[i], self.green[i], self.blue[i]);
                    r.max(g).max(b) - r.min(g).min(b)
                })
                .sum();
            spread >= COLORFUL_THRESHOLD
        })
    }

    /// Serialize one channel as 32 big-endian f64 values
    pub fn to_blob(&self, channel: Channel) -> Vec<u8> {
        self.channel(channel)
            .iter()
            .flat_map(|bin| bin.to_be_bytes())
            .collect()
    }

    /// Restore one channel; the blob must be exactly `CHANNEL_BLOB_LEN` bytes.
    pub fn bins_from_blob(blob: &[u8]) -> Result<Bins, HistogramError> {
        if blob.len() != CHANNEL_BLOB_LEN {
            return Err(HistogramError::Corrupt {
                expected: CHANNEL_BLOB_LEN,
                actual: blob.len(),
            });
        }

        let mut bins = [0.0; BIN_COUNT];
        for (bin, chunk) in bins.iter_mut().zip(blob.chunks_exact(8)) {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            *bin = f64::from_be_bytes(bytes);
        }
        Ok(bins)
    }

    /// Restore a histogram from its four channel blobs
    pub fn from_blobs(
        alpha: &[u8],
        red: &[u8],
        green: &[u8],
        blue: &[u8],
    ) -> Result<Self, HistogramError> {
        Ok(Self::from_bins(
            Self::bins_from_blob(alpha)?,
            Self::bins_from_blob(red)?,
            Self::bins_from_blob(green)?,
            Self::bins_from_blob(blue)?,
        ))
    }
}

impl PartialEq for Histogram {
    fn eq(&self, other: &Self) -> bool {
        Channel::ALL.iter().all(|&channel| {
            self.channel(channel)
                .iter()
                .zip(other.channel(channel))
                .all(|(a, b)| (a - b).abs() <= BIN_EPSILON)
        })
    }
}
