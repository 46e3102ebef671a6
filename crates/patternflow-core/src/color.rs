//! 8-bit RGBA color used for event color hints and canvas painting.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel (255 = opaque)
    pub a: u8,
}

impl Rgba {
    /// Opaque black
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
    /// Opaque white
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    /// Fully transparent
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    /// Create a color from channel values
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Return this color with its alpha scaled by `factor` (clamped to [0, 1]).
    pub fn with_alpha_factor(self, factor: f32) -> Self {
        let f = factor.clamp(0.0, 1.0);
        Self {
            a: (self.a as f32 * f).round() as u8,
            ..self
        }
    }

    /// Parse a `#rgb`, `#rrggbb` or `#rrggbbaa` hex string.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        let parse = |h: &str| u8::from_str_radix(h, 16);

        match hex.len() {
            3 => {
                let channel = |i: usize| {
                    let d = &hex[i..i + 1];
                    parse(d).map(|v| v * 17)
                };
                Ok(Self::opaque(
                    channel(0).map_err(|_| CoreError::InvalidColor(s.to_string()))?,
                    channel(1).map_err(|_| CoreError::InvalidColor(s.to_string()))?,
                    channel(2).map_err(|_| CoreError::InvalidColor(s.to_string()))?,
                ))
            }
            6 | 8 => {
                let channel = |i: usize| {
                    parse(&hex[i..i + 2]).map_err(|_| CoreError::InvalidColor(s.to_string()))
                };
                let r = channel(0)?;
                let g = channel(2)?;
                let b = channel(4)?;
                let a = if hex.len() == 8 { channel(6)? } else { 255 };
                Ok(Self::new(r, g, b, a))
            }
            _ => Err(CoreError::InvalidColor(s.to_string())),
        }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::WHITE
    }
}
