//! Render flags and the named options they translate into.

use std::ops::{BitOr, BitOrAssign};

/// Bitfield of render flags as passed across the embedding API.
///
/// Each bit names exactly one option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderOptionFlags(u32);

impl RenderOptionFlags {
    /// Render annotations.
    pub const ANNOT: Self = Self(0x01);
    /// Antialias text for LCD panels.
    pub const LCD_TEXT: Self = Self(0x02);
    /// Don't let the device draw text natively.
    pub const NO_NATIVETEXT: Self = Self(0x04);
    /// Grayscale output.
    pub const GRAYSCALE: Self = Self(0x08);
    /// Keep the decoded image cache small.
    pub const LIMITED_IMAGE_CACHE: Self = Self(0x200);
    /// Always use the high quality image filter.
    pub const FORCE_HALFTONE: Self = Self(0x400);
    /// Render for printing rather than viewing.
    pub const PRINTING: Self = Self(0x800);
    /// Disable text antialiasing.
    pub const NO_SMOOTHTEXT: Self = Self(0x1000);
    /// Disable image smoothing.
    pub const NO_SMOOTHIMAGE: Self = Self(0x2000);
    /// Disable path antialiasing.
    pub const NO_SMOOTHPATH: Self = Self(0x4000);

    const ALL: u32 = 0x01 | 0x02 | 0x04 | 0x08 | 0x200 | 0x400 | 0x800 | 0x1000 | 0x2000 | 0x4000;

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Keeps only the known bits of `bits`.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for RenderOptionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RenderOptionFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Output color handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Normal,
    Gray,
}

/// Which usage optional content visibility is evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Usage {
    #[default]
    View,
    Print,
}

/// Decoded image cache capacity without `LIMITED_IMAGE_CACHE`.
pub const DEFAULT_IMAGE_CACHE_CAPACITY: usize = 64;

/// Decoded image cache capacity with `LIMITED_IMAGE_CACHE`.
pub const LIMITED_IMAGE_CACHE_CAPACITY: usize = 4;

/// Named render options for one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    pub color_mode: ColorMode,
    pub usage: Usage,
    pub lcd_text: bool,
    pub no_native_text: bool,
    pub limited_image_cache: bool,
    pub force_halftone: bool,
    pub no_smooth_text: bool,
    pub no_smooth_image: bool,
    pub no_smooth_path: bool,
}

impl RenderOptions {
    /// Translates the flag bits 1:1 into options.
    pub fn from_flags(flags: RenderOptionFlags) -> Self {
        RenderOptions {
            color_mode: if flags.contains(RenderOptionFlags::GRAYSCALE) {
                ColorMode::Gray
            } else {
                ColorMode::Normal
            },
            usage: if flags.contains(RenderOptionFlags::PRINTING) {
                Usage::Print
            } else {
                Usage::View
            },
            lcd_text: flags.contains(RenderOptionFlags::LCD_TEXT),
            no_native_text: flags.contains(RenderOptionFlags::NO_NATIVETEXT),
            limited_image_cache: flags.contains(RenderOptionFlags::LIMITED_IMAGE_CACHE),
            force_halftone: flags.contains(RenderOptionFlags::FORCE_HALFTONE),
            no_smooth_text: flags.contains(RenderOptionFlags::NO_SMOOTHTEXT),
            no_smooth_image: flags.contains(RenderOptionFlags::NO_SMOOTHIMAGE),
            no_smooth_path: flags.contains(RenderOptionFlags::NO_SMOOTHPATH),
        }
    }

    pub fn image_cache_capacity(&self) -> usize {
        if self.limited_image_cache {
            LIMITED_IMAGE_CACHE_CAPACITY
        } else {
            DEFAULT_IMAGE_CACHE_CAPACITY
        }
    }

    pub fn is_printing(&self) -> bool {
        self.usage == Usage::Print
    }
}
