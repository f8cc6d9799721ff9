//! Export Settings - Fixed Parameters
//!
//! `ExportSettings::default()` is the compiled-in parameter set the plugin
//! exports with. JSON loading exists for the dry-run CLI only.

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{self, Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{field} must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: &'static str,
        min: u32,
        max: u32,
        actual: u32,
    },

    #[error("AVIF bit depth must be 8, 10 or 12, got {0}")]
    BitDepth(u32),

    #[error("Invalid timestamp format: {0:?}")]
    TimestampFormat(String),

    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    #[serde(default)]
    pub avif: AvifSettings,
    #[serde(default)]
    pub png: PngSettings,
    #[serde(default = "default_true")]
    pub prefer_avif: bool,
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

fn default_true() -> bool { true }
fn default_timestamp_format() -> String { "%Y%m%d%H%M%S".to_string() }

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            avif: AvifSettings::default(),
            png: PngSettings::default(),
            prefer_avif: true,
            timestamp_format: default_timestamp_format(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AvifSettings {
    /// 0 = worst, 100 = best
    pub quality: u32,
    pub lossless: bool,
    pub bit_depth: u32,
    pub pixel_format: PixelFormat,
    pub encoder_speed: EncoderSpeed,
    pub include_exif: bool,
    pub include_xmp: bool,
}

impl Default for AvifSettings {
    fn default() -> Self {
        Self {
            quality: 85,
            lossless: true,
            bit_depth: 10,
            pixel_format: PixelFormat::Yuv444,
            encoder_speed: EncoderSpeed::Balanced,
            include_exif: true,
            include_xmp: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Rgb,
    Yuv444,
    Yuv420,
}

impl PixelFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            PixelFormat::Rgb => "rgb",
            PixelFormat::Yuv444 => "yuv444",
            PixelFormat::Yuv420 => "yuv420",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderSpeed {
    Slow,
    Balanced,
    Fast,
}

impl EncoderSpeed {
    pub fn as_str(self) -> &'static str {
        match self {
            EncoderSpeed::Slow => "slow",
            EncoderSpeed::Balanced => "balanced",
            EncoderSpeed::Fast => "fast",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PngSettings {
    /// Deflate level, 0..=9
    pub compression: u32,
    /// Adam7
    pub interlaced: bool,
    /// Keep the color of fully transparent pixels
    pub save_transparent: bool,
    /// Save as 1/2/4/8-bit depending on the colors used instead of always 8-bit
    pub optimize_palette: bool,
    pub format: PngFormat,
}

impl Default for PngSettings {
    fn default() -> Self {
        Self {
            compression: 9,
            interlaced: false,
            save_transparent: true,
            optimize_palette: false,
            format: PngFormat::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngFormat {
    Auto,
    Rgb8,
    Gray8,
    Rgba8,
    Graya8,
    Rgb16,
    Gray16,
    Rgba16,
    Graya16,
}

impl PngFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            PngFormat::Auto => "auto",
            PngFormat::Rgb8 => "rgb8",
            PngFormat::Gray8 => "gray8",
            PngFormat::Rgba8 => "rgba8",
            PngFormat::Graya8 => "graya8",
            PngFormat::Rgb16 => "rgb16",
            PngFormat::Gray16 => "gray16",
            PngFormat::Rgba16 => "rgba16",
            PngFormat::Graya16 => "graya16",
        }
    }
}

impl ExportSettings {
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        check_range("avif.quality", self.avif.quality, 0, 100)?;
        if !matches!(self.avif.bit_depth, 8 | 10 | 12) {
            return Err(SettingsError::BitDepth(self.avif.bit_depth));
        }
        check_range("png.compression", self.png.compression, 0, 9)?;

        let pattern_ok = !self.timestamp_format.is_empty()
            && !StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error));
        if !pattern_ok {
            return Err(SettingsError::TimestampFormat(self.timestamp_format.clone()));
        }
        render_timestamp(&self.timestamp_format, sample_time())?;

        Ok(())
    }
}

/// Format `now` with `pattern` for use inside a file name.
///
/// Fails on specifiers a local time cannot fill (`%z`, `%Z`) and on output
/// containing a path separator.
pub fn render_timestamp(pattern: &str, now: NaiveDateTime) -> Result<String, SettingsError> {
    let mut rendered = String::new();
    write!(rendered, "{}", now.format(pattern))
        .map_err(|_| SettingsError::TimestampFormat(pattern.to_string()))?;

    if rendered.contains('/') || rendered.contains(path::MAIN_SEPARATOR) {
        return Err(SettingsError::TimestampFormat(pattern.to_string()));
    }
    Ok(rendered)
}

fn sample_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

fn check_range(field: &'static str, actual: u32, min: u32, max: u32) -> Result<(), SettingsError> {
    if actual < min || actual > max {
        return Err(SettingsError::OutOfRange { field, min, max, actual });
    }
    Ok(())
}
