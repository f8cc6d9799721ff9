//! Export Backends - host encoder procedures
//!
//! The plugin never encodes anything itself. It picks one of two host
//! procedures and fills in its configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::host::{Host, ImageId, RunMode};
use crate::settings::ExportSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Avif,
    Png,
}

impl ExportFormat {
    /// Name of the host procedure that writes this format.
    pub fn procedure_name(self) -> &'static str {
        match self {
            ExportFormat::Avif => "file-heif-av1-export",
            ExportFormat::Png => "file-png-export",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Avif => "avif",
            ExportFormat::Png => "png",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Avif => f.write_str("AVIF"),
            ExportFormat::Png => f.write_str("PNG"),
        }
    }
}

/// Pick the backend to export with.
///
/// AVIF when preferred and registered, otherwise PNG when registered.
pub fn select_backend(host: &dyn Host, prefer_avif: bool) -> Option<ExportFormat> {
    if prefer_avif {
        if host.lookup_procedure(ExportFormat::Avif.procedure_name()) {
            return Some(ExportFormat::Avif);
        }
        warn!("AVIF export not available, falling back to PNG");
    }

    if host.lookup_procedure(ExportFormat::Png.procedure_name()) {
        Some(ExportFormat::Png)
    } else {
        None
    }
}

/// A single procedure argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Image(ImageId),
    File(PathBuf),
    RunMode(RunMode),
}

/// Named arguments for a host procedure, in the order they are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcedureConfig {
    pub procedure: String,
    pub properties: Vec<(String, ParamValue)>,
}

impl ProcedureConfig {
    pub fn new(procedure: &str) -> Self {
        Self {
            procedure: procedure.to_string(),
            properties: vec![],
        }
    }

    /// Set a property, replacing any earlier value with the same name.
    pub fn set(&mut self, name: &str, value: ParamValue) -> &mut Self {
        match self.properties.iter_mut().find(|(k, _)| k == name) {
            Some((_, slot)) => *slot = value,
            None => self.properties.push((name.to_string(), value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.properties.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Build the fixed configuration for `format`, exporting `image` to `path`.
pub fn build_config(
    format: ExportFormat,
    settings: &ExportSettings,
    image: ImageId,
    path: &Path,
) -> ProcedureConfig {
    let mut config = ProcedureConfig::new(format.procedure_name());
    config
        .set("run-mode", ParamValue::RunMode(RunMode::Noninteractive))
        .set("image", ParamValue::Image(image))
        .set("file", ParamValue::File(path.to_path_buf()))
        .set("options", ParamValue::Null);

    match format {
        ExportFormat::Avif => {
            let avif = &settings.avif;
            info!("Setting AVIF parameters...");
            config
                .set("quality", ParamValue::Int(avif.quality.into()))
                .set("lossless", ParamValue::Bool(avif.lossless))
                .set("save-bit-depth", ParamValue::Int(avif.bit_depth.into()))
                .set("pixel-format", ParamValue::Str(avif.pixel_format.as_str().to_string()))
                .set("encoder-speed", ParamValue::Str(avif.encoder_speed.as_str().to_string()))
                .set("include-exif", ParamValue::Bool(avif.include_exif))
                .set("include-xmp", ParamValue::Bool(avif.include_xmp));
            info!(
                quality = avif.quality,
                lossless = avif.lossless,
                bit_depth = avif.bit_depth,
                pixel_format = avif.pixel_format.as_str(),
                speed = avif.encoder_speed.as_str(),
                "AVIF parameters"
            );
        }
        ExportFormat::Png => {
            let png = &settings.png;
            info!("Using PNG export parameters...");
            config
                .set("interlaced", ParamValue::Bool(png.interlaced))
                .set("compression", ParamValue::Int(png.compression.into()))
                .set("bkgd", ParamValue::Bool(true))
                .set("offs", ParamValue::Bool(false))
                .set("phys", ParamValue::Bool(true))
                .set("time", ParamValue::Bool(true))
                .set("save-transparent", ParamValue::Bool(png.save_transparent))
                .set("optimize-palette", ParamValue::Bool(png.optimize_palette))
                .set("format", ParamValue::Str(png.format.as_str().to_string()));
            info!(
                compression = png.compression,
                transparent = png.save_transparent,
                format = png.format.as_str(),
                "PNG parameters"
            );
        }
    }

    debug!(count = config.len(), "Properties set.");
    config
}
