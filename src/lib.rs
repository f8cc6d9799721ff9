//! Scronch Core - duplicate, flatten, export
//!
//! # The Flow
//! 1. Duplicate the active image, never touch the original
//! 2. Flatten the duplicate (visible layers, clipped to the canvas)
//! 3. Name the output `{base}-{timestamp}.{ext}` next to the source
//! 4. Prefer AVIF, fall back to PNG
//! 5. Delete the duplicate, whatever happened

pub mod host;
pub mod settings;
pub mod output;
pub mod backend;
pub mod pipeline;
pub mod plugin;
pub mod dry_run;
pub mod logging;

pub use host::{Host, HostError, ImageId, MergeType, PdbStatus, RunMode};
pub use settings::{ExportSettings, AvifSettings, PngSettings, SettingsError};
pub use output::OutputPlan;
pub use backend::{ExportFormat, ProcedureConfig, ParamValue, select_backend, build_config};
pub use pipeline::{ExportPipeline, ExportReport, ExportError};
pub use plugin::{ScronchPlugin, ProcedureInfo, PROCEDURE_NAME};
pub use dry_run::{DryRunHost, HostCall};

pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");
