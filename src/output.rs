//! Output Naming - `{dir}/{base}-{timestamp}.{ext}`

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::backend::ExportFormat;
use crate::settings::{render_timestamp, SettingsError};

/// Base name used when the image has never been saved.
pub const UNTITLED: &str = "untitled";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPlan {
    pub directory: PathBuf,
    pub base_name: String,
    pub timestamp: String,
    pub format: ExportFormat,
    pub path: PathBuf,
}

impl OutputPlan {
    /// Derive the output location for an export.
    ///
    /// Fails when `timestamp_format` cannot be rendered into a file name.
    pub fn derive(
        source: Option<&Path>,
        cwd: &Path,
        now: NaiveDateTime,
        format: ExportFormat,
        timestamp_format: &str,
    ) -> Result<Self, SettingsError> {
        let (directory, base_name) = match source {
            Some(path) => {
                let directory = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                    _ => cwd.to_path_buf(),
                };
                let base_name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| UNTITLED.to_string());
                (directory, base_name)
            }
            None => (cwd.to_path_buf(), UNTITLED.to_string()),
        };
        let directory = absolutize(&directory, cwd);
        let timestamp = render_timestamp(timestamp_format, now)?;

        let mut plan = Self {
            directory,
            base_name,
            timestamp,
            format,
            path: PathBuf::new(),
        };
        plan.path = plan.compose_path();
        Ok(plan)
    }

    /// Same name and timestamp, different format.
    pub fn with_format(&self, format: ExportFormat) -> Self {
        let mut plan = Self { format, ..self.clone() };
        plan.path = plan.compose_path();
        plan
    }

    pub fn file_name(&self) -> String {
        format!("{}-{}.{}", self.base_name, self.timestamp, self.format.extension())
    }

    fn compose_path(&self) -> PathBuf {
        self.directory.join(self.file_name())
    }
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
