//! Export Pipeline - Single Entry Point
//!
//! CRITICAL: the working copy is deleted on every path once it exists.

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::backtrace::Backtrace;
use std::error::Error as _;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::backend::{build_config, select_backend, ExportFormat};
use crate::host::{Host, HostError, ImageId, MergeType, PdbStatus};
use crate::output::OutputPlan;
use crate::settings::{ExportSettings, SettingsError};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No suitable export procedure found.")]
    NoBackend,

    #[error("Export failed with status {0}")]
    BackendFailed(PdbStatus),

    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub job: Uuid,
    pub working_copy: ImageId,
    pub format: ExportFormat,
    pub procedure: String,
    pub output: OutputPlan,
}

/// Duplicate, flatten, export, clean up.
pub struct ExportPipeline {
    settings: ExportSettings,
}

impl ExportPipeline {
    pub fn new(settings: ExportSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Host entry point: export `image` stamped with the local time.
    pub fn run(&self, host: &dyn Host, image: ImageId) -> PdbStatus {
        self.run_at(host, image, Local::now().naive_local())
    }

    pub fn run_at(&self, host: &dyn Host, image: ImageId, now: NaiveDateTime) -> PdbStatus {
        match self.invoke_at(host, image, now) {
            Ok(_) => PdbStatus::Success,
            Err(_) => PdbStatus::ExecutionError,
        }
    }

    /// Run the export once and report the outcome to the user and the log.
    ///
    /// Never unwinds: a panic inside a host call becomes
    /// `ExportError::Unexpected`.
    pub fn invoke_at(
        &self,
        host: &dyn Host,
        image: ImageId,
        now: NaiveDateTime,
    ) -> Result<ExportReport, ExportError> {
        let job = Uuid::new_v4();
        let span = info_span!("scronch", %job, %image);
        let _guard = span.enter();

        let mut trace = None;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.export(host, image, now, job)))
            .unwrap_or_else(|payload| {
                trace = Some(Backtrace::force_capture());
                Err(ExportError::Unexpected(panic_message(payload.as_ref())))
            });

        if let Err(e) = &outcome {
            host.message(&format!("Scronch plugin error: {}", e));
            match &trace {
                Some(trace) => error!(error = %e, detail = %error_chain(e), backtrace = %trace, "Scronch plugin error"),
                None => error!(error = %e, detail = %error_chain(e), "Scronch plugin error"),
            }
        }
        outcome
    }

    fn export(
        &self,
        host: &dyn Host,
        image: ImageId,
        now: NaiveDateTime,
        job: Uuid,
    ) -> Result<ExportReport, ExportError> {
        self.settings.validate()?;

        let copy = WorkingCopy::duplicate(host, image)?;
        debug!(copy = %copy.id(), "Image duplicated.");

        host.merge_visible_layers(copy.id(), MergeType::ClipToImage)?;
        debug!("Image flattened.");

        let preferred = if self.settings.prefer_avif { ExportFormat::Avif } else { ExportFormat::Png };
        let source = host.image_file(image);
        let cwd = host.current_dir()?;
        let plan = OutputPlan::derive(
            source.as_deref(),
            &cwd,
            now,
            preferred,
            &self.settings.timestamp_format,
        )?;
        debug!(path = %plan.path.display(), "Output will be saved to");

        let format = select_backend(host, self.settings.prefer_avif).ok_or(ExportError::NoBackend)?;
        let plan = if format == plan.format { plan } else { plan.with_format(format) };

        let config = build_config(format, &self.settings, copy.id(), &plan.path);

        info!("Running export procedure...");
        host.message("Running export procedure...");
        let status = host.run_procedure(format.procedure_name(), &config)?;
        debug!(%status, "Export procedure run.");

        if !status.is_success() {
            return Err(ExportError::BackendFailed(status));
        }

        info!("Exported to {}", plan.path.display());
        host.message(&format!("Exported to {}", plan.path.display()));

        Ok(ExportReport {
            job,
            working_copy: copy.id(),
            format,
            procedure: config.procedure,
            output: plan,
        })
    }
}

impl Default for ExportPipeline {
    fn default() -> Self {
        Self::new(ExportSettings::default())
    }
}

/// Duplicate of the source image, deleted from the host on drop.
struct WorkingCopy<'h> {
    host: &'h dyn Host,
    image: ImageId,
}

impl<'h> WorkingCopy<'h> {
    fn duplicate(host: &'h dyn Host, source: ImageId) -> Result<Self, HostError> {
        let image = host.duplicate(source)?;
        Ok(Self { host, image })
    }

    fn id(&self) -> ImageId {
        self.image
    }
}

impl Drop for WorkingCopy<'_> {
    fn drop(&mut self) {
        match self.host.delete_image(self.image) {
            Ok(()) => debug!(copy = %self.image, "Working copy deleted."),
            Err(e) => warn!(copy = %self.image, error = %e, "Failed to delete working copy"),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn error_chain(e: &ExportError) -> String {
    let mut parts = vec![format!("{:?}", e)];
    let mut source = e.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": caused by: ")
}
