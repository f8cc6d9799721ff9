//! Dry-Run Host - in-memory stand-in for the image editor
//!
//! Records every call and writes nothing. Used by the CLI `run` command and
//! by the tests.

use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::backend::{ExportFormat, ProcedureConfig};
use crate::host::{Host, HostError, HostResult, ImageId, MergeType, PdbStatus};

/// The image the host hands to the plugin.
pub const SOURCE_IMAGE: ImageId = ImageId(1);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "kebab-case")]
pub enum HostCall {
    Duplicate { image: ImageId, copy: ImageId },
    MergeVisibleLayers { image: ImageId, merge: MergeType },
    LookupProcedure { name: String, found: bool },
    RunProcedure { config: ProcedureConfig, status: PdbStatus },
    DeleteImage { image: ImageId },
    Message { text: String },
}

/// Host call where an injected fault fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Duplicate,
    Merge,
    RunProcedure,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Error(FailPoint),
    Panic(FailPoint),
}

pub struct DryRunHost {
    source_file: Option<PathBuf>,
    cwd: PathBuf,
    procedures: BTreeSet<String>,
    status: PdbStatus,
    fault: Option<Fault>,
    next_id: Cell<u32>,
    live: RefCell<BTreeSet<ImageId>>,
    calls: RefCell<Vec<HostCall>>,
}

impl DryRunHost {
    /// Host with both export procedures registered, an unsaved source image,
    /// `/` as working directory and backends that succeed.
    pub fn new() -> Self {
        let procedures = [ExportFormat::Avif, ExportFormat::Png]
            .iter()
            .map(|f| f.procedure_name().to_string())
            .collect();
        Self {
            source_file: None,
            cwd: PathBuf::from("/"),
            procedures,
            status: PdbStatus::Success,
            fault: None,
            next_id: Cell::new(SOURCE_IMAGE.0 + 1),
            live: RefCell::new(BTreeSet::from([SOURCE_IMAGE])),
            calls: RefCell::new(vec![]),
        }
    }

    pub fn with_source_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_file = Some(path.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn without_procedure(mut self, name: &str) -> Self {
        self.procedures.remove(name);
        self
    }

    /// Status every backend run reports.
    pub fn with_status(mut self, status: PdbStatus) -> Self {
        self.status = status;
        self
    }

    pub fn fail_at(mut self, point: FailPoint) -> Self {
        self.fault = Some(Fault::Error(point));
        self
    }

    pub fn panic_at(mut self, point: FailPoint) -> Self {
        self.fault = Some(Fault::Panic(point));
        self
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.borrow().clone()
    }

    /// Images that exist on the host, source included.
    pub fn live_images(&self) -> Vec<ImageId> {
        self.live.borrow().iter().copied().collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                HostCall::Message { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn runs(&self) -> Vec<ProcedureConfig> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                HostCall::RunProcedure { config, .. } => Some(config.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: HostCall) {
        self.calls.borrow_mut().push(call);
    }

    fn check(&self, point: FailPoint) -> HostResult<()> {
        match self.fault {
            Some(Fault::Error(p)) if p == point => {
                Err(HostError::call_failed(format!("injected failure at {:?}", point)))
            }
            Some(Fault::Panic(p)) if p == point => panic!("injected panic at {:?}", point),
            _ => Ok(()),
        }
    }

    fn require(&self, image: ImageId) -> HostResult<()> {
        if self.live.borrow().contains(&image) {
            Ok(())
        } else {
            Err(HostError::ImageNotFound(image))
        }
    }
}

impl Default for DryRunHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for DryRunHost {
    fn duplicate(&self, image: ImageId) -> HostResult<ImageId> {
        self.check(FailPoint::Duplicate)?;
        self.require(image)?;
        let copy = ImageId(self.next_id.get());
        self.next_id.set(copy.0 + 1);
        self.live.borrow_mut().insert(copy);
        self.record(HostCall::Duplicate { image, copy });
        Ok(copy)
    }

    fn merge_visible_layers(&self, image: ImageId, merge: MergeType) -> HostResult<()> {
        self.check(FailPoint::Merge)?;
        self.require(image)?;
        self.record(HostCall::MergeVisibleLayers { image, merge });
        Ok(())
    }

    fn image_file(&self, image: ImageId) -> Option<PathBuf> {
        if image == SOURCE_IMAGE {
            self.source_file.clone()
        } else {
            None
        }
    }

    fn lookup_procedure(&self, name: &str) -> bool {
        let found = self.procedures.contains(name);
        self.record(HostCall::LookupProcedure { name: name.to_string(), found });
        found
    }

    fn run_procedure(&self, name: &str, config: &ProcedureConfig) -> HostResult<PdbStatus> {
        self.check(FailPoint::RunProcedure)?;
        if !self.procedures.contains(name) {
            return Err(HostError::ProcedureNotFound(name.to_string()));
        }
        self.record(HostCall::RunProcedure { config: config.clone(), status: self.status });
        Ok(self.status)
    }

    fn delete_image(&self, image: ImageId) -> HostResult<()> {
        self.check(FailPoint::Delete)?;
        if !self.live.borrow_mut().remove(&image) {
            return Err(HostError::ImageNotFound(image));
        }
        self.record(HostCall::DeleteImage { image });
        Ok(())
    }

    fn message(&self, text: &str) {
        self.record(HostCall::Message { text: text.to_string() });
    }

    fn current_dir(&self) -> HostResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}
