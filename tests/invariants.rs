//! Contract Invariant Tests
//!
//! These tests verify the export guarantees end to end against the dry-run host.

use chrono::{NaiveDate, NaiveDateTime};
use std::path::PathBuf;

use scronch_core::{
    dry_run::{FailPoint, HostCall, SOURCE_IMAGE},
    DryRunHost, ExportError, ExportFormat, ExportPipeline, ExportSettings, ParamValue, PdbStatus,
    ScronchPlugin,
};

fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(12, 0, 0).unwrap()
}

fn photo_host() -> DryRunHost {
    DryRunHost::new()
        .with_source_file("/home/u/pics/photo.xcf")
        .with_cwd("/somewhere/else")
}

fn no_backends(host: DryRunHost) -> DryRunHost {
    host.without_procedure(ExportFormat::Avif.procedure_name())
        .without_procedure(ExportFormat::Png.procedure_name())
}

#[test]
fn invariant_scenario_photo_exports_as_avif() {
    let host = photo_host();
    let pipeline = ExportPipeline::default();

    let report = pipeline.invoke_at(&host, SOURCE_IMAGE, noon()).unwrap();

    assert_eq!(report.output.path, PathBuf::from("/home/u/pics/photo-20250301120000.avif"));
    assert_eq!(report.format, ExportFormat::Avif);

    let runs = host.runs();
    assert_eq!(runs.len(), 1);
    let config = &runs[0];
    assert_eq!(config.procedure, "file-heif-av1-export");
    assert_eq!(config.get("file"), Some(&ParamValue::File(report.output.path.clone())));
    assert_eq!(config.get("image"), Some(&ParamValue::Image(report.working_copy)));
    assert_eq!(config.get("quality"), Some(&ParamValue::Int(85)));
    assert_eq!(config.get("lossless"), Some(&ParamValue::Bool(true)));
    assert_eq!(config.get("save-bit-depth"), Some(&ParamValue::Int(10)));
    assert_eq!(config.get("pixel-format"), Some(&ParamValue::Str("yuv444".into())));
    assert_eq!(config.get("encoder-speed"), Some(&ParamValue::Str("balanced".into())));
    assert_eq!(config.get("include-exif"), Some(&ParamValue::Bool(true)));
    assert_eq!(config.get("include-xmp"), Some(&ParamValue::Bool(true)));

    assert_eq!(pipeline.run_at(&photo_host(), SOURCE_IMAGE, noon()), PdbStatus::Success);
}

#[test]
fn invariant_exports_the_copy_not_the_original() {
    let host = photo_host();
    let report = ExportPipeline::default().invoke_at(&host, SOURCE_IMAGE, noon()).unwrap();

    assert_ne!(report.working_copy, SOURCE_IMAGE);
    assert_eq!(host.runs()[0].get("image"), Some(&ParamValue::Image(report.working_copy)));
}

#[test]
fn invariant_unsaved_image_goes_to_cwd_as_untitled() {
    let host = DryRunHost::new().with_cwd("/work");
    let report = ExportPipeline::default().invoke_at(&host, SOURCE_IMAGE, noon()).unwrap();

    assert_eq!(report.output.path, PathBuf::from("/work/untitled-20250301120000.avif"));
}

#[test]
fn invariant_fallback_uses_png_extension() {
    let host = photo_host().without_procedure(ExportFormat::Avif.procedure_name());
    let report = ExportPipeline::default().invoke_at(&host, SOURCE_IMAGE, noon()).unwrap();

    assert_eq!(report.format, ExportFormat::Png);
    assert_eq!(report.output.path, PathBuf::from("/home/u/pics/photo-20250301120000.png"));
    let config = &host.runs()[0];
    assert_eq!(config.procedure, "file-png-export");
    assert_eq!(config.get("compression"), Some(&ParamValue::Int(9)));
    assert_eq!(config.get("file"), Some(&ParamValue::File(report.output.path.clone())));
}

#[test]
fn invariant_png_when_avif_not_preferred() {
    let settings = ExportSettings { prefer_avif: false, ..ExportSettings::default() };
    let host = photo_host();
    let report = ExportPipeline::new(settings).invoke_at(&host, SOURCE_IMAGE, noon()).unwrap();

    assert_eq!(report.format, ExportFormat::Png);
    assert!(!host.calls().iter().any(|c| matches!(
        c,
        HostCall::LookupProcedure { name, .. } if name == "file-heif-av1-export"
    )));
}

#[test]
fn invariant_no_backend_fails_before_export_and_cleans_up() {
    let host = no_backends(photo_host());
    let pipeline = ExportPipeline::default();

    let err = pipeline.invoke_at(&host, SOURCE_IMAGE, noon()).unwrap_err();
    assert!(matches!(err, ExportError::NoBackend));
    assert!(host.runs().is_empty());
    assert_eq!(host.live_images(), vec![SOURCE_IMAGE]);

    let host = no_backends(photo_host());
    assert_eq!(pipeline.run_at(&host, SOURCE_IMAGE, noon()), PdbStatus::ExecutionError);
}

#[test]
fn invariant_success_deletes_working_copy() {
    let host = photo_host();
    let status = ExportPipeline::default().run_at(&host, SOURCE_IMAGE, noon());

    assert_eq!(status, PdbStatus::Success);
    assert_eq!(host.live_images(), vec![SOURCE_IMAGE]);
    // Deleted after the export ran, not before.
    let calls = host.calls();
    let run = calls.iter().position(|c| matches!(c, HostCall::RunProcedure { .. })).unwrap();
    let delete = calls.iter().position(|c| matches!(c, HostCall::DeleteImage { .. })).unwrap();
    assert!(run < delete);
}

#[test]
fn invariant_backend_failure_is_execution_error() {
    for status in [PdbStatus::ExecutionError, PdbStatus::CallingError, PdbStatus::Cancel] {
        let host = photo_host().with_status(status);
        let pipeline = ExportPipeline::default();

        let err = pipeline.invoke_at(&host, SOURCE_IMAGE, noon()).unwrap_err();
        assert!(matches!(err, ExportError::BackendFailed(s) if s == status));
        assert_eq!(host.live_images(), vec![SOURCE_IMAGE]);

        let host = photo_host().with_status(status);
        assert_eq!(pipeline.run_at(&host, SOURCE_IMAGE, noon()), PdbStatus::ExecutionError);
    }
}

#[test]
fn invariant_host_failures_are_reported_not_propagated() {
    for point in [FailPoint::Duplicate, FailPoint::Merge, FailPoint::RunProcedure] {
        let host = photo_host().fail_at(point);
        let status = ExportPipeline::default().run_at(&host, SOURCE_IMAGE, noon());

        assert_eq!(status, PdbStatus::ExecutionError);
        assert_eq!(host.live_images(), vec![SOURCE_IMAGE]);
        assert!(host.messages().iter().any(|m| m.starts_with("Scronch plugin error:")));
    }
}

#[test]
fn invariant_user_sees_progress_and_result() {
    let host = photo_host();
    ExportPipeline::default().run_at(&host, SOURCE_IMAGE, noon());

    assert_eq!(
        host.messages(),
        vec![
            "Running export procedure...".to_string(),
            "Exported to /home/u/pics/photo-20250301120000.avif".to_string(),
        ]
    );
}

#[test]
fn invariant_plugin_entry_point_reports_success() {
    let plugin = ScronchPlugin::default();
    let host = photo_host();

    assert_eq!(plugin.run(&host, SOURCE_IMAGE), PdbStatus::Success);
    assert_eq!(host.runs().len(), 1);
    assert_eq!(host.live_images(), vec![SOURCE_IMAGE]);
}
