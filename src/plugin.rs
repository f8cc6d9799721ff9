//! Plugin Descriptor
//!
//! What the host needs to list the procedure in its menus, and the entry
//! point it calls. Host bindings translate `ProcedureInfo` into their own
//! registration calls.

use serde::{Deserialize, Serialize};

use crate::host::{Host, ImageId, PdbStatus};
use crate::pipeline::ExportPipeline;
use crate::settings::ExportSettings;

pub const PROCEDURE_NAME: &str = "scronch";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcType {
    Internal,
    Plugin,
    Extension,
    Temporary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub authors: String,
    pub copyright: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureInfo {
    pub name: String,
    pub proc_type: ProcType,
    pub image_types: String,
    pub menu_label: String,
    pub menu_paths: Vec<String>,
    pub blurb: String,
    pub help: String,
    pub attribution: Attribution,
    /// Always empty: every export setting is compiled in.
    pub arguments: Vec<String>,
}

pub struct ScronchPlugin {
    pipeline: ExportPipeline,
}

impl ScronchPlugin {
    pub fn new(settings: ExportSettings) -> Self {
        Self {
            pipeline: ExportPipeline::new(settings),
        }
    }

    pub fn query_procedures(&self) -> Vec<&'static str> {
        vec![PROCEDURE_NAME]
    }

    pub fn create_procedure(&self, name: &str) -> Option<ProcedureInfo> {
        if name != PROCEDURE_NAME {
            return None;
        }
        Some(ProcedureInfo {
            name: name.to_string(),
            proc_type: ProcType::Plugin,
            image_types: "*".to_string(),
            menu_label: "Scronch".to_string(),
            menu_paths: vec!["<Image>/Filters/".to_string()],
            blurb: "Scronch plugin".to_string(),
            help: "Duplicate, flatten, and export image as AVIF or PNG with timestamp. \
                   Settings are compiled into the plugin."
                .to_string(),
            attribution: Attribution {
                authors: "Charon".to_string(),
                copyright: "GPL 3".to_string(),
                date: "2025".to_string(),
            },
            arguments: vec![],
        })
    }

    /// Called by the host when the user picks the menu entry.
    pub fn run(&self, host: &dyn Host, image: ImageId) -> PdbStatus {
        self.pipeline.run(host, image)
    }

    pub fn pipeline(&self) -> &ExportPipeline {
        &self.pipeline
    }
}

impl Default for ScronchPlugin {
    fn default() -> Self {
        Self::new(ExportSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registers_one_procedure() {
        let plugin = ScronchPlugin::default();
        assert_eq!(plugin.query_procedures(), vec!["scronch"]);
    }

    #[test]
    fn test_descriptor_lives_in_filters_menu() {
        let info = ScronchPlugin::default().create_procedure(PROCEDURE_NAME).unwrap();
        assert_eq!(info.menu_label, "Scronch");
        assert_eq!(info.menu_paths, vec!["<Image>/Filters/"]);
        assert_eq!(info.image_types, "*");
        assert_eq!(info.proc_type, ProcType::Plugin);
        assert!(info.arguments.is_empty());
    }

    #[test]
    fn test_unknown_procedure_is_not_created() {
        assert!(ScronchPlugin::default().create_procedure("scrunch").is_none());
    }
}
