use crate::config::ContainmentConfig;
use crate::model::ConstructId;
use chrono::{DateTime, Utc};
use fixcheck_editscript::EditScript;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Writes edit scripts of a check to disk for offline inspection.
///
/// Failures are logged and never abort a check.
#[derive(Debug, Clone)]
pub struct EditScriptDumper {
    dir: PathBuf,
    intersections: bool,
}

impl EditScriptDumper {
    /// Dumper for `config`, or `None` when saving scripts is disabled
    pub fn from_config(config: &ContainmentConfig) -> Option<Self> {
        if !config.save_edit_scripts {
            return None;
        }
        Some(Self {
            dir: config.dump_dir(),
            intersections: config.save_edit_script_intersections,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn saves_intersections(&self) -> bool {
        self.intersections
    }

    pub fn dump_script(
        &self,
        id: &ConstructId,
        name: &str,
        script: &EditScript,
    ) -> Option<PathBuf> {
        self.write(id, name, &script.to_json_value(&id.qname))
    }

    pub fn dump_intersections(
        &self,
        id: &ConstructId,
        defective_to_test: &EditScript,
        test_to_fixed: &EditScript,
    ) -> Option<PathBuf> {
        if !self.intersections {
            return None;
        }
        let value = json!({
            "### Defective->Test": defective_to_test.to_json_value(&id.qname),
            "### Test->Fixed": test_to_fixed.to_json_value(&id.qname),
        });
        self.write(id, "intersections", &value)
    }

    fn write(&self, id: &ConstructId, name: &str, value: &Value) -> Option<PathBuf> {
        let file = self.dir.join(format!(
            "{}_{}_{}.json",
            sanitize(&id.qname),
            name,
            timestamp(Utc::now())
        ));
        let result = std::fs::create_dir_all(&self.dir).and_then(|()| {
            let text = serde_json::to_string_pretty(value)?;
            std::fs::write(&file, text)
        });
        match result {
            Ok(()) => {
                log::debug!("Saved {name} of {id} to {}", file.display());
                Some(file)
            }
            Err(e) => {
                log::warn!("Failed to save {name} of {id} to {}: {e}", file.display());
                None
            }
        }
    }
}

fn sanitize(qname: &str) -> String {
    qname
        .chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '.' | '$' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}
