use anyhow::{anyhow, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration of fix containment checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainmentConfig {
    /// Write overall, defective→test and test→fixed scripts to disk
    pub save_edit_scripts: bool,

    /// Target directory for saved scripts (system temp dir when unset)
    pub edit_script_dir: Option<PathBuf>,

    /// Also write the two intersections
    pub save_edit_script_intersections: bool,

    /// Compare normalized names right away instead of only on retry
    pub relaxed_by_default: bool,

    /// Strip `final` while normalizing names
    pub strip_finals: bool,

    /// Glob patterns of repository paths holding test code
    pub test_path_patterns: Vec<String>,

    /// Evaluate constructs on the rayon thread pool
    pub parallel: bool,
}

impl Default for ContainmentConfig {
    fn default() -> Self {
        Self {
            save_edit_scripts: false,
            edit_script_dir: None,
            save_edit_script_intersections: false,
            relaxed_by_default: false,
            strip_finals: false,
            test_path_patterns: vec![
                "**/src/test/**".to_string(),
                "src/test/**".to_string(),
                "**/testcases/**".to_string(),
            ],
            parallel: false,
        }
    }
}

impl ContainmentConfig {
    /// Create config that keeps every diagnostic file
    pub fn for_diagnostics(dir: impl Into<PathBuf>) -> Self {
        Self {
            save_edit_scripts: true,
            edit_script_dir: Some(dir.into()),
            save_edit_script_intersections: true,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.save_edit_script_intersections && !self.save_edit_scripts {
            return Err(
                "save_edit_script_intersections requires save_edit_scripts".to_string(),
            );
        }

        for pattern in &self.test_path_patterns {
            if pattern.trim().is_empty() {
                return Err("test_path_patterns must not contain empty patterns".to_string());
            }
            Glob::new(pattern).map_err(|e| format!("invalid test path pattern '{pattern}': {e}"))?;
        }

        Ok(())
    }

    /// Parse TOML, falling back to JSON
    pub fn from_str_any(text: &str) -> Result<Self> {
        let config: Self = match toml::from_str(text) {
            Ok(config) => config,
            Err(toml_err) => serde_json::from_str(text).map_err(|json_err| {
                anyhow!("Config is not valid TOML ({toml_err}) or JSON ({json_err})")
            })?,
        };
        config.validate().map_err(|e| anyhow!(e))?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_str_any(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Apply `FIXCHECK_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            lookup(key).and_then(|value| match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                other => {
                    log::warn!("Ignoring {key}={other}: expected a boolean");
                    None
                }
            })
        };

        if let Some(v) = flag("FIXCHECK_SAVE_EDIT_SCRIPTS") {
            self.save_edit_scripts = v;
        }
        if let Some(v) = flag("FIXCHECK_SAVE_INTERSECTIONS") {
            self.save_edit_script_intersections = v;
        }
        if let Some(v) = flag("FIXCHECK_RELAXED") {
            self.relaxed_by_default = v;
        }
        if let Some(v) = flag("FIXCHECK_STRIP_FINALS") {
            self.strip_finals = v;
        }
        if let Some(v) = flag("FIXCHECK_PARALLEL") {
            self.parallel = v;
        }
        if let Some(dir) = lookup("FIXCHECK_EDIT_SCRIPT_DIR") {
            let trimmed = dir.trim();
            if !trimmed.is_empty() {
                self.edit_script_dir = Some(PathBuf::from(trimmed));
            }
        }
    }

    /// Directory receiving saved edit scripts
    pub fn dump_dir(&self) -> PathBuf {
        self.edit_script_dir
            .clone()
            .unwrap_or_else(env::temp_dir)
    }

    pub(crate) fn test_path_matcher(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.test_path_patterns {
            builder.add(
                Glob::new(pattern)
                    .with_context(|| format!("Invalid test path pattern '{pattern}'"))?,
            );
        }
        builder.build().context("Failed to build test path matcher")
    }
}
