use crate::projector::{ViolationMode, VoteEventProjector, DEFAULT_OUTPUT_NAME};
use crate::schema::SOURCE_TABLE;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectorSettings {
    pub db_path: Option<String>,
    pub source_table: String,
    pub output_name: String,
    pub strict: bool,
    pub on_violation: ViolationMode,
}

impl Default for ProjectorSettings {
    fn default() -> Self {
        Self {
            db_path: None,
            source_table: SOURCE_TABLE.to_string(),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            strict: false,
            on_violation: ViolationMode::FailFast,
        }
    }
}

impl ProjectorSettings {
    /// Loads settings from a `.toml`, `.yaml` or `.yml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
        let settings = match extension {
            "toml" => toml::from_str(&raw)?,
            "yaml" | "yml" => serde_yaml::from_str(&raw)?,
            _ => return Err(anyhow!("unsupported config format: {}", path.display())),
        };
        Ok(settings)
    }

    pub fn projector(&self) -> VoteEventProjector {
        VoteEventProjector {
            output_name: self.output_name.clone(),
            strict: self.strict,
            on_violation: self.on_violation,
        }
    }
}
