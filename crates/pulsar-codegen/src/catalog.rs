//! The sensor catalog: the set of known sensors, with optional type and
//! unit annotations, used by the `--catalog` validation path.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SensorCatalog {
    #[serde(default)]
    pub sensors: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CatalogEntry {
    /// Shorthand: a bare sensor id.
    Id(String),
    Detailed {
        id: String,
        #[serde(default, rename = "type")]
        kind: Option<String>,
        #[serde(default)]
        unit: Option<String>,
    },
}

impl CatalogEntry {
    pub fn id(&self) -> &str {
        match self {
            CatalogEntry::Id(id) => id,
            CatalogEntry::Detailed { id, .. } => id,
        }
    }
}

impl SensorCatalog {
    /// Load a catalog document: a `sensors:` list of ids or id mappings.
    pub fn load(path: &Path) -> anyhow::Result<SensorCatalog> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading catalog file {}", path.display()))?;
        let catalog: SensorCatalog = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing catalog file {}", path.display()))?;
        Ok(catalog)
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.sensors.iter().map(|e| e.id().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}
