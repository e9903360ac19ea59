//! Entity template catalog.
//!
//! The catalog is a static JSON document grouping entity templates by
//! Home Assistant platform:
//!
//! ```json
//! {
//!   "switches": [{ "name": "Power", "id": "power", "entity": { ... } }],
//!   "buttons":  [...],
//!   "sensors":  [...],
//!   "fans":     [...],
//!   "selects":  [...]
//! }
//! ```
//!
//! Templates are shared, read-only inputs. Zone-specific values are layered on
//! top of a copy by [`crate::discovery`].

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::media_player::MEDIA_PLAYER_BINDINGS;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while loading or validating the entity catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("Failed to read entity catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog is not valid JSON or does not match the expected shape.
    #[error("Error parsing entity catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two templates share an id, so their composite entity ids would collide.
    #[error("Entity template id '{0}' is defined more than once")]
    DuplicateId(String),

    /// The media player config references an entity the catalog does not define.
    #[error("Entity catalog has no {kind} with id '{id}' (required by the media player config)")]
    MissingBinding { kind: EntityKind, id: &'static str },
}

/// Convenient Result alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

// ─────────────────────────────────────────────────────────────────────────────
// Entity Kinds
// ─────────────────────────────────────────────────────────────────────────────

/// Home Assistant platform an entity template belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Switch,
    Button,
    Sensor,
    Fan,
    Select,
}

impl EntityKind {
    /// All kinds, in the order components are emitted.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Switch,
        EntityKind::Button,
        EntityKind::Sensor,
        EntityKind::Fan,
        EntityKind::Select,
    ];

    /// Platform name as used in discovery payloads and entity ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Switch => "switch",
            Self::Button => "button",
            Self::Sensor => "sensor",
            Self::Fan => "fan",
            Self::Select => "select",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Templates
// ─────────────────────────────────────────────────────────────────────────────

/// Static, unpopulated field set for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTemplate {
    /// Suffix appended to the component name (e.g. "Power").
    pub name: String,
    /// Suffix of the composite entity id (e.g. "power").
    pub id: String,
    /// Discovery fields copied verbatim into the component.
    #[serde(default)]
    pub entity: Map<String, Value>,
}

/// The full catalog of entity templates, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityCatalog {
    #[serde(default)]
    pub switches: Vec<EntityTemplate>,
    #[serde(default)]
    pub buttons: Vec<EntityTemplate>,
    #[serde(default)]
    pub sensors: Vec<EntityTemplate>,
    #[serde(default)]
    pub fans: Vec<EntityTemplate>,
    #[serde(default)]
    pub selects: Vec<EntityTemplate>,
}

impl EntityCatalog {
    /// Reads a catalog from a JSON file.
    pub async fn load(path: &Path) -> CatalogResult<Self> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| CatalogError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
        let catalog = Self::from_json_str(&content)?;

        log::debug!(
            "[Catalog] Loaded {} entity template(s) from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parses a catalog from JSON text.
    pub fn from_json_str(json: &str) -> CatalogResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Templates of a single kind.
    pub fn templates(&self, kind: EntityKind) -> &[EntityTemplate] {
        match kind {
            EntityKind::Switch => &self.switches,
            EntityKind::Button => &self.buttons,
            EntityKind::Sensor => &self.sensors,
            EntityKind::Fan => &self.fans,
            EntityKind::Select => &self.selects,
        }
    }

    /// Iterates every template with its kind: switches, buttons, sensors, fans, selects.
    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, &EntityTemplate)> + '_ {
        EntityKind::ALL
            .into_iter()
            .flat_map(move |kind| self.templates(kind).iter().map(move |t| (kind, t)))
    }

    /// Total number of templates.
    pub fn len(&self) -> usize {
        EntityKind::ALL
            .iter()
            .map(|kind| self.templates(*kind).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if a template of `kind` with `id` exists.
    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        self.templates(kind).iter().any(|t| t.id == id)
    }

    /// Checks that template ids are unique and that every entity the media
    /// player config binds to is defined.
    pub fn validate(&self) -> CatalogResult<()> {
        let mut ids = HashSet::new();
        for (_, template) in self.iter() {
            if !ids.insert(template.id.as_str()) {
                return Err(CatalogError::DuplicateId(template.id.clone()));
            }
        }

        for binding in MEDIA_PLAYER_BINDINGS {
            if !self.contains(binding.kind, binding.id) {
                return Err(CatalogError::MissingBinding {
                    kind: binding.kind,
                    id: binding.id,
                });
            }
        }

        Ok(())
    }
}
