use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use declarative::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Default state file name
pub const DEFAULT_STATE_FILE: &str = "dashform.state.json";

/// Current state file format version
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// State Structures
// ============================================================================

/// Everything dashform has recorded about the remote service
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StateFile {
    pub version: u32,

    /// Incremented on every save
    #[serde(default)]
    pub serial: u64,

    /// Last time the state was written
    pub last_updated: DateTime<Utc>,

    /// Recorded resources keyed by `kind.name`
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceRecord>,
}

/// Recorded state of one resource
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResourceRecord {
    pub kind: String,
    pub attributes: Value,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            serial: 0,
            last_updated: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

// ============================================================================
// StateFile Implementation
// ============================================================================

impl StateFile {
    /// Load state from disk, or return an empty state if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, using empty state", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            bail!(
                "State file {} has version {}, this build understands up to {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        log::debug!(
            "Loaded {} resources from {} (serial {})",
            state.resources.len(),
            path.display(),
            state.serial
        );
        Ok(state)
    }

    /// Save state to disk
    ///
    /// The file is written next to its final location and renamed into
    /// place, so a crash never leaves a truncated state file behind.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.serial += 1;
        self.last_updated = Utc::now();

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;

        let content = serde_json::to_string_pretty(self).context("Failed to serialize state")?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        tmp.write_all(content.as_bytes())
            .and_then(|()| tmp.write_all(b"\n"))
            .context("Failed to write state")?;
        tmp.persist(path)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {} (serial {})", path.display(), self.serial);
        Ok(())
    }

    // ========================================================================
    // Resource Helpers
    // ========================================================================

    pub fn get(&self, address: &Address) -> Option<&ResourceRecord> {
        self.resources.get(&address.to_string())
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.resources.contains_key(&address.to_string())
    }

    /// Record `attributes` for `address`, or forget it when `None`
    pub fn set(&mut self, address: &Address, attributes: Option<Value>) {
        let key = address.to_string();
        match attributes {
            Some(attributes) => {
                self.resources.insert(
                    key,
                    ResourceRecord {
                        kind: address.kind.clone(),
                        attributes,
                    },
                );
            }
            None => {
                self.resources.remove(&key);
            }
        }
    }

    pub fn remove(&mut self, address: &Address) -> Option<ResourceRecord> {
        self.resources.remove(&address.to_string())
    }

    /// Recorded addresses in key order
    pub fn addresses(&self) -> Result<Vec<Address>> {
        self.resources
            .iter()
            .map(|(key, record)| {
                let address: Address = key
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!(e))
                    .with_context(|| format!("Corrupt state entry '{key}'"))?;
                if address.kind != record.kind {
                    bail!(
                        "Corrupt state entry '{key}': recorded kind is '{}'",
                        record.kind
                    );
                }
                Ok(address)
            })
            .collect()
    }
}
