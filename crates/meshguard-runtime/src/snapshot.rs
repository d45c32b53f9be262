//! Persistence hook for sender state
//!
//! Only durable state is captured: reputation, history and the two manual
//! lists. Monotonic timestamps and the dedup cache are node-local.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use meshguard_core::{GuardError, GuardResult, SenderId};
use meshguard_filter::ProfileSnapshot;
use serde::{Deserialize, Serialize};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable admission state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HardeningSnapshot {
    pub version: u32,
    pub profiles: Vec<ProfileSnapshot>,
    #[serde(default)]
    pub blocklist: BTreeMap<SenderId, String>,
    #[serde(default)]
    pub allowlist: BTreeMap<SenderId, String>,
}

impl Default for HardeningSnapshot {
    fn default() -> Self {
        HardeningSnapshot {
            version: SNAPSHOT_VERSION,
            profiles: Vec::new(),
            blocklist: BTreeMap::new(),
            allowlist: BTreeMap::new(),
        }
    }
}

impl HardeningSnapshot {
    pub fn to_json(&self) -> GuardResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> GuardResult<Self> {
        let snapshot: HardeningSnapshot = serde_json::from_str(json)?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    pub fn check_version(&self) -> GuardResult<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(GuardError::SnapshotVersion(self.version));
        }
        Ok(())
    }
}

/// Load/save backend for snapshots
pub trait SnapshotStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet
    fn load(&self) -> GuardResult<Option<HardeningSnapshot>>;
    fn save(&self, snapshot: &HardeningSnapshot) -> GuardResult<()>;
}

/// Snapshot stored as a JSON file
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> GuardResult<Option<HardeningSnapshot>> {
        match fs::read_to_string(&self.path) {
            Ok(json) => HardeningSnapshot::from_json(&json).map(Some),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(GuardError::io(&self.path, err)),
        }
    }

    fn save(&self, snapshot: &HardeningSnapshot) -> GuardResult<()> {
        let json = snapshot.to_json()?;
        let tmp = self.temp_path();
        fs::write(&tmp, json).map_err(|e| GuardError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| GuardError::io(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), profiles = snapshot.profiles.len(), "snapshot saved");
        Ok(())
    }
}
