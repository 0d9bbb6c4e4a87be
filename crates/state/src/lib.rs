use anyhow::{Context, Result};
use discue_core::{Current, Outputs, ResourceId};
use serde::{Serialize, Deserialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const STATE_FILE: &str = "discue.state.json";
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    #[serde(default)]
    pub serial: u64,
    #[serde(default)]
    pub resources: BTreeMap<String, Json>,
}

impl Default for StateFile {
    fn default() -> Self { Self { version: STATE_VERSION, serial: 0, resources: BTreeMap::new() } }
}

impl StateFile {
    pub fn outputs(&self) -> Outputs {
        self.resources.iter().map(|(k, v)| (ResourceId(k.clone()), Current(v.clone()))).collect()
    }

    pub fn set_outputs(&mut self, outputs: &Outputs) {
        self.resources = outputs.iter().map(|(k, v)| (k.0.clone(), v.0.clone())).collect();
    }
}

pub fn state_path(dir: &Path) -> PathBuf { dir.join(STATE_FILE) }

/// Reads the state in `dir`; a missing file is an empty state.
pub fn load_state(dir: &Path) -> Result<StateFile> {
    let path = state_path(dir);
    if !path.exists() { return Ok(StateFile::default()); }
    let bytes = std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    let state: StateFile = serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    if state.version != STATE_VERSION {
        anyhow::bail!("{} has state version {}, expected {}", path.display(), state.version, STATE_VERSION);
    }
    Ok(state)
}

/// Writes `state` with a bumped serial. The file is replaced atomically.
pub fn write_state(state: &mut StateFile, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    state.serial += 1;
    let path = state_path(dir);
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_string_pretty(state)?).with_context(|| format!("write {}", tmp.display()))?;
    std::fs::rename(&tmp, &path).with_context(|| format!("replace {}", path.display()))?;
    tracing::debug!(path = %path.display(), serial = state.serial, "state written");
    Ok(())
}
