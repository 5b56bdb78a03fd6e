//! Per-source "last relayed message id" state.
//!
//! On disk this is a flat JSON object, `{"<source>": "<message id>"}`. Ids are
//! written as strings so 64-bit snowflakes survive JS-style JSON readers.

use std::{
    collections::BTreeMap,
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};

use crate::{
    domain::{ChannelId, MessageId},
    Result,
};

/// Highest relayed id per source. Absent source = nothing relayed yet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermarks(BTreeMap<ChannelId, MessageId>);

impl Watermarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &ChannelId) -> Option<MessageId> {
        self.0.get(source).copied()
    }

    /// Move `source` forward to `id`. Never moves backwards.
    ///
    /// Returns `true` if the stored value changed.
    pub fn advance(&mut self, source: &ChannelId, id: MessageId) -> bool {
        match self.0.get(source) {
            Some(current) if *current >= id => false,
            _ => {
                self.0.insert(source.clone(), id);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChannelId, &MessageId)> {
        self.0.iter()
    }
}

impl FromIterator<(ChannelId, MessageId)> for Watermarks {
    fn from_iter<I: IntoIterator<Item = (ChannelId, MessageId)>>(iter: I) -> Self {
        let mut out = Watermarks::new();
        for (source, id) in iter {
            out.advance(&source, id);
        }
        out
    }
}

/// Why a load produced no prior state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmptyReason {
    /// No state file yet (first run).
    Missing,
    /// State file exists but does not parse; treated like a first run.
    Corrupt(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(Watermarks),
    Empty(EmptyReason),
}

impl LoadOutcome {
    pub fn into_watermarks(self) -> Watermarks {
        match self {
            LoadOutcome::Loaded(w) => w,
            LoadOutcome::Empty(_) => Watermarks::new(),
        }
    }
}

pub trait WatermarkStore: Send + Sync {
    /// Missing/corrupt state is an `Ok(Empty(..))`; only real I/O failures are `Err`.
    fn load(&self) -> Result<LoadOutcome>;

    /// Replace the persisted state with `watermarks` as a whole.
    fn save(&self, watermarks: &Watermarks) -> Result<()>;
}

/// JSON file with atomic replace on save.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling temp file; same directory so the rename stays on one filesystem.
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl WatermarkStore for JsonFileStore {
    fn load(&self) -> Result<LoadOutcome> {
        let txt = match fs::read_to_string(&self.path) {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(LoadOutcome::Empty(EmptyReason::Missing));
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Watermarks>(&txt) {
            Ok(w) => Ok(LoadOutcome::Loaded(w)),
            Err(e) => Ok(LoadOutcome::Empty(EmptyReason::Corrupt(e.to_string()))),
        }
    }

    fn save(&self, watermarks: &Watermarks) -> Result<()> {
        let txt = serde_json::to_string_pretty(watermarks)?;
        let tmp = self.temp_path();

        // The temp file never outlives a failed save.
        let written =
            write_synced(&tmp, txt.as_bytes()).and_then(|()| fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut f = fs::File::create(path)?;
    f.write_all(bytes)?;
    f.sync_all()
}

/// In-memory store; counts saves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Option<Watermarks>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(watermarks: Watermarks) -> Self {
        Self {
            state: Mutex::new(Some(watermarks)),
            saves: Mutex::new(0),
        }
    }

    pub fn saved(&self) -> Option<Watermarks> {
        self.state.lock().ok().and_then(|g| g.clone())
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|g| *g).unwrap_or(0)
    }
}

impl WatermarkStore for MemoryStore {
    fn load(&self) -> Result<LoadOutcome> {
        let state = self.state.lock().map(|g| g.clone()).unwrap_or(None);
        Ok(match state {
            Some(w) => LoadOutcome::Loaded(w),
            None => LoadOutcome::Empty(EmptyReason::Missing),
        })
    }

    fn save(&self, watermarks: &Watermarks) -> Result<()> {
        if let Ok(mut g) = self.state.lock() {
            *g = Some(watermarks.clone());
        }
        if let Ok(mut n) = self.saves.lock() {
            *n += 1;
        }
        Ok(())
    }
}
