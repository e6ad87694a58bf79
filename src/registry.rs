//! Adapter registry: game identifier -> adapter
//!
//! Registration happens once at startup; lookups afterwards are a single
//! hash lookup. The built-in tables are constructed lazily, once per process,
//! and shared between every registry that asks for them.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::adapter::GameAdapter;
use crate::config::AdapterFile;
use crate::error::{IntrospectError, Result};
use crate::games;
use crate::header::{Fingerprint, Header};

lazy_static! {
    static ref BUILTIN_ADAPTERS: Vec<Arc<GameAdapter>> = games::builtin_adapters()
        .unwrap_or_else(|e| panic!("built-in adapter table is invalid: {e}"))
        .into_iter()
        .map(Arc::new)
        .collect();
}

/// Case-insensitive game identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameId(String);

impl GameId {
    pub fn new(id: &str) -> Self {
        GameId(id.trim().to_lowercase())
    }

    /// Derive an identifier from a story file name: `games/Planetfall.z3` -> `planetfall`
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .map(GameId::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GameId {
    fn from(id: &str) -> Self {
        GameId::new(id)
    }
}

#[derive(Debug, Default, Clone)]
pub struct AdapterRegistry {
    adapters: IndexMap<GameId, Arc<GameAdapter>>,
    fingerprints: IndexMap<Fingerprint, GameId>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every compiled-in adapter
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for adapter in BUILTIN_ADAPTERS.iter() {
            registry.insert(GameId::new(adapter.name()), Arc::clone(adapter));
        }
        registry
    }

    /// Register `adapter` under `id`, replacing any previous entry
    pub fn register(&mut self, id: impl Into<GameId>, adapter: GameAdapter) -> Arc<GameAdapter> {
        let adapter = Arc::new(adapter);
        self.insert(id.into(), Arc::clone(&adapter));
        adapter
    }

    fn insert(&mut self, id: GameId, adapter: Arc<GameAdapter>) {
        debug!("Registering adapter {} as '{}'", adapter.name(), id);
        if self.adapters.insert(id.clone(), Arc::clone(&adapter)).is_some() {
            warn!("Adapter for '{}' replaced", id);
            // fingerprints only the replaced adapter declared must not resolve to `id`
            let declared = adapter.fingerprints();
            self.fingerprints
                .retain(|fp, owner| *owner != id || declared.contains(fp));
        }
        for fp in adapter.fingerprints() {
            self.fingerprints.insert(fp.clone(), id.clone());
        }
    }

    /// Register every game in a TOML adapter file, including its aliases
    pub fn load_config_str(&mut self, text: &str) -> Result<usize> {
        self.register_file(AdapterFile::parse(text)?)
    }

    pub fn load_config(&mut self, path: &Path) -> Result<usize> {
        self.register_file(AdapterFile::load(path)?)
    }

    fn register_file(&mut self, file: AdapterFile) -> Result<usize> {
        let mut count = 0;
        for game in file.games {
            let id = GameId::new(&game.id);
            let aliases: Vec<GameId> = game.aliases.iter().map(|a| GameId::new(a)).collect();
            let adapter = Arc::new(game.into_adapter()?);
            self.insert(id, Arc::clone(&adapter));
            for alias in aliases {
                self.insert(alias, Arc::clone(&adapter));
            }
            count += 1;
        }
        info!("Loaded {} adapter definition(s)", count);
        Ok(count)
    }

    pub fn lookup(&self, id: &GameId) -> Result<Arc<GameAdapter>> {
        self.adapters
            .get(id)
            .cloned()
            .ok_or_else(|| IntrospectError::UnsupportedGame {
                game: id.to_string(),
            })
    }

    pub fn contains(&self, id: &GameId) -> bool {
        self.adapters.contains_key(id)
    }

    /// Work out which game `story` is: header fingerprint first, then file name.
    /// A fingerprint pinned to the header checksum wins over one without.
    pub fn identify(&self, path: Option<&Path>, story: &[u8]) -> Result<GameId> {
        if let Ok(header) = Header::parse(story) {
            for fp in [header.checked_fingerprint(), header.fingerprint()] {
                if let Some(id) = self.fingerprints.get(&fp) {
                    debug!("Identified {} by fingerprint {}", id, fp);
                    return Ok(id.clone());
                }
            }
        }

        match path.and_then(GameId::from_path) {
            Some(id) if self.contains(&id) => Ok(id),
            Some(id) => Err(IntrospectError::UnsupportedGame {
                game: id.to_string(),
            }),
            None => Err(IntrospectError::UnsupportedGame {
                game: "<unknown story>".to_string(),
            }),
        }
    }

    /// Registered identifiers, in registration order
    pub fn ids(&self) -> impl Iterator<Item = &GameId> {
        self.adapters.keys()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
