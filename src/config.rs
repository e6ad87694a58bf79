//! TOML adapter definitions
//!
//! Lets a game be supported by describing it as data:
//!
//! ```toml
//! [[game]]
//! id = "lostpig"
//! aliases = ["lost-pig"]
//! intro_actions = ["no"]
//! banner = ["Score:"]
//! victory_marker = "*** Grunk bring pig back to farm ***"
//! game_over_marker = "*** You have died ***"
//! self_object = 20
//! moves_addr = 0x2A10
//! score = { kind = "word", addr = 0x2A0E }
//! max_score = 7
//! num_world_objs = 180
//! num_attributes = 48
//! fingerprints = [{ release = 2, serial = "080406", checksum = 0x1c2e }]
//! ignore_moved = [{ object = 33 }]
//! ignore_attr_set = [{ object = 12, attr = 4 }]
//! ignore_attr_cleared = [{ attr = 30 }]
//! ```
//!
//! An omitted field in a suppression rule matches anything.

use std::fs;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::adapter::{GameAdapter, ScoreLocation};
use crate::error::{IntrospectError, Result};
use crate::header::Fingerprint;
use crate::memory::{MAX_ATTRIBUTES_V3, MAX_ATTRIBUTES_V4};

#[derive(Debug, Clone, Deserialize)]
pub struct AdapterFile {
    #[serde(default, rename = "game")]
    pub games: Vec<GameConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameConfig {
    pub id: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub intro_actions: Vec<String>,
    #[serde(default)]
    pub banner: Vec<String>,
    #[serde(default)]
    pub victory_marker: String,
    #[serde(default)]
    pub game_over_marker: String,
    pub self_object: u16,
    pub moves_addr: usize,
    pub score: ScoreConfig,
    pub max_score: i32,
    pub num_world_objs: u16,
    #[serde(default = "default_num_attributes")]
    pub num_attributes: u16,
    #[serde(default)]
    pub fingerprints: Vec<Fingerprint>,
    #[serde(default)]
    pub ignore_moved: Vec<MoveRule>,
    #[serde(default)]
    pub ignore_attr_set: Vec<AttrRule>,
    #[serde(default)]
    pub ignore_attr_cleared: Vec<AttrRule>,
}

fn default_num_attributes() -> u16 {
    MAX_ATTRIBUTES_V3
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    Byte,
    Word,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScoreConfig {
    pub kind: ScoreKind,
    pub addr: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoveRule {
    pub object: Option<u16>,
    pub dest: Option<u16>,
}

impl MoveRule {
    pub fn matches(&self, obj: u16, dest: u16) -> bool {
        self.object.map_or(true, |o| o == obj) && self.dest.map_or(true, |d| d == dest)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttrRule {
    pub object: Option<u16>,
    pub attr: Option<u16>,
}

impl AttrRule {
    pub fn matches(&self, obj: u16, attr: u16) -> bool {
        self.object.map_or(true, |o| o == obj) && self.attr.map_or(true, |a| a == attr)
    }
}

impl AdapterFile {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse an adapter file from disk
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading adapter definitions from {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }
}

impl GameConfig {
    fn validate(&self) -> Result<()> {
        let fail = |msg: String| -> Result<()> {
            Err(IntrospectError::Config(format!("{}: {}", self.id, msg)))
        };

        if self.id.trim().is_empty() {
            return Err(IntrospectError::Config("game id must not be empty".into()));
        }
        if self.num_attributes != MAX_ATTRIBUTES_V3 && self.num_attributes != MAX_ATTRIBUTES_V4 {
            return fail(format!(
                "num_attributes must be {MAX_ATTRIBUTES_V3} or {MAX_ATTRIBUTES_V4}, got {}",
                self.num_attributes
            ));
        }
        let n = self.num_world_objs;
        let bad_obj = |o: Option<u16>| o.is_some_and(|o| o == 0 || o > n);
        for rule in &self.ignore_moved {
            if bad_obj(rule.object) || rule.dest.is_some_and(|d| d > n) {
                return fail(format!("ignore_moved rule {rule:?} outside 1..={n}"));
            }
        }
        for rule in self.ignore_attr_set.iter().chain(&self.ignore_attr_cleared) {
            if bad_obj(rule.object) || rule.attr.is_some_and(|a| a >= self.num_attributes) {
                return fail(format!("attribute rule {rule:?} out of range"));
            }
        }
        Ok(())
    }

    /// Validate and turn the declarative description into an adapter
    pub fn into_adapter(self) -> Result<GameAdapter> {
        self.validate()?;

        let score = match self.score.kind {
            ScoreKind::Byte => ScoreLocation::Byte(self.score.addr),
            ScoreKind::Word => ScoreLocation::Word(self.score.addr),
        };

        let mut builder = GameAdapter::builder(&self.id)
            .intro_actions(&self.intro_actions)
            .victory_marker(&self.victory_marker)
            .game_over_marker(&self.game_over_marker)
            .self_object(self.self_object)
            .moves_addr(self.moves_addr)
            .score(score, self.max_score)
            .num_world_objs(self.num_world_objs)
            .num_attributes(self.num_attributes);

        for fp in &self.fingerprints {
            builder = match fp.checksum {
                Some(checksum) => builder.checked_fingerprint(fp.release, &fp.serial, checksum),
                None => builder.fingerprint(fp.release, &fp.serial),
            };
        }

        if !self.banner.is_empty() {
            let markers = self.banner;
            builder = builder.banner(move |line| markers.iter().any(|m| line.contains(m.as_str())));
        }
        if !self.ignore_moved.is_empty() {
            let rules = self.ignore_moved;
            builder = builder.ignore_moved_obj(move |obj, dest| rules.iter().any(|r| r.matches(obj, dest)));
        }
        if !self.ignore_attr_set.is_empty() {
            let rules = self.ignore_attr_set;
            builder = builder.ignore_attr_set(move |obj, attr| rules.iter().any(|r| r.matches(obj, attr)));
        }
        if !self.ignore_attr_cleared.is_empty() {
            let rules = self.ignore_attr_cleared;
            builder =
                builder.ignore_attr_cleared(move |obj, attr| rules.iter().any(|r| r.matches(obj, attr)));
        }

        builder.build()
    }
}
