//! Per-game adapter records
//!
//! Every supported story binary gets one `GameAdapter`: the hard-coded
//! offsets, object numbers and marker strings for that game, plus the
//! suppression predicates the world diff consults. Adapters are plain data
//! with closure-valued fields, so a generic driver can run any of them and
//! each one is trivially constructible in a test.

use std::fmt;
use std::sync::Arc;

use crate::error::{IntrospectError, RangeKind, Result};
use crate::header::Fingerprint;
use crate::memory::{MemoryAccessor, MAX_ATTRIBUTES_V3};

/// Suppression rule over (object, new parent)
pub type MovePredicate = Arc<dyn Fn(u16, u16) -> bool + Send + Sync>;
/// Suppression rule over (object, attribute index)
pub type AttrPredicate = Arc<dyn Fn(u16, u16) -> bool + Send + Sync>;
/// Recognises a line of interpreter chrome, e.g. a status banner
pub type LinePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Where a game keeps its score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreLocation {
    /// Unsigned byte at an absolute address
    Byte(usize),
    /// Signed big-endian word at an absolute address
    Word(usize),
}

pub struct GameAdapter {
    name: String,
    intro_actions: Vec<String>,
    banner: Option<LinePredicate>,
    victory_marker: String,
    game_over_marker: String,
    self_object: u16,
    moves_addr: usize,
    score: ScoreLocation,
    max_score: i32,
    num_world_objs: u16,
    num_attributes: u16,
    fingerprints: Vec<Fingerprint>,
    ignore_moved: Option<MovePredicate>,
    ignore_set: Option<AttrPredicate>,
    ignore_cleared: Option<AttrPredicate>,
}

impl GameAdapter {
    pub fn builder(name: &str) -> GameAdapterBuilder {
        GameAdapterBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scripted commands that skip a game's non-interactive preamble
    pub fn intro_actions(&self) -> &[String] {
        &self.intro_actions
    }

    /// Strip interpreter chrome from raw output.
    ///
    /// Leading banner lines are dropped for as long as the first line is a
    /// banner, then whitespace is trimmed, so applying this to its own
    /// output changes nothing.
    pub fn clean_observation(&self, raw: &str) -> String {
        let mut text = raw.trim();
        if let Some(is_banner) = &self.banner {
            loop {
                let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
                if first.is_empty() || !is_banner(first) {
                    break;
                }
                text = rest.trim();
            }
        }
        text.to_string()
    }

    // NOTE: markers are searched in the whole text buffer, not just the last
    // turn's output. A marker quoted later in unrelated text would misfire.
    pub fn is_victory(&self, mem: &dyn MemoryAccessor) -> bool {
        !self.victory_marker.is_empty() && mem.text().contains(&self.victory_marker)
    }

    pub fn is_game_over(&self, mem: &dyn MemoryAccessor) -> bool {
        !self.game_over_marker.is_empty() && mem.text().contains(&self.game_over_marker)
    }

    pub fn victory_marker(&self) -> &str {
        &self.victory_marker
    }

    pub fn game_over_marker(&self) -> &str {
        &self.game_over_marker
    }

    pub fn self_object_num(&self) -> u16 {
        self.self_object
    }

    /// Move counter, stored big-endian as (high, low) at a fixed offset
    pub fn get_moves(&self, mem: &dyn MemoryAccessor) -> Result<u16> {
        mem.read_word(self.moves_addr)
    }

    pub fn moves_addr(&self) -> usize {
        self.moves_addr
    }

    /// Current score. May be negative in games that penalise; never clamped.
    pub fn get_score(&self, mem: &dyn MemoryAccessor) -> Result<i32> {
        match self.score {
            ScoreLocation::Byte(addr) => Ok(mem.read_byte(addr)? as i32),
            ScoreLocation::Word(addr) => Ok(mem.read_word(addr)? as i16 as i32),
        }
    }

    pub fn score_location(&self) -> ScoreLocation {
        self.score
    }

    pub fn max_score(&self) -> i32 {
        self.max_score
    }

    /// Largest valid object number; objects are numbered 1..=num_world_objs
    pub fn num_world_objs(&self) -> u16 {
        self.num_world_objs
    }

    pub fn num_attributes(&self) -> u16 {
        self.num_attributes
    }

    pub fn fingerprints(&self) -> &[Fingerprint] {
        &self.fingerprints
    }

    /// Fail with OutOfRange unless `obj` is a valid object number
    pub fn check_object(&self, obj: u16) -> Result<()> {
        if obj == 0 || obj > self.num_world_objs {
            return Err(IntrospectError::out_of_range(
                &self.name,
                RangeKind::Object,
                obj as usize,
                self.num_world_objs as usize,
            ));
        }
        Ok(())
    }

    /// Like `check_object`, but 0 ("no parent") is accepted
    pub fn check_link(&self, obj: u16) -> Result<()> {
        if obj == 0 {
            return Ok(());
        }
        self.check_object(obj)
    }

    pub fn check_attribute(&self, attr: u16) -> Result<()> {
        if attr >= self.num_attributes {
            return Err(IntrospectError::out_of_range(
                &self.name,
                RangeKind::Attribute,
                attr as usize,
                self.num_attributes as usize - 1,
            ));
        }
        Ok(())
    }

    pub fn ignore_moved_obj(&self, obj: u16, new_parent: u16) -> Result<bool> {
        self.check_object(obj)?;
        self.check_link(new_parent)?;
        Ok(self
            .ignore_moved
            .as_ref()
            .map(|rule| rule(obj, new_parent))
            .unwrap_or(false))
    }

    pub fn ignore_attr_set(&self, obj: u16, attr: u16) -> Result<bool> {
        self.check_object(obj)?;
        self.check_attribute(attr)?;
        Ok(self
            .ignore_set
            .as_ref()
            .map(|rule| rule(obj, attr))
            .unwrap_or(false))
    }

    pub fn ignore_attr_cleared(&self, obj: u16, attr: u16) -> Result<bool> {
        self.check_object(obj)?;
        self.check_attribute(attr)?;
        Ok(self
            .ignore_cleared
            .as_ref()
            .map(|rule| rule(obj, attr))
            .unwrap_or(false))
    }
}

impl fmt::Debug for GameAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameAdapter")
            .field("name", &self.name)
            .field("intro_actions", &self.intro_actions)
            .field("victory_marker", &self.victory_marker)
            .field("game_over_marker", &self.game_over_marker)
            .field("self_object", &self.self_object)
            .field("moves_addr", &self.moves_addr)
            .field("score", &self.score)
            .field("max_score", &self.max_score)
            .field("num_world_objs", &self.num_world_objs)
            .field("num_attributes", &self.num_attributes)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for GameAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} objects, player object {}, max score {}",
            self.name, self.num_world_objs, self.self_object, self.max_score
        )
    }
}

pub struct GameAdapterBuilder {
    adapter: GameAdapter,
}

impl GameAdapterBuilder {
    fn new(name: &str) -> Self {
        GameAdapterBuilder {
            adapter: GameAdapter {
                name: name.to_lowercase(),
                intro_actions: Vec::new(),
                banner: None,
                victory_marker: String::new(),
                game_over_marker: String::new(),
                self_object: 1,
                moves_addr: 0,
                score: ScoreLocation::Byte(0),
                max_score: 0,
                num_world_objs: 1,
                num_attributes: MAX_ATTRIBUTES_V3,
                fingerprints: Vec::new(),
                ignore_moved: None,
                ignore_set: None,
                ignore_cleared: None,
            },
        }
    }

    pub fn intro_actions<S: AsRef<str>>(mut self, actions: &[S]) -> Self {
        self.adapter.intro_actions = actions.iter().map(|a| a.as_ref().to_string()).collect();
        self
    }

    pub fn banner(mut self, is_banner: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.adapter.banner = Some(Arc::new(is_banner));
        self
    }

    pub fn victory_marker(mut self, marker: &str) -> Self {
        self.adapter.victory_marker = marker.to_string();
        self
    }

    pub fn game_over_marker(mut self, marker: &str) -> Self {
        self.adapter.game_over_marker = marker.to_string();
        self
    }

    pub fn self_object(mut self, obj: u16) -> Self {
        self.adapter.self_object = obj;
        self
    }

    pub fn moves_addr(mut self, addr: usize) -> Self {
        self.adapter.moves_addr = addr;
        self
    }

    pub fn score(mut self, location: ScoreLocation, max_score: i32) -> Self {
        self.adapter.score = location;
        self.adapter.max_score = max_score;
        self
    }

    pub fn num_world_objs(mut self, n: u16) -> Self {
        self.adapter.num_world_objs = n;
        self
    }

    pub fn num_attributes(mut self, n: u16) -> Self {
        self.adapter.num_attributes = n;
        self
    }

    pub fn fingerprint(mut self, release: u16, serial: &str) -> Self {
        self.adapter.fingerprints.push(Fingerprint {
            release,
            serial: serial.to_string(),
            checksum: None,
        });
        self
    }

    /// A fingerprint that only matches the build with this header checksum
    pub fn checked_fingerprint(mut self, release: u16, serial: &str, checksum: u16) -> Self {
        self.adapter.fingerprints.push(Fingerprint {
            release,
            serial: serial.to_string(),
            checksum: Some(checksum),
        });
        self
    }

    pub fn ignore_moved_obj(
        mut self,
        rule: impl Fn(u16, u16) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.adapter.ignore_moved = Some(Arc::new(rule));
        self
    }

    pub fn ignore_attr_set(mut self, rule: impl Fn(u16, u16) -> bool + Send + Sync + 'static) -> Self {
        self.adapter.ignore_set = Some(Arc::new(rule));
        self
    }

    pub fn ignore_attr_cleared(
        mut self,
        rule: impl Fn(u16, u16) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.adapter.ignore_cleared = Some(Arc::new(rule));
        self
    }

    /// Validate the record and freeze it
    pub fn build(self) -> Result<GameAdapter> {
        let a = self.adapter;
        if a.num_world_objs == 0 {
            return Err(IntrospectError::Config(format!(
                "{}: num_world_objs must be at least 1",
                a.name
            )));
        }
        if a.num_attributes == 0 || a.num_attributes > 48 {
            return Err(IntrospectError::Config(format!(
                "{}: num_attributes must be between 1 and 48, got {}",
                a.name, a.num_attributes
            )));
        }
        if a.self_object == 0 || a.self_object > a.num_world_objs {
            return Err(IntrospectError::Config(format!(
                "{}: self object {} is outside 1..={}",
                a.name, a.self_object, a.num_world_objs
            )));
        }
        Ok(a)
    }
}
