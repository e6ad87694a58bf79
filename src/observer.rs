//! Step observer: runs one episode of one game
//!
//! An `Episode` owns its interpreter handle, the adapter for its game and
//! the previous object snapshot. Every turn it forwards a command, reads
//! score, moves and end-of-game markers through the adapter, cleans the
//! text, and diffs the object tree against the last turn.

use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;

use crate::adapter::GameAdapter;
use crate::diff::{world_diff, ChangeEvent};
use crate::error::{IntrospectError, Outcome, Result};
use crate::interpreter::{Interpreter, StoryLoader};
use crate::memory::MemoryView;
use crate::registry::{AdapterRegistry, GameId};
use crate::snapshot::ObjectSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeState {
    NotStarted,
    /// Replaying the adapter's intro actions
    Intro,
    Running,
    /// Absorbing: no further steps are accepted
    Terminated(Outcome),
}

impl fmt::Display for EpisodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpisodeState::NotStarted => write!(f, "not started"),
            EpisodeState::Intro => write!(f, "intro"),
            EpisodeState::Running => write!(f, "running"),
            EpisodeState::Terminated(outcome) => write!(f, "terminated ({outcome})"),
        }
    }
}

/// Everything observed about one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub turn: u32,
    pub score: i32,
    pub max_score: i32,
    pub moves: u16,
    pub victory: bool,
    pub defeat: bool,
    pub observation: String,
    pub changes: Vec<ChangeEvent>,
    /// Parent of the player object
    pub location: u16,
    /// Children of the player object
    pub inventory: Vec<u16>,
    pub state_hash: u64,
}

impl StepResult {
    pub fn is_terminal(&self) -> bool {
        self.victory || self.defeat
    }

    pub fn outcome(&self) -> Option<Outcome> {
        if self.victory {
            Some(Outcome::Victory)
        } else if self.defeat {
            Some(Outcome::Defeat)
        } else {
            None
        }
    }
}

pub struct Episode<L: StoryLoader> {
    game: GameId,
    adapter: Arc<GameAdapter>,
    loader: Arc<L>,
    story: Arc<[u8]>,
    interpreter: Option<L::Interpreter>,
    state: EpisodeState,
    previous: Option<ObjectSnapshot>,
    turn: u32,
}

impl<L: StoryLoader> Episode<L> {
    /// A fresh episode in `NotStarted`; call `reset` to load the story
    pub fn new(game: GameId, adapter: Arc<GameAdapter>, loader: Arc<L>, story: Arc<[u8]>) -> Self {
        Episode {
            game,
            adapter,
            loader,
            story,
            interpreter: None,
            state: EpisodeState::NotStarted,
            previous: None,
            turn: 0,
        }
    }

    pub fn game(&self) -> &GameId {
        &self.game
    }

    pub fn adapter(&self) -> &GameAdapter {
        &self.adapter
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }

    /// Snapshot the next diff will compare against
    pub fn previous_snapshot(&self) -> Option<&ObjectSnapshot> {
        self.previous.as_ref()
    }

    pub fn interpreter(&self) -> Option<&L::Interpreter> {
        self.interpreter.as_ref()
    }

    fn failure(&self, reason: impl Into<String>) -> IntrospectError {
        IntrospectError::interpreter(self.game.as_str(), reason)
    }

    /// Load the story, replay the intro actions and capture the baseline.
    ///
    /// The returned result carries no change events: the first snapshot of an
    /// episode only establishes what later turns are compared against.
    pub fn reset(&mut self) -> Result<StepResult> {
        self.state = EpisodeState::NotStarted;
        self.interpreter = None;
        self.previous = None;
        self.turn = 0;

        info!("Loading {} ({} bytes)", self.game, self.story.len());
        let interpreter = self
            .loader
            .load(&self.story)
            .map_err(|e| self.failure(format!("load failed: {e}")))?;
        self.interpreter = Some(interpreter);
        self.state = EpisodeState::Intro;

        let mut raw = match &self.interpreter {
            Some(interp) => interp.text_buffer().to_string(),
            None => String::new(),
        };
        let intro: Vec<String> = self.adapter.intro_actions().to_vec();
        if !intro.is_empty() {
            info!("Replaying {} intro action(s) for {}", intro.len(), self.game);
        }
        for action in &intro {
            raw = self.execute(action)?;
        }

        let (result, snapshot) = self.observe(&raw)?;
        self.commit(result, snapshot)
    }

    /// Play one command and report what changed.
    ///
    /// Fails with `EpisodeFinished` once the game has been won or lost, without
    /// touching the interpreter. On any other failure the previous snapshot is
    /// kept, so a later turn diffs against a consistent baseline.
    pub fn step(&mut self, command: &str) -> Result<StepResult> {
        match self.state {
            EpisodeState::Running => {}
            EpisodeState::Terminated(outcome) => {
                return Err(IntrospectError::EpisodeFinished {
                    game: self.game.to_string(),
                    outcome,
                });
            }
            EpisodeState::NotStarted | EpisodeState::Intro => {
                return Err(IntrospectError::EpisodeNotStarted {
                    game: self.game.to_string(),
                });
            }
        }

        debug!("{} turn {}: '{}'", self.game, self.turn + 1, command);
        let raw = self.execute(command)?;
        let (result, snapshot) = self.observe(&raw)?;
        self.commit(result, snapshot)
    }

    fn execute(&mut self, command: &str) -> Result<String> {
        let game = self.game.to_string();
        let interp = self
            .interpreter
            .as_mut()
            .ok_or_else(|| IntrospectError::EpisodeNotStarted { game: game.clone() })?;
        interp
            .execute_command(command)
            .map_err(|e| IntrospectError::interpreter(&game, e))
    }

    /// Read everything about the current turn without changing episode state
    fn observe(&self, raw: &str) -> Result<(StepResult, ObjectSnapshot)> {
        let interp = self.interpreter.as_ref().ok_or_else(|| IntrospectError::EpisodeNotStarted {
            game: self.game.to_string(),
        })?;
        let adapter = self.adapter.as_ref();
        let view = MemoryView::for_game(interp.memory(), interp.text_buffer(), self.game.as_str())?;

        let score = adapter.get_score(&view)?;
        let moves = adapter.get_moves(&view)?;
        // victory wins if a game's text could trigger both
        let victory = adapter.is_victory(&view);
        let defeat = !victory && adapter.is_game_over(&view);

        if !interp.is_alive() && !victory && !defeat {
            return Err(self.failure("interpreter halted without reaching an ending"));
        }
        if score > adapter.max_score() {
            warn!(
                "{} reports score {} above its maximum {}",
                self.game,
                score,
                adapter.max_score()
            );
        }

        let snapshot = ObjectSnapshot::capture(&view, adapter)?;
        let changes = world_diff(self.previous.as_ref(), &snapshot, adapter)?;
        let location = snapshot.parent_of(adapter.self_object_num())?;
        let inventory = snapshot.children(adapter.self_object_num())?;

        for change in &changes {
            debug!("{} {}", self.game, change);
        }

        let result = StepResult {
            turn: self.turn,
            score,
            max_score: adapter.max_score(),
            moves,
            victory,
            defeat,
            observation: adapter.clean_observation(raw),
            changes,
            location,
            inventory,
            state_hash: snapshot.state_hash(),
        };
        Ok((result, snapshot))
    }

    fn commit(&mut self, mut result: StepResult, snapshot: ObjectSnapshot) -> Result<StepResult> {
        if self.state == EpisodeState::Running {
            self.turn += 1;
        }
        result.turn = self.turn;
        self.previous = Some(snapshot);
        self.state = match result.outcome() {
            Some(outcome) => {
                info!("{} finished with {} at score {}", self.game, outcome, result.score);
                EpisodeState::Terminated(outcome)
            }
            None => EpisodeState::Running,
        };
        Ok(result)
    }
}

/// Consumer entry point: adapters plus a way to load interpreters
pub struct Driver<L: StoryLoader> {
    registry: AdapterRegistry,
    loader: Arc<L>,
}

impl<L: StoryLoader> Driver<L> {
    pub fn new(registry: AdapterRegistry, loader: L) -> Self {
        Driver {
            registry,
            loader: Arc::new(loader),
        }
    }

    /// A driver preloaded with every built-in adapter
    pub fn with_builtins(loader: L) -> Self {
        Self::new(AdapterRegistry::with_builtins(), loader)
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut AdapterRegistry {
        &mut self.registry
    }

    pub fn register_adapter(&mut self, id: impl Into<GameId>, adapter: GameAdapter) -> Arc<GameAdapter> {
        self.registry.register(id, adapter)
    }

    /// Resolve the adapter for `game_id`, load `story` and play the intro.
    /// Returns the running episode and its initial observation.
    pub fn start_episode(
        &self,
        game_id: impl Into<GameId>,
        story: &[u8],
    ) -> Result<(Episode<L>, StepResult)> {
        let game = game_id.into();
        let adapter = self.registry.lookup(&game)?;
        let mut episode = Episode::new(game, adapter, Arc::clone(&self.loader), Arc::from(story));
        let initial = episode.reset()?;
        Ok((episode, initial))
    }

    pub fn step(&self, episode: &mut Episode<L>, command: &str) -> Result<StepResult> {
        episode.step(command)
    }

    pub fn reset(&self, episode: &mut Episode<L>) -> Result<StepResult> {
        episode.reset()
    }
}
