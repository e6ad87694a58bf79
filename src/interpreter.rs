//! Interpreter control boundary
//!
//! The bytecode interpreter is an external collaborator. The introspection
//! layer drives it through these two traits and never looks inside.

/// A running interpreter instance bound to one loaded story.
///
/// Not shared: exactly one `Episode` drives a given instance, and every
/// call that advances the game takes `&mut self`.
pub trait Interpreter {
    /// Run one command to the next input prompt and return the raw output.
    /// The call is synchronous and cannot be cancelled mid-turn.
    fn execute_command(&mut self, command: &str) -> Result<String, String>;

    /// False once the interpreter has halted or crashed
    fn is_alive(&self) -> bool;

    /// The interpreter's memory image, starting with the story header
    fn memory(&self) -> &[u8];

    /// The raw text buffer victory and defeat markers are searched in
    fn text_buffer(&self) -> &str;
}

/// Creates interpreter instances from story binaries
pub trait StoryLoader {
    type Interpreter: Interpreter;

    /// Load `story` and run it up to the first input prompt
    fn load(&self, story: &[u8]) -> Result<Self::Interpreter, String>;
}
