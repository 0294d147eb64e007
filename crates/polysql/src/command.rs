//! The rendered result of a statement builder.

use std::fmt;

/// A fully rendered SQL statement, ready for execution.
///
/// Produced exactly once per `render()` call; rendering the same builder
/// state twice yields byte-identical text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The final SQL text.
    pub text: String,
    /// Whether the text ends with a statement terminator (`;`).
    pub terminated: bool,
}

impl Command {
    /// Wrap rendered SQL text into a command.
    pub fn new(text: impl Into<String>, terminated: bool) -> Self {
        Self {
            text: text.into(),
            terminated,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
