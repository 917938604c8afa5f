//! Parameterized, translatable messages.
//!
//! The engine never produces display text. It produces a translation key
//! and positional arguments; the host renders them in the player's locale.

use serde::{Deserialize, Serialize};

/// A translatable message with positional arguments.
///
/// ```
/// use essence_rituals::core::Message;
///
/// let msg = Message::new("ritual.essence_rituals.insufficient_essence").with_arg(500);
/// assert_eq!(msg.args, vec!["500".to_string()]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// Translation key.
    pub key: String,
    /// Positional arguments, already formatted.
    pub args: Vec<String>,
}

impl Message {
    /// Create a message without arguments.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument (builder pattern).
    #[must_use]
    pub fn with_arg(mut self, arg: impl ToString) -> Self {
        self.args.push(arg.to_string());
        self
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)?;
        if !self.args.is_empty() {
            write!(f, "[{}]", self.args.join(", "))?;
        }
        Ok(())
    }
}
