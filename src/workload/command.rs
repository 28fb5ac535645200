//! Plain-text workload command: `"<workload> <arg>..."`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::InvocationError;

/// An immutable, validated workload command.
///
/// Invariants: non-empty, printable ASCII only, tokens separated by exactly one
/// space, first token is the workload name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Command(String);

impl Command {
    /// Validate and wrap a command line.
    pub fn parse(text: impl Into<String>) -> Result<Self, InvocationError> {
        let text = text.into();
        if text.is_empty() {
            return Err(InvocationError::InvalidCommand("empty command".into()));
        }
        if let Some(c) = text.chars().find(|c| !c.is_ascii() || c.is_ascii_control()) {
            return Err(InvocationError::InvalidCommand(format!(
                "unsupported character {c:?} in {text:?}"
            )));
        }
        if text.starts_with(' ') || text.ends_with(' ') || text.contains("  ") {
            return Err(InvocationError::InvalidCommand(format!(
                "malformed token separation in {text:?}"
            )));
        }
        Ok(Command(text))
    }

    /// Wrap a compile-time literal from the catalogue.
    pub(crate) fn trusted(text: &'static str) -> Self {
        Command(text.to_string())
    }

    /// Decode a command received as raw bytes across an isolation boundary.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvocationError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| InvocationError::InvalidCommand(format!("not valid text: {e}")))?;
        Command::parse(text)
    }

    pub fn workload(&self) -> &str {
        self.tokens().next().unwrap_or_default()
    }

    pub fn args(&self) -> Vec<&str> {
        self.tokens().skip(1).collect()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Command {
    type Error = InvocationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Command::parse(value)
    }
}

impl From<Command> for String {
    fn from(value: Command) -> Self {
        value.0
    }
}
