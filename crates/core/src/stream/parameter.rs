//! Command-line fragments and their ordered containers.

use serde::{Deserialize, Serialize};

/// Where a parameter lands relative to the `-i` declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterPosition {
    /// Before the input it applies to (e.g. `-ss` for fast input seeking).
    PreInput,
    /// After all inputs, applying to the output.
    PostInput,
}

/// An immutable command-line fragment such as `-codec:a aac`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    text: String,
    position: ParameterPosition,
}

impl Parameter {
    /// Creates a parameter at the given position.
    pub fn new(text: impl Into<String>, position: ParameterPosition) -> Self {
        Self {
            text: text.into(),
            position,
        }
    }

    /// Creates a pre-input parameter.
    pub fn pre_input(text: impl Into<String>) -> Self {
        Self::new(text, ParameterPosition::PreInput)
    }

    /// Creates a post-input parameter.
    pub fn post_input(text: impl Into<String>) -> Self {
        Self::new(text, ParameterPosition::PostInput)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn position(&self) -> ParameterPosition {
        self.position
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    key: Option<&'static str>,
    parameter: Parameter,
}

/// Insertion-ordered parameters.
///
/// Keyed entries are single-valued: setting the same key again replaces the
/// earlier parameter in place, keeping its original slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ParameterList {
    entries: Vec<Entry>,
}

impl ParameterList {
    pub(crate) fn push(&mut self, parameter: Parameter) {
        self.entries.push(Entry {
            key: None,
            parameter,
        });
    }

    pub(crate) fn set(&mut self, key: &'static str, parameter: Parameter) {
        match self.entries.iter_mut().find(|e| e.key == Some(key)) {
            Some(entry) => entry.parameter = parameter,
            None => self.entries.push(Entry {
                key: Some(key),
                parameter,
            }),
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.iter().map(|e| &e.parameter)
    }

    /// Space-joined text of every parameter at `position`, in insertion order.
    pub(crate) fn build(&self, position: ParameterPosition) -> String {
        self.iter()
            .filter(|p| p.position() == position)
            .map(Parameter::text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
