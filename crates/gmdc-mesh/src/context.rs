//! Per-operation state: the morph registry and collected diagnostics.

use std::fmt;

use tracing::{info, warn};

use gmdc_core::MorphName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Info => f.write_str("info"),
            DiagnosticLevel::Warning => f.write_str("warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level, self.message)
    }
}

/// Soft problems a host should show its user. Every entry is also emitted
/// as a tracing event.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.entries.push(Diagnostic {
            level: DiagnosticLevel::Info,
            message,
        });
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.entries.push(Diagnostic {
            level: DiagnosticLevel::Warning,
            message,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// State threaded through one export.
#[derive(Debug, Clone, Default)]
pub struct ExportContext {
    morph_names: Vec<MorphName>,
    pub diagnostics: Diagnostics,
}

impl ExportContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `name` in the registry, registering it if new.
    pub fn register_morph(&mut self, name: MorphName) -> u32 {
        if let Some(i) = self.morph_names.iter().position(|n| *n == name) {
            return i as u32;
        }
        self.morph_names.push(name);
        (self.morph_names.len() - 1) as u32
    }

    pub fn morph_names(&self) -> &[MorphName] {
        &self.morph_names
    }

    /// Drops every name registered after the first `len`.
    pub fn rollback_morphs(&mut self, len: usize) {
        self.morph_names.truncate(len);
    }
}

/// State threaded through one import.
#[derive(Debug, Clone, Default)]
pub struct ImportContext {
    pub diagnostics: Diagnostics,
}

impl ImportContext {
    pub fn new() -> Self {
        Self::default()
    }
}
