//! Step outcomes.
//!
//! A step produces exactly one [`WorkflowResult`]: success, error or skip.
//! The variant, message and metadata are fixed at construction; there are
//! no setters.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Key/value data a step hands to the steps that follow it.
pub type Metadata = HashMap<String, Value>;

/// Which outcome a result represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    /// The step did what it was asked to do
    Success,
    /// The step could not complete its effect
    Error,
    /// The step decided its effect does not apply
    Skip,
}

impl ResultKind {
    /// Symbol used when rendering a result line.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Success => "✓",
            Self::Error => "✗",
            Self::Skip => "⊝",
        }
    }
}

/// Outcome of a single step (or of a whole workflow run).
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    kind: ResultKind,
    message: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    metadata: Metadata,
    #[serde(serialize_with = "serialize_cause", skip_serializing_if = "Option::is_none")]
    cause: Option<Arc<anyhow::Error>>,
}

impl WorkflowResult {
    fn new(kind: ResultKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), metadata: Metadata::new(), cause: None }
    }

    /// Step completed successfully.
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ResultKind::Success, message)
    }

    /// Step failed; a workflow that halts on error stops here.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ResultKind::Error, message)
    }

    /// Step failed because of an underlying error, kept for diagnostics.
    pub fn error_with_cause(message: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        let mut result = Self::new(ResultKind::Error, message);
        result.cause = Some(Arc::new(cause.into()));
        result
    }

    /// Step was not applicable. Not a failure.
    pub fn skip(message: impl Into<String>) -> Self {
        Self::new(ResultKind::Skip, message)
    }

    /// Attach one metadata entry while building the result.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach a whole metadata map while building the result.
    pub fn with_metadata_map(mut self, metadata: Metadata) -> Self {
        self.metadata.extend(metadata);
        self
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The underlying error, for `Error` results built with a cause.
    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.cause.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.kind == ResultKind::Success
    }

    pub fn is_error(&self) -> bool {
        self.kind == ResultKind::Error
    }

    pub fn is_skip(&self) -> bool {
        self.kind == ResultKind::Skip
    }
}

impl fmt::Display for WorkflowResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.symbol(), self.message)
    }
}

fn serialize_cause<S: Serializer>(
    cause: &Option<Arc<anyhow::Error>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match cause {
        Some(err) => serializer.serialize_str(&format!("{err:#}")),
        None => serializer.serialize_none(),
    }
}
