//! Error taxonomies.
//!
//! Two channels, deliberately kept apart:
//!
//! - design errors (bad input from the DSL author): accumulated into
//!   [`ValidationErrors`] during the validate pass, or returned as
//!   [`ProjectError`] from view projection. Both are ordinary `Result` errors.
//! - invariant violations (bugs in the caller or in this crate): these panic
//!   with a `// bug`-style message and are never surfaced through `Result`.

use std::fmt;

use thiserror::Error;

/// A single design violation, tagged with the evaluation name of the
/// expression it was found on.
#[derive(Debug, Clone, Error)]
#[error("{context}: {message}")]
pub struct ValidationError {
    /// Evaluation name of the offending expression (e.g. `type "Bottle"`).
    pub context: String,
    /// Formatted violation message.
    pub message: String,
}

/// Ordered collection of design violations. The validate pass never fails
/// fast: every violation reachable in one run is reported in bulk.
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a violation against the expression named `context`.
    pub fn add(&mut self, context: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            context: context.into(),
            message: message.into(),
        });
    }

    /// Appends all violations from `other`, preserving order.
    pub fn merge(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Converts the accumulator into a `Result`: `Ok` when no violation was
    /// recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Errors returned by the view projection engine. These are design errors
/// (an unknown view name is bad input, not a bug) and carry enough context
/// to locate the offending design element.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("unknown view {view:?} on result type {ty}")]
    UnknownView { view: String, ty: String },

    #[error("view {view:?} on field {field:?} cannot be computed: {source}")]
    Field {
        view: String,
        field: String,
        #[source]
        source: Box<ProjectError>,
    },

    #[error("collection element: {0}")]
    CollectionElement(#[source] Box<ProjectError>),
}

/// Errors returned by the build pipeline.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Validation(ValidationErrors),

    #[error("too many deferred initializer generations, infinite loop?")]
    InitializerLoop,
}
