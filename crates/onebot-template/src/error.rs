//! Error types for template compilation and rendering.

use thiserror::Error;

/// Broad category of a [`TemplateError`].
///
/// Syntax errors are raised while compiling; every other kind is raised while
/// rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed tag, unknown block command or unbalanced nesting.
    Syntax,
    /// A dotted path could not be resolved against the context.
    Context,
    /// Missing filter or a call target that is not a function.
    Configuration,
    /// A value had the wrong shape for the operation applied to it.
    Runtime,
    /// The compiled tree is corrupt.
    Structural,
}

/// Errors that can occur when compiling or rendering a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A tag whose arguments do not follow the block grammar.
    #[error("{fragment} seems like invalid syntax (line {line})")]
    InvalidSyntax { fragment: String, line: usize },

    /// An opening block with an unrecognized command word.
    #[error("unknown block `{command}` in {fragment} (line {line})")]
    UnknownBlock {
        command: String,
        fragment: String,
        line: usize,
    },

    /// A close tag with no open block to close.
    #[error("{fragment} closes a block that was never opened (line {line})")]
    UnbalancedEnd { fragment: String, line: usize },

    /// A block still open when the template ends.
    #[error("{fragment} is never closed (line {line})")]
    UnclosedBlock { fragment: String, line: usize },

    /// A dotted path that no lookup strategy could resolve.
    #[error("cannot resolve {0}")]
    Unresolved(String),

    /// A filter name that is not registered on the template.
    #[error("filter {0} does not exist in context")]
    UnknownFilter(String),

    /// A call target that resolved to something other than a function.
    #[error("{0} is not callable")]
    NotCallable(String),

    /// An `if` operator outside `<, >, ==, !=, <=, >=`.
    #[error("unknown comparison operator `{0}`")]
    UnknownOperator(String),

    /// An ordering comparison between values that have no order.
    #[error("cannot compare {lhs} {op} {rhs}")]
    Incomparable {
        lhs: &'static str,
        op: String,
        rhs: &'static str,
    },

    /// An `each` iterator that is not a sequence.
    #[error("{expr} resolved to {kind}, which is not iterable")]
    NotIterable { expr: String, kind: &'static str },

    /// An `each` max count that is not an integer.
    #[error("max count {0} is not an integer")]
    InvalidMax(String),

    /// A function invoked by `{% call %}` returned an error.
    #[error("call to {name} failed: {message}")]
    Call { name: String, message: String },

    /// Host data that could not be converted into template values.
    #[error("cannot convert context value: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A node whose parent chain does not end at the root.
    #[error("hanging syntax tree, node {0} does not descend from a root")]
    DetachedNode(usize),
}

impl TemplateError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TemplateError::InvalidSyntax { .. }
            | TemplateError::UnknownBlock { .. }
            | TemplateError::UnbalancedEnd { .. }
            | TemplateError::UnclosedBlock { .. } => ErrorKind::Syntax,
            TemplateError::Unresolved(_) => ErrorKind::Context,
            TemplateError::UnknownFilter(_)
            | TemplateError::NotCallable(_)
            | TemplateError::Serialization(_) => ErrorKind::Configuration,
            TemplateError::UnknownOperator(_)
            | TemplateError::Incomparable { .. }
            | TemplateError::NotIterable { .. }
            | TemplateError::InvalidMax(_)
            | TemplateError::Call { .. } => ErrorKind::Runtime,
            TemplateError::DetachedNode(_) => ErrorKind::Structural,
        }
    }

    /// Returns `true` for errors raised while compiling.
    pub fn is_syntax(&self) -> bool {
        self.kind() == ErrorKind::Syntax
    }
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;
