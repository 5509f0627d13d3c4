use std::fmt;
use thiserror::Error;

/// Coarse classification of a [`ModularError`].
///
/// Callers that only care about the family of a failure (a bad argument type,
/// a bad value, an index out of range, a missing key, or a failure raised by a
/// module's own computation) can match on this instead of on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong kind of argument or payload (not a signal, missing capability, unset state).
    Type,
    /// Right kind of argument but wrong value (shape, arity of outputs, unknown name).
    Value,
    /// Invalid index expression.
    Index,
    /// Missing key in a declarative specification.
    Key,
    /// Failure raised from inside a module rule.
    Runtime,
}

/// Payload capabilities that are checked at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// In-place addition (`+=`).
    Accumulate,
    /// In-place zero fill.
    ZeroFill,
    /// Indexed read / write.
    Index,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Accumulate => write!(f, "in-place accumulation"),
            Capability::ZeroFill => write!(f, "in-place zero fill"),
            Capability::Index => write!(f, "indexing"),
        }
    }
}

/// Custom error type for the modular graph core.
#[derive(Error, Debug, Clone, PartialEq)] // PartialEq for easier testing
pub enum ModularError {
    #[error("Entry {position} of '{key}' is not a signal (found {found})")]
    NotASignal {
        key: String,
        position: usize,
        found: String,
    },

    #[error("Module '{0}' is not registered")]
    UnknownModule(String),

    #[error("Missing required key '{key}'")]
    MissingKey { key: String },

    #[error("Invalid value for '{key}': expected {expected}")]
    InvalidConfig { key: String, expected: String },

    #[error("Module {module}: {what} count mismatch, expected {expected}, got {actual}")]
    ArityMismatch {
        module: String,
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("Array creation error: data length {data_len} does not match shape {shape:?}")]
    ArrayCreation { data_len: usize, shape: Vec<usize> },

    #[error("Cannot add a {increment} payload into a {target} payload")]
    IncompatiblePayload { target: String, increment: String },

    #[error("Payload {payload} does not support {capability}")]
    MissingCapability {
        capability: Capability,
        payload: String,
    },

    #[error("Signal '{tag}' has no state (during {operation})")]
    StateUnset { tag: String, operation: String },

    #[error("Concatenated signal '{tag}' is incomplete: constituent '{constituent}' has no state")]
    IncompleteConcat { tag: String, constituent: String },

    #[error("Index {index} is out of bounds for dimension {dim} with size {size}")]
    IndexOutOfBounds { index: isize, dim: usize, size: usize },

    #[error("Too many indices: {given} given for a value of rank {rank}")]
    TooManyIndices { given: usize, rank: usize },

    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    #[error("Computation error: {0}")]
    Computation(String),
}

impl ModularError {
    /// Maps the error onto its [`ErrorKind`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModularError::NotASignal { .. }
            | ModularError::InvalidConfig { .. }
            | ModularError::IncompatiblePayload { .. }
            | ModularError::MissingCapability { .. }
            | ModularError::StateUnset { .. }
            | ModularError::ArityMismatch { .. } => ErrorKind::Type,
            ModularError::UnknownModule(_)
            | ModularError::ShapeMismatch { .. }
            | ModularError::ArrayCreation { .. }
            | ModularError::IncompleteConcat { .. } => ErrorKind::Value,
            ModularError::IndexOutOfBounds { .. }
            | ModularError::TooManyIndices { .. }
            | ModularError::InvalidIndex(_) => ErrorKind::Index,
            ModularError::MissingKey { .. } => ErrorKind::Key,
            ModularError::Computation(_) => ErrorKind::Runtime,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ModularError>;
