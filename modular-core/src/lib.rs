// Main modules of the crate
pub mod check;
pub mod index;
pub mod module;
pub mod modules;
pub mod network;
pub mod payload;
pub mod signal;

// Re-export the core types so they are reachable as `modular_core::Signal`, etc.
pub use check::{finite_difference, FdError, FdOptions, FdReport};
pub use index::SliceArg;
pub use module::registry::Registry;
pub use module::spec::{Config, Param, Spec};
pub use module::{Module, ModuleOp, Prepare};
pub use network::{Network, NetworkEntry};
pub use payload::{Accumulable, Array, Indexable, IntoPayload, Payload, Value, Zeroable};
pub use signal::{make_signals, AnySignal, IntoSignals, Signal, SignalConcat, SignalSlice};

// Used by `register_module!`
#[doc(hidden)]
pub use inventory;

pub mod error;
pub use error::{Capability, ErrorKind, ModularError, Result};
