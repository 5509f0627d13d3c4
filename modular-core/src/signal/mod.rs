// src/signal/mod.rs

use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{ModularError, Result};
use crate::index::SliceArg;
use crate::payload::{Accumulable, Array, IntoPayload, Value, Zeroable};

pub mod any;
pub mod concat;
pub mod slice;

pub use any::{AnySignal, IntoSignals};
pub use concat::SignalConcat;
pub use slice::SignalSlice;

/// Internal storage of a [`Signal`].
#[derive(Debug)]
pub struct SignalData {
    pub(crate) tag: String,
    /// Current value, written by the producing module (or by the caller for root inputs).
    pub(crate) state: Option<Value>,
    /// Accumulated gradient; `None` until first written or accumulated.
    pub(crate) sensitivity: Option<Value>,
}

impl SignalData {
    /// Returns the sensitivity storage, allocating zeros shaped like `state` on first use.
    pub(crate) fn sensitivity_storage(&mut self, operation: &str) -> Result<&mut Value> {
        match &mut self.sensitivity {
            Some(existing) => Ok(existing),
            slot @ None => {
                let state = self.state.as_ref().ok_or_else(|| ModularError::StateUnset {
                    tag: self.tag.clone(),
                    operation: operation.to_string(),
                })?;
                Ok(slot.insert(state.zeros_like()?))
            }
        }
    }
}

/// A named value/gradient cell, the unit of data flow in the graph.
///
/// `Signal` uses `Arc<RwLock<SignalData>>` internally: cloning a `Signal` is cheap
/// and every clone (and every view built on it) aliases the same storage. Modules
/// hold clones of the signals they read and write, so a state written by one module
/// is immediately visible to the next.
#[derive(Clone)]
pub struct Signal {
    pub(crate) data: Arc<RwLock<SignalData>>,
}

impl Signal {
    /// Creates a signal with no state and no sensitivity.
    pub fn new(tag: impl Into<String>) -> Self {
        Self::with_values(tag, None, None)
    }

    pub fn with_state(tag: impl Into<String>, state: impl IntoPayload) -> Self {
        Self::with_values(tag, state, None)
    }

    /// Creates a signal with the given state and sensitivity (either may be `None`).
    pub fn with_values(tag: impl Into<String>, state: impl IntoPayload, sensitivity: impl IntoPayload) -> Self {
        Signal {
            data: Arc::new(RwLock::new(SignalData {
                tag: tag.into(),
                state: state.into_payload(),
                sensitivity: sensitivity.into_payload(),
            })),
        }
    }

    /// Acquires a read lock on the signal's data, recovering from a poisoned lock.
    pub(crate) fn read_data(&self) -> RwLockReadGuard<'_, SignalData> {
        self.data.read().unwrap_or_else(|poisoned| {
            log::warn!("RwLock of a signal was poisoned. Recovering read guard.");
            poisoned.into_inner()
        })
    }

    /// Acquires a write lock on the signal's data, recovering from a poisoned lock.
    pub(crate) fn write_data(&self) -> RwLockWriteGuard<'_, SignalData> {
        self.data.write().unwrap_or_else(|poisoned| {
            log::warn!("RwLock of a signal was poisoned. Recovering write guard.");
            poisoned.into_inner()
        })
    }

    pub fn tag(&self) -> String {
        self.read_data().tag.clone()
    }

    pub fn set_tag(&self, tag: impl Into<String>) {
        self.write_data().tag = tag.into();
    }

    /// Returns a copy of the current state.
    pub fn state(&self) -> Option<Value> {
        self.read_data().state.clone()
    }

    /// Overwrites the state (`None` clears it).
    pub fn set_state(&self, state: impl IntoPayload) {
        self.write_data().state = state.into_payload();
    }

    /// Runs `f` on the state without copying it.
    pub fn with_state_ref<R>(&self, f: impl FnOnce(Option<&Value>) -> R) -> R {
        f(self.read_data().state.as_ref())
    }

    /// Returns a copy of the accumulated sensitivity.
    pub fn sensitivity(&self) -> Option<Value> {
        self.read_data().sensitivity.clone()
    }

    /// Overwrites the sensitivity.
    ///
    /// # Errors
    /// `ModularError::StateUnset` when a sensitivity is given while the signal has no
    /// state: there is nothing to hold a gradient of. Clearing with `None` always works.
    pub fn set_sensitivity(&self, sensitivity: impl IntoPayload) -> Result<()> {
        let mut guard = self.write_data();
        let sensitivity = sensitivity.into_payload();
        if sensitivity.is_some() && guard.state.is_none() {
            return Err(ModularError::StateUnset {
                tag: guard.tag.clone(),
                operation: "set_sensitivity".to_string(),
            });
        }
        guard.sensitivity = sensitivity;
        Ok(())
    }

    /// Accumulates `value` into the sensitivity (`+=`); `None` is a no-op.
    ///
    /// When no sensitivity exists yet, storage is zero-initialised like an array
    /// state, otherwise the increment is adopted as-is.
    ///
    /// # Errors
    /// * `ShapeMismatch` if the increment cannot be broadcast into the existing shape.
    /// * `IncompatiblePayload` / `MissingCapability` if the payloads cannot be added.
    pub fn add_sensitivity(&self, value: impl IntoPayload) -> Result<()> {
        let Some(increment) = value.into_payload() else {
            return Ok(());
        };
        let mut guard = self.write_data();
        let data = &mut *guard;
        match data.sensitivity.as_mut() {
            Some(existing) => existing.accumulate(&increment),
            None => {
                let mut fresh = match &data.state {
                    Some(Value::Array(a)) => Value::Array(Array::zeros(a.shape())),
                    _ => {
                        data.sensitivity = Some(increment);
                        return Ok(());
                    }
                };
                fresh.accumulate(&increment)?;
                data.sensitivity = Some(fresh);
                Ok(())
            }
        }
    }

    /// Clears the sensitivity.
    ///
    /// With `keep_allocation` the existing storage is zero-filled in place instead;
    /// payloads that cannot be zeroed are cleared with a warning.
    pub fn reset(&self, keep_allocation: bool) {
        let mut guard = self.write_data();
        let data = &mut *guard;
        if !keep_allocation {
            data.sensitivity = None;
            return;
        }
        if let Some(sens) = data.sensitivity.as_mut() {
            if let Err(e) = sens.zero_fill() {
                log::warn!(
                    "Signal '{}': cannot zero the sensitivity in place ({}). Setting it to None instead.",
                    data.tag,
                    e
                );
                data.sensitivity = None;
            }
        }
    }

    /// Creates a sliced view addressing `index` of this signal.
    pub fn slice(&self, index: Vec<SliceArg>) -> SignalSlice {
        SignalSlice::new(self.clone(), index)
    }

    /// Shorthand for `slice(s![i])`.
    pub fn at(&self, i: isize) -> SignalSlice {
        self.slice(vec![SliceArg::Index(i)])
    }

    /// True when both handles alias the same storage.
    pub fn ptr_eq(&self, other: &Signal) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl PartialEq for Signal {
    /// Identity comparison: two handles are equal when they share storage.
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.read_data();
        write!(
            f,
            "Signal(tag={:?}, state={:?}, sensitivity={:?})",
            data.tag, data.state, data.sensitivity
        )
    }
}

/// Creates one empty signal per tag, keyed by tag.
pub fn make_signals(tags: &[&str]) -> BTreeMap<String, Signal> {
    tags.iter()
        .map(|t| (t.to_string(), Signal::new(*t)))
        .collect()
}

#[cfg(test)]
#[path = "signal_test.rs"]
mod tests;
