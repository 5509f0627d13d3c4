// src/signal/slice.rs

use std::fmt::{self, Debug};

use crate::error::{ModularError, Result};
use crate::index::{format_index, SliceArg};
use crate::payload::{Indexable, IntoPayload, Value};
use crate::signal::Signal;

/// A view addressing a sub-region of a base [`Signal`].
///
/// The view owns no storage: reads copy the indexed region out of the base, and
/// writes go straight into the base's `state` or `sensitivity` at the index.
#[derive(Clone)]
pub struct SignalSlice {
    base: Signal,
    index: Vec<SliceArg>,
}

impl SignalSlice {
    pub fn new(base: Signal, index: Vec<SliceArg>) -> Self {
        SignalSlice { base, index }
    }

    pub fn base(&self) -> &Signal {
        &self.base
    }

    pub fn index(&self) -> &[SliceArg] {
        &self.index
    }

    /// `base[index]`.
    pub fn tag(&self) -> String {
        format!("{}[{}]", self.base.tag(), format_index(&self.index))
    }

    /// Reads the indexed region of the base state; `Ok(None)` when the base has no state.
    ///
    /// # Errors
    /// Index errors for an invalid index, `MissingCapability` for non-indexable payloads.
    pub fn state(&self) -> Result<Option<Value>> {
        let guard = self.base.read_data();
        guard
            .state
            .as_ref()
            .map(|state| state.select(&self.index))
            .transpose()
    }

    /// Writes `value` into the base state at the index.
    pub fn set_state(&self, value: impl IntoPayload) -> Result<()> {
        let value = self.require_value(value, "set_state")?;
        let mut guard = self.base.write_data();
        let data = &mut *guard;
        match data.state.as_mut() {
            Some(state) => state.assign(&self.index, &value),
            None => Err(ModularError::StateUnset {
                tag: data.tag.clone(),
                operation: "set_state through a slice".to_string(),
            }),
        }
    }

    /// Reads the indexed region of the base sensitivity.
    pub fn sensitivity(&self) -> Result<Option<Value>> {
        let guard = self.base.read_data();
        guard
            .sensitivity
            .as_ref()
            .map(|sens| sens.select(&self.index))
            .transpose()
    }

    /// Overwrites the indexed region of the base sensitivity.
    ///
    /// The base storage is allocated (zeros shaped like the base state) on first use.
    /// `None` zeroes the region.
    pub fn set_sensitivity(&self, value: impl IntoPayload) -> Result<()> {
        let mut guard = self.base.write_data();
        match value.into_payload() {
            Some(value) => guard
                .sensitivity_storage("set_sensitivity")?
                .assign(&self.index, &value),
            None => match guard.sensitivity.as_mut() {
                Some(sens) => sens.assign(&self.index, &Value::Scalar(0.0)),
                None => Ok(()),
            },
        }
    }

    /// Accumulates `value` into the indexed region of the base sensitivity only.
    pub fn add_sensitivity(&self, value: impl IntoPayload) -> Result<()> {
        let Some(increment) = value.into_payload() else {
            return Ok(());
        };
        let mut guard = self.base.write_data();
        guard
            .sensitivity_storage("add_sensitivity")?
            .accumulate_at(&self.index, &increment)
    }

    /// Zeroes the indexed region of the base sensitivity, leaving the rest untouched.
    pub fn reset(&self) -> Result<()> {
        let mut guard = self.base.write_data();
        match guard.sensitivity.as_mut() {
            Some(sens) => sens.assign(&self.index, &Value::Scalar(0.0)),
            None => Ok(()),
        }
    }

    fn require_value(&self, value: impl IntoPayload, operation: &str) -> Result<Value> {
        value.into_payload().ok_or_else(|| ModularError::IncompatiblePayload {
            target: self.tag(),
            increment: format!("None ({})", operation),
        })
    }
}

impl Debug for SignalSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignalSlice({})", self.tag())
    }
}

#[cfg(test)]
#[path = "slice_test.rs"]
mod tests;
