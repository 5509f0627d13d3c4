// src/signal/concat.rs

use std::fmt::{self, Debug};

use crate::error::{ModularError, Result};
use crate::module::spec::Spec;
use crate::payload::{Array, IntoPayload, Value};
use crate::signal::any::{AnySignal, IntoSignals};

/// Several signals presented as one flat 1-d value.
///
/// Reads concatenate the flattened constituents in order. Writes split the flat value
/// back into one chunk per constituent, shaped like that constituent's current state.
#[derive(Clone)]
pub struct SignalConcat {
    tag: String,
    signals: Vec<AnySignal>,
}

// Where a constituent's elements live in the flat value, and how to rebuild them
#[derive(Debug, Clone)]
enum Chunk {
    Scalar,
    Array(Vec<usize>),
}

impl Chunk {
    fn numel(&self) -> usize {
        match self {
            Chunk::Scalar => 1,
            Chunk::Array(shape) => shape.iter().product(),
        }
    }

    fn build(&self, data: &[f64]) -> Result<Value> {
        match self {
            Chunk::Scalar => Ok(Value::Scalar(data[0])),
            Chunk::Array(shape) => Ok(Value::Array(Array::from_vec(data.to_vec(), shape.clone())?)),
        }
    }
}

impl SignalConcat {
    pub fn new(signals: impl IntoSignals, tag: impl Into<String>) -> Self {
        SignalConcat {
            tag: tag.into(),
            signals: signals.into_signals(),
        }
    }

    /// Builds a concatenation from a declarative description.
    ///
    /// `signals` is required, `tag` is optional (defaults to `"concat"`).
    ///
    /// # Errors
    /// `MissingKey` without `signals`, `NotASignal` if an entry is not a signal.
    pub fn from_spec(spec: &Spec) -> Result<Self> {
        let signals = spec.require_signals("signals")?;
        let tag = spec.get_str("tag")?.unwrap_or("concat").to_string();
        Ok(SignalConcat { tag, signals })
    }

    pub fn tag(&self) -> String {
        self.tag.clone()
    }

    pub fn signals(&self) -> &[AnySignal] {
        &self.signals
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    fn incomplete(&self, constituent: &AnySignal) -> ModularError {
        ModularError::IncompleteConcat {
            tag: self.tag.clone(),
            constituent: constituent.tag(),
        }
    }

    fn layout(&self) -> Result<Vec<Chunk>> {
        self.signals
            .iter()
            .map(|s| match s.state()? {
                None => Err(self.incomplete(s)),
                Some(Value::Scalar(_)) => Ok(Chunk::Scalar),
                Some(Value::Array(a)) => Ok(Chunk::Array(a.shape().to_vec())),
                Some(other) => Err(ModularError::IncompatiblePayload {
                    target: self.tag.clone(),
                    increment: other.type_name(),
                }),
            })
            .collect()
    }

    // Splits a flat value into per-constituent values matching the current layout
    fn split(&self, value: &Value, operation: &str) -> Result<Vec<Value>> {
        let layout = self.layout()?;
        let flat = value.flat()?;
        let total: usize = layout.iter().map(Chunk::numel).sum();
        if flat.len() != total {
            return Err(ModularError::ShapeMismatch {
                expected: vec![total],
                actual: value.shape().unwrap_or_default(),
                operation: operation.to_string(),
            });
        }
        let mut offset = 0;
        layout
            .iter()
            .map(|chunk| {
                let n = chunk.numel();
                let part = chunk.build(&flat[offset..offset + n]);
                offset += n;
                part
            })
            .collect()
    }

    /// The flattened concatenation of every constituent state.
    ///
    /// # Errors
    /// `IncompleteConcat` if any constituent has no state.
    pub fn state(&self) -> Result<Option<Value>> {
        let mut data = Vec::new();
        for s in &self.signals {
            let state = s.state()?.ok_or_else(|| self.incomplete(s))?;
            data.extend(state.flat()?);
        }
        Ok(Some(Value::from(data)))
    }

    /// Splits `value` and writes each chunk into the matching constituent state.
    pub fn set_state(&self, value: impl IntoPayload) -> Result<()> {
        let Some(value) = value.into_payload() else {
            return Err(ModularError::IncompatiblePayload {
                target: self.tag.clone(),
                increment: "None (set_state)".to_string(),
            });
        };
        for (s, part) in self.signals.iter().zip(self.split(&value, "set_state")?) {
            s.set_state(part)?;
        }
        Ok(())
    }

    /// The flattened concatenation of the constituent sensitivities.
    ///
    /// `None` when no constituent has a sensitivity; otherwise constituents without one
    /// contribute zeros.
    pub fn sensitivity(&self) -> Result<Option<Value>> {
        let sensitivities = self
            .signals
            .iter()
            .map(|s| s.sensitivity())
            .collect::<Result<Vec<_>>>()?;
        if sensitivities.iter().all(Option::is_none) {
            return Ok(None);
        }
        let layout = self.layout()?;
        let mut data = Vec::new();
        for (sens, chunk) in sensitivities.iter().zip(&layout) {
            match sens {
                Some(v) => data.extend(v.flat()?),
                None => data.extend(std::iter::repeat(0.0).take(chunk.numel())),
            }
        }
        Ok(Some(Value::from(data)))
    }

    /// Splits `value` and overwrites each constituent sensitivity; `None` clears them all.
    pub fn set_sensitivity(&self, value: impl IntoPayload) -> Result<()> {
        match value.into_payload() {
            None => {
                for s in &self.signals {
                    s.set_sensitivity(None)?;
                }
                Ok(())
            }
            Some(value) => {
                for (s, part) in self.signals.iter().zip(self.split(&value, "set_sensitivity")?) {
                    s.set_sensitivity(part)?;
                }
                Ok(())
            }
        }
    }

    /// Splits `value` and accumulates each chunk into its constituent.
    ///
    /// A zero chunk is skipped for a constituent that has no sensitivity yet.
    pub fn add_sensitivity(&self, value: impl IntoPayload) -> Result<()> {
        let Some(value) = value.into_payload() else {
            return Ok(());
        };
        for (s, part) in self.signals.iter().zip(self.split(&value, "add_sensitivity")?) {
            if part.is_zero() && s.sensitivity()?.is_none() {
                continue;
            }
            s.add_sensitivity(part)?;
        }
        Ok(())
    }

    /// Resets every constituent.
    pub fn reset(&self, keep_allocation: bool) -> Result<()> {
        for s in &self.signals {
            s.reset(keep_allocation)?;
        }
        Ok(())
    }
}

impl Debug for SignalConcat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<String> = self.signals.iter().map(AnySignal::tag).collect();
        write!(f, "SignalConcat(tag={:?}, signals={:?})", self.tag, tags)
    }
}

#[cfg(test)]
#[path = "concat_test.rs"]
mod tests;
