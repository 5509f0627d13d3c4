// src/module/spec.rs
// Declarative module descriptions and the keyword configuration handed to `Prepare`.

use std::collections::BTreeMap;

use crate::error::{ModularError, Result};
use crate::payload::{Array, Value};
use crate::signal::{AnySignal, Signal, SignalConcat, SignalSlice};

/// A single configuration value.
#[derive(Debug, Clone)]
pub enum Param {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Value(Value),
    Signal(AnySignal),
    List(Vec<Param>),
}

impl Param {
    /// Short description of the parameter kind, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Param::Bool(_) => "bool",
            Param::Int(_) => "int",
            Param::Float(_) => "float",
            Param::Str(_) => "string",
            Param::Value(_) => "value",
            Param::Signal(_) => "signal",
            Param::List(_) => "list",
        }
    }

    pub fn as_signal(&self) -> Option<&AnySignal> {
        match self {
            Param::Signal(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Bool(v)
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<i32> for Param {
    fn from(v: i32) -> Self {
        Param::Int(i64::from(v))
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Float(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Str(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Str(v)
    }
}

impl From<Value> for Param {
    fn from(v: Value) -> Self {
        Param::Value(v)
    }
}

impl From<Array> for Param {
    fn from(v: Array) -> Self {
        Param::Value(Value::Array(v))
    }
}

impl From<AnySignal> for Param {
    fn from(v: AnySignal) -> Self {
        Param::Signal(v)
    }
}

impl From<Signal> for Param {
    fn from(v: Signal) -> Self {
        Param::Signal(v.into())
    }
}

impl From<&Signal> for Param {
    fn from(v: &Signal) -> Self {
        Param::Signal(v.into())
    }
}

impl From<SignalSlice> for Param {
    fn from(v: SignalSlice) -> Self {
        Param::Signal(v.into())
    }
}

impl From<SignalConcat> for Param {
    fn from(v: SignalConcat) -> Self {
        Param::Signal(v.into())
    }
}

impl<T: Into<Param>> From<Vec<T>> for Param {
    fn from(v: Vec<T>) -> Self {
        Param::List(v.into_iter().map(Into::into).collect())
    }
}

/// An ordered `key -> Param` map.
///
/// Used both as a full module description (`type`, `sig_in`, `sig_out` plus
/// configuration) and as the configuration alone, once those three keys are
/// taken out.
///
/// ```
/// use modular_core::{Signal, Spec};
/// let x = Signal::with_state("x", 2.0);
/// let y = Signal::new("y");
/// let spec = Spec::new()
///     .with("type", "Scaling")
///     .with("sig_in", x)
///     .with("sig_out", y)
///     .with("scaling", 3.0);
/// assert_eq!(spec.get_f64("scaling").unwrap(), Some(3.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Spec {
    params: BTreeMap<String, Param>,
}

/// Configuration consumed by [`Prepare::prepare`](crate::Prepare::prepare).
pub type Config = Spec;

impl Spec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Param>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Param>) -> Option<Param> {
        self.params.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Param> {
        self.params.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Param> {
        self.params.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    fn require<'a>(&'a self, key: &str) -> Result<&'a Param> {
        self.get(key).ok_or_else(|| ModularError::MissingKey {
            key: key.to_string(),
        })
    }

    fn invalid(key: &str, expected: &str, found: &Param) -> ModularError {
        ModularError::InvalidConfig {
            key: key.to_string(),
            expected: format!("{}, found {}", expected, found.type_name()),
        }
    }

    /// Reads a number (`Int` or `Float`, or a scalar `Value`).
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(Param::Float(v)) => Ok(Some(*v)),
            Some(Param::Int(v)) => Ok(Some(*v as f64)),
            Some(p @ Param::Value(v)) => v
                .as_scalar()
                .map(Some)
                .ok_or_else(|| Self::invalid(key, "a number", p)),
            Some(other) => Err(Self::invalid(key, "a number", other)),
        }
    }

    pub fn get_f64_or(&self, key: &str, default: f64) -> Result<f64> {
        Ok(self.get_f64(key)?.unwrap_or(default))
    }

    pub fn require_f64(&self, key: &str) -> Result<f64> {
        self.require(key)?;
        self.get_f64(key)?.ok_or_else(|| ModularError::MissingKey {
            key: key.to_string(),
        })
    }

    pub fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(Param::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(Self::invalid(key, "an integer", other)),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(Param::Bool(v)) => Ok(Some(*v)),
            Some(other) => Err(Self::invalid(key, "a bool", other)),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.get(key) {
            None => Ok(None),
            Some(Param::Str(v)) => Ok(Some(v.as_str())),
            Some(other) => Err(Self::invalid(key, "a string", other)),
        }
    }

    pub fn require_str(&self, key: &str) -> Result<&str> {
        match self.require(key)? {
            Param::Str(v) => Ok(v.as_str()),
            other => Err(Self::invalid(key, "a string", other)),
        }
    }

    pub fn get_value(&self, key: &str) -> Result<Option<Value>> {
        match self.get(key) {
            None => Ok(None),
            Some(Param::Value(v)) => Ok(Some(v.clone())),
            Some(Param::Float(v)) => Ok(Some(Value::Scalar(*v))),
            Some(Param::Int(v)) => Ok(Some(Value::Scalar(*v as f64))),
            Some(other) => Err(Self::invalid(key, "a value", other)),
        }
    }

    /// Reads a single signal or a list of signals; a missing key yields no signals.
    ///
    /// # Errors
    /// `ModularError::NotASignal` naming the offending position.
    pub fn signals(&self, key: &str) -> Result<Vec<AnySignal>> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(param) => Self::collect_signals(key, param),
        }
    }

    /// Like [`signals`](Self::signals), but the key must be present.
    pub fn require_signals(&self, key: &str) -> Result<Vec<AnySignal>> {
        Self::collect_signals(key, self.require(key)?)
    }

    fn collect_signals(key: &str, param: &Param) -> Result<Vec<AnySignal>> {
        let not_a_signal = |position: usize, found: &Param| ModularError::NotASignal {
            key: key.to_string(),
            position,
            found: found.type_name().to_string(),
        };
        match param {
            Param::Signal(s) => Ok(vec![s.clone()]),
            Param::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, p)| p.as_signal().cloned().ok_or_else(|| not_a_signal(i, p)))
                .collect(),
            other => Err(not_a_signal(0, other)),
        }
    }

    /// Splits a module description into `(type, sig_in, sig_out, config)`.
    ///
    /// # Errors
    /// * `MissingKey` without a `type` entry.
    /// * `NotASignal` if `sig_in` / `sig_out` hold anything but signals.
    pub fn split_module(&self) -> Result<(String, Vec<AnySignal>, Vec<AnySignal>, Config)> {
        let name = self.require_str("type")?.to_string();
        let sig_in = self.signals("sig_in")?;
        let sig_out = self.signals("sig_out")?;
        let mut config = self.clone();
        for key in ["type", "sig_in", "sig_out"] {
            config.remove(key);
        }
        Ok((name, sig_in, sig_out, config))
    }
}

#[cfg(test)]
#[path = "spec_test.rs"]
mod tests;
