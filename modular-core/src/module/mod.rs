// src/module/mod.rs
// Computational units binding input signals to output signals.

pub mod registry;
pub mod spec;

use std::any::Any;
use std::fmt::{self, Debug};

use crate::error::{ModularError, Result};
use crate::payload::Value;
use crate::signal::{AnySignal, IntoSignals};

use registry::Registry;
use spec::{Config, Spec};

/// Downcasting support for boxed module rules.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The hand-written rules of a concrete module.
///
/// A module's rules work on plain payloads; [`Module`] takes care of reading the
/// input states, writing the output states and accumulating the returned gradients
/// into the input signals. Any state needed between the forward and the backward
/// rule (inputs, intermediate results) is cached on `self`.
pub trait ModuleOp: AsAny + Debug + Send + Sync {
    /// The forward rule.
    ///
    /// # Arguments
    /// * `inputs`: the state of every input signal, in input order. The rule is
    ///   never called while an input has no state; [`Module::response`] reports
    ///   `StateUnset` instead.
    ///
    /// # Returns
    /// One value per output signal, in output order.
    fn response(&mut self, inputs: &[Value]) -> Result<Vec<Value>>;

    /// The backward rule.
    ///
    /// # Arguments
    /// * `douts`: the sensitivity of every output signal, in output order. Outputs
    ///   without a sensitivity are passed as zeros.
    ///
    /// # Returns
    /// * `Ok(None)` when the module has no backward rule (the default).
    /// * `Ok(Some(dins))` with one entry per input signal; a `None` entry
    ///   contributes nothing to that input.
    fn sensitivity(&mut self, _douts: &[Value]) -> Result<Option<Vec<Option<Value>>>> {
        Ok(None)
    }

    /// Clears cached intermediate state. Must be idempotent.
    fn reset(&mut self) -> Result<()> {
        Ok(())
    }

    /// Number of inputs the forward rule takes, when fixed.
    fn input_arity(&self) -> Option<usize> {
        None
    }

    /// Number of outputs the forward rule produces, when fixed.
    fn output_arity(&self) -> Option<usize> {
        None
    }

    /// Called once when the rules are wired between their signals.
    fn bind(&mut self, _sig_in: &[AnySignal], _sig_out: &[AnySignal]) {}

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Name-based construction of a [`ModuleOp`] from keyword configuration.
///
/// Implementors can be registered in a [`Registry`] and built from a [`Spec`].
pub trait Prepare: ModuleOp + Sized {
    /// Name the module is registered under (matched case-insensitively).
    const NAME: &'static str;

    /// The preparation step: consumes the configuration and builds the rules.
    fn prepare(config: &Config) -> Result<Self>;
}

/// A module: ordered input signals, ordered output signals and the rules between them.
pub struct Module {
    sig_in: Vec<AnySignal>,
    sig_out: Vec<AnySignal>,
    op: Box<dyn ModuleOp>,
}

impl Module {
    /// Wires `op` between `inputs` and `outputs`.
    ///
    /// `inputs` and `outputs` may each be a single signal or a collection of them.
    pub fn new(inputs: impl IntoSignals, outputs: impl IntoSignals, op: impl ModuleOp + 'static) -> Self {
        Self::from_boxed(inputs.into_signals(), outputs.into_signals(), Box::new(op))
    }

    pub fn from_boxed(sig_in: Vec<AnySignal>, sig_out: Vec<AnySignal>, mut op: Box<dyn ModuleOp>) -> Self {
        op.bind(&sig_in, &sig_out);
        Module { sig_in, sig_out, op }
    }

    /// Builds a registered module by name through the global registry.
    ///
    /// # Errors
    /// `UnknownModule` if `name` is not registered; preparation errors as raised.
    pub fn create(name: &str, inputs: impl IntoSignals, outputs: impl IntoSignals, config: &Config) -> Result<Self> {
        // The registry lock is released before the preparation step runs
        let constructor = Registry::global().constructor(name)?;
        registry::build(constructor, inputs, outputs, config)
    }

    /// Builds a module from a declarative description through the global registry.
    pub fn from_spec(spec: &Spec) -> Result<Self> {
        let (name, sig_in, sig_out, config) = spec.split_module()?;
        Self::create(&name, sig_in, sig_out, &config)
    }

    pub fn sig_in(&self) -> &[AnySignal] {
        &self.sig_in
    }

    pub fn sig_out(&self) -> &[AnySignal] {
        &self.sig_out
    }

    pub fn name(&self) -> &str {
        self.op.name()
    }

    /// The rules of this module, if they are of type `T`.
    pub fn op<T: ModuleOp + 'static>(&self) -> Option<&T> {
        (*self.op).as_any().downcast_ref::<T>()
    }

    pub fn op_mut<T: ModuleOp + 'static>(&mut self) -> Option<&mut T> {
        (*self.op).as_any_mut().downcast_mut::<T>()
    }

    fn arity_error(&self, what: &str, expected: usize, actual: usize) -> ModularError {
        ModularError::ArityMismatch {
            module: self.name().to_string(),
            what: what.to_string(),
            expected,
            actual,
        }
    }

    // Declared arities against the wired signals
    fn check_wiring(&self) -> Result<()> {
        if let Some(expected) = self.op.input_arity() {
            if expected != self.sig_in.len() {
                return Err(self.arity_error("input", expected, self.sig_in.len()));
            }
        }
        if let Some(expected) = self.op.output_arity() {
            if expected != self.sig_out.len() {
                return Err(self.arity_error("output", expected, self.sig_out.len()));
            }
        }
        Ok(())
    }

    /// Runs the forward rule on the input states and writes the output states.
    ///
    /// # Errors
    /// * `ArityMismatch` if the rule's declared input or output count, or its number
    ///   of returned values, does not match the wiring.
    /// * `StateUnset` if an input has no state.
    /// * Whatever the forward rule raises.
    pub fn response(&mut self) -> Result<()> {
        self.check_wiring()?;
        let inputs = self
            .sig_in
            .iter()
            .map(|s| {
                s.state()?.ok_or_else(|| ModularError::StateUnset {
                    tag: s.tag(),
                    operation: format!("response of {}", self.name()),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let outputs = self.op.response(&inputs)?;
        if outputs.len() != self.sig_out.len() {
            return Err(self.arity_error("output", self.sig_out.len(), outputs.len()));
        }
        for (signal, value) in self.sig_out.iter().zip(outputs) {
            signal.set_state(value)?;
        }
        Ok(())
    }

    /// Runs the backward rule and accumulates its gradients into the input signals.
    ///
    /// Nothing happens when every output sensitivity is `None`. A module without a
    /// backward rule logs a warning and leaves its inputs untouched.
    ///
    /// # Errors
    /// * `ArityMismatch` if the declared arities do not match the wiring, or the
    ///   rule does not return one gradient per input.
    /// * Accumulation errors (`ShapeMismatch`, `IncompatiblePayload`, ...).
    /// * Whatever the backward rule raises.
    pub fn sensitivity(&mut self) -> Result<()> {
        self.check_wiring()?;
        let douts = self
            .sig_out
            .iter()
            .map(AnySignal::sensitivity)
            .collect::<Result<Vec<_>>>()?;
        if !douts.is_empty() && douts.iter().all(Option::is_none) {
            return Ok(());
        }
        let douts = douts
            .into_iter()
            .zip(&self.sig_out)
            .map(|(dout, signal)| match dout {
                Some(v) => Ok(v),
                None => match signal.state()? {
                    Some(state) => state.zeros_like(),
                    None => Ok(Value::Scalar(0.0)),
                },
            })
            .collect::<Result<Vec<_>>>()?;

        let Some(dins) = self.op.sensitivity(&douts)? else {
            log::warn!(
                "Module {} has no sensitivity rule; input sensitivities are left untouched.",
                self.name()
            );
            return Ok(());
        };
        if dins.len() != self.sig_in.len() {
            return Err(self.arity_error("sensitivity", self.sig_in.len(), dins.len()));
        }
        for (signal, din) in self.sig_in.iter().zip(dins) {
            signal.add_sensitivity(din)?;
        }
        Ok(())
    }

    /// Clears the sensitivities of every input and output, then the module's own cache.
    ///
    /// # Errors
    /// Failures of the module's reset hook are propagated.
    pub fn reset(&mut self) -> Result<()> {
        for signal in self.sig_in.iter().chain(&self.sig_out) {
            signal.reset(false)?;
        }
        self.op.reset()
    }
}

impl Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags = |sigs: &[AnySignal]| sigs.iter().map(AnySignal::tag).collect::<Vec<_>>();
        f.debug_struct("Module")
            .field("op", &self.op)
            .field("sig_in", &tags(&self.sig_in))
            .field("sig_out", &tags(&self.sig_out))
            .finish()
    }
}

#[cfg(test)]
#[path = "module_test.rs"]
mod tests;
