// src/signal/any.rs

use crate::error::Result;
use crate::payload::{IntoPayload, Value};
use crate::signal::{Signal, SignalConcat, SignalSlice};

/// Any signal-like handle a module can be wired to.
#[derive(Debug, Clone)]
pub enum AnySignal {
    Signal(Signal),
    Slice(SignalSlice),
    Concat(SignalConcat),
}

impl AnySignal {
    pub fn tag(&self) -> String {
        match self {
            AnySignal::Signal(s) => s.tag(),
            AnySignal::Slice(s) => s.tag(),
            AnySignal::Concat(s) => s.tag(),
        }
    }

    pub fn state(&self) -> Result<Option<Value>> {
        match self {
            AnySignal::Signal(s) => Ok(s.state()),
            AnySignal::Slice(s) => s.state(),
            AnySignal::Concat(s) => s.state(),
        }
    }

    pub fn set_state(&self, value: impl IntoPayload) -> Result<()> {
        match self {
            AnySignal::Signal(s) => {
                s.set_state(value);
                Ok(())
            }
            AnySignal::Slice(s) => s.set_state(value),
            AnySignal::Concat(s) => s.set_state(value),
        }
    }

    pub fn sensitivity(&self) -> Result<Option<Value>> {
        match self {
            AnySignal::Signal(s) => Ok(s.sensitivity()),
            AnySignal::Slice(s) => s.sensitivity(),
            AnySignal::Concat(s) => s.sensitivity(),
        }
    }

    pub fn set_sensitivity(&self, value: impl IntoPayload) -> Result<()> {
        match self {
            AnySignal::Signal(s) => s.set_sensitivity(value),
            AnySignal::Slice(s) => s.set_sensitivity(value),
            AnySignal::Concat(s) => s.set_sensitivity(value),
        }
    }

    pub fn add_sensitivity(&self, value: impl IntoPayload) -> Result<()> {
        match self {
            AnySignal::Signal(s) => s.add_sensitivity(value),
            AnySignal::Slice(s) => s.add_sensitivity(value),
            AnySignal::Concat(s) => s.add_sensitivity(value),
        }
    }

    /// Clears the sensitivity addressed by this handle.
    ///
    /// A slice only zeroes its own region of the base, whatever `keep_allocation` says.
    pub fn reset(&self, keep_allocation: bool) -> Result<()> {
        match self {
            AnySignal::Signal(s) => {
                s.reset(keep_allocation);
                Ok(())
            }
            AnySignal::Slice(s) => s.reset(),
            AnySignal::Concat(s) => s.reset(keep_allocation),
        }
    }

    /// The plain signal behind this handle, if it is one.
    pub fn as_signal(&self) -> Option<&Signal> {
        match self {
            AnySignal::Signal(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Signal> for AnySignal {
    fn from(s: Signal) -> Self {
        AnySignal::Signal(s)
    }
}

impl From<&Signal> for AnySignal {
    fn from(s: &Signal) -> Self {
        AnySignal::Signal(s.clone())
    }
}

impl From<SignalSlice> for AnySignal {
    fn from(s: SignalSlice) -> Self {
        AnySignal::Slice(s)
    }
}

impl From<SignalConcat> for AnySignal {
    fn from(s: SignalConcat) -> Self {
        AnySignal::Concat(s)
    }
}

/// A single signal or an ordered collection of them.
pub trait IntoSignals {
    fn into_signals(self) -> Vec<AnySignal>;
}

impl IntoSignals for AnySignal {
    fn into_signals(self) -> Vec<AnySignal> {
        vec![self]
    }
}

impl IntoSignals for Signal {
    fn into_signals(self) -> Vec<AnySignal> {
        vec![self.into()]
    }
}

impl IntoSignals for &Signal {
    fn into_signals(self) -> Vec<AnySignal> {
        vec![self.into()]
    }
}

impl IntoSignals for SignalSlice {
    fn into_signals(self) -> Vec<AnySignal> {
        vec![self.into()]
    }
}

impl IntoSignals for SignalConcat {
    fn into_signals(self) -> Vec<AnySignal> {
        vec![self.into()]
    }
}

impl<T: Into<AnySignal>> IntoSignals for Vec<T> {
    fn into_signals(self) -> Vec<AnySignal> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<AnySignal>, const N: usize> IntoSignals for [T; N] {
    fn into_signals(self) -> Vec<AnySignal> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<AnySignal> + Clone> IntoSignals for &[T] {
    fn into_signals(self) -> Vec<AnySignal> {
        self.iter().cloned().map(Into::into).collect()
    }
}

/// No signals.
impl IntoSignals for () {
    fn into_signals(self) -> Vec<AnySignal> {
        Vec::new()
    }
}
