// src/network.rs

use std::fmt::{self, Debug};

use crate::error::Result;
use crate::module::registry::Registry;
use crate::module::spec::Spec;
use crate::module::Module;
use crate::signal::AnySignal;

/// Either a ready module or a declarative description of one.
#[derive(Debug)]
pub enum NetworkEntry {
    Module(Module),
    Spec(Spec),
}

impl From<Module> for NetworkEntry {
    fn from(m: Module) -> Self {
        NetworkEntry::Module(m)
    }
}

impl From<Spec> for NetworkEntry {
    fn from(s: Spec) -> Self {
        NetworkEntry::Spec(s)
    }
}

impl NetworkEntry {
    // Specs go through `registry`, or the global registry when none is given
    fn instantiate(self, registry: Option<&Registry>) -> Result<Module> {
        match (self, registry) {
            (NetworkEntry::Module(m), _) => Ok(m),
            (NetworkEntry::Spec(spec), Some(registry)) => registry.create_from_spec(&spec),
            (NetworkEntry::Spec(spec), None) => Module::from_spec(&spec),
        }
    }
}

/// An ordered collection of modules.
///
/// `response` runs the modules in insertion order and `sensitivity` in exactly the
/// reverse order, so every consumer of a signal has added its contribution to the
/// signal's sensitivity before the producer of that signal propagates it further.
/// Every phase stops at the first failing module and returns its error unchanged.
#[derive(Default)]
pub struct Network {
    modules: Vec<Module>,
}

impl Network {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_modules(modules: Vec<Module>) -> Self {
        Network { modules }
    }

    /// Builds a network from modules and module descriptions, in order.
    ///
    /// Descriptions are instantiated immediately through the global registry, so a
    /// malformed one fails here rather than at the first response.
    pub fn from_entries<I, E>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<NetworkEntry>,
    {
        Self::build(entries, None)
    }

    /// Like [`from_entries`](Self::from_entries), resolving names in `registry`.
    pub fn from_entries_in<I, E>(registry: &Registry, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<NetworkEntry>,
    {
        Self::build(entries, Some(registry))
    }

    fn build<I, E>(entries: I, registry: Option<&Registry>) -> Result<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<NetworkEntry>,
    {
        let modules = entries
            .into_iter()
            .map(|e| e.into().instantiate(registry))
            .collect::<Result<Vec<_>>>()?;
        Ok(Network { modules })
    }

    /// Appends a module (or instantiates a description) and returns its output signals.
    ///
    /// ```
    /// use modular_core::{modules::Scaling, Module, Network, Signal};
    /// let x = Signal::with_state("x", 1.0);
    /// let mut net = Network::new();
    /// let y = net.append(Module::new(&x, Signal::new("y"), Scaling::new(2.0))).unwrap();
    /// let z = net.append(Module::new(y, Signal::new("z"), Scaling::new(3.0))).unwrap();
    /// net.response().unwrap();
    /// assert_eq!(z[0].state().unwrap().and_then(|v| v.as_scalar()), Some(6.0));
    /// ```
    pub fn append(&mut self, entry: impl Into<NetworkEntry>) -> Result<Vec<AnySignal>> {
        self.push(entry.into(), None)
    }

    /// Like [`append`](Self::append), resolving a description's name in `registry`.
    pub fn append_in(&mut self, registry: &Registry, entry: impl Into<NetworkEntry>) -> Result<Vec<AnySignal>> {
        self.push(entry.into(), Some(registry))
    }

    fn push(&mut self, entry: NetworkEntry, registry: Option<&Registry>) -> Result<Vec<AnySignal>> {
        let module = entry.instantiate(registry)?;
        let outputs = module.sig_out().to_vec();
        self.modules.push(module);
        Ok(outputs)
    }

    /// Appends several entries, returning the outputs of the last one.
    pub fn append_all<I, E>(&mut self, entries: I) -> Result<Vec<AnySignal>>
    where
        I: IntoIterator<Item = E>,
        E: Into<NetworkEntry>,
    {
        let mut outputs = Vec::new();
        for entry in entries {
            outputs = self.append(entry)?;
        }
        Ok(outputs)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Module> {
        self.modules.iter()
    }

    /// Forward pass over every module, in insertion order.
    pub fn response(&mut self) -> Result<()> {
        log::debug!("Network response over {} modules", self.modules.len());
        for (i, module) in self.modules.iter_mut().enumerate() {
            log::trace!("response [{}] {}", i, module.name());
            module.response()?;
        }
        Ok(())
    }

    /// Backward pass over every module, in reverse insertion order.
    pub fn sensitivity(&mut self) -> Result<()> {
        log::debug!("Network sensitivity over {} modules", self.modules.len());
        for (i, module) in self.modules.iter_mut().enumerate().rev() {
            log::trace!("sensitivity [{}] {}", i, module.name());
            module.sensitivity()?;
        }
        Ok(())
    }

    /// Resets every module, clearing the sensitivities of all signals they touch.
    pub fn reset(&mut self) -> Result<()> {
        log::debug!("Network reset over {} modules", self.modules.len());
        for module in self.modules.iter_mut() {
            module.reset()?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Network {
    type Item = &'a Module;
    type IntoIter = std::slice::Iter<'a, Module>;

    fn into_iter(self) -> Self::IntoIter {
        self.modules.iter()
    }
}

impl Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.modules.iter()).finish()
    }
}

#[cfg(test)]
#[path = "network_test.rs"]
mod tests;
