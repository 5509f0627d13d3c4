// src/module/registry.rs
// Name-based module construction.

use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::Lazy;

use crate::error::{ModularError, Result};
use crate::module::spec::{Config, Spec};
use crate::module::{Module, ModuleOp, Prepare};
use crate::modules::{IterationLog, Scaling, Sum};
use crate::signal::IntoSignals;

/// Builds the rules of a registered module from its configuration.
pub type Constructor = fn(&Config) -> Result<Box<dyn ModuleOp>>;

fn construct<M: Prepare + 'static>(config: &Config) -> Result<Box<dyn ModuleOp>> {
    Ok(Box::new(M::prepare(config)?))
}

/// A module type declared with [`register_module!`](crate::register_module).
///
/// Declarations are gathered at link time and loaded into the global registry
/// the first time it is used.
pub struct Declaration {
    name: &'static str,
    type_id: fn() -> TypeId,
    type_name: fn() -> &'static str,
    constructor: Constructor,
}

impl Declaration {
    pub const fn of<M: Prepare + 'static>() -> Self {
        Declaration {
            name: M::NAME,
            type_id: TypeId::of::<M>,
            type_name: std::any::type_name::<M>,
            constructor: construct::<M>,
        }
    }

    fn entry(&self) -> Entry {
        Entry {
            name: self.name,
            type_id: (self.type_id)(),
            type_name: (self.type_name)(),
            constructor: self.constructor,
        }
    }
}

inventory::collect!(Declaration);

/// Makes a module type buildable by name as soon as it is defined.
///
/// ```
/// use modular_core::{register_module, Config, Module, ModuleOp, Prepare, Result, Signal, Value};
///
/// #[derive(Debug)]
/// struct Negate;
///
/// impl ModuleOp for Negate {
///     fn response(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
///         Ok(vec![inputs[0].map(|v| -v)?])
///     }
/// }
///
/// impl Prepare for Negate {
///     const NAME: &'static str = "Negate";
///     fn prepare(_config: &Config) -> Result<Self> {
///         Ok(Negate)
///     }
/// }
///
/// register_module!(Negate);
///
/// let x = Signal::with_state("x", 2.0);
/// let y = Signal::new("y");
/// let mut m = Module::create("negate", &x, &y, &Config::new()).unwrap();
/// m.response().unwrap();
/// assert_eq!(y.state(), Some(Value::Scalar(-2.0)));
/// ```
#[macro_export]
macro_rules! register_module {
    ($module:ty) => {
        $crate::inventory::submit! {
            $crate::module::registry::Declaration::of::<$module>()
        }
    };
}

/// One registered module type.
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    /// Name as declared by the module (`Prepare::NAME`).
    pub name: &'static str,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub constructor: Constructor,
}

/// Table of module types that can be built by name.
///
/// Names are matched case-insensitively. Several distinct types may share a name:
/// the most recently registered one wins lookups, and the collision is reported
/// as a warning whenever the registry is described.
#[derive(Debug, Default)]
pub struct Registry {
    entries: BTreeMap<String, Vec<Entry>>,
}

static GLOBAL: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::with_declared()));

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in modules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register::<Scaling>();
        registry.register::<Sum>();
        registry.register::<IterationLog>();
        registry
    }

    /// A registry holding every type declared with [`register_module!`](crate::register_module).
    ///
    /// Declarations are loaded sorted by type name, so when two declared types share
    /// a name the lookup result does not depend on link order.
    pub fn with_declared() -> Self {
        let mut declared: Vec<Entry> = inventory::iter::<Declaration>
            .into_iter()
            .map(Declaration::entry)
            .collect();
        declared.sort_by_key(|e| e.type_name);
        let mut registry = Self::new();
        for entry in declared {
            registry.insert(entry);
        }
        registry
    }

    /// The process-wide registry used by [`Module::create`] and [`Module::from_spec`].
    pub fn global() -> RwLockReadGuard<'static, Registry> {
        GLOBAL.read().unwrap_or_else(|poisoned| {
            log::warn!("RwLock of the module registry was poisoned. Recovering read guard.");
            poisoned.into_inner()
        })
    }

    /// Write access to the process-wide registry, e.g. to register user modules.
    pub fn global_mut() -> RwLockWriteGuard<'static, Registry> {
        GLOBAL.write().unwrap_or_else(|poisoned| {
            log::warn!("RwLock of the module registry was poisoned. Recovering write guard.");
            poisoned.into_inner()
        })
    }

    /// Canonical (lookup) form of a module name.
    pub fn canonical(name: &str) -> String {
        name.to_lowercase()
    }

    /// Registers `M` under `M::NAME`.
    ///
    /// Registering the same type again replaces its entry. A different type under an
    /// existing name is kept as a duplicate and becomes the one lookups return.
    pub fn register<M: Prepare + 'static>(&mut self) {
        self.insert(Declaration::of::<M>().entry());
    }

    fn insert(&mut self, entry: Entry) {
        let list = self.entries.entry(Self::canonical(entry.name)).or_default();
        list.retain(|e| e.type_id != entry.type_id);
        list.push(entry);
        log::trace!("Registered module {} as '{}'", entry.type_name, entry.name);
    }

    /// The entry lookups resolve `name` to.
    pub fn lookup(&self, name: &str) -> Option<&Entry> {
        self.entries.get(&Self::canonical(name)).and_then(|list| list.last())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Canonical names of every registered module, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Names claimed by more than one type, with the types in registration order.
    pub fn duplicates(&self) -> Vec<(String, Vec<&'static str>)> {
        self.entries
            .iter()
            .filter(|(_, list)| list.len() > 1)
            .map(|(name, list)| (name.clone(), list.iter().map(|e| e.type_name).collect()))
            .collect()
    }

    /// Lists the registered modules, logging a warning for every duplicate name.
    pub fn describe(&self) -> String {
        for (name, types) in self.duplicates() {
            log::warn!(
                "Module name '{}' is registered by several types ({}); {} is used.",
                name,
                types.join(", "),
                types.last().copied().unwrap_or_default()
            );
        }
        let mut out = String::new();
        for (name, list) in &self.entries {
            if let Some(entry) = list.last() {
                let _ = writeln!(out, "{:<20} {}", name, entry.type_name);
            }
        }
        out
    }

    /// The constructor registered for `name`.
    ///
    /// # Errors
    /// `ModularError::UnknownModule` if nothing is registered under `name`.
    pub fn constructor(&self, name: &str) -> Result<Constructor> {
        self.lookup(name)
            .map(|e| e.constructor)
            .ok_or_else(|| ModularError::UnknownModule(name.to_string()))
    }

    /// Builds the module registered as `name` between `inputs` and `outputs`.
    pub fn create(&self, name: &str, inputs: impl IntoSignals, outputs: impl IntoSignals, config: &Config) -> Result<Module> {
        let constructor = self.constructor(name)?;
        build(constructor, inputs, outputs, config)
    }

    /// Builds a module from a declarative description (`type`, `sig_in`, `sig_out`
    /// and configuration).
    pub fn create_from_spec(&self, spec: &Spec) -> Result<Module> {
        let (name, sig_in, sig_out, config) = spec.split_module()?;
        self.create(&name, sig_in, sig_out, &config)
    }
}

pub(crate) fn build(
    constructor: Constructor,
    inputs: impl IntoSignals,
    outputs: impl IntoSignals,
    config: &Config,
) -> Result<Module> {
    let op = constructor(config)?;
    Ok(Module::from_boxed(inputs.into_signals(), outputs.into_signals(), op))
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
