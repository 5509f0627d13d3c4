use super::*;
use crate::payload::Value;
use crate::signal::Signal;

#[derive(Debug)]
struct Double;

impl ModuleOp for Double {
    fn response(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
        Ok(vec![inputs[0].map(|v| 2.0 * v)?])
    }
}

impl Prepare for Double {
    const NAME: &'static str = "Double";

    fn prepare(_config: &Config) -> Result<Self> {
        Ok(Double)
    }
}

// Same name, different type
#[derive(Debug)]
struct OtherDouble;

impl ModuleOp for OtherDouble {
    fn response(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
        Ok(vec![inputs[0].map(|v| -2.0 * v)?])
    }
}

impl Prepare for OtherDouble {
    const NAME: &'static str = "double";

    fn prepare(_config: &Config) -> Result<Self> {
        Ok(OtherDouble)
    }
}

#[derive(Debug)]
struct NeedsFactor(f64);

impl ModuleOp for NeedsFactor {
    fn response(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
        let factor = self.0;
        Ok(vec![inputs[0].map(|v| factor * v)?])
    }
}

impl Prepare for NeedsFactor {
    const NAME: &'static str = "NeedsFactor";

    fn prepare(config: &Config) -> Result<Self> {
        Ok(NeedsFactor(config.require_f64("factor")?))
    }
}

#[test]
fn test_builtins() {
    let registry = Registry::with_builtins();
    assert_eq!(registry.names(), vec!["iterationlog", "scaling", "sum"]);
    assert!(registry.contains("Scaling"));
    assert!(registry.contains("SUM"));
    assert!(registry.duplicates().is_empty());
    assert!(Registry::new().names().is_empty());
}

#[test]
fn test_create_case_insensitive() {
    let mut registry = Registry::new();
    registry.register::<Double>();
    let x = Signal::with_state("x", 1.5);
    let y = Signal::new("y");
    let mut m = registry.create("dOuBlE", &x, &y, &Config::new()).unwrap();
    m.response().unwrap();
    assert_eq!(y.state(), Some(Value::Scalar(3.0)));

    let err = registry.create("triple", &x, &y, &Config::new()).unwrap_err();
    assert_eq!(err, ModularError::UnknownModule("triple".to_string()));
}

#[test]
fn test_reregistering_same_type_replaces() {
    let mut registry = Registry::new();
    registry.register::<Double>();
    registry.register::<Double>();
    assert!(registry.duplicates().is_empty());
}

#[test]
fn test_duplicate_names_last_wins() {
    let mut registry = Registry::new();
    registry.register::<Double>();
    registry.register::<OtherDouble>();

    let duplicates = registry.duplicates();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].0, "double");
    assert_eq!(duplicates[0].1.len(), 2);
    assert_eq!(registry.lookup("Double").map(|e| e.name), Some("double"));

    let x = Signal::with_state("x", 1.0);
    let y = Signal::new("y");
    let mut m = registry.create("double", &x, &y, &Config::new()).unwrap();
    m.response().unwrap();
    assert_eq!(y.state(), Some(Value::Scalar(-2.0)));

    // Describing warns but still lists one line per name
    let listing = registry.describe();
    assert_eq!(listing.lines().count(), 1);
    assert!(listing.contains("OtherDouble"));
}

#[test]
fn test_preparation_errors_propagate() {
    let mut registry = Registry::new();
    registry.register::<NeedsFactor>();
    let err = registry
        .create("needsfactor", (), (), &Config::new())
        .unwrap_err();
    assert_eq!(err, ModularError::MissingKey { key: "factor".to_string() });

    let spec = Spec::new()
        .with("type", "NeedsFactor")
        .with("sig_in", Signal::with_state("x", 2.0))
        .with("sig_out", Signal::new("y"))
        .with("factor", 0.5);
    let m = registry.create_from_spec(&spec).unwrap();
    assert_eq!(m.op::<NeedsFactor>().map(|op| op.0), Some(0.5));
}

#[test]
fn test_global_registry() {
    Registry::global_mut().register::<NeedsFactor>();
    assert!(Registry::global().contains("scaling"));
    assert!(Registry::global().contains("needsfactor"));

    let x = Signal::with_state("x", 2.0);
    let y = Signal::new("y");
    let mut m = Module::create("NeedsFactor", &x, &y, &Config::new().with("factor", 3.0)).unwrap();
    m.response().unwrap();
    assert_eq!(y.state(), Some(Value::Scalar(6.0)));
}

// Declared, never registered by hand
#[derive(Debug)]
struct Halve;

impl ModuleOp for Halve {
    fn response(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
        Ok(vec![inputs[0].map(|v| 0.5 * v)?])
    }
}

impl Prepare for Halve {
    const NAME: &'static str = "Halve";

    fn prepare(_config: &Config) -> Result<Self> {
        Ok(Halve)
    }
}

crate::register_module!(Halve);

#[test]
fn test_declared_modules_are_registered() {
    let declared = Registry::with_declared();
    for name in ["scaling", "sum", "iterationlog", "halve"] {
        assert!(declared.contains(name), "{} is not declared", name);
    }
    assert!(!declared.contains("double"));
    assert!(declared.duplicates().is_empty());

    let x = Signal::with_state("x", 3.0);
    let y = Signal::new("y");
    let mut m = Module::create("halve", &x, &y, &Config::new()).unwrap();
    m.response().unwrap();
    assert_eq!(y.state(), Some(Value::Scalar(1.5)));
    assert!(m.op::<Halve>().is_some());
}
