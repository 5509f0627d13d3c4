use super::*;
use crate::error::Result;
use crate::module::{Module, ModuleOp};
use crate::modules::{Scaling, Sum};
use crate::signal::Signal;

// y = x^2, element-wise
#[derive(Debug, Default)]
struct Square {
    x: Option<Value>,
}

impl ModuleOp for Square {
    fn response(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
        self.x = Some(inputs[0].clone());
        Ok(vec![inputs[0].map(|v| v * v)?])
    }

    fn sensitivity(&mut self, douts: &[Value]) -> Result<Option<Vec<Option<Value>>>> {
        let x = self.x.as_ref().ok_or_else(|| ModularError::Computation("no cache".to_string()))?;
        let dx: Vec<f64> = x.flat()?.iter().zip(douts[0].flat()?).map(|(x, d)| 2.0 * x * d).collect();
        Ok(Some(vec![Some(rebuild(x, dx).map_err(|_| ModularError::Computation("rebuild".to_string()))?)]))
    }
}

// Forward y = x^2 with a wrong backward rule dx = dy
#[derive(Debug, Default)]
struct WrongSquare;

impl ModuleOp for WrongSquare {
    fn response(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
        Ok(vec![inputs[0].map(|v| v * v)?])
    }

    fn sensitivity(&mut self, douts: &[Value]) -> Result<Option<Vec<Option<Value>>>> {
        Ok(Some(vec![Some(douts[0].clone())]))
    }
}

#[test]
fn test_correct_rules_pass() {
    let x = Signal::with_state("x", vec![0.5, -1.5, 2.0]);
    let y = Signal::new("y");
    let z = Signal::new("z");
    let w = Signal::new("w");
    let mut net = Network::from_modules(vec![
        Module::new(&x, &y, Square::default()),
        Module::new(&y, &z, Scaling::new(3.0)),
        Module::new(&z, &w, Sum::new()),
    ]);

    let inputs = [AnySignal::from(x.clone())];
    let outputs = [AnySignal::from(w.clone()), AnySignal::from(y.clone())];
    let report = finite_difference(&mut net, &inputs, &outputs, &FdOptions::default()).unwrap();
    // 1 * 3 (w) + 3 * 3 (y) derivatives
    assert_eq!(report.entries.len(), 12);
    assert!(report.max_error() < 1e-5);

    // States restored, sensitivities cleared
    assert_eq!(x.state(), Some(Value::from(vec![0.5, -1.5, 2.0])));
    assert!(x.sensitivity().is_none());
    assert_eq!(w.state(), Some(Value::Scalar(3.0 * (0.25 + 2.25 + 4.0))));
}

#[test]
fn test_wrong_rule_is_reported() {
    let x = Signal::with_state("x", 3.0);
    let y = Signal::new("y");
    let mut net = Network::from_modules(vec![Module::new(&x, &y, WrongSquare)]);

    let err = finite_difference(&mut net, &[AnySignal::from(x)], &[AnySignal::from(y)], &FdOptions::default()).unwrap_err();
    match err {
        FdError::GradientMismatch {
            analytical, numerical, ..
        } => {
            approx::assert_relative_eq!(analytical, 1.0);
            approx::assert_relative_eq!(numerical, 6.0, epsilon = 1e-4);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_input_state() {
    let x = Signal::new("x");
    let y = Signal::new("y");
    let mut net = Network::from_modules(vec![Module::new(&x, &y, Scaling::new(1.0))]);
    let err = finite_difference(&mut net, &[AnySignal::from(x)], &[AnySignal::from(y)], &FdOptions::default()).unwrap_err();
    assert!(matches!(err, FdError::Network(ModularError::StateUnset { .. })));
}
