use super::*;
use crate::error::ErrorKind;
use crate::payload::{Indexable, Payload};
use crate::s;
use approx::assert_relative_eq;
use std::any::Any;

// Payload that can be neither accumulated nor zeroed
#[derive(Debug, Clone)]
struct Opaque(f64);

impl Payload for Opaque {
    fn clone_payload(&self) -> Box<dyn Payload> {
        Box::new(self.clone())
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn test_init() {
    let s = Signal::new("foo");
    assert_eq!(s.tag(), "foo");
    assert!(s.state().is_none());
    assert!(s.sensitivity().is_none());

    let s = Signal::with_state("x", 1.5);
    assert_eq!(s.state(), Some(Value::Scalar(1.5)));
    assert!(s.sensitivity().is_none());

    let s = Signal::with_values("y", vec![1.0, 2.0], vec![0.5, 0.5]);
    assert_eq!(s.sensitivity(), Some(Value::from(vec![0.5, 0.5])));
}

#[test]
fn test_clones_alias_storage() {
    let a = Signal::new("a");
    let b = a.clone();
    b.set_state(3.0);
    assert_eq!(a.state(), Some(Value::Scalar(3.0)));
    assert!(a.ptr_eq(&b));
    assert_eq!(a, b);
    assert_ne!(a, Signal::with_state("a", 3.0));

    b.set_tag("renamed");
    assert_eq!(a.tag(), "renamed");
}

#[test]
fn test_set_sensitivity_requires_state() {
    let s = Signal::new("empty");
    let err = s.set_sensitivity(1.0).unwrap_err();
    assert!(matches!(err, ModularError::StateUnset { .. }));
    assert_eq!(err.kind(), ErrorKind::Type);

    // Clearing is always allowed
    s.set_sensitivity(None).unwrap();

    s.set_state(2.0);
    s.set_sensitivity(4.0).unwrap();
    assert_eq!(s.sensitivity(), Some(Value::Scalar(4.0)));
}

#[test]
fn test_add_sensitivity_scalar() {
    let s = Signal::with_state("x", 1.0);
    s.add_sensitivity(None).unwrap();
    assert!(s.sensitivity().is_none());

    s.add_sensitivity(1.5).unwrap();
    s.add_sensitivity(2.0).unwrap();
    assert_relative_eq!(s.sensitivity().unwrap().as_scalar().unwrap(), 3.5);
}

#[test]
fn test_add_sensitivity_array() {
    let s = Signal::with_state("x", Array::rand(&[3, 3]));
    // First contribution is broadcast into zeros shaped like the state
    s.add_sensitivity(1.0).unwrap();
    assert_eq!(s.sensitivity(), Some(Value::Array(Array::ones(&[3, 3]))));

    s.add_sensitivity(Array::full(&[3, 3], 2.0)).unwrap();
    assert_eq!(s.sensitivity(), Some(Value::Array(Array::full(&[3, 3], 3.0))));

    let err = s.add_sensitivity(Array::rand(&[4, 4])).unwrap_err();
    assert!(matches!(err, ModularError::ShapeMismatch { .. }));
    assert_eq!(err.kind(), ErrorKind::Value);
}

#[test]
fn test_add_sensitivity_incompatible() {
    let s = Signal::with_state("x", vec![1.0, 2.0]);
    s.add_sensitivity(vec![1.0, 1.0]).unwrap();
    let err = s.add_sensitivity(Value::object(Opaque(1.0))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);

    let o = Signal::with_state("obj", Value::object(Opaque(0.0)));
    o.add_sensitivity(Value::object(Opaque(1.0))).unwrap();
    let err = o.add_sensitivity(Value::object(Opaque(2.0))).unwrap_err();
    assert!(matches!(err, ModularError::MissingCapability { .. }));
}

#[test]
fn test_accumulation_order_insensitive() {
    let v1 = Value::from(vec![0.1, 0.2, 0.3]);
    let v2 = Value::from(vec![1.0, -2.0, 4.0]);

    let a = Signal::with_state("a", Array::zeros(&[3]));
    a.add_sensitivity(&v1).unwrap();
    a.add_sensitivity(&v2).unwrap();

    let b = Signal::with_state("b", Array::zeros(&[3]));
    let mut combined = v1.clone();
    combined.accumulate(&v2).unwrap();
    b.add_sensitivity(combined).unwrap();

    let (sa, sb) = (a.sensitivity().unwrap(), b.sensitivity().unwrap());
    for (x, y) in sa.flat().unwrap().iter().zip(sb.flat().unwrap()) {
        assert_relative_eq!(*x, y, epsilon = 1e-12);
    }
}

#[test]
fn test_reset() {
    let s = Signal::with_state("x", vec![1.0, 2.0]);
    s.add_sensitivity(vec![3.0, 4.0]).unwrap();
    s.reset(false);
    assert!(s.sensitivity().is_none());

    s.add_sensitivity(vec![3.0, 4.0]).unwrap();
    s.reset(true);
    assert_eq!(s.sensitivity(), Some(Value::from(vec![0.0, 0.0])));

    // Nothing to keep
    let empty = Signal::with_state("y", 1.0);
    empty.reset(true);
    assert!(empty.sensitivity().is_none());
}

#[test]
fn test_reset_keep_allocation_falls_back_to_clear() {
    let s = Signal::with_values("obj", Value::object(Opaque(1.0)), Value::object(Opaque(2.0)));
    s.reset(true);
    assert!(s.sensitivity().is_none());
}

#[test]
fn test_make_signals() {
    let sigs = make_signals(&["a", "b", "c"]);
    assert_eq!(sigs.len(), 3);
    assert_eq!(sigs["b"].tag(), "b");
    assert!(sigs.values().all(|s| s.state().is_none()));
}

#[test]
fn test_slice_1d() {
    let s = Signal::with_state("x", Array::zeros(&[100]));
    let view = s.slice(s![4..9]);
    view.set_state(vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
    assert_eq!(
        s.state().unwrap().select(&s![4..9]).unwrap(),
        Value::from(vec![1.0, 2.0, 3.0, 4.0, 5.0])
    );

    let single = s.at(5);
    assert_eq!(single.state().unwrap(), Some(Value::Scalar(2.0)));
}

#[test]
fn test_slice_2d_with_fancy() {
    let s = Signal::with_state("x", Array::zeros(&[10, 10]));
    let view = s.slice(s![vec![1, 2, 4], 1]);
    view.set_state(vec![7.0, 8.0, 9.0]).unwrap();
    let state = s.state().unwrap();
    assert_eq!(state.select(&s![1, 1]).unwrap(), Value::Scalar(7.0));
    assert_eq!(state.select(&s![2, 1]).unwrap(), Value::Scalar(8.0));
    assert_eq!(state.select(&s![4, 1]).unwrap(), Value::Scalar(9.0));
    assert_eq!(state.select(&s![3, 1]).unwrap(), Value::Scalar(0.0));
}

#[test]
fn test_slice_errors() {
    let s = Signal::with_state("x", Array::zeros(&[10, 10]));
    let err = s.slice(s![2, 3, 4]).state().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Index);

    let err = s.slice(s![vec![1, 2, 493], 1]).state().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Index);

    let o = Signal::with_state("obj", Value::object(Opaque(1.0)));
    let err = o.at(0).state().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
}
