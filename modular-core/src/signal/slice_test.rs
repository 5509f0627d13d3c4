use super::*;
use crate::error::ErrorKind;
use crate::payload::Array;
use crate::s;

fn grid() -> Signal {
    let data = (0..12).map(|x| x as f64).collect();
    Signal::with_state("grid", Array::from_vec(data, vec![3, 4]).unwrap())
}

#[test]
fn test_tag() {
    let view = grid().slice(s![0, 2..8]);
    assert_eq!(view.tag(), "grid[0, 2:8]");
}

#[test]
fn test_read_region() {
    let base = grid();
    assert_eq!(
        base.slice(s![.., 1]).state().unwrap(),
        Some(Value::from(vec![1.0, 5.0, 9.0]))
    );
    assert_eq!(base.slice(s![2, 3]).state().unwrap(), Some(Value::Scalar(11.0)));

    assert!(Signal::new("empty").at(0).state().unwrap().is_none());
}

#[test]
fn test_write_through_base() {
    let base = grid();
    let view = base.slice(s![1, 1..3]);
    view.set_state(vec![-1.0, -2.0]).unwrap();
    assert_eq!(view.state().unwrap(), Some(Value::from(vec![-1.0, -2.0])));
    assert_eq!(
        base.state().unwrap().select(&s![1]).unwrap(),
        Value::from(vec![4.0, -1.0, -2.0, 7.0])
    );

    let err = Signal::new("empty").at(0).set_state(1.0).unwrap_err();
    assert!(matches!(err, ModularError::StateUnset { .. }));
}

#[test]
fn test_scalar_base_whole_value() {
    let base = Signal::with_state("s", 2.0);
    let view = base.at(0);
    assert_eq!(view.state().unwrap(), Some(Value::Scalar(2.0)));
    view.set_state(5.0).unwrap();
    assert_eq!(base.state(), Some(Value::Scalar(5.0)));

    view.add_sensitivity(1.5).unwrap();
    view.add_sensitivity(1.0).unwrap();
    assert_eq!(base.sensitivity(), Some(Value::Scalar(2.5)));
}

#[test]
fn test_add_sensitivity_allocates_base() {
    let base = grid();
    let view = base.slice(s![.., 0]);
    view.add_sensitivity(None).unwrap();
    assert!(base.sensitivity().is_none());

    view.add_sensitivity(vec![1.0, 2.0, 3.0]).unwrap();
    view.add_sensitivity(1.0).unwrap();
    let sens = base.sensitivity().unwrap();
    assert_eq!(sens.shape(), Some(vec![3, 4]));
    assert_eq!(sens.select(&s![.., 0]).unwrap(), Value::from(vec![2.0, 3.0, 4.0]));
    // Outside the region nothing was touched
    assert_eq!(sens.select(&s![.., 1..]).unwrap(), Value::Array(Array::zeros(&[3, 3])));
}

#[test]
fn test_overlapping_views_accumulate() {
    let base = Signal::with_state("x", Array::zeros(&[4]));
    base.slice(s![0..3]).add_sensitivity(1.0).unwrap();
    base.slice(s![1..4]).add_sensitivity(1.0).unwrap();
    base.slice(s![vec![0, 3]]).add_sensitivity(vec![10.0, 20.0]).unwrap();
    assert_eq!(base.sensitivity(), Some(Value::from(vec![11.0, 2.0, 2.0, 21.0])));
}

#[test]
fn test_set_sensitivity_and_reset() {
    let base = grid();
    let view = base.slice(s![0]);
    view.set_sensitivity(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    base.slice(s![1]).set_sensitivity(9.0).unwrap();
    assert_eq!(view.sensitivity().unwrap(), Some(Value::from(vec![1.0, 2.0, 3.0, 4.0])));

    view.reset().unwrap();
    assert_eq!(view.sensitivity().unwrap(), Some(Value::Array(Array::zeros(&[4]))));
    // The rest of the base keeps its gradient
    assert_eq!(
        base.sensitivity().unwrap().select(&s![1]).unwrap(),
        Value::Array(Array::full(&[4], 9.0))
    );

    base.slice(s![1]).set_sensitivity(None).unwrap();
    assert!(base.sensitivity().unwrap().is_zero());
}

#[test]
fn test_sensitivity_without_state() {
    let err = Signal::new("empty").at(0).add_sensitivity(1.0).unwrap_err();
    assert!(matches!(err, ModularError::StateUnset { .. }));
    assert_eq!(err.kind(), ErrorKind::Type);
}

#[test]
fn test_shape_mismatch_through_view() {
    let base = grid();
    let err = base.slice(s![0]).add_sensitivity(vec![1.0, 2.0]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);
}
