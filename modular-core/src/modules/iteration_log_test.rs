use super::*;
use crate::module::spec::Spec;
use crate::module::Module;
use crate::network::Network;
use crate::signal::Signal;

#[test]
fn test_history_and_limits() {
    let a = Signal::with_state("a", 2.0);
    let b = Signal::with_state("b", vec![-1.0, 4.0]);
    let mut net = Network::from_modules(vec![Module::new(vec![a.clone(), b.clone()], (), IterationLog::new("obj"))]);

    net.response().unwrap();
    a.set_state(3.0);
    net.response().unwrap();

    let log = net.modules()[0].op::<IterationLog>().unwrap();
    assert_eq!(log.tags(), &["a".to_string(), "b".to_string()]);
    assert_eq!(log.iterations(), 2);
    assert_eq!(log.history(), &[vec![2.0, 3.0], vec![-1.0, 4.0, -1.0, 4.0]]);
    assert_eq!(log.limits(), Some((-1.0, 4.0)));
}

#[test]
fn test_observer_has_no_sensitivity_rule() {
    let a = Signal::with_state("a", 1.0);
    let mut m = Module::new(&a, (), IterationLog::default());
    m.response().unwrap();
    m.sensitivity().unwrap();
    assert!(a.sensitivity().is_none());
}

#[test]
fn test_prepare_label() {
    let log = IterationLog::prepare(&Spec::new()).unwrap();
    assert_eq!(log.label, "iteration");
    let log = IterationLog::prepare(&Spec::new().with("label", "compliance")).unwrap();
    assert_eq!(log.label, "compliance");
    assert!(IterationLog::prepare(&Spec::new().with("label", 3.0)).is_err());
    assert_eq!(log.limits(), None);
}

#[test]
fn test_tags_of_views() {
    let x = Signal::with_state("x", vec![1.0, 2.0, 3.0]);
    let spec = Spec::new()
        .with("type", "IterationLog")
        .with("sig_in", vec![x.at(-1), x.slice(crate::s![0..2])]);
    let m = Module::from_spec(&spec).unwrap();
    let log = m.op::<IterationLog>().unwrap();
    assert_eq!(log.tags(), &["x[-1]".to_string(), "x[0:2]".to_string()]);
}
