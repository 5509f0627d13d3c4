// examples/constrained_pipeline.rs
//!
//! Builds a small pipeline from declarative module descriptions, runs the forward
//! response, propagates sensitivities back to the design variables and verifies them
//! against finite differences.

use modular_core::{
    finite_difference, s, AnySignal, FdOptions, Module, ModularError, Network, Signal, SignalConcat,
    Spec,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let x = Signal::with_state("x", vec![0.2, 0.4, 0.6, 0.8]);
    let g = Signal::new("g");
    let total = Signal::new("total");

    // g = 10 * (x[1:3] / 0.5 - 1), then total = sum of (x[0], g, x[3])
    let mut net = Network::from_entries(vec![
        Spec::new()
            .with("type", "Scaling")
            .with("sig_in", x.slice(s![1..3]))
            .with("sig_out", g.clone())
            .with("scaling", 10.0)
            .with("maxval", 0.5),
        Spec::new()
            .with("type", "IterationLog")
            .with("sig_in", g.clone())
            .with("label", "constraint"),
    ])?;
    let joined = SignalConcat::new(vec![AnySignal::from(x.at(0)), AnySignal::from(&g), AnySignal::from(x.at(3))], "joined");
    net.append(Module::create("Sum", joined, &total, &Spec::new())?)?;

    net.response()?;
    println!("g = {:?}, total = {:?}", g.state(), total.state());

    total.set_sensitivity(1.0)?;
    net.sensitivity()?;
    println!("dtotal/dx = {:?}", x.sensitivity());
    net.reset()?;

    let report = finite_difference(
        &mut net,
        &[AnySignal::from(&x)],
        &[AnySignal::from(&total)],
        &FdOptions::default(),
    )?;
    println!(
        "finite-difference check passed on {} derivatives (max error {:e})",
        report.entries.len(),
        report.max_error()
    );

    match Module::create("Missing", (), (), &Spec::new()) {
        Err(ModularError::UnknownModule(name)) => println!("'{}' is not registered", name),
        other => println!("unexpected: {:?}", other.map(|m| m.name().to_string())),
    }
    Ok(())
}
