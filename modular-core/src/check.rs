// src/check.rs
// Finite-difference verification of module sensitivity rules.

use thiserror::Error;

use crate::error::ModularError;
use crate::network::Network;
use crate::payload::{Array, Value};
use crate::signal::AnySignal;

/// Error type specifically for finite-difference checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FdError {
    #[error("Sensitivity check failed for d{output}[{output_element}]/d{input}[{element}]: analytical {analytical:?} != numerical {numerical:?} (error {error:?})")]
    GradientMismatch {
        output: String,
        output_element: usize,
        input: String,
        element: usize,
        analytical: f64,
        numerical: f64,
        error: f64,
    },

    #[error("Signal '{tag}' has no state to check")]
    MissingState { tag: String },

    #[error("Numerical derivative is NaN or infinite for d{output}[{output_element}]/d{input}[{element}]")]
    NumericalNaNOrInfinite {
        output: String,
        output_element: usize,
        input: String,
        element: usize,
    },

    #[error("Network error during finite-difference check: {0}")]
    Network(#[from] ModularError),
}

/// Settings of [`finite_difference`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FdOptions {
    /// Perturbation applied to every input element.
    pub step: f64,
    /// Accepted relative (or, for values below one, absolute) difference.
    pub tolerance: f64,
    /// Central differences (two responses per element) instead of forward differences.
    pub central: bool,
}

impl Default for FdOptions {
    fn default() -> Self {
        FdOptions {
            step: 1e-6,
            tolerance: 1e-5,
            central: true,
        }
    }
}

/// One compared derivative.
#[derive(Debug, Clone, PartialEq)]
pub struct FdEntry {
    pub output: String,
    pub output_element: usize,
    pub input: String,
    pub element: usize,
    pub analytical: f64,
    pub numerical: f64,
    pub error: f64,
}

/// Result of a successful check.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FdReport {
    pub entries: Vec<FdEntry>,
}

impl FdReport {
    /// Largest error over all entries (0 for an empty report).
    pub fn max_error(&self) -> f64 {
        self.entries.iter().map(|e| e.error).fold(0.0, f64::max)
    }
}

fn state_of(signal: &AnySignal) -> Result<Value, FdError> {
    signal
        .state()?
        .ok_or_else(|| FdError::MissingState { tag: signal.tag() })
}

// A value of the same kind and shape as `template` holding `data`
fn rebuild(template: &Value, data: Vec<f64>) -> Result<Value, FdError> {
    match template {
        Value::Scalar(_) => Ok(Value::Scalar(data[0])),
        other => {
            let shape = other.shape().unwrap_or_default();
            Ok(Value::Array(Array::from_vec(data, shape)?))
        }
    }
}

fn outputs_flat(outputs: &[AnySignal]) -> Result<Vec<Vec<f64>>, FdError> {
    outputs
        .iter()
        .map(|o| -> Result<Vec<f64>, FdError> { Ok(state_of(o)?.flat()?) })
        .collect()
}

// |a - n| scaled by the larger magnitude, or absolute below one
fn scaled_error(analytical: f64, numerical: f64) -> f64 {
    (analytical - numerical).abs() / analytical.abs().max(numerical.abs()).max(1.0)
}

/// Compares the sensitivities of `network` against finite differences.
///
/// For every element of every output, the network's sensitivity pass is seeded with
/// a unit gradient on that element only, giving the analytical derivatives with
/// respect to every input element. Every input element is then perturbed by
/// `options.step` and the network response re-run to obtain the numerical
/// derivatives. Input states are restored and sensitivities cleared afterwards.
///
/// # Errors
/// * `FdError::GradientMismatch` for the worst pair exceeding `options.tolerance`.
/// * `FdError::Network` for any failure of the network itself.
pub fn finite_difference(
    network: &mut Network,
    inputs: &[AnySignal],
    outputs: &[AnySignal],
    options: &FdOptions,
) -> Result<FdReport, FdError> {
    network.response()?;
    let input_states = inputs.iter().map(state_of).collect::<Result<Vec<_>, _>>()?;
    let output_states = outputs.iter().map(state_of).collect::<Result<Vec<_>, _>>()?;

    // analytical[o][j][i][k] = d outputs[o][j] / d inputs[i][k]
    let mut analytical = Vec::with_capacity(outputs.len());
    for (o, output) in outputs.iter().enumerate() {
        let n_out = output_states[o].flat()?.len();
        let mut per_element = Vec::with_capacity(n_out);
        for j in 0..n_out {
            // Reset hooks may drop forward caches, so every pass starts from a fresh response
            network.reset()?;
            for s in inputs.iter().chain(outputs) {
                s.reset(false)?;
            }
            network.response()?;
            let mut seed = vec![0.0; n_out];
            seed[j] = 1.0;
            output.set_sensitivity(rebuild(&output_states[o], seed)?)?;
            network.sensitivity()?;

            let grads = inputs
                .iter()
                .zip(&input_states)
                .map(|(s, x)| -> Result<Vec<f64>, FdError> {
                    match s.sensitivity()? {
                        Some(v) => Ok(v.flat()?),
                        None => Ok(vec![0.0; x.flat()?.len()]),
                    }
                })
                .collect::<Result<Vec<_>, FdError>>()?;
            per_element.push(grads);
        }
        analytical.push(per_element);
    }
    network.reset()?;

    let base = outputs_flat(outputs)?;
    let mut report = FdReport::default();
    for (i, input) in inputs.iter().enumerate() {
        let x0 = input_states[i].flat()?;
        for k in 0..x0.len() {
            let mut perturbed = x0.clone();
            perturbed[k] += options.step;
            input.set_state(rebuild(&input_states[i], perturbed)?)?;
            network.response()?;
            let plus = outputs_flat(outputs)?;

            let (minus, span) = if options.central {
                let mut perturbed = x0.clone();
                perturbed[k] -= options.step;
                input.set_state(rebuild(&input_states[i], perturbed)?)?;
                network.response()?;
                (outputs_flat(outputs)?, 2.0 * options.step)
            } else {
                (base.clone(), options.step)
            };
            input.set_state(input_states[i].clone())?;

            for (o, output) in outputs.iter().enumerate() {
                for j in 0..plus[o].len() {
                    let numerical = (plus[o][j] - minus[o][j]) / span;
                    if !numerical.is_finite() {
                        return Err(FdError::NumericalNaNOrInfinite {
                            output: output.tag(),
                            output_element: j,
                            input: input.tag(),
                            element: k,
                        });
                    }
                    let exact = analytical[o][j][i][k];
                    report.entries.push(FdEntry {
                        output: output.tag(),
                        output_element: j,
                        input: input.tag(),
                        element: k,
                        analytical: exact,
                        numerical,
                        error: scaled_error(exact, numerical),
                    });
                }
            }
        }
    }
    network.response()?;

    let worst = report
        .entries
        .iter()
        .filter(|e| {
            !approx::relative_eq!(
                e.analytical,
                e.numerical,
                epsilon = options.tolerance,
                max_relative = options.tolerance
            )
        })
        .max_by(|a, b| a.error.total_cmp(&b.error));
    if let Some(e) = worst {
        return Err(FdError::GradientMismatch {
            output: e.output.clone(),
            output_element: e.output_element,
            input: e.input.clone(),
            element: e.element,
            analytical: e.analytical,
            numerical: e.numerical,
            error: e.error,
        });
    }
    log::debug!(
        "Finite-difference check passed on {} derivatives (max error {:e})",
        report.entries.len(),
        report.max_error()
    );
    Ok(report)
}

#[cfg(test)]
#[path = "check_test.rs"]
mod tests;
