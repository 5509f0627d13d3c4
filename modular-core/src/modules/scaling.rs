use crate::error::{ModularError, Result};
use crate::module::spec::Config;
use crate::module::{ModuleOp, Prepare};
use crate::payload::Value;

/// Affine scaling of a response, typically used to normalise objectives and
/// constraints before handing them to an optimizer.
///
/// * default: `y = scaling * x`
/// * with `maxval`: `y = scaling * (x / maxval - 1)`, negative while `x < maxval`
/// * with `minval`: `y = scaling * (1 - x / minval)`, negative while `x > minval`
#[derive(Debug, Clone, PartialEq)]
pub struct Scaling {
    scaling: f64,
    maxval: Option<f64>,
    minval: Option<f64>,
}

impl Scaling {
    /// Creates a plain scaling `y = scaling * x`.
    pub fn new(scaling: f64) -> Self {
        Scaling {
            scaling,
            maxval: None,
            minval: None,
        }
    }

    /// Upper-bound constraint `scaling * (x / maxval - 1)`.
    pub fn with_maxval(scaling: f64, maxval: f64) -> Self {
        Scaling {
            scaling,
            maxval: Some(maxval),
            minval: None,
        }
    }

    /// Lower-bound constraint `scaling * (1 - x / minval)`.
    pub fn with_minval(scaling: f64, minval: f64) -> Self {
        Scaling {
            scaling,
            maxval: None,
            minval: Some(minval),
        }
    }

    /// `dy/dx`.
    fn slope(&self) -> f64 {
        match (self.maxval, self.minval) {
            (Some(max), _) => self.scaling / max,
            (None, Some(min)) => -self.scaling / min,
            (None, None) => self.scaling,
        }
    }
}

impl Default for Scaling {
    fn default() -> Self {
        Scaling::new(100.0)
    }
}

impl Prepare for Scaling {
    const NAME: &'static str = "Scaling";

    fn prepare(config: &Config) -> Result<Self> {
        let scaling = config.get_f64_or("scaling", 100.0)?;
        let maxval = config.get_f64("maxval")?;
        let minval = config.get_f64("minval")?;
        if maxval.is_some() && minval.is_some() {
            return Err(ModularError::InvalidConfig {
                key: "maxval".to_string(),
                expected: "either maxval or minval, not both".to_string(),
            });
        }
        for (key, bound) in [("maxval", maxval), ("minval", minval)] {
            if bound == Some(0.0) {
                return Err(ModularError::InvalidConfig {
                    key: key.to_string(),
                    expected: "a non-zero bound".to_string(),
                });
            }
        }
        Ok(Scaling {
            scaling,
            maxval,
            minval,
        })
    }
}

impl ModuleOp for Scaling {
    fn response(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
        let x = &inputs[0];
        let y = match (self.maxval, self.minval) {
            (Some(max), _) => x.map(|v| self.scaling * (v / max - 1.0))?,
            (None, Some(min)) => x.map(|v| self.scaling * (1.0 - v / min))?,
            (None, None) => x.map(|v| self.scaling * v)?,
        };
        Ok(vec![y])
    }

    fn sensitivity(&mut self, douts: &[Value]) -> Result<Option<Vec<Option<Value>>>> {
        let slope = self.slope();
        Ok(Some(vec![Some(douts[0].map(|dy| dy * slope)?)]))
    }

    fn input_arity(&self) -> Option<usize> {
        Some(1)
    }

    fn output_arity(&self) -> Option<usize> {
        Some(1)
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

crate::register_module!(Scaling);

#[cfg(test)]
#[path = "scaling_test.rs"]
mod tests;
