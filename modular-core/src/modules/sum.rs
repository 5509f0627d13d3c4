use crate::error::{ModularError, Result};
use crate::module::spec::Config;
use crate::module::{ModuleOp, Prepare};
use crate::payload::{Array, Value};

/// Sum of all elements of the input, as a scalar.
#[derive(Debug, Clone, Default)]
pub struct Sum {
    // Shape of the last input, `None` before the first response
    input_shape: Option<Vec<usize>>,
}

impl Sum {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prepare for Sum {
    const NAME: &'static str = "Sum";

    fn prepare(_config: &Config) -> Result<Self> {
        Ok(Sum::new())
    }
}

impl ModuleOp for Sum {
    fn response(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
        let x = &inputs[0];
        let total = x.flat()?.iter().sum::<f64>();
        self.input_shape = x.shape();
        Ok(vec![Value::Scalar(total)])
    }

    fn sensitivity(&mut self, douts: &[Value]) -> Result<Option<Vec<Option<Value>>>> {
        let shape = self
            .input_shape
            .as_ref()
            .ok_or_else(|| ModularError::Computation("Sum: sensitivity requested before response".to_string()))?;
        let dy = douts[0].as_scalar().ok_or_else(|| ModularError::IncompatiblePayload {
            target: "scalar".to_string(),
            increment: douts[0].type_name(),
        })?;
        let dx = if shape.is_empty() {
            Value::Scalar(dy)
        } else {
            Value::Array(Array::full(shape, dy))
        };
        Ok(Some(vec![Some(dx)]))
    }

    fn reset(&mut self) -> Result<()> {
        self.input_shape = None;
        Ok(())
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

crate::register_module!(Sum);

#[cfg(test)]
#[path = "sum_test.rs"]
mod tests;
