#![allow(dead_code)]

use modular_core::{Config, ModularError, ModuleOp, Prepare, Registry, Result, Signal, Value};

// Helpers shared by the integration tests.

pub fn state_f64(s: &Signal) -> f64 {
    s.state()
        .and_then(|v| v.as_scalar())
        .expect("signal has no scalar state")
}

pub fn sensitivity_f64(s: &Signal) -> f64 {
    s.sensitivity()
        .and_then(|v| v.as_scalar())
        .expect("signal has no scalar sensitivity")
}

fn scalar(v: &Value) -> Result<f64> {
    v.as_scalar().ok_or_else(|| ModularError::IncompatiblePayload {
        target: "scalar".to_string(),
        increment: v.type_name(),
    })
}

/// y = factor * x
#[derive(Debug)]
pub struct Mul {
    pub factor: f64,
}

impl ModuleOp for Mul {
    fn response(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
        Ok(vec![Value::Scalar(self.factor * scalar(&inputs[0])?)])
    }

    fn sensitivity(&mut self, douts: &[Value]) -> Result<Option<Vec<Option<Value>>>> {
        Ok(Some(vec![Some(Value::Scalar(self.factor * scalar(&douts[0])?))]))
    }

    fn input_arity(&self) -> Option<usize> {
        Some(1)
    }
}

impl Prepare for Mul {
    const NAME: &'static str = "Mul";

    fn prepare(config: &Config) -> Result<Self> {
        Ok(Mul {
            factor: config.get_f64_or("factor", 2.0)?,
        })
    }
}

/// y = x^2 + offset
#[derive(Debug, Default)]
pub struct SquarePlus {
    pub offset: f64,
    x: Option<f64>,
}

impl SquarePlus {
    pub fn new(offset: f64) -> Self {
        SquarePlus { offset, x: None }
    }
}

impl ModuleOp for SquarePlus {
    fn response(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
        let x = scalar(&inputs[0])?;
        self.x = Some(x);
        Ok(vec![Value::Scalar(x * x + self.offset)])
    }

    fn sensitivity(&mut self, douts: &[Value]) -> Result<Option<Vec<Option<Value>>>> {
        let x = self
            .x
            .ok_or_else(|| ModularError::Computation("SquarePlus: no response yet".to_string()))?;
        Ok(Some(vec![Some(Value::Scalar(2.0 * x * scalar(&douts[0])?))]))
    }

    fn reset(&mut self) -> Result<()> {
        self.x = None;
        Ok(())
    }
}

impl Prepare for SquarePlus {
    const NAME: &'static str = "SquarePlus";

    fn prepare(config: &Config) -> Result<Self> {
        Ok(SquarePlus {
            offset: config.get_f64_or("offset", 2.0)?,
            x: None,
        })
    }
}

/// z = a * b
#[derive(Debug, Default)]
pub struct Product {
    cache: Option<(f64, f64)>,
}

impl ModuleOp for Product {
    fn response(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
        let (a, b) = (scalar(&inputs[0])?, scalar(&inputs[1])?);
        self.cache = Some((a, b));
        Ok(vec![Value::Scalar(a * b)])
    }

    fn sensitivity(&mut self, douts: &[Value]) -> Result<Option<Vec<Option<Value>>>> {
        let (a, b) = self
            .cache
            .ok_or_else(|| ModularError::Computation("Product: no response yet".to_string()))?;
        let dz = scalar(&douts[0])?;
        Ok(Some(vec![Some(Value::Scalar(dz * b)), Some(Value::Scalar(dz * a))]))
    }

    fn reset(&mut self) -> Result<()> {
        self.cache = None;
        Ok(())
    }

    fn input_arity(&self) -> Option<usize> {
        Some(2)
    }
}

impl Prepare for Product {
    const NAME: &'static str = "Product";

    fn prepare(_config: &Config) -> Result<Self> {
        Ok(Product::default())
    }
}

/// A registry with the built-ins and the test modules above.
pub fn test_registry() -> Registry {
    let mut registry = Registry::with_builtins();
    registry.register::<Mul>();
    registry.register::<SquarePlus>();
    registry.register::<Product>();
    registry
}
