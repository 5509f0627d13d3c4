// src/payload/mod.rs
// Payloads carried by signals and the capabilities the graph core relies on.

pub mod array;
pub mod utils;

use std::any::Any;
use std::fmt::Debug;

use crate::error::{Capability, ModularError, Result};
use crate::index::{resolve, SliceArg};

pub use array::Array;

/// In-place addition (`+=`).
pub trait Accumulable {
    /// Adds `increment` into `self`.
    fn accumulate(&mut self, increment: &Value) -> Result<()>;
}

/// In-place zero fill.
pub trait Zeroable {
    fn zero_fill(&mut self) -> Result<()>;
}

/// Indexed read, write and accumulate.
pub trait Indexable {
    /// Returns a copy of the indexed region.
    fn select(&self, index: &[SliceArg]) -> Result<Value>;
    /// Overwrites the indexed region with `value` (broadcast into the region).
    fn assign(&mut self, index: &[SliceArg], value: &Value) -> Result<()>;
    /// Adds `increment` into the indexed region (broadcast into the region).
    fn accumulate_at(&mut self, index: &[SliceArg], increment: &Value) -> Result<()>;
}

/// Opaque user payload stored in [`Value::Object`].
///
/// Only `clone_payload` and `as_any` are required. Each capability the graph core may
/// need is advertised by overriding the matching `as_*` accessor; the defaults report
/// the capability as absent, which surfaces as `ModularError::MissingCapability`.
pub trait Payload: Debug + Send + Sync + 'static {
    fn clone_payload(&self) -> Box<dyn Payload>;

    fn as_any(&self) -> &dyn Any;

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn as_accumulable(&mut self) -> Option<&mut dyn Accumulable> {
        None
    }

    fn as_zeroable(&mut self) -> Option<&mut dyn Zeroable> {
        None
    }

    fn as_indexable(&self) -> Option<&dyn Indexable> {
        None
    }

    fn as_indexable_mut(&mut self) -> Option<&mut dyn Indexable> {
        None
    }
}

/// A value carried in a signal's `state` or `sensitivity`.
#[derive(Debug)]
pub enum Value {
    /// A plain number.
    Scalar(f64),
    /// A dense array (0-d arrays included).
    Array(Array),
    /// Any other payload.
    Object(Box<dyn Payload>),
}

impl Clone for Value {
    fn clone(&self) -> Self {
        match self {
            Value::Scalar(v) => Value::Scalar(*v),
            Value::Array(a) => Value::Array(a.clone()),
            Value::Object(o) => Value::Object(o.clone_payload()),
        }
    }
}

impl PartialEq for Value {
    /// Numeric values compare by content; objects never compare equal.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    pub fn object<P: Payload>(payload: P) -> Self {
        Value::Object(Box::new(payload))
    }

    /// Short description of the payload kind, used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            Value::Scalar(_) => "scalar".to_string(),
            Value::Array(a) => format!("array{:?}", a.shape()),
            Value::Object(o) => o.type_name().to_string(),
        }
    }

    /// The number held by a scalar or a 0-d array.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Array(a) if a.ndim() == 0 => Some(a.data()[0]),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object<T: 'static>(&self) -> Option<&T> {
        match self {
            Value::Object(o) => o.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Shape of numeric values (`[]` for scalars); `None` for objects.
    pub fn shape(&self) -> Option<Vec<usize>> {
        match self {
            Value::Scalar(_) => Some(vec![]),
            Value::Array(a) => Some(a.shape().to_vec()),
            Value::Object(_) => None,
        }
    }

    pub fn numel(&self) -> Option<usize> {
        match self {
            Value::Scalar(_) => Some(1),
            Value::Array(a) => Some(a.numel()),
            Value::Object(_) => None,
        }
    }

    fn not_numeric(&self, capability: Capability) -> ModularError {
        ModularError::MissingCapability {
            capability,
            payload: self.type_name(),
        }
    }

    /// Numeric value as an array (scalars become 0-d arrays).
    pub fn to_array(&self) -> Result<Array> {
        match self {
            Value::Scalar(v) => Ok(Array::scalar(*v)),
            Value::Array(a) => Ok(a.clone()),
            Value::Object(_) => Err(self.not_numeric(Capability::Index)),
        }
    }

    /// Flat row-major elements of a numeric value.
    pub fn flat(&self) -> Result<Vec<f64>> {
        match self {
            Value::Scalar(v) => Ok(vec![*v]),
            Value::Array(a) => Ok(a.data().to_vec()),
            Value::Object(_) => Err(self.not_numeric(Capability::Index)),
        }
    }

    /// Applies `f` element-wise to a numeric value, keeping its kind and shape.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Result<Value> {
        match self {
            Value::Scalar(v) => Ok(Value::Scalar(f(*v))),
            Value::Array(a) => Ok(Value::Array(a.map(f))),
            Value::Object(o) => Err(ModularError::IncompatiblePayload {
                target: o.type_name().to_string(),
                increment: "element-wise function".to_string(),
            }),
        }
    }

    /// A zero of the same kind and shape.
    ///
    /// Objects are cloned and zero-filled, which requires the `Zeroable` capability.
    pub fn zeros_like(&self) -> Result<Value> {
        let mut zero = self.clone();
        zero.zero_fill()?;
        Ok(zero)
    }

    /// True for numeric values whose elements are all zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Scalar(v) => *v == 0.0,
            Value::Array(a) => a.data().iter().all(|&v| v == 0.0),
            Value::Object(_) => false,
        }
    }
}

impl Accumulable for Value {
    /// `self += increment`.
    ///
    /// * scalar + scalar (or 0-d array) stays a scalar;
    /// * scalar + n-d array becomes an array of the increment's shape;
    /// * array + anything numeric broadcasts into the array's own shape;
    /// * objects defer to their own `Accumulable` capability.
    fn accumulate(&mut self, increment: &Value) -> Result<()> {
        if let Value::Object(target) = self {
            let payload = target.type_name().to_string();
            return match target.as_accumulable() {
                Some(acc) => acc.accumulate(increment),
                None => Err(ModularError::MissingCapability {
                    capability: Capability::Accumulate,
                    payload,
                }),
            };
        }
        if increment.is_object() {
            return Err(ModularError::IncompatiblePayload {
                target: self.type_name(),
                increment: increment.type_name(),
            });
        }

        let replacement = match (&mut *self, increment) {
            (Value::Scalar(a), Value::Scalar(b)) => {
                *a += b;
                None
            }
            (Value::Scalar(a), Value::Array(b)) if b.ndim() == 0 => {
                *a += b.data()[0];
                None
            }
            (Value::Scalar(a), Value::Array(b)) => {
                let mut grown = b.clone();
                grown.add_scalar(*a);
                Some(Value::Array(grown))
            }
            (Value::Array(a), Value::Scalar(b)) => {
                a.add_scalar(*b);
                None
            }
            (Value::Array(a), Value::Array(b)) => {
                a.add_assign_broadcast(b)?;
                None
            }
            _ => None,
        };
        if let Some(value) = replacement {
            *self = value;
        }
        Ok(())
    }
}

impl Zeroable for Value {
    fn zero_fill(&mut self) -> Result<()> {
        match self {
            Value::Scalar(v) => {
                *v = 0.0;
                Ok(())
            }
            Value::Array(a) => {
                a.fill(0.0);
                Ok(())
            }
            Value::Object(o) => {
                let payload = o.type_name().to_string();
                match o.as_zeroable() {
                    Some(z) => z.zero_fill(),
                    None => Err(ModularError::MissingCapability {
                        capability: Capability::ZeroFill,
                        payload,
                    }),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Assign,
    Accumulate,
}

// Writes through `index` into an array, broadcasting `value` into the selected region
fn write_indexed(target: &mut Array, index: &[SliceArg], value: &Value, mode: WriteMode) -> Result<()> {
    let selection = resolve(index, target.shape())?;
    let source = value
        .to_array()
        .map_err(|_| ModularError::IncompatiblePayload {
            target: format!("array{:?}", target.shape()),
            increment: value.type_name(),
        })?
        .broadcast_to(&selection.shape)?;
    let data = target.data_mut();
    for (&offset, &v) in selection.offsets.iter().zip(source.data()) {
        match mode {
            WriteMode::Assign => data[offset] = v,
            WriteMode::Accumulate => data[offset] += v,
        }
    }
    Ok(())
}

impl Indexable for Value {
    fn select(&self, index: &[SliceArg]) -> Result<Value> {
        let array = match self {
            Value::Object(o) => {
                return match o.as_indexable() {
                    Some(ix) => ix.select(index),
                    None => Err(self.not_numeric(Capability::Index)),
                }
            }
            numeric => numeric.to_array()?,
        };
        let selection = resolve(index, array.shape())?;
        if selection.shape.is_empty() {
            return Ok(Value::Scalar(array.data()[selection.offsets[0]]));
        }
        let data = selection.offsets.iter().map(|&o| array.data()[o]).collect();
        Ok(Value::Array(Array::from_vec(data, selection.shape)?))
    }

    fn assign(&mut self, index: &[SliceArg], value: &Value) -> Result<()> {
        self.write_at(index, value, WriteMode::Assign)
    }

    fn accumulate_at(&mut self, index: &[SliceArg], increment: &Value) -> Result<()> {
        self.write_at(index, increment, WriteMode::Accumulate)
    }
}

impl Value {
    fn write_at(&mut self, index: &[SliceArg], value: &Value, mode: WriteMode) -> Result<()> {
        match self {
            Value::Scalar(x) => {
                let mut boxed = Array::scalar(*x);
                write_indexed(&mut boxed, index, value, mode)?;
                *x = boxed.data()[0];
                Ok(())
            }
            Value::Array(a) => write_indexed(a, index, value, mode),
            Value::Object(o) => {
                let payload = o.type_name().to_string();
                let ix = o.as_indexable_mut().ok_or(ModularError::MissingCapability {
                    capability: Capability::Index,
                    payload,
                })?;
                match mode {
                    WriteMode::Assign => ix.assign(index, value),
                    WriteMode::Accumulate => ix.accumulate_at(index, value),
                }
            }
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Scalar(f64::from(v))
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl From<Vec<f64>> for Value {
    /// 1-dimensional array.
    fn from(v: Vec<f64>) -> Self {
        Value::Array(Array::from(v))
    }
}

/// Anything that can be stored as an optional payload (`None` meaning "no value").
pub trait IntoPayload {
    fn into_payload(self) -> Option<Value>;
}

impl IntoPayload for Value {
    fn into_payload(self) -> Option<Value> {
        Some(self)
    }
}

impl IntoPayload for Option<Value> {
    fn into_payload(self) -> Option<Value> {
        self
    }
}

impl IntoPayload for f64 {
    fn into_payload(self) -> Option<Value> {
        Some(Value::Scalar(self))
    }
}

impl IntoPayload for Array {
    fn into_payload(self) -> Option<Value> {
        Some(Value::Array(self))
    }
}

impl IntoPayload for Vec<f64> {
    fn into_payload(self) -> Option<Value> {
        Some(Value::from(self))
    }
}

impl IntoPayload for &Value {
    fn into_payload(self) -> Option<Value> {
        Some(self.clone())
    }
}

#[cfg(test)]
#[path = "value_test.rs"]
mod tests;
