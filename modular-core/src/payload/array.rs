// src/payload/array.rs

use std::fmt::{self, Debug};

use num_traits::ToPrimitive;
use rand::Rng;

use crate::error::{ModularError, Result};
use crate::payload::utils::{
    broadcast_shapes, calculate_strides, coord_to_index_broadcasted, index_to_coord,
};

/// Dense n-dimensional array of `f64` stored contiguously in row-major order.
///
/// This is the array-like payload a [`Signal`](crate::Signal) carries. It owns its
/// buffer; aliasing between signals is handled one level up, by views holding a
/// handle on the signal that owns the array.
///
/// A shape of `[]` denotes a 0-dimensional array holding exactly one element.
#[derive(Clone, PartialEq)]
pub struct Array {
    data: Vec<f64>,
    shape: Vec<usize>,
}

impl Array {
    /// Creates an array from flat row-major data and a shape.
    ///
    /// # Errors
    /// Returns `ModularError::ArrayCreation` if the length of `data` does not match
    /// the number of elements described by `shape`.
    pub fn from_vec(data: Vec<f64>, shape: Vec<usize>) -> Result<Self> {
        let numel: usize = shape.iter().product();
        if data.len() != numel {
            return Err(ModularError::ArrayCreation {
                data_len: data.len(),
                shape,
            });
        }
        Ok(Array { data, shape })
    }

    /// Creates an array from any primitive numbers (integers included), converting to `f64`.
    pub fn from_elems<T: ToPrimitive>(data: Vec<T>, shape: Vec<usize>) -> Result<Self> {
        let converted = data
            .iter()
            .map(|v| v.to_f64().unwrap_or(f64::NAN))
            .collect();
        Self::from_vec(converted, shape)
    }

    /// Creates a 0-dimensional array.
    pub fn scalar(value: f64) -> Self {
        Array {
            data: vec![value],
            shape: vec![],
        }
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self::full(shape, 0.0)
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self::full(shape, 1.0)
    }

    /// Creates an array filled with `value`.
    pub fn full(shape: &[usize], value: f64) -> Self {
        let numel = shape.iter().product();
        Array {
            data: vec![value; numel],
            shape: shape.to_vec(),
        }
    }

    /// Creates an array with elements drawn uniformly from `[0, 1)`.
    pub fn rand(shape: &[usize]) -> Self {
        let mut rng = rand::thread_rng();
        let numel = shape.iter().product();
        Array {
            data: (0..numel).map(|_| rng.gen::<f64>()).collect(),
            shape: shape.to_vec(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn strides(&self) -> Vec<usize> {
        calculate_strides(&self.shape)
    }

    /// Flat row-major view of the elements.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Reads the element at the given multi-dimensional coordinates.
    pub fn get(&self, coords: &[usize]) -> Result<f64> {
        if coords.len() != self.shape.len() {
            return Err(ModularError::TooManyIndices {
                given: coords.len(),
                rank: self.shape.len(),
            });
        }
        let strides = self.strides();
        let mut offset = 0;
        for (dim, (&c, &size)) in coords.iter().zip(&self.shape).enumerate() {
            if c >= size {
                return Err(ModularError::IndexOutOfBounds {
                    index: c as isize,
                    dim,
                    size,
                });
            }
            offset += c * strides[dim];
        }
        Ok(self.data[offset])
    }

    /// Returns the same elements with a new shape.
    pub fn reshape(self, shape: Vec<usize>) -> Result<Array> {
        let numel: usize = shape.iter().product();
        if numel != self.data.len() {
            return Err(ModularError::ShapeMismatch {
                expected: self.shape,
                actual: shape,
                operation: "reshape".to_string(),
            });
        }
        Ok(Array {
            data: self.data,
            shape,
        })
    }

    /// Returns a 1-dimensional copy.
    pub fn flatten(&self) -> Array {
        Array {
            data: self.data.clone(),
            shape: vec![self.data.len()],
        }
    }

    pub fn fill(&mut self, value: f64) {
        self.data.iter_mut().for_each(|v| *v = value);
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Applies `f` element-wise, returning a new array of the same shape.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Array {
        Array {
            data: self.data.iter().map(|&v| f(v)).collect(),
            shape: self.shape.clone(),
        }
    }

    pub fn add_scalar(&mut self, value: f64) {
        self.data.iter_mut().for_each(|v| *v += value);
    }

    /// Broadcasts this array to `target` following NumPy rules.
    ///
    /// The broadcast result must have exactly the `target` shape; an array that would
    /// have to grow `target` (e.g. `[3, 3]` into `[3]`) is rejected.
    pub fn broadcast_to(&self, target: &[usize]) -> Result<Array> {
        let mismatch = || ModularError::ShapeMismatch {
            expected: target.to_vec(),
            actual: self.shape.clone(),
            operation: "broadcast".to_string(),
        };
        let out_shape = broadcast_shapes(&self.shape, target).map_err(|_| mismatch())?;
        if out_shape != target {
            return Err(mismatch());
        }
        if self.shape == target {
            return Ok(self.clone());
        }
        let strides = self.strides();
        let numel: usize = target.iter().product();
        let data = (0..numel)
            .map(|i| {
                let coord = index_to_coord(i, target);
                self.data[coord_to_index_broadcasted(&coord, &self.shape, &strides)]
            })
            .collect();
        Ok(Array {
            data,
            shape: target.to_vec(),
        })
    }

    /// In-place `self += other`, broadcasting `other` into `self`'s shape.
    ///
    /// # Errors
    /// `ModularError::ShapeMismatch` if `other` cannot be broadcast into `self`'s shape.
    pub fn add_assign_broadcast(&mut self, other: &Array) -> Result<()> {
        let other = other.broadcast_to(&self.shape).map_err(|_| ModularError::ShapeMismatch {
            expected: self.shape.clone(),
            actual: other.shape.clone(),
            operation: "accumulate".to_string(),
        })?;
        self.data
            .iter_mut()
            .zip(other.data.iter())
            .for_each(|(a, b)| *a += b);
        Ok(())
    }
}

impl From<Vec<f64>> for Array {
    /// 1-dimensional array.
    fn from(data: Vec<f64>) -> Self {
        let len = data.len();
        Array {
            data,
            shape: vec![len],
        }
    }
}

impl Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 8;
        write!(f, "Array(shape={:?}, data=", self.shape)?;
        if self.data.len() <= PREVIEW {
            write!(f, "{:?})", self.data)
        } else {
            write!(f, "{:?} ... ~{} elements)", &self.data[..PREVIEW], self.data.len())
        }
    }
}

#[cfg(test)]
#[path = "array_test.rs"]
mod tests;
