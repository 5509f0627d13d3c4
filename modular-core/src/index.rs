// src/index.rs

use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use crate::error::{ModularError, Result};
use crate::payload::utils::calculate_strides;

/// Represents the different ways to index one dimension of a payload.
///
/// A list of `SliceArg`s (usually built with the [`s!`](crate::s) macro) is the
/// index descriptor a [`SignalSlice`](crate::SignalSlice) holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceArg {
    /// Indexing with a single integer. Removes the dimension being indexed.
    /// Negative values count from the end.
    Index(isize),
    /// A standard slice `start:stop:step`, clamped to the dimension like NumPy does.
    Slice {
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    },
    /// A list of positions along the dimension (NumPy "fancy" index).
    Fancy(Vec<isize>),
    /// The `...` ellipsis, expanding to as many full slices as needed.
    Ellipsis,
}

impl SliceArg {
    /// The full slice `:`.
    pub fn full() -> Self {
        SliceArg::Slice {
            start: None,
            stop: None,
            step: 1,
        }
    }

    pub fn range(start: isize, stop: isize) -> Self {
        SliceArg::Slice {
            start: Some(start),
            stop: Some(stop),
            step: 1,
        }
    }

    pub fn stepped(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        SliceArg::Slice { start, stop, step }
    }

    fn is_whole(&self) -> bool {
        matches!(
            self,
            SliceArg::Ellipsis
                | SliceArg::Index(0)
                | SliceArg::Index(-1)
                | SliceArg::Slice {
                    start: None,
                    stop: None,
                    step: 1
                }
        )
    }
}

// Integer literals fall back to `i32`, so every common integer type gets the same conversions
macro_rules! impl_slice_arg_from {
    ($($t:ty),*) => {$(
        impl From<$t> for SliceArg {
            fn from(i: $t) -> Self {
                SliceArg::Index(i as isize)
            }
        }

        impl From<Range<$t>> for SliceArg {
            fn from(r: Range<$t>) -> Self {
                SliceArg::range(r.start as isize, r.end as isize)
            }
        }

        impl From<RangeFrom<$t>> for SliceArg {
            fn from(r: RangeFrom<$t>) -> Self {
                SliceArg::stepped(Some(r.start as isize), None, 1)
            }
        }

        impl From<RangeTo<$t>> for SliceArg {
            fn from(r: RangeTo<$t>) -> Self {
                SliceArg::stepped(None, Some(r.end as isize), 1)
            }
        }

        impl From<Vec<$t>> for SliceArg {
            fn from(v: Vec<$t>) -> Self {
                SliceArg::Fancy(v.into_iter().map(|i| i as isize).collect())
            }
        }

        impl From<&[$t]> for SliceArg {
            fn from(v: &[$t]) -> Self {
                SliceArg::Fancy(v.iter().map(|&i| i as isize).collect())
            }
        }
    )*};
}

impl_slice_arg_from!(isize, i32, i64, usize);

impl From<RangeFull> for SliceArg {
    fn from(_: RangeFull) -> Self {
        SliceArg::full()
    }
}

impl fmt::Display for SliceArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |v: &Option<isize>| v.map(|x| x.to_string()).unwrap_or_default();
        match self {
            SliceArg::Index(i) => write!(f, "{}", i),
            SliceArg::Slice { start, stop, step } if *step == 1 => {
                write!(f, "{}:{}", opt(start), opt(stop))
            }
            SliceArg::Slice { start, stop, step } => {
                write!(f, "{}:{}:{}", opt(start), opt(stop), step)
            }
            SliceArg::Fancy(v) => write!(f, "{:?}", v),
            SliceArg::Ellipsis => write!(f, "..."),
        }
    }
}

/// Builds a `Vec<SliceArg>` from index expressions.
///
/// ```
/// use modular_core::{s, SliceArg};
/// let idx = s![0, 2..8];
/// assert_eq!(idx, vec![SliceArg::Index(0), SliceArg::range(2, 8)]);
/// let idx = s![.., vec![1, 3]];
/// assert_eq!(idx[1], SliceArg::Fancy(vec![1, 3]));
/// ```
#[macro_export]
macro_rules! s {
    ($($e:expr),* $(,)?) => {
        vec![$($crate::index::SliceArg::from($e)),*]
    };
}

/// Formats an index list the way it would be written between brackets.
pub fn format_index(index: &[SliceArg]) -> String {
    index
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of resolving an index list against a concrete shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Row-major offsets into the indexed buffer, in output order.
    pub offsets: Vec<usize>,
    /// Shape of the selected region.
    pub shape: Vec<usize>,
}

impl Selection {
    pub fn numel(&self) -> usize {
        self.offsets.len()
    }
}

fn normalize(index: isize, dim: usize, size: usize) -> Result<usize> {
    let resolved = if index < 0 { index + size as isize } else { index };
    if resolved < 0 || resolved >= size as isize {
        return Err(ModularError::IndexOutOfBounds { index, dim, size });
    }
    Ok(resolved as usize)
}

fn slice_positions(start: Option<isize>, stop: Option<isize>, step: isize, size: usize) -> Result<Vec<usize>> {
    if step == 0 {
        return Err(ModularError::InvalidIndex("slice step cannot be zero".to_string()));
    }
    let n = size as isize;
    let adjust = |v: isize| if v < 0 { v + n } else { v };
    let mut out = Vec::new();
    if step > 0 {
        let begin = start.map(adjust).unwrap_or(0).clamp(0, n);
        let end = stop.map(adjust).unwrap_or(n).clamp(0, n);
        let mut i = begin;
        while i < end {
            out.push(i as usize);
            i += step;
        }
    } else {
        let begin = start.map(adjust).unwrap_or(n - 1).clamp(-1, n - 1);
        let end = stop.map(adjust).unwrap_or(-1).clamp(-1, n - 1);
        let mut i = begin;
        while i > end {
            out.push(i as usize);
            i += step;
        }
    }
    Ok(out)
}

/// Resolves `index` against `shape`, producing the selected offsets and output shape.
///
/// # Errors
/// * `TooManyIndices` when more dimensions are indexed than the value has.
/// * `IndexOutOfBounds` for an integer or list entry outside its dimension.
/// * `InvalidIndex` for a zero step or more than one ellipsis.
pub fn resolve(index: &[SliceArg], shape: &[usize]) -> Result<Selection> {
    let ellipses = index.iter().filter(|a| **a == SliceArg::Ellipsis).count();
    if ellipses > 1 {
        return Err(ModularError::InvalidIndex(
            "an index can only have a single ellipsis".to_string(),
        ));
    }
    let rank = shape.len();

    // 0-d values: `0`, `-1`, `:` and `...` all address the whole value
    if rank == 0 {
        return match index {
            [] => Ok(Selection { offsets: vec![0], shape: vec![] }),
            [only] if only.is_whole() => Ok(Selection { offsets: vec![0], shape: vec![] }),
            [SliceArg::Index(i)] => Err(ModularError::IndexOutOfBounds { index: *i, dim: 0, size: 1 }),
            _ => Err(ModularError::TooManyIndices { given: index.len() - ellipses, rank }),
        };
    }

    let explicit = index.len() - ellipses;
    if explicit > rank {
        return Err(ModularError::TooManyIndices { given: explicit, rank });
    }

    // (positions, kept) per dimension
    let mut per_dim: Vec<(Vec<usize>, bool)> = Vec::with_capacity(rank);
    let full = |size: usize| ((0..size).collect::<Vec<_>>(), true);
    for arg in index {
        let dim = per_dim.len();
        match arg {
            SliceArg::Ellipsis => {
                for _ in 0..(rank - explicit) {
                    let size = shape[per_dim.len()];
                    per_dim.push(full(size));
                }
            }
            SliceArg::Index(i) => per_dim.push((vec![normalize(*i, dim, shape[dim])?], false)),
            SliceArg::Slice { start, stop, step } => {
                per_dim.push((slice_positions(*start, *stop, *step, shape[dim])?, true))
            }
            SliceArg::Fancy(list) => {
                let positions = list
                    .iter()
                    .map(|&i| normalize(i, dim, shape[dim]))
                    .collect::<Result<Vec<_>>>()?;
                per_dim.push((positions, true));
            }
        }
    }
    while per_dim.len() < rank {
        let size = shape[per_dim.len()];
        per_dim.push(full(size));
    }

    let out_shape: Vec<usize> = per_dim
        .iter()
        .filter(|(_, kept)| *kept)
        .map(|(p, _)| p.len())
        .collect();

    let strides = calculate_strides(shape);
    let total: usize = per_dim.iter().map(|(p, _)| p.len()).product();
    let mut offsets = Vec::with_capacity(total);
    if total > 0 {
        // Odometer over the per-dimension position lists, last dimension fastest
        let mut counter = vec![0usize; rank];
        'outer: loop {
            offsets.push(
                counter
                    .iter()
                    .enumerate()
                    .map(|(d, &c)| per_dim[d].0[c] * strides[d])
                    .sum(),
            );
            for d in (0..rank).rev() {
                counter[d] += 1;
                if counter[d] < per_dim[d].0.len() {
                    continue 'outer;
                }
                counter[d] = 0;
            }
            break;
        }
    }

    Ok(Selection {
        offsets,
        shape: out_shape,
    })
}

#[cfg(test)]
#[path = "index_test.rs"]
mod tests;
