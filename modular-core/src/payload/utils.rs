/// Row-major strides of a payload of `shape`, e.g. `[2, 3]` gives `[3, 1]`.
///
/// Used to turn index selections into flat offsets of an `Array` buffer.
pub fn calculate_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    let mut step = 1;
    for (stride, &dim) in strides.iter_mut().zip(shape).rev() {
        *stride = step;
        step *= dim;
    }
    strides
}

/// Shape an accumulation or assignment of `b` into `a` broadcasts to.
///
/// Shapes are aligned on their trailing dimensions; a missing or unit dimension
/// stretches to match the other one.
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>, String> {
    let rank = a.len().max(b.len());
    let dim = |shape: &[usize], i: usize| {
        (i + shape.len())
            .checked_sub(rank)
            .map_or(1, |j| shape[j])
    };
    (0..rank)
        .map(|i| match (dim(a, i), dim(b, i)) {
            (x, y) if x == y || y == 1 => Ok(x),
            (1, y) => Ok(y),
            (x, y) => Err(format!("cannot broadcast {:?} with {:?}: axis {} has {} vs {}", a, b, i, x, y)),
        })
        .collect()
}

/// Converts a linear (row-major) index into multi-dimensional coordinates.
pub fn index_to_coord(index: usize, shape: &[usize]) -> Vec<usize> {
    let mut coord = vec![0; shape.len()];
    let mut rest = index;
    for i in (0..shape.len()).rev() {
        if shape[i] == 0 {
            continue;
        }
        coord[i] = rest % shape[i];
        rest /= shape[i];
    }
    coord
}

// Data index in the original (smaller) array for a coordinate of the broadcast target
pub fn coord_to_index_broadcasted(
    target_coord: &[usize],
    original_shape: &[usize],
    original_strides: &[usize],
) -> usize {
    if original_shape.is_empty() {
        return 0;
    }
    let rank_diff = target_coord.len().saturating_sub(original_shape.len());
    let mut index = 0;
    for i in 0..original_shape.len() {
        let dim_size = original_shape[i];
        let effective_coord = if dim_size == 1 { 0 } else { target_coord[rank_diff + i] };
        index += effective_coord * original_strides[i];
    }
    index
}

#[cfg(test)]
#[path = "utils_test.rs"]
mod tests;
