//! Row-major (host) and column-major (engine) element order.

/// Reorder row-major `data` of `shape` into column-major order.
pub(crate) fn to_column_major<T: Clone>(data: &[T], shape: &[usize]) -> Vec<T> {
    permute(data, shape, Order::ColumnMajor)
}

/// Reorder column-major `data` of `shape` into row-major order.
pub(crate) fn to_row_major<T: Clone>(data: &[T], shape: &[usize]) -> Vec<T> {
    permute(data, shape, Order::RowMajor)
}

#[derive(Clone, Copy)]
enum Order {
    RowMajor,
    ColumnMajor,
}

/// Walk the output in `target` order and pick each element from the source,
/// which is stored in the other order.
fn permute<T: Clone>(data: &[T], shape: &[usize], target: Order) -> Vec<T> {
    if shape.iter().filter(|&&d| d > 1).count() < 2 {
        return data.to_vec();
    }

    let rank = shape.len();
    let mut strides = vec![1usize; rank];
    match target {
        // Source is column-major: first axis fastest.
        Order::RowMajor => {
            for axis in 1..rank {
                strides[axis] = strides[axis - 1] * shape[axis - 1];
            }
        }
        // Source is row-major: last axis fastest.
        Order::ColumnMajor => {
            for axis in (0..rank - 1).rev() {
                strides[axis] = strides[axis + 1] * shape[axis + 1];
            }
        }
    }

    // Axes in the order the output index advances.
    let axes: Vec<usize> = match target {
        Order::RowMajor => (0..rank).rev().collect(),
        Order::ColumnMajor => (0..rank).collect(),
    };

    let mut index = vec![0usize; rank];
    let mut out = Vec::with_capacity(data.len());
    for _ in 0..data.len() {
        let offset: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
        out.push(data[offset].clone());

        for &axis in &axes {
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    out
}
