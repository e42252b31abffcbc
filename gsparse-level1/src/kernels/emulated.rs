use super::{Level1Kernel, Scalars, SparseOperands};
use gsparse_core::{
    DeviceBuffer, DeviceFault, DeviceMemory, DeviceResult, Element, LaunchConfig, Result, Scalar,
    SparseError, Stream,
};
use std::sync::Arc;

fn memory<E: Element>(buffer: &DeviceBuffer<E>) -> Result<DeviceMemory<E>> {
    buffer.emulated_memory().ok_or_else(|| {
        SparseError::Internal(format!(
            "Buffer '{}' is not resident on an emulated device",
            buffer.label()
        ))
    })
}

enum ScalarMemory<T: Element, const N: usize> {
    Host([T; N]),
    Device(Vec<DeviceMemory<T>>),
}

/// `x` and `y` views, which may be one allocation.
enum Operands<'a, T> {
    Distinct { x: &'a mut [T], y: &'a mut [T] },
    Aliased(&'a mut [T]),
}

impl<T> Operands<'_, T> {
    fn x(&mut self) -> &mut [T] {
        match self {
            Operands::Distinct { x, .. } => &mut **x,
            Operands::Aliased(v) => &mut **v,
        }
    }

    fn y(&mut self) -> &mut [T] {
        match self {
            Operands::Distinct { y, .. } => &mut **y,
            Operands::Aliased(v) => &mut **v,
        }
    }
}

/// Locks `x` and `y` in address order so kernels on other streams cannot
/// deadlock against this one.
fn with_operands<T, R>(
    x: &DeviceMemory<T>,
    y: &DeviceMemory<T>,
    body: impl FnOnce(Operands<'_, T>) -> R,
) -> R {
    if Arc::ptr_eq(x, y) {
        let mut guard = x.lock();
        return body(Operands::Aliased(&mut guard[..]));
    }
    let mut x_guard;
    let mut y_guard;
    if Arc::as_ptr(x) < Arc::as_ptr(y) {
        x_guard = x.lock();
        y_guard = y.lock();
    } else {
        y_guard = y.lock();
        x_guard = x.lock();
    }
    body(Operands::Distinct {
        x: &mut x_guard[..],
        y: &mut y_guard[..],
    })
}

fn read_scalars<T: Element, const N: usize>(
    name: &str,
    memories: &[DeviceMemory<T>],
) -> core::result::Result<[T; N], DeviceFault> {
    let mut values = [T::zeroed(); N];
    for (value, memory) in values.iter_mut().zip(memories) {
        *value = memory
            .lock()
            .first()
            .copied()
            .ok_or_else(|| DeviceFault::out_of_bounds(name, 0, 0))?;
    }
    Ok(values)
}

/// Runs `K` over the grid on the stream's worker thread.
pub(super) fn launch<K, T, const N: usize>(
    stream: &Stream,
    config: LaunchConfig,
    operands: &SparseOperands<'_, T>,
    scalars: Scalars<'_, T, N>,
) -> Result<()>
where
    K: Level1Kernel<N>,
    T: Scalar,
{
    let x_val = memory(operands.x_val)?;
    let x_ind = memory(operands.x_ind)?;
    let y = memory(operands.y)?;
    let scalars = match scalars {
        Scalars::Host(values) => ScalarMemory::Host(values),
        Scalars::Device(buffers) => ScalarMemory::Device(
            buffers
                .iter()
                .map(|buffer| memory(buffer))
                .collect::<Result<Vec<_>>>()?,
        ),
    };
    let nnz = operands.nnz;
    let base = i64::from(operands.base);

    stream.launch(K::NAME, move || -> DeviceResult {
        let values = match &scalars {
            ScalarMemory::Host(values) => *values,
            ScalarMemory::Device(memories) => {
                let values = read_scalars::<T, N>(K::NAME, memories)?;
                if K::is_noop(&values) {
                    return Ok(());
                }
                values
            }
        };

        let indices = x_ind.lock();
        with_operands(&x_val, &y, |mut ops| {
            for tid in config.global_ids() {
                if tid >= nnz {
                    continue;
                }
                let ind_len = indices.len();
                let stored = *indices
                    .get(tid)
                    .ok_or_else(|| DeviceFault::out_of_bounds(K::NAME, tid as i64, ind_len))?;
                let x_len = ops.x().len();
                let x_old = *ops
                    .x()
                    .get(tid)
                    .ok_or_else(|| DeviceFault::out_of_bounds(K::NAME, tid as i64, x_len))?;

                let position = i64::from(stored) - base;
                let y_len = ops.y().len();
                if position < 0 || position as usize >= y_len {
                    return Err(DeviceFault::out_of_bounds(K::NAME, position, y_len));
                }
                let idx = position as usize;
                let y_old = ops.y()[idx];

                let (x_new, y_new) = K::update(&values, x_old, y_old);
                if K::WRITES_X {
                    ops.x()[tid] = x_new;
                }
                ops.y()[idx] = y_new;
            }
            Ok(())
        })
    })
}
