//! Sparse plane rotation.

use crate::dispatch::{
    self, address, check_buffer, check_extent, check_handle, check_index_base, check_nnz,
    check_scalars, ScalarArg,
};
use crate::kernels::{Level1Kernel, SparseOperands};
use gsparse_core::{
    Complex32, Complex64, DeviceBuffer, Handle, IndexBase, Result, Scalar, TraceRecord,
};

/// Threads per block of the rotation kernel.
pub const ROTI_BLOCK_SIZE: u32 = 512;

pub(crate) struct Roti;

impl Level1Kernel<2> for Roti {
    const NAME: &'static str = "roti";
    const SHADER: &'static str = include_str!("./shaders/roti.wgsl");
    const WRITES_X: bool = true;

    fn is_noop<T: Scalar>([c, s]: &[T; 2]) -> bool {
        c.is_one() && s.is_zero()
    }

    fn update<T: Scalar>(&[c, s]: &[T; 2], x: T, y: T) -> (T, T) {
        (c * x - s * y, s * x + c * y)
    }
}

/// Applies the plane rotation `(c, s)` to a sparse vector and a dense vector.
///
/// For every stored entry `i`, with `idx = x_ind[i] - idx_base`:
///
/// ```text
/// x_val[i] = c * x_val[i] - s * y[idx]
/// y[idx]   = s * x_val[i] + c * y[idx]
/// ```
///
/// `c` and `s` must reside where the handle's pointer mode says. Indices
/// are assumed distinct. The call returns once the kernel is enqueued on
/// the handle's stream; `c == 1, s == 0` enqueues nothing in host pointer
/// mode.
///
/// # Errors
///
/// `InvalidHandle`, `InvalidValue` (index base), `InvalidSize` (`nnz`),
/// `InvalidPointer` (checked in the order `c`, `s`, `x_val`, `x_ind`, `y`),
/// and `NotImplemented` when the stream's backend has no kernel for `T`.
#[allow(clippy::too_many_arguments)]
pub fn roti<T: Scalar>(
    handle: Option<&Handle>,
    nnz: i32,
    x_val: Option<&DeviceBuffer<T>>,
    x_ind: Option<&DeviceBuffer<i32>>,
    y: Option<&DeviceBuffer<T>>,
    c: Option<ScalarArg<'_, T>>,
    s: Option<ScalarArg<'_, T>>,
    idx_base: IndexBase,
) -> Result<()> {
    let handle = check_handle(handle)?;

    handle.trace(|| {
        TraceRecord::new(T::routine_name(Roti::NAME))
            .arg(nnz)
            .opt_arg(x_val.map(address))
            .opt_arg(x_ind.map(address))
            .opt_arg(y.map(address))
            .opt_arg(c.as_ref().map(ScalarArg::render))
            .opt_arg(s.as_ref().map(ScalarArg::render))
            .arg(idx_base)
    });

    check_index_base(idx_base)?;
    let nnz = check_nnz(nnz)?;

    let stream = handle.stream();
    let scalars = check_scalars(handle, [("c", c), ("s", s)])?;
    let x_val = check_buffer("x_val", x_val, stream)?;
    let x_ind = check_buffer("x_ind", x_ind, stream)?;
    let y = check_buffer("y", y, stream)?;

    if nnz == 0 {
        return Ok(());
    }
    check_extent("x_val", x_val, nnz)?;
    check_extent("x_ind", x_ind, nnz)?;

    let operands = SparseOperands {
        nnz,
        base: idx_base.offset(),
        x_val,
        x_ind,
        y,
    };
    dispatch::launch::<Roti, T, 2>(handle, ROTI_BLOCK_SIZE, operands, scalars)
}

macro_rules! roti_entry_point {
    ($name:ident, $t:ty) => {
        #[doc = concat!("[`roti`] over `", stringify!($t), "`.")]
        #[allow(clippy::too_many_arguments)]
        pub fn $name(
            handle: Option<&Handle>,
            nnz: i32,
            x_val: Option<&DeviceBuffer<$t>>,
            x_ind: Option<&DeviceBuffer<i32>>,
            y: Option<&DeviceBuffer<$t>>,
            c: Option<ScalarArg<'_, $t>>,
            s: Option<ScalarArg<'_, $t>>,
            idx_base: IndexBase,
        ) -> Result<()> {
            roti::<$t>(handle, nnz, x_val, x_ind, y, c, s, idx_base)
        }
    };
}

roti_entry_point!(sroti, f32);
roti_entry_point!(droti, f64);
roti_entry_point!(croti, Complex32);
roti_entry_point!(zroti, Complex64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_noop() {
        assert!(Roti::is_noop(&[1.0f32, 0.0]));
        assert!(!Roti::is_noop(&[1.0f64, 1e-300]));
        assert!(!Roti::is_noop(&[0.0f32, 1.0]));
        assert!(Roti::is_noop(&[Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)]));
    }

    #[test]
    fn test_update_matches_rotation() {
        assert_eq!(Roti::update(&[0.0f64, 1.0], 2.0, 1.0), (-1.0, 2.0));
        let (x, y) = Roti::update(&[0.6f64, 0.8], 3.0, 4.0);
        assert!((x - -1.4).abs() < 1e-12);
        assert!((y - 4.8).abs() < 1e-12);
    }
}
