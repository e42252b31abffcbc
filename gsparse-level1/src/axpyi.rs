//! Sparse scaled vector addition into a dense vector.

use crate::dispatch::{
    self, address, check_buffer, check_extent, check_handle, check_index_base, check_nnz,
    check_scalars, ScalarArg,
};
use crate::kernels::{Level1Kernel, SparseOperands};
use gsparse_core::{
    Complex32, Complex64, DeviceBuffer, Handle, IndexBase, Result, Scalar, TraceRecord,
};

/// Threads per block of the scatter kernel.
pub const AXPYI_BLOCK_SIZE: u32 = 256;

pub(crate) struct Axpyi;

impl Level1Kernel<1> for Axpyi {
    const NAME: &'static str = "axpyi";
    const SHADER: &'static str = include_str!("./shaders/axpyi.wgsl");
    const WRITES_X: bool = false;

    fn is_noop<T: Scalar>([alpha]: &[T; 1]) -> bool {
        alpha.is_zero()
    }

    fn update<T: Scalar>(&[alpha]: &[T; 1], x: T, y: T) -> (T, T) {
        (x, y + alpha * x)
    }
}

/// Computes `y[x_ind[i] - idx_base] += alpha * x_val[i]` for every stored entry.
///
/// Pointers are checked in the order `alpha`, `x_val`, `x_ind`, `y`. In
/// host pointer mode `alpha == 0` enqueues nothing.
pub fn axpyi<T: Scalar>(
    handle: Option<&Handle>,
    nnz: i32,
    alpha: Option<ScalarArg<'_, T>>,
    x_val: Option<&DeviceBuffer<T>>,
    x_ind: Option<&DeviceBuffer<i32>>,
    y: Option<&DeviceBuffer<T>>,
    idx_base: IndexBase,
) -> Result<()> {
    let handle = check_handle(handle)?;

    handle.trace(|| {
        TraceRecord::new(T::routine_name(Axpyi::NAME))
            .arg(nnz)
            .opt_arg(alpha.as_ref().map(ScalarArg::render))
            .opt_arg(x_val.map(address))
            .opt_arg(x_ind.map(address))
            .opt_arg(y.map(address))
            .arg(idx_base)
    });

    check_index_base(idx_base)?;
    let nnz = check_nnz(nnz)?;

    let stream = handle.stream();
    let scalars = check_scalars(handle, [("alpha", alpha)])?;
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
    dispatch::launch::<Axpyi, T, 1>(handle, AXPYI_BLOCK_SIZE, operands, scalars)
}

macro_rules! axpyi_entry_point {
    ($name:ident, $t:ty) => {
        #[doc = concat!("[`axpyi`] over `", stringify!($t), "`.")]
        pub fn $name(
            handle: Option<&Handle>,
            nnz: i32,
            alpha: Option<ScalarArg<'_, $t>>,
            x_val: Option<&DeviceBuffer<$t>>,
            x_ind: Option<&DeviceBuffer<i32>>,
            y: Option<&DeviceBuffer<$t>>,
            idx_base: IndexBase,
        ) -> Result<()> {
            axpyi::<$t>(handle, nnz, alpha, x_val, x_ind, y, idx_base)
        }
    };
}

axpyi_entry_point!(saxpyi, f32);
axpyi_entry_point!(daxpyi, f64);
axpyi_entry_point!(caxpyi, Complex32);
axpyi_entry_point!(zaxpyi, Complex64);
