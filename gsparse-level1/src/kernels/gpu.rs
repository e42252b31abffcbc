use super::{Level1Kernel, Scalars, SparseOperands};
use gsparse_core::{
    BindKind, DeviceBuffer, Element, LaunchConfig, Result, Scalar, ShaderBinding, ShaderLaunch,
    SparseError, Stream,
};
use std::borrow::Cow;
use std::mem;

fn bind<E: Element>(buffer: &DeviceBuffer<E>, kind: BindKind) -> Result<ShaderBinding<'_>> {
    buffer.shader_binding(kind).ok_or_else(|| {
        SparseError::Internal(format!("Buffer '{}' is not resident on a GPU", buffer.label()))
    })
}

/// Shrinks the block to what the adapter allows and checks the grid fits.
fn fit_to_device(stream: &Stream, config: LaunchConfig, nnz: usize) -> Result<LaunchConfig> {
    let mut config = config;
    if let Some(max_block) = stream.max_block_size() {
        if config.threads_per_block > max_block {
            log::debug!(
                "Block size {} exceeds adapter limit {}, relaunching with {}",
                config.threads_per_block,
                max_block,
                max_block
            );
            config = LaunchConfig::for_elements(nnz, max_block);
        }
    }
    if let Some(max_blocks) = stream.max_blocks() {
        if config.blocks > max_blocks {
            return Err(SparseError::NotImplemented(format!(
                "Grid of {} blocks exceeds the adapter limit of {}",
                config.blocks, max_blocks
            )));
        }
    }
    Ok(config)
}

/// A wgpu dispatch may not bind one buffer both read-only and read-write,
/// so `x_val`, `y` and device scalars must be distinct allocations.
fn check_bindings_disjoint<T: Scalar, const N: usize>(
    routine: &str,
    operands: &SparseOperands<'_, T>,
    scalars: &Scalars<'_, T, N>,
) -> Result<()> {
    let aliased = |a: &str, b: &str| {
        SparseError::NotImplemented(format!(
            "{} cannot bind {} and {} to the same GPU buffer",
            routine, a, b
        ))
    };
    if operands.x_val.same_allocation(operands.y) {
        return Err(aliased("x_val", "y"));
    }
    if let Scalars::Device(buffers) = scalars {
        for buffer in buffers {
            if buffer.same_allocation(operands.x_val) {
                return Err(aliased(buffer.label(), "x_val"));
            }
            if buffer.same_allocation(operands.y) {
                return Err(aliased(buffer.label(), "y"));
            }
        }
    }
    Ok(())
}

/// Submits `K` as a WGSL compute pass on the stream's queue.
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
    let routine = T::routine_name(K::NAME);
    let wgsl_type = T::WGSL_TYPE.ok_or_else(|| {
        SparseError::NotImplemented(format!("{} has no GPU kernel", routine))
    })?;
    if T::NEEDS_SHADER_F64 && !stream.supports_shader_f64() {
        return Err(SparseError::NotImplemented(format!(
            "{} needs SHADER_F64, which this adapter did not grant",
            routine
        )));
    }
    check_bindings_disjoint(&routine, operands, &scalars)?;
    let config = fit_to_device(stream, config, operands.nnz)?;

    let source = K::SHADER
        .replace("SCALAR", wgsl_type)
        .replace("BLOCK_SIZE", &config.threads_per_block.to_string());

    // Params { nnz: u32, base: i32, scalars: [SCALAR; N] }
    let mut params = Vec::with_capacity(8 + N * mem::size_of::<T>());
    params.extend_from_slice(bytemuck::bytes_of(&(operands.nnz as u32)));
    params.extend_from_slice(bytemuck::bytes_of(&operands.base));

    let x_kind = if K::WRITES_X {
        BindKind::ReadWrite
    } else {
        BindKind::ReadOnly
    };
    let mut bindings = vec![
        bind(operands.x_val, x_kind)?,
        bind(operands.x_ind, BindKind::ReadOnly)?,
        bind(operands.y, BindKind::ReadWrite)?,
    ];
    let entry_point = match &scalars {
        Scalars::Host(values) => {
            for value in values {
                params.extend_from_slice(bytemuck::bytes_of(value));
            }
            "main_host"
        }
        Scalars::Device(buffers) => {
            params.resize(params.len() + N * mem::size_of::<T>(), 0);
            for buffer in buffers {
                bindings.push(bind(buffer, BindKind::ReadOnly)?);
            }
            "main_device"
        }
    };

    stream.launch_shader(ShaderLaunch {
        label: &routine,
        source: Cow::Owned(source),
        entry_point,
        params,
        bindings,
        workgroups: config.blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsparse_core::{Device, Status};

    #[test]
    fn test_scalar_buffers_must_not_alias_vectors() {
        let device = Device::emulated().unwrap();
        let x_val = device.create_buffer("x_val", &[1.0f32, 2.0]).unwrap();
        let x_ind = device.create_buffer("x_ind", &[0i32, 1]).unwrap();
        let y = device.create_buffer("y", &[0.0f32; 4]).unwrap();
        let s = device.create_buffer("s", &[0.0f32]).unwrap();
        let operands = SparseOperands {
            nnz: 2,
            base: 0,
            x_val: &x_val,
            x_ind: &x_ind,
            y: &y,
        };

        let distinct = Scalars::Device([&s, &s]);
        assert!(check_bindings_disjoint("gsparse_sroti", &operands, &distinct).is_ok());

        let c_is_y = Scalars::Device([&y, &s]);
        let err = check_bindings_disjoint("gsparse_sroti", &operands, &c_is_y).unwrap_err();
        assert_eq!(Status::from(&err), Status::NotImplemented);
        assert!(err.to_string().contains("and y"));

        let s_is_x = Scalars::Device([&s, &x_val]);
        let err = check_bindings_disjoint("gsparse_sroti", &operands, &s_is_x).unwrap_err();
        assert!(err.to_string().contains("and x_val"));

        let host = Scalars::Host([0.0f32, 1.0]);
        assert!(check_bindings_disjoint("gsparse_sroti", &operands, &host).is_ok());
    }

    #[test]
    fn test_x_and_y_must_not_alias() {
        let device = Device::emulated().unwrap();
        let shared = device.create_buffer("shared", &[1.0f64, 2.0]).unwrap();
        let x_ind = device.create_buffer("x_ind", &[1i32]).unwrap();
        let operands = SparseOperands {
            nnz: 1,
            base: 0,
            x_val: &shared,
            x_ind: &x_ind,
            y: &shared,
        };
        let err = check_bindings_disjoint("gsparse_droti", &operands, &Scalars::Host([0.0, 1.0]))
            .unwrap_err();
        assert_eq!(Status::from(err), Status::NotImplemented);
    }
}
