//! Validation and dispatch shared by the level-1 routines.
//!
//! Every routine runs the same fixed sequence, and the first failing step
//! decides the error:
//!
//! 1. absent handle: `InvalidHandle`
//! 2. trace the call (never fails)
//! 3. index base outside `{ZERO, ONE}`: `InvalidValue`
//! 4. negative `nnz`: `InvalidSize`
//! 5. absent scalar or buffer, in argument order: `InvalidPointer`
//! 6. `nnz == 0`: success, nothing enqueued
//! 7. launch geometry from the routine's block size
//! 8. host scalars: return early on a no-op, else launch by value;
//!    device scalars: always launch, the kernel checks for a no-op
//!
//! A routine returns as soon as its kernel is enqueued.

use crate::kernels::{self, Level1Kernel, Scalars, SparseOperands};
use gsparse_core::{
    DeviceBuffer, Element, Handle, IndexBase, LaunchConfig, PointerMode, Result, Scalar,
    SparseError, Stream,
};

/// A scalar coefficient, either a host value or a one-element device buffer.
///
/// Must match the handle's pointer mode: `Host` under [`PointerMode::HOST`],
/// `Device` under [`PointerMode::DEVICE`].
#[derive(Debug, Clone, Copy)]
pub enum ScalarArg<'a, T: Element> {
    Host(T),
    Device(&'a DeviceBuffer<T>),
}

impl<T: Scalar> ScalarArg<'_, T> {
    /// Trace rendering: the value of a host scalar, the address of a device one.
    pub(crate) fn render(&self) -> String {
        match self {
            ScalarArg::Host(value) => value.to_string(),
            ScalarArg::Device(buffer) => address(buffer),
        }
    }
}

pub(crate) fn address<E: Element>(buffer: &DeviceBuffer<E>) -> String {
    format!("{:p}", *buffer)
}

pub(crate) fn check_handle(handle: Option<&Handle>) -> Result<&Handle> {
    handle.ok_or(SparseError::InvalidHandle)
}

pub(crate) fn check_index_base(base: IndexBase) -> Result<()> {
    if !base.is_valid() {
        return Err(SparseError::InvalidValue(format!(
            "Index base {} is neither zero nor one",
            base
        )));
    }
    Ok(())
}

pub(crate) fn check_nnz(nnz: i32) -> Result<usize> {
    usize::try_from(nnz)
        .map_err(|_| SparseError::InvalidSize(format!("nnz must be non-negative, got {}", nnz)))
}

fn null_pointer(name: &str) -> SparseError {
    SparseError::InvalidPointer(format!("{} is null", name))
}

fn check_device<E: Element>(name: &str, buffer: &DeviceBuffer<E>, stream: &Stream) -> Result<()> {
    if buffer.device_id() != stream.device_id() {
        return Err(SparseError::InvalidPointer(format!(
            "{} ('{}') lives on device {}, the handle's stream runs on device {}",
            name,
            buffer.label(),
            buffer.device_id(),
            stream.device_id()
        )));
    }
    Ok(())
}

/// Checks the scalars in order and reads host values.
///
/// Any pointer mode other than `DEVICE` reads scalars from the host.
pub(crate) fn check_scalars<'a, T: Element, const N: usize>(
    handle: &Handle,
    args: [(&str, Option<ScalarArg<'a, T>>); N],
) -> Result<Scalars<'a, T, N>> {
    let on_device = handle.pointer_mode() == PointerMode::DEVICE;
    let mut values = [T::zeroed(); N];
    let mut buffers = Vec::with_capacity(N);
    for (slot, (name, arg)) in values.iter_mut().zip(args) {
        match (arg.ok_or_else(|| null_pointer(name))?, on_device) {
            (ScalarArg::Host(value), false) => *slot = value,
            (ScalarArg::Device(buffer), true) => {
                check_device(name, buffer, handle.stream())?;
                buffers.push(buffer);
            }
            (ScalarArg::Host(_), true) => {
                return Err(SparseError::InvalidPointer(format!(
                    "{} is a host scalar but the pointer mode is device",
                    name
                )));
            }
            (ScalarArg::Device(_), false) => {
                return Err(SparseError::InvalidPointer(format!(
                    "{} is a device scalar but the pointer mode is host",
                    name
                )));
            }
        }
    }
    if !on_device {
        return Ok(Scalars::Host(values));
    }
    let buffers = buffers.try_into().map_err(|_: Vec<&DeviceBuffer<T>>| {
        SparseError::Internal("Scalar buffer count does not match the kernel".to_string())
    })?;
    Ok(Scalars::Device(buffers))
}

pub(crate) fn check_buffer<'a, E: Element>(
    name: &str,
    buffer: Option<&'a DeviceBuffer<E>>,
    stream: &Stream,
) -> Result<&'a DeviceBuffer<E>> {
    let buffer = buffer.ok_or_else(|| null_pointer(name))?;
    check_device(name, buffer, stream)?;
    Ok(buffer)
}

/// A sparse operand must hold at least `nnz` entries.
pub(crate) fn check_extent<E: Element>(
    name: &str,
    buffer: &DeviceBuffer<E>,
    nnz: usize,
) -> Result<()> {
    if buffer.len() < nnz {
        return Err(SparseError::InvalidSize(format!(
            "{} holds {} entries, nnz is {}",
            name,
            buffer.len(),
            nnz
        )));
    }
    Ok(())
}

/// Runs the pointer mode branch and enqueues `K` when there is work to do.
pub(crate) fn launch<K, T, const N: usize>(
    handle: &Handle,
    block_size: u32,
    operands: SparseOperands<'_, T>,
    scalars: Scalars<'_, T, N>,
) -> Result<()>
where
    K: Level1Kernel<N>,
    T: Scalar,
{
    let config = LaunchConfig::for_elements(operands.nnz, block_size);
    if let Scalars::Host(values) = &scalars {
        if K::is_noop(values) {
            log::trace!("{}: no-op coefficients, nothing enqueued", T::routine_name(K::NAME));
            return Ok(());
        }
    }
    kernels::enqueue::<K, T, N>(handle.stream(), config, &operands, scalars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsparse_core::{Config, Device, Status};

    fn handle_on(device: &Device, mode: PointerMode) -> Handle {
        let mut handle = Handle::with_config(device, &Config::default());
        handle.set_pointer_mode(mode);
        handle
    }

    #[test]
    fn test_nnz_and_base_checks() {
        assert_eq!(check_nnz(0).unwrap(), 0);
        assert_eq!(check_nnz(17).unwrap(), 17);
        assert_eq!(Status::from_result(&check_nnz(-1)), Status::InvalidSize);
        assert!(check_index_base(IndexBase::ONE).is_ok());
        assert_eq!(
            Status::from_result(&check_index_base(IndexBase::from_raw(3))),
            Status::InvalidValue
        );
    }

    #[test]
    fn test_host_scalars_are_read() {
        let device = Device::emulated().unwrap();
        let handle = handle_on(&device, PointerMode::HOST);
        let scalars = check_scalars(
            &handle,
            [("c", Some(ScalarArg::Host(0.5f32))), ("s", Some(ScalarArg::Host(2.0)))],
        )
        .unwrap();
        assert!(matches!(scalars, Scalars::Host([c, s]) if c == 0.5 && s == 2.0));
    }

    #[test]
    fn test_scalar_residency_must_match_pointer_mode() {
        let device = Device::emulated().unwrap();
        let c = device.create_buffer("c", &[1.0f64]).unwrap();

        let host = handle_on(&device, PointerMode::HOST);
        let err = check_scalars(&host, [("c", Some(ScalarArg::Device(&c)))]).unwrap_err();
        assert_eq!(Status::from(err), Status::InvalidPointer);

        let dev = handle_on(&device, PointerMode::DEVICE);
        let err = check_scalars(&dev, [("c", Some(ScalarArg::Host(1.0f64)))]).unwrap_err();
        assert_eq!(Status::from(err), Status::InvalidPointer);
        assert!(matches!(
            check_scalars(&dev, [("c", Some(ScalarArg::Device(&c)))]),
            Ok(Scalars::Device(_))
        ));
    }

    #[test]
    fn test_first_missing_scalar_is_reported() {
        let device = Device::emulated().unwrap();
        let handle = handle_on(&device, PointerMode::HOST);
        let args = [("c", Some(ScalarArg::Host(1.0f32))), ("s", None)];
        let err = check_scalars(&handle, args).unwrap_err();
        assert_eq!(err, SparseError::InvalidPointer("s is null".to_string()));
    }

    #[test]
    fn test_foreign_device_buffer_is_invalid_pointer() {
        let device = Device::emulated().unwrap();
        let other = Device::emulated().unwrap();
        let y = other.create_buffer("y", &[0.0f32; 3]).unwrap();
        let err = check_buffer("y", Some(&y), &device.null_stream()).unwrap_err();
        assert_eq!(Status::from(err), Status::InvalidPointer);
        assert!(check_buffer("y", Some(&y), &other.null_stream()).is_ok());
    }

    #[test]
    fn test_extent() {
        let device = Device::emulated().unwrap();
        let x = device.create_buffer("x", &[1i32, 2]).unwrap();
        assert!(check_extent("x_ind", &x, 2).is_ok());
        assert_eq!(
            Status::from_result(&check_extent("x_ind", &x, 3)),
            Status::InvalidSize
        );
    }

    #[test]
    fn test_render_by_residency() {
        let device = Device::emulated().unwrap();
        let c = device.create_buffer("c", &[0.25f32]).unwrap();
        assert_eq!(ScalarArg::Host(0.25f32).render(), "0.25");
        assert!(ScalarArg::Device(&c).render().starts_with("0x"));
    }
}
