use gsparse_core::{Config, Device, Handle, IndexBase, PointerMode, SparseError, Status};
use gsparse_level1::{axpyi, caxpyi, daxpyi, saxpyi, Complex32, ScalarArg};

fn setup(mode: PointerMode) -> (Device, Handle) {
    let _ = env_logger::builder().is_test(true).try_init();
    let device = Device::emulated().unwrap();
    let mut handle = Handle::with_config(&device, &Config::default());
    handle.set_pointer_mode(mode);
    (device, handle)
}

#[test]
fn test_validation_order() -> Result<(), SparseError> {
    let (device, handle) = setup(PointerMode::HOST);
    let x_val = device.create_buffer("x_val", &[1.0f64])?;
    let x_ind = device.create_buffer("x_ind", &[0i32])?;
    let y = device.create_buffer("y", &[0.0f64; 2])?;
    let alpha = Some(ScalarArg::Host(2.0));

    let status = |result: gsparse_core::Result<()>| Status::from_result(&result);
    assert_eq!(
        status(daxpyi(None, -1, None, None, None, None, IndexBase::from_raw(5))),
        Status::InvalidHandle
    );
    assert_eq!(
        status(daxpyi(Some(&handle), -1, None, None, None, None, IndexBase::from_raw(5))),
        Status::InvalidValue
    );
    assert_eq!(
        status(daxpyi(Some(&handle), -1, None, None, None, None, IndexBase::ZERO)),
        Status::InvalidSize
    );
    assert_eq!(
        daxpyi(Some(&handle), 1, None, Some(&x_val), Some(&x_ind), Some(&y), IndexBase::ZERO),
        Err(SparseError::InvalidPointer("alpha is null".to_string()))
    );
    assert_eq!(
        daxpyi(Some(&handle), 1, alpha, None, Some(&x_ind), Some(&y), IndexBase::ZERO),
        Err(SparseError::InvalidPointer("x_val is null".to_string()))
    );
    assert_eq!(
        daxpyi(Some(&handle), 1, alpha, Some(&x_val), None, Some(&y), IndexBase::ZERO),
        Err(SparseError::InvalidPointer("x_ind is null".to_string()))
    );
    assert_eq!(
        daxpyi(Some(&handle), 1, alpha, Some(&x_val), Some(&x_ind), None, IndexBase::ZERO),
        Err(SparseError::InvalidPointer("y is null".to_string()))
    );
    assert_eq!(handle.stream().stats().kernels_launched, 0);
    Ok(())
}

#[test]
fn test_scatter_one_based() -> Result<(), SparseError> {
    let (device, handle) = setup(PointerMode::HOST);
    let x_val = device.create_buffer("x_val", &[1.0f32, 2.0, 3.0])?;
    let x_ind = device.create_buffer("x_ind", &[1i32, 4, 3])?;
    let y = device.create_buffer("y", &[10.0f32, 10.0, 10.0, 10.0])?;

    saxpyi(
        Some(&handle),
        3,
        Some(ScalarArg::Host(2.0)),
        Some(&x_val),
        Some(&x_ind),
        Some(&y),
        IndexBase::ONE,
    )?;

    let stream = handle.stream();
    stream.synchronize_blocking()?;
    assert_eq!(y.read_contents_blocking(stream)?, vec![12.0, 10.0, 16.0, 14.0]);
    // x is only read.
    assert_eq!(x_val.read_contents_blocking(stream)?, vec![1.0, 2.0, 3.0]);
    Ok(())
}

#[test]
fn test_zero_alpha() -> Result<(), SparseError> {
    for mode in [PointerMode::HOST, PointerMode::DEVICE] {
        let (device, handle) = setup(mode);
        let x_val = device.create_buffer("x_val", &[5.0f64, 6.0])?;
        let x_ind = device.create_buffer("x_ind", &[0i32, 1])?;
        let y = device.create_buffer("y", &[1.0f64, 1.0])?;
        let alpha_buf = device.create_buffer("alpha", &[0.0f64])?;
        let alpha = match mode {
            PointerMode::DEVICE => ScalarArg::Device(&alpha_buf),
            _ => ScalarArg::Host(0.0),
        };

        daxpyi(
            Some(&handle),
            2,
            Some(alpha),
            Some(&x_val),
            Some(&x_ind),
            Some(&y),
            IndexBase::ZERO,
        )?;

        let stream = handle.stream();
        stream.synchronize_blocking()?;
        let expected_launches = if mode == PointerMode::DEVICE { 1 } else { 0 };
        assert_eq!(stream.stats().kernels_launched, expected_launches);
        assert_eq!(y.read_contents_blocking(stream)?, vec![1.0, 1.0]);
    }
    Ok(())
}

#[test]
fn test_random_scatter_matches_reference() -> Result<(), SparseError> {
    let (device, handle) = setup(PointerMode::DEVICE);
    let n = 2000;
    let nnz = 777;
    let mut positions: Vec<i32> = (0..n).collect();
    fastrand::shuffle(&mut positions);
    let ind = &positions[..nnz];
    let x_host: Vec<Complex32> = (0..nnz)
        .map(|_| Complex32::new(fastrand::f32(), fastrand::f32()))
        .collect();
    let y_host: Vec<Complex32> = (0..n).map(|_| Complex32::new(fastrand::f32(), 0.0)).collect();
    let alpha = Complex32::new(0.5, -1.5);

    let x_val = device.create_buffer("x_val", &x_host)?;
    let x_ind = device.create_buffer("x_ind", ind)?;
    let y = device.create_buffer("y", &y_host)?;
    let alpha_buf = device.create_buffer("alpha", &[alpha])?;

    caxpyi(
        Some(&handle),
        nnz as i32,
        Some(ScalarArg::Device(&alpha_buf)),
        Some(&x_val),
        Some(&x_ind),
        Some(&y),
        IndexBase::ZERO,
    )?;

    let mut expected = y_host.clone();
    for (value, &idx) in x_host.iter().zip(ind) {
        expected[idx as usize] = expected[idx as usize] + alpha * *value;
    }
    let stream = handle.stream();
    stream.synchronize_blocking()?;
    let got = y.read_contents_blocking(stream)?;
    for (g, e) in got.iter().zip(&expected) {
        assert!((g - e).norm() < 1e-5, "got {}, expected {}", g, e);
    }
    Ok(())
}

#[test]
fn test_generic_entry_point_and_stream_order() -> Result<(), SparseError> {
    let (device, handle) = setup(PointerMode::HOST);
    let x_val = device.create_buffer("x_val", &[1.0f64])?;
    let x_ind = device.create_buffer("x_ind", &[0i32])?;
    let y = device.create_buffer("y", &[0.0f64])?;

    // Same stream: the updates accumulate in enqueue order.
    for _ in 0..10 {
        axpyi(
            Some(&handle),
            1,
            Some(ScalarArg::Host(1.5)),
            Some(&x_val),
            Some(&x_ind),
            Some(&y),
            IndexBase::ZERO,
        )?;
    }
    let stream = handle.stream();
    stream.synchronize_blocking()?;
    assert_eq!(stream.stats().kernels_launched, 10);
    assert_eq!(y.read_contents_blocking(stream)?, vec![15.0]);
    Ok(())
}
