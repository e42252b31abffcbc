use gsparse_level1::{droti, sroti, Device, Handle, IndexBase, PointerMode, ScalarArg, Stream};
use std::time::Instant;

/// Picks `nnz` distinct positions out of `0..n`, sorted.
fn sparse_pattern(n: usize, nnz: usize) -> Vec<i32> {
    let mut positions: Vec<i32> = (0..n as i32).collect();
    fastrand::shuffle(&mut positions);
    positions.truncate(nnz);
    positions.sort_unstable();
    positions
}

fn log_stats(label: &str, stream: &Stream, elapsed: std::time::Duration) {
    let stats = stream.stats();
    log::info!("{}:", label);
    log::info!("  Kernels launched: {}", stats.kernels_launched);
    log::info!("  Bytes host -> device: {}", stats.bytes_to_device);
    log::info!("  Bytes device -> host: {}", stats.bytes_from_device);
    log::info!("  Time elapsed: {:?}", elapsed);
}

async fn run(device: &Device, n: usize, nnz: usize, rounds: usize) -> gsparse_level1::Result<()> {
    let handle = Handle::with_device(device);
    let stream = handle.stream();
    let ind = sparse_pattern(n, nnz);

    let x_host: Vec<f32> = (0..nnz).map(|_| fastrand::f32()).collect();
    let y_host: Vec<f32> = (0..n).map(|i| (i as f32 / n as f32).sin()).collect();
    let x_val = device.create_buffer("x_val", &x_host)?;
    let x_ind = device.create_buffer("x_ind", &ind)?;
    let y = device.create_buffer("y", &y_host)?;

    // 60 degree rotation applied `rounds` times.
    let (c, s) = (0.5f32, 0.75f32.sqrt());
    stream.reset_stats();
    let start = Instant::now();
    for _ in 0..rounds {
        sroti(
            Some(&handle),
            nnz as i32,
            Some(&x_val),
            Some(&x_ind),
            Some(&y),
            Some(ScalarArg::Host(c)),
            Some(ScalarArg::Host(s)),
            IndexBase::ZERO,
        )?;
    }
    stream.synchronize().await?;
    log_stats("sroti, host scalars", stream, start.elapsed());

    let result = y.read_contents(stream).await?;
    let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
    log::info!("  ||y||_2 after rotation: {:.6}", norm);

    if !stream.supports_shader_f64() {
        log::warn!("Adapter has no f64 shader support, skipping droti.");
        return Ok(());
    }

    let mut handle = handle;
    handle.set_pointer_mode(PointerMode::DEVICE);
    let stream = handle.stream();
    let widen = |values: &[f32]| values.iter().map(|&v| f64::from(v)).collect::<Vec<_>>();
    let x_val = device.create_buffer("x_val", &widen(&x_host))?;
    let y = device.create_buffer("y", &widen(&y_host))?;
    let c_dev = device.create_buffer("c", &[0.5f64])?;
    let s_dev = device.create_buffer("s", &[0.75f64.sqrt()])?;

    stream.reset_stats();
    let start = Instant::now();
    for _ in 0..rounds {
        droti(
            Some(&handle),
            nnz as i32,
            Some(&x_val),
            Some(&x_ind),
            Some(&y),
            Some(ScalarArg::Device(&c_dev)),
            Some(ScalarArg::Device(&s_dev)),
            IndexBase::ZERO,
        )?;
    }
    stream.synchronize().await?;
    log_stats("droti, device scalars", stream, start.elapsed());
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging based on RUST_LOG environment variable
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("wgpu", log::LevelFilter::Off)
        .init();

    let n = 1 << 20;
    let nnz = n / 8;
    let rounds = 6;
    log::info!("Rotating a sparse vector with {} of {} entries stored, {} rounds", nnz, n, rounds);

    match Device::emulated() {
        Ok(device) => {
            if let Err(e) = run(&device, n, nnz, rounds).await {
                log::error!("Emulated run failed: {}", e);
            }
        }
        Err(e) => log::error!("Failed to create emulated device: {}", e),
    }

    match Device::gpu().await {
        Ok(device) => {
            if let Err(e) = run(&device, n, nnz, rounds).await {
                log::error!("GPU run failed: {}", e);
            }
        }
        Err(e) => log::warn!("No GPU adapter, skipping GPU run: {}", e),
    }
}
