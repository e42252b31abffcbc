//! Lifecycle and accessor functions for handles, descriptors and opaque
//! resources.
//!
//! These follow the status contract of the C-style API: an absent handle is
//! `InvalidHandle`, an absent descriptor or resource is `InvalidPointer`.
//! Absence is modelled with `Option`; the methods on [`Handle`],
//! [`MatDescr`], [`HybMat`] and [`MatInfo`] are the direct Rust surface.

use crate::descriptor::MatDescr;
use crate::error::{Result, SparseError};
use crate::handle::Handle;
use crate::resources::{HybMat, MatInfo};
use crate::stream::Stream;
use crate::types::{DiagType, FillMode, IndexBase, MatrixType, PointerMode};

fn descr_missing() -> SparseError {
    SparseError::InvalidPointer("Matrix descriptor is null".to_string())
}

/// Creates a handle on the default device. Any failure is an internal error.
pub fn create_handle() -> Result<Handle> {
    Handle::new().map_err(|e| match e {
        SparseError::Internal(_) => e,
        other => SparseError::Internal(other.to_string()),
    })
}

/// Destroys a handle. Its stream is left alone.
pub fn destroy_handle(handle: Option<Handle>) -> Result<()> {
    let handle = handle.ok_or(SparseError::InvalidHandle)?;
    drop(handle);
    Ok(())
}

pub fn set_stream(handle: Option<&mut Handle>, stream: Stream) -> Result<()> {
    handle.ok_or(SparseError::InvalidHandle)?.set_stream(stream);
    Ok(())
}

pub fn get_stream(handle: Option<&Handle>) -> Result<Stream> {
    Ok(handle.ok_or(SparseError::InvalidHandle)?.stream().clone())
}

pub fn set_pointer_mode(handle: Option<&mut Handle>, mode: PointerMode) -> Result<()> {
    handle.ok_or(SparseError::InvalidHandle)?.set_pointer_mode(mode);
    Ok(())
}

pub fn get_pointer_mode(handle: Option<&Handle>) -> Result<PointerMode> {
    Ok(handle.ok_or(SparseError::InvalidHandle)?.pointer_mode())
}

pub fn get_version(handle: Option<&Handle>) -> Result<i32> {
    Ok(handle.ok_or(SparseError::InvalidHandle)?.version())
}

pub fn create_mat_descr() -> Result<MatDescr> {
    Ok(MatDescr::new())
}

pub fn copy_mat_descr(dest: Option<&mut MatDescr>, src: Option<&MatDescr>) -> Result<()> {
    let dest = dest.ok_or_else(descr_missing)?;
    let src = src.ok_or_else(descr_missing)?;
    dest.copy_from(src);
    Ok(())
}

pub fn destroy_mat_descr(descr: Option<MatDescr>) -> Result<()> {
    descr.ok_or_else(descr_missing).map(drop)
}

pub fn set_mat_index_base(descr: Option<&mut MatDescr>, base: IndexBase) -> Result<()> {
    descr.ok_or_else(descr_missing)?.set_index_base(base)
}

pub fn get_mat_index_base(descr: &MatDescr) -> IndexBase {
    descr.index_base()
}

pub fn set_mat_type(descr: Option<&mut MatDescr>, matrix_type: MatrixType) -> Result<()> {
    descr.ok_or_else(descr_missing)?.set_matrix_type(matrix_type)
}

pub fn get_mat_type(descr: &MatDescr) -> MatrixType {
    descr.matrix_type()
}

pub fn set_mat_fill_mode(descr: Option<&mut MatDescr>, fill_mode: FillMode) -> Result<()> {
    descr.ok_or_else(descr_missing)?.set_fill_mode(fill_mode)
}

pub fn get_mat_fill_mode(descr: &MatDescr) -> FillMode {
    descr.fill_mode()
}

pub fn set_mat_diag_type(descr: Option<&mut MatDescr>, diag_type: DiagType) -> Result<()> {
    descr.ok_or_else(descr_missing)?.set_diag_type(diag_type)
}

pub fn get_mat_diag_type(descr: &MatDescr) -> DiagType {
    descr.diag_type()
}

pub fn create_hyb_mat() -> Result<HybMat> {
    log::debug!("Created hybrid matrix container");
    Ok(HybMat::new())
}

pub fn destroy_hyb_mat(hyb: Option<HybMat>) -> Result<()> {
    hyb.ok_or_else(|| SparseError::InvalidPointer("Hybrid matrix is null".to_string()))
        .map(drop)
}

pub fn create_mat_info() -> Result<MatInfo> {
    log::debug!("Created matrix info");
    Ok(MatInfo::new())
}

pub fn destroy_mat_info(info: Option<MatInfo>) -> Result<()> {
    info.ok_or_else(|| SparseError::InvalidPointer("Matrix info is null".to_string()))
        .map(drop)
}
