use thiserror::Error;

pub type Result<T> = core::result::Result<T, SparseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SparseError {
    #[error("Invalid handle")]
    InvalidHandle,

    #[error("Invalid pointer: {0}")]
    InvalidPointer(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("WGPU initialization failed: {0}")]
    WgpuInit(String),

    #[error("WGPU error: {0}")]
    Wgpu(String),
}

/// Status codes returned across the library boundary.
///
/// The numeric values match the C header family this API mirrors, so a
/// status can be handed to foreign callers unchanged.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success = 0,
    InvalidHandle = 1,
    NotImplemented = 2,
    InvalidPointer = 3,
    InvalidSize = 4,
    InternalError = 6,
    InvalidValue = 7,
}

impl Status {
    /// Collapses any library result into its status code.
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Status::Success,
            Err(e) => Status::from(e),
        }
    }

    pub fn is_success(self) -> bool {
        self == Status::Success
    }
}

impl From<&SparseError> for Status {
    fn from(err: &SparseError) -> Self {
        match err {
            SparseError::InvalidHandle => Status::InvalidHandle,
            SparseError::InvalidPointer(_) => Status::InvalidPointer,
            SparseError::InvalidValue(_) => Status::InvalidValue,
            SparseError::InvalidSize(_) => Status::InvalidSize,
            SparseError::NotImplemented(_) => Status::NotImplemented,
            SparseError::Internal(_) | SparseError::WgpuInit(_) | SparseError::Wgpu(_) => {
                Status::InternalError
            }
        }
    }
}

impl From<SparseError> for Status {
    fn from(err: SparseError) -> Self {
        Status::from(&err)
    }
}

impl From<std::io::Error> for SparseError {
    fn from(err: std::io::Error) -> Self {
        SparseError::Internal(format!("IO error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_match_c_values() {
        assert_eq!(Status::Success as i32, 0);
        assert_eq!(Status::InvalidHandle as i32, 1);
        assert_eq!(Status::NotImplemented as i32, 2);
        assert_eq!(Status::InvalidPointer as i32, 3);
        assert_eq!(Status::InvalidSize as i32, 4);
        assert_eq!(Status::InternalError as i32, 6);
        assert_eq!(Status::InvalidValue as i32, 7);
    }

    #[test]
    fn test_backend_errors_surface_as_internal() {
        let err = SparseError::Wgpu("lost device".to_string());
        assert_eq!(Status::from(&err), Status::InternalError);
        let err = SparseError::WgpuInit("no adapter".to_string());
        assert_eq!(Status::from(err), Status::InternalError);
    }

    #[test]
    fn test_from_result() {
        let ok: Result<()> = Ok(());
        assert!(Status::from_result(&ok).is_success());
        let err: Result<()> = Err(SparseError::InvalidSize("nnz".to_string()));
        assert_eq!(Status::from_result(&err), Status::InvalidSize);
    }
}
