use crate::error::{Result, SparseError};
use crate::types::{DiagType, FillMode, IndexBase, MatrixType};

/// Metadata attached to a sparse matrix argument.
///
/// Independent of any handle. `Clone` and [`MatDescr::copy_from`] copy
/// every field by value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatDescr {
    index_base: IndexBase,
    matrix_type: MatrixType,
    fill_mode: FillMode,
    diag_type: DiagType,
}

fn reject(field: &str, raw: i32) -> SparseError {
    SparseError::InvalidValue(format!("{} {} is outside its domain", field, raw))
}

impl MatDescr {
    /// General, zero-based, lower fill, non-unit diagonal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites all four fields with those of `src`.
    pub fn copy_from(&mut self, src: &MatDescr) {
        *self = src.clone();
    }

    pub fn index_base(&self) -> IndexBase {
        self.index_base
    }

    pub fn set_index_base(&mut self, base: IndexBase) -> Result<()> {
        if !base.is_valid() {
            return Err(reject("Index base", base.as_raw()));
        }
        self.index_base = base;
        Ok(())
    }

    pub fn matrix_type(&self) -> MatrixType {
        self.matrix_type
    }

    pub fn set_matrix_type(&mut self, matrix_type: MatrixType) -> Result<()> {
        if !matrix_type.is_valid() {
            return Err(reject("Matrix type", matrix_type.as_raw()));
        }
        self.matrix_type = matrix_type;
        Ok(())
    }

    pub fn fill_mode(&self) -> FillMode {
        self.fill_mode
    }

    pub fn set_fill_mode(&mut self, fill_mode: FillMode) -> Result<()> {
        if !fill_mode.is_valid() {
            return Err(reject("Fill mode", fill_mode.as_raw()));
        }
        self.fill_mode = fill_mode;
        Ok(())
    }

    pub fn diag_type(&self) -> DiagType {
        self.diag_type
    }

    pub fn set_diag_type(&mut self, diag_type: DiagType) -> Result<()> {
        if !diag_type.is_valid() {
            return Err(reject("Diagonal type", diag_type.as_raw()));
        }
        self.diag_type = diag_type;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let descr = MatDescr::new();
        assert_eq!(descr.index_base(), IndexBase::ZERO);
        assert_eq!(descr.matrix_type(), MatrixType::GENERAL);
        assert_eq!(descr.fill_mode(), FillMode::LOWER);
        assert_eq!(descr.diag_type(), DiagType::NON_UNIT);
    }

    #[test]
    fn test_setters_store_valid_values() {
        let mut descr = MatDescr::new();
        descr.set_index_base(IndexBase::ONE).unwrap();
        descr.set_matrix_type(MatrixType::HERMITIAN).unwrap();
        descr.set_fill_mode(FillMode::UPPER).unwrap();
        descr.set_diag_type(DiagType::UNIT).unwrap();
        assert_eq!(descr.index_base(), IndexBase::ONE);
        assert_eq!(descr.matrix_type(), MatrixType::HERMITIAN);
        assert_eq!(descr.fill_mode(), FillMode::UPPER);
        assert_eq!(descr.diag_type(), DiagType::UNIT);
    }

    #[test]
    fn test_invalid_values_leave_descriptor_unchanged() {
        let mut descr = MatDescr::new();
        descr.set_matrix_type(MatrixType::SYMMETRIC).unwrap();
        let before = descr.clone();

        assert!(matches!(
            descr.set_index_base(IndexBase::from_raw(2)),
            Err(SparseError::InvalidValue(_))
        ));
        assert!(matches!(
            descr.set_matrix_type(MatrixType::from_raw(-1)),
            Err(SparseError::InvalidValue(_))
        ));
        assert!(matches!(
            descr.set_fill_mode(FillMode::from_raw(5)),
            Err(SparseError::InvalidValue(_))
        ));
        assert!(matches!(
            descr.set_diag_type(DiagType::from_raw(3)),
            Err(SparseError::InvalidValue(_))
        ));
        assert_eq!(descr, before);
    }

    #[test]
    fn test_copy_is_independent_of_source() {
        let mut src = MatDescr::new();
        src.set_index_base(IndexBase::ONE).unwrap();
        src.set_fill_mode(FillMode::UPPER).unwrap();
        let mut dest = MatDescr::new();
        dest.copy_from(&src);

        src.set_index_base(IndexBase::ZERO).unwrap();
        src.set_matrix_type(MatrixType::TRIANGULAR).unwrap();
        assert_eq!(dest.index_base(), IndexBase::ONE);
        assert_eq!(dest.matrix_type(), MatrixType::GENERAL);
        assert_eq!(dest.fill_mode(), FillMode::UPPER);
    }
}
