//! Opaque resources filled in by analysis and format conversion routines.
//!
//! Both types are created empty. Numeric routines only read them.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// How a hybrid matrix splits rows between its ELL and COO parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HybPartition {
    /// Width chosen from the row length distribution.
    #[default]
    Auto,
    /// Width supplied by the caller.
    User,
    /// Width of the longest row; the COO part stays empty.
    Max,
}

/// Shape of a hybrid (ELL + COO) matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HybLayout {
    pub rows: i32,
    pub cols: i32,
    pub partition: HybPartition,
    pub ell_width: i32,
    pub ell_nnz: i32,
    pub coo_nnz: i32,
}

impl HybLayout {
    pub fn nnz(&self) -> i64 {
        self.ell_nnz as i64 + self.coo_nnz as i64
    }
}

/// Container for a matrix in hybrid storage.
#[derive(Debug, Default)]
pub struct HybMat {
    layout: Option<HybLayout>,
}

impl HybMat {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until a conversion routine has filled the container.
    pub fn layout(&self) -> Option<&HybLayout> {
        self.layout.as_ref()
    }

    pub fn set_layout(&mut self, layout: HybLayout) {
        self.layout = Some(layout);
    }

    pub fn is_populated(&self) -> bool {
        self.layout.is_some()
    }
}

/// The analysis a [`MatInfo`] entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    Csrmv,
    Csrsv,
    Csrilu0,
    Csric0,
}

/// Cache of per-matrix analysis results, one entry per [`AnalysisKind`].
#[derive(Default)]
pub struct MatInfo {
    entries: HashMap<AnalysisKind, Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for MatInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatInfo")
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MatInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` under `kind`, replacing any previous entry.
    pub fn insert<T: Any + Send + Sync>(&mut self, kind: AnalysisKind, data: T) {
        self.entries.insert(kind, Box::new(data));
    }

    /// The entry for `kind`, if present and of type `T`.
    pub fn get<T: Any + Send + Sync>(&self, kind: AnalysisKind) -> Option<&T> {
        self.entries.get(&kind).and_then(|entry| entry.downcast_ref())
    }

    pub fn contains(&self, kind: AnalysisKind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn remove(&mut self, kind: AnalysisKind) -> bool {
        self.entries.remove(&kind).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct RowBlocks(Vec<i32>);

    #[test]
    fn test_hyb_mat_starts_empty() {
        let mut hyb = HybMat::new();
        assert!(!hyb.is_populated());
        hyb.set_layout(HybLayout {
            rows: 4,
            cols: 4,
            partition: HybPartition::Max,
            ell_width: 3,
            ell_nnz: 12,
            coo_nnz: 0,
        });
        assert_eq!(hyb.layout().map(HybLayout::nnz), Some(12));
    }

    #[test]
    fn test_mat_info_typed_entries() {
        let mut info = MatInfo::new();
        assert!(info.is_empty());
        info.insert(AnalysisKind::Csrmv, RowBlocks(vec![0, 2, 4]));
        assert_eq!(
            info.get::<RowBlocks>(AnalysisKind::Csrmv),
            Some(&RowBlocks(vec![0, 2, 4]))
        );
        assert!(info.get::<u32>(AnalysisKind::Csrmv).is_none());
        assert!(info.get::<RowBlocks>(AnalysisKind::Csrsv).is_none());
    }

    #[test]
    fn test_mat_info_remove_and_clear() {
        let mut info = MatInfo::new();
        info.insert(AnalysisKind::Csrsv, 1u32);
        info.insert(AnalysisKind::Csric0, 2u32);
        assert!(info.remove(AnalysisKind::Csrsv));
        assert!(!info.remove(AnalysisKind::Csrsv));
        assert!(info.contains(AnalysisKind::Csric0));
        info.clear();
        assert!(info.is_empty());
    }
}
