use bytemuck::{Pod, Zeroable};
use num_complex::{Complex32, Complex64};
use num_traits::{One, Zero};
use std::fmt::{Debug, Display};
use std::ops::{Add, Mul, Sub};

/// Anything that can live in a device buffer.
/// Needs Send + Sync because streams execute on their own threads.
pub trait Element: Copy + Debug + Pod + Zeroable + Send + Sync + 'static {}

impl<T: Copy + Debug + Pod + Zeroable + Send + Sync + 'static> Element for T {}

/// Numeric element type of the sparse routines.
///
/// Each implementor gets its own monomorphized copy of every routine; the
/// associated constants describe how that copy is named and which GPU
/// kernels exist for it.
pub trait Scalar:
    Element
    + PartialEq
    + Display
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
{
    /// Precision letter used in routine names (`s`, `d`, `c`, `z`).
    const PREFIX: char;

    /// WGSL spelling of the type, `None` when no shader can express it.
    const WGSL_TYPE: Option<&'static str>;

    /// Whether shaders over this type need `SHADER_F64`.
    const NEEDS_SHADER_F64: bool;

    /// Full routine name for this precision, e.g. `gsparse_droti`.
    fn routine_name(base: &str) -> String {
        format!("gsparse_{}{}", Self::PREFIX, base)
    }
}

impl Scalar for f32 {
    const PREFIX: char = 's';
    const WGSL_TYPE: Option<&'static str> = Some("f32");
    const NEEDS_SHADER_F64: bool = false;
}

impl Scalar for f64 {
    const PREFIX: char = 'd';
    const WGSL_TYPE: Option<&'static str> = Some("f64");
    const NEEDS_SHADER_F64: bool = true;
}

impl Scalar for Complex32 {
    const PREFIX: char = 'c';
    const WGSL_TYPE: Option<&'static str> = None;
    const NEEDS_SHADER_F64: bool = false;
}

impl Scalar for Complex64 {
    const PREFIX: char = 'z';
    const WGSL_TYPE: Option<&'static str> = None;
    const NEEDS_SHADER_F64: bool = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routine_names() {
        assert_eq!(f32::routine_name("roti"), "gsparse_sroti");
        assert_eq!(f64::routine_name("roti"), "gsparse_droti");
        assert_eq!(Complex32::routine_name("axpyi"), "gsparse_caxpyi");
        assert_eq!(Complex64::routine_name("axpyi"), "gsparse_zaxpyi");
    }

    #[test]
    fn test_identity_checks() {
        assert!(1.0f32.is_one());
        assert!(!0.5f64.is_one());
        assert!(Complex64::new(1.0, 0.0).is_one());
        assert!(!Complex64::new(1.0, 1e-12).is_one());
        assert!(Complex32::new(0.0, 0.0).is_zero());
    }
}
