//! Enumerations shared by every routine.
//!
//! These mirror C enums: each is a transparent `i32` with named constants.
//! A raw value outside the declared set is representable; routines and
//! descriptor setters reject it with `InvalidValue`.

use std::fmt;

macro_rules! c_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $value:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(i32);

        impl $name {
            $(pub const $variant: Self = Self($value);)+

            /// Wraps a raw value without checking it.
            pub const fn from_raw(raw: i32) -> Self {
                Self(raw)
            }

            pub const fn as_raw(self) -> i32 {
                self.0
            }

            /// Whether the value is one of the declared constants.
            pub fn is_valid(self) -> bool {
                matches!(self.0, $($value)|+)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.0 {
                    $($value => write!(f, "{}::{}", stringify!($name), stringify!($variant)),)+
                    raw => write!(f, "{}({})", stringify!($name), raw),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

c_enum! {
    /// Whether sparse indices count from zero or one.
    IndexBase { ZERO = 0, ONE = 1 }
}

c_enum! {
    MatrixType { GENERAL = 0, SYMMETRIC = 1, HERMITIAN = 2, TRIANGULAR = 3 }
}

c_enum! {
    FillMode { LOWER = 0, UPPER = 1 }
}

c_enum! {
    DiagType { NON_UNIT = 0, UNIT = 1 }
}

c_enum! {
    /// Where scalar arguments (rotation coefficients, `alpha`, ...) live.
    PointerMode { HOST = 0, DEVICE = 1 }
}

impl IndexBase {
    /// Offset subtracted from a stored index to get a zero-based position.
    pub fn offset(self) -> i32 {
        self.0
    }
}

impl Default for IndexBase {
    fn default() -> Self {
        IndexBase::ZERO
    }
}

impl Default for MatrixType {
    fn default() -> Self {
        MatrixType::GENERAL
    }
}

impl Default for FillMode {
    fn default() -> Self {
        FillMode::LOWER
    }
}

impl Default for DiagType {
    fn default() -> Self {
        DiagType::NON_UNIT
    }
}

impl Default for PointerMode {
    fn default() -> Self {
        PointerMode::HOST
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_values_are_valid() {
        assert!(IndexBase::ZERO.is_valid());
        assert!(IndexBase::ONE.is_valid());
        assert!(MatrixType::TRIANGULAR.is_valid());
        assert!(FillMode::UPPER.is_valid());
        assert!(DiagType::UNIT.is_valid());
        assert!(PointerMode::DEVICE.is_valid());
    }

    #[test]
    fn test_raw_values_outside_domain() {
        assert!(!IndexBase::from_raw(2).is_valid());
        assert!(!IndexBase::from_raw(-1).is_valid());
        assert!(!MatrixType::from_raw(4).is_valid());
        assert!(!FillMode::from_raw(7).is_valid());
        assert!(!DiagType::from_raw(2).is_valid());
    }

    #[test]
    fn test_debug_names() {
        assert_eq!(format!("{:?}", IndexBase::ONE), "IndexBase::ONE");
        assert_eq!(format!("{:?}", FillMode::from_raw(9)), "FillMode(9)");
        assert_eq!(IndexBase::ONE.to_string(), "1");
    }
}
