use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value types of the host program representation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Void,
    Label,
    /// Integer type with the given bit width (`i1`, `i32`, ...)
    Int(u32),
    Float,
    Double,
    Ptr,
    Vector { len: u32, elem: Box<Type> },
    Struct(Vec<Type>),
    Array { len: u64, elem: Box<Type> },
}

impl Type {
    /// Shorthand for `Type::Int(bits)`
    pub fn int(bits: u32) -> Self {
        Type::Int(bits)
    }

    /// Shorthand for a vector of `len` elements of type `elem`
    pub fn vector(len: u32, elem: Type) -> Self {
        Type::Vector {
            len,
            elem: Box::new(elem),
        }
    }

    /// Shorthand for an array of `len` elements of type `elem`
    pub fn array(len: u64, elem: Type) -> Self {
        Type::Array {
            len,
            elem: Box::new(elem),
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Type::Vector { .. })
    }

    /// Struct and array types
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Type::Struct(_) | Type::Array { .. })
    }

    /// Check for an integer type of exactly `bits` width
    pub fn is_int(&self, bits: u32) -> bool {
        matches!(self, Type::Int(width) if *width == bits)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Label => write!(f, "label"),
            Type::Int(bits) => write!(f, "i{bits}"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Ptr => write!(f, "ptr"),
            Type::Vector { len, elem } => write!(f, "<{len} x {elem}>"),
            Type::Struct(fields) => write!(f, "{{ {} }}", fields.iter().join(", ")),
            Type::Array { len, elem } => write!(f, "[{len} x {elem}]"),
        }
    }
}

/// Linkage kinds of global values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    #[default]
    External,
    AvailableExternally,
    LinkOnce,
    LinkOnceOdr,
    Weak,
    WeakOdr,
    Appending,
    Internal,
    Private,
    ExternWeak,
    Common,
}

impl Linkage {
    /// `weak` and `weak_odr`. `extern_weak` and the linkonce kinds are not weak linkage.
    pub fn is_weak(self) -> bool {
        matches!(self, Linkage::Weak | Linkage::WeakOdr)
    }

    pub fn is_internal(self) -> bool {
        self == Linkage::Internal
    }

    pub fn is_external(self) -> bool {
        self == Linkage::External
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Linkage::External => "external",
            Linkage::AvailableExternally => "available_externally",
            Linkage::LinkOnce => "linkonce",
            Linkage::LinkOnceOdr => "linkonce_odr",
            Linkage::Weak => "weak",
            Linkage::WeakOdr => "weak_odr",
            Linkage::Appending => "appending",
            Linkage::Internal => "internal",
            Linkage::Private => "private",
            Linkage::ExternWeak => "extern_weak",
            Linkage::Common => "common",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_and_vector_queries() {
        assert!(Type::vector(4, Type::int(32)).is_vector());
        assert!(!Type::vector(4, Type::int(32)).is_aggregate());
        assert!(Type::Struct(vec![Type::int(8), Type::Ptr]).is_aggregate());
        assert!(Type::array(2, Type::Float).is_aggregate());
        assert!(Type::int(1).is_int(1));
        assert!(!Type::int(8).is_int(1));
    }

    #[test]
    fn weak_linkage_covers_weak_and_weak_odr_only() {
        assert!(Linkage::Weak.is_weak());
        assert!(Linkage::WeakOdr.is_weak());
        assert!(!Linkage::ExternWeak.is_weak());
        assert!(!Linkage::LinkOnce.is_weak());
        assert!(!Linkage::Private.is_internal());
    }

    #[test]
    fn type_rendering() {
        assert_eq!("<4 x i32>", Type::vector(4, Type::int(32)).to_string());
        assert_eq!(
            "{ i8, [2 x ptr] }",
            Type::Struct(vec![Type::int(8), Type::array(2, Type::Ptr)]).to_string()
        );
    }
}
