// SPDX-License-Identifier: Apache-2.0

//! Tagged attribute values.
//!
//! A closed sum type over every payload kind a manifest may carry. The tag
//! can never desynchronize from the payload: construction, copy, and drop of
//! each variant are compiler-enforced, and typed extraction reports the
//! stored kind on mismatch instead of misreading the value.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::set::AttrSet;

/// Opaque object handle. Compared by identity, cloned by handle.
///
/// The payload itself is never inspected by the runtime; collaborators
/// downcast on their side of the boundary.
#[derive(Clone)]
pub struct ObjectHandle(Arc<dyn Any + Send + Sync>);

impl ObjectHandle {
    /// Wrap an arbitrary payload in an opaque handle.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the payload as a concrete type, if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectHandle")
            .field(&Arc::as_ptr(&self.0))
            .finish()
    }
}

/// The kind tag of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    Bool,
    Byte,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    String,
    Set,
    Object,
    ByteArray,
    Int32Array,
    UInt32Array,
    Int64Array,
    UInt64Array,
    FloatArray,
    StringArray,
    ObjectArray,
}

impl AttrKind {
    /// Get the kind name for error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::Int32 => "i32",
            Self::UInt32 => "u32",
            Self::Int64 => "i64",
            Self::UInt64 => "u64",
            Self::Float => "f64",
            Self::String => "string",
            Self::Set => "set",
            Self::Object => "object",
            Self::ByteArray => "byte[]",
            Self::Int32Array => "i32[]",
            Self::UInt32Array => "u32[]",
            Self::Int64Array => "i64[]",
            Self::UInt64Array => "u64[]",
            Self::FloatArray => "f64[]",
            Self::StringArray => "string[]",
            Self::ObjectArray => "object[]",
        }
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One attribute payload. Scalars, UTF-8 strings, nested sets, opaque
/// handles, and homogeneous arrays of everything but bool and nested sets.
///
/// `Clone` deep-copies every heap-backed payload; two clones never alias.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Byte(u8),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f64),
    String(String),
    Set(AttrSet),
    Object(ObjectHandle),
    ByteArray(Vec<u8>),
    Int32Array(Vec<i32>),
    UInt32Array(Vec<u32>),
    Int64Array(Vec<i64>),
    UInt64Array(Vec<u64>),
    FloatArray(Vec<f64>),
    StringArray(Vec<String>),
    ObjectArray(Vec<ObjectHandle>),
}

impl AttrValue {
    /// The kind tag of the live variant.
    pub const fn kind(&self) -> AttrKind {
        match self {
            Self::Bool(_) => AttrKind::Bool,
            Self::Byte(_) => AttrKind::Byte,
            Self::Int32(_) => AttrKind::Int32,
            Self::UInt32(_) => AttrKind::UInt32,
            Self::Int64(_) => AttrKind::Int64,
            Self::UInt64(_) => AttrKind::UInt64,
            Self::Float(_) => AttrKind::Float,
            Self::String(_) => AttrKind::String,
            Self::Set(_) => AttrKind::Set,
            Self::Object(_) => AttrKind::Object,
            Self::ByteArray(_) => AttrKind::ByteArray,
            Self::Int32Array(_) => AttrKind::Int32Array,
            Self::UInt32Array(_) => AttrKind::UInt32Array,
            Self::Int64Array(_) => AttrKind::Int64Array,
            Self::UInt64Array(_) => AttrKind::UInt64Array,
            Self::FloatArray(_) => AttrKind::FloatArray,
            Self::StringArray(_) => AttrKind::StringArray,
            Self::ObjectArray(_) => AttrKind::ObjectArray,
        }
    }

    /// Element count: 1 for scalars, array length for arrays.
    pub fn count(&self) -> usize {
        match self {
            Self::ByteArray(v) => v.len(),
            Self::Int32Array(v) => v.len(),
            Self::UInt32Array(v) => v.len(),
            Self::Int64Array(v) => v.len(),
            Self::UInt64Array(v) => v.len(),
            Self::FloatArray(v) => v.len(),
            Self::StringArray(v) => v.len(),
            Self::ObjectArray(v) => v.len(),
            _ => 1,
        }
    }

    /// Whether the value is an array kind.
    pub const fn is_array(&self) -> bool {
        matches!(
            self.kind(),
            AttrKind::ByteArray
                | AttrKind::Int32Array
                | AttrKind::UInt32Array
                | AttrKind::Int64Array
                | AttrKind::UInt64Array
                | AttrKind::FloatArray
                | AttrKind::StringArray
                | AttrKind::ObjectArray
        )
    }
}

/// Typed extraction found a different kind than the accessor requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindMismatch {
    pub requested: AttrKind,
    pub actual: AttrKind,
}

macro_rules! owned_conversions {
    ($( $variant:ident => $ty:ty ),+ $(,)?) => {
        $(
            impl From<$ty> for AttrValue {
                fn from(value: $ty) -> Self {
                    AttrValue::$variant(value)
                }
            }

            impl<'a> TryFrom<&'a AttrValue> for $ty {
                type Error = KindMismatch;

                fn try_from(value: &'a AttrValue) -> Result<Self, KindMismatch> {
                    match value {
                        AttrValue::$variant(v) => Ok(v.clone()),
                        other => Err(KindMismatch {
                            requested: AttrKind::$variant,
                            actual: other.kind(),
                        }),
                    }
                }
            }
        )+
    };
}

owned_conversions! {
    Bool => bool,
    Byte => u8,
    Int32 => i32,
    UInt32 => u32,
    Int64 => i64,
    UInt64 => u64,
    Float => f64,
    String => String,
    Set => AttrSet,
    Object => ObjectHandle,
    ByteArray => Vec<u8>,
    Int32Array => Vec<i32>,
    UInt32Array => Vec<u32>,
    Int64Array => Vec<i64>,
    UInt64Array => Vec<u64>,
    FloatArray => Vec<f64>,
    StringArray => Vec<String>,
    ObjectArray => Vec<ObjectHandle>,
}

macro_rules! slice_conversions {
    ($( $variant:ident => $elem:ty ),+ $(,)?) => {
        $(
            impl<'a> TryFrom<&'a AttrValue> for &'a [$elem] {
                type Error = KindMismatch;

                fn try_from(value: &'a AttrValue) -> Result<Self, KindMismatch> {
                    match value {
                        AttrValue::$variant(v) => Ok(v.as_slice()),
                        other => Err(KindMismatch {
                            requested: AttrKind::$variant,
                            actual: other.kind(),
                        }),
                    }
                }
            }
        )+
    };
}

slice_conversions! {
    ByteArray => u8,
    Int32Array => i32,
    UInt32Array => u32,
    Int64Array => i64,
    UInt64Array => u64,
    FloatArray => f64,
    StringArray => String,
    ObjectArray => ObjectHandle,
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_owned())
    }
}

impl From<Vec<&str>> for AttrValue {
    fn from(value: Vec<&str>) -> Self {
        AttrValue::StringArray(value.into_iter().map(str::to_owned).collect())
    }
}

impl<'a> TryFrom<&'a AttrValue> for &'a str {
    type Error = KindMismatch;

    fn try_from(value: &'a AttrValue) -> Result<Self, KindMismatch> {
        match value {
            AttrValue::String(s) => Ok(s.as_str()),
            other => Err(KindMismatch {
                requested: AttrKind::String,
                actual: other.kind(),
            }),
        }
    }
}

impl<'a> TryFrom<&'a AttrValue> for &'a AttrSet {
    type Error = KindMismatch;

    fn try_from(value: &'a AttrValue) -> Result<Self, KindMismatch> {
        match value {
            AttrValue::Set(s) => Ok(s),
            other => Err(KindMismatch {
                requested: AttrKind::Set,
                actual: other.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(AttrValue::from(true).kind(), AttrKind::Bool);
        assert_eq!(AttrValue::from(7u8).kind(), AttrKind::Byte);
        assert_eq!(AttrValue::from(-1i32).kind(), AttrKind::Int32);
        assert_eq!(AttrValue::from(1u32).kind(), AttrKind::UInt32);
        assert_eq!(AttrValue::from(-1i64).kind(), AttrKind::Int64);
        assert_eq!(AttrValue::from(1u64).kind(), AttrKind::UInt64);
        assert_eq!(AttrValue::from(2.5f64).kind(), AttrKind::Float);
        assert_eq!(AttrValue::from("x").kind(), AttrKind::String);
        assert_eq!(AttrValue::from(AttrSet::new()).kind(), AttrKind::Set);
        assert_eq!(AttrValue::from(vec![1u8, 2]).kind(), AttrKind::ByteArray);
        assert_eq!(
            AttrValue::from(vec!["a".to_string()]).kind(),
            AttrKind::StringArray
        );
    }

    #[test]
    fn test_count() {
        assert_eq!(AttrValue::from(5i32).count(), 1);
        assert_eq!(AttrValue::from(vec![1u8, 2, 3]).count(), 3);
        assert_eq!(AttrValue::from(Vec::<f64>::new()).count(), 0);
        assert!(!AttrValue::from(5i32).is_array());
        assert!(AttrValue::from(vec![5i32]).is_array());
    }

    #[test]
    fn test_typed_extraction_mismatch() {
        let value = AttrValue::from("text");
        let err = i32::try_from(&value).unwrap_err();
        assert_eq!(err.requested, AttrKind::Int32);
        assert_eq!(err.actual, AttrKind::String);
    }

    #[test]
    fn test_slice_extraction() {
        let value = AttrValue::from(vec![1u32, 2, 3]);
        let slice: &[u32] = (&value).try_into().unwrap();
        assert_eq!(slice, &[1, 2, 3]);
    }

    #[test]
    fn test_object_handle_identity() {
        let a = ObjectHandle::new(42u64);
        let b = a.clone();
        let c = ObjectHandle::new(42u64);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.downcast_ref::<u64>(), Some(&42));
        assert_eq!(a.downcast_ref::<i32>(), None);
    }

    #[test]
    fn test_float_equality_is_plain() {
        assert_eq!(AttrValue::from(1.5f64), AttrValue::from(1.5f64));
        assert_ne!(AttrValue::from(f64::NAN), AttrValue::from(f64::NAN));
    }
}
