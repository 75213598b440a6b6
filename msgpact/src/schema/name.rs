//! Canonical type naming for union members.
//!
//! Union values carry their member's name on the wire, so the rendering must
//! be stable across processes: primitives use their canonical lowercase
//! names, sequences render as `T[]`, nullables as `T?`, generic
//! instantiations as `Outer(Inner1,Inner2)`, and plain user types as their
//! unqualified type name. The derive macros emit `TypeName` impls alongside
//! `SchemaWrite`.
use {
    super::containers::Bytes,
    rust_decimal::Decimal,
    std::{
        collections::{BTreeMap, HashMap},
        time::{Duration, SystemTime},
    },
};

/// The canonical human-readable identifier for a type on the wire.
pub trait TypeName {
    fn type_name() -> String;
}

macro_rules! impl_primitive_name {
    ($($ty:ty => $name:literal,)*) => {
        $(
            impl TypeName for $ty {
                fn type_name() -> String {
                    $name.to_string()
                }
            }
        )*
    };
}

impl_primitive_name! {
    bool => "bool",
    i8 => "int8",
    i16 => "int16",
    i32 => "int32",
    i64 => "int64",
    u8 => "uint8",
    u16 => "uint16",
    u32 => "uint32",
    u64 => "uint64",
    f32 => "float32",
    f64 => "float64",
    String => "string",
    str => "string",
    Bytes => "bytes",
    Decimal => "decimal",
    SystemTime => "timestamp",
    Duration => "duration",
    () => "empty",
}

impl<T: TypeName> TypeName for Vec<T> {
    fn type_name() -> String {
        format!("{}[]", T::type_name())
    }
}

impl<T: TypeName> TypeName for Option<T> {
    fn type_name() -> String {
        format!("{}?", T::type_name())
    }
}

impl<T: TypeName> TypeName for Box<T> {
    fn type_name() -> String {
        T::type_name()
    }
}

impl<K: TypeName, V: TypeName> TypeName for HashMap<K, V> {
    fn type_name() -> String {
        format!("Dictionary({},{})", K::type_name(), V::type_name())
    }
}

impl<K: TypeName, V: TypeName> TypeName for BTreeMap<K, V> {
    fn type_name() -> String {
        format!("Dictionary({},{})", K::type_name(), V::type_name())
    }
}

macro_rules! impl_tuple_name {
    ($($ty:ident),+) => {
        impl<$($ty: TypeName),+> TypeName for ($($ty,)+) {
            fn type_name() -> String {
                let parts = [$($ty::type_name()),+];
                format!("Tuple({})", parts.join(","))
            }
        }
    };
}

impl_tuple_name!(A, B);
impl_tuple_name!(A, B, C);
impl_tuple_name!(A, B, C, D);
impl_tuple_name!(A, B, C, D, E);
impl_tuple_name!(A, B, C, D, E, F);
impl_tuple_name!(A, B, C, D, E, F, G);
impl_tuple_name!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_renderings() {
        assert_eq!(i32::type_name(), "int32");
        assert_eq!(<Vec<String>>::type_name(), "string[]");
        assert_eq!(<Vec<Vec<u8>>>::type_name(), "uint8[][]");
        assert_eq!(<Option<f64>>::type_name(), "float64?");
        assert_eq!(
            <HashMap<String, i64>>::type_name(),
            "Dictionary(string,int64)"
        );
        assert_eq!(<(i32, String)>::type_name(), "Tuple(int32,string)");
        assert_eq!(<Box<bool>>::type_name(), "bool");
        assert_eq!(Bytes::type_name(), "bytes");
    }
}
