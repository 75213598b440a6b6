//! The schema model.
//!
//! A schema describes the wire shape of a type: what a serializer produces
//! ([`WriteSchema`]) or what a deserializer expects ([`ReadSchema`]). The two
//! flavors carry the same structural content; only the read flavor gives
//! meaning to field defaults.
//!
//! Shapes compose by value (primitives, nullables, tuples, sequences,
//! mappings, the empty shape) except for the three variants with identity:
//! complex records, unions, and enums. Those live as nodes in a
//! [`SchemaCollection`] arena and are referenced by [`NodeId`], which is what
//! lets mutually recursive types close into finite graphs.
use {
    crate::{
        error::{ReadResult, WriteResult},
        wire::{Decoder, Encoder},
    },
    std::{
        cmp::Ordering,
        io::{Read, Write},
    },
};

pub mod collection;
mod compat;
pub mod containers;
mod impls;
pub mod name;
pub mod record;
mod xml;

pub use {collection::SchemaCollection, name::TypeName, record::RecordReader};

/// The scalar atoms of the wire format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    Binary,
    Decimal,
    Timestamp,
    Duration,
}

impl PrimitiveKind {
    /// The canonical lowercase name, used for union member naming and the
    /// XML schema form.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Int8 => "int8",
            PrimitiveKind::Int16 => "int16",
            PrimitiveKind::Int32 => "int32",
            PrimitiveKind::Int64 => "int64",
            PrimitiveKind::UInt8 => "uint8",
            PrimitiveKind::UInt16 => "uint16",
            PrimitiveKind::UInt32 => "uint32",
            PrimitiveKind::UInt64 => "uint64",
            PrimitiveKind::Float32 => "float32",
            PrimitiveKind::Float64 => "float64",
            PrimitiveKind::String => "string",
            PrimitiveKind::Binary => "bytes",
            PrimitiveKind::Decimal => "decimal",
            PrimitiveKind::Timestamp => "timestamp",
            PrimitiveKind::Duration => "duration",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => PrimitiveKind::Bool,
            "int8" => PrimitiveKind::Int8,
            "int16" => PrimitiveKind::Int16,
            "int32" => PrimitiveKind::Int32,
            "int64" => PrimitiveKind::Int64,
            "uint8" => PrimitiveKind::UInt8,
            "uint16" => PrimitiveKind::UInt16,
            "uint32" => PrimitiveKind::UInt32,
            "uint64" => PrimitiveKind::UInt64,
            "float32" => PrimitiveKind::Float32,
            "float64" => PrimitiveKind::Float64,
            "string" => PrimitiveKind::String,
            "bytes" => PrimitiveKind::Binary,
            "decimal" => PrimitiveKind::Decimal,
            "timestamp" => PrimitiveKind::Timestamp,
            "duration" => PrimitiveKind::Duration,
            _ => return None,
        })
    }
}

/// Identifier of a by-reference node within one [`SchemaCollection`].
///
/// Ids are meaningless across collections; `copy_to` re-interns nodes in the
/// target collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

/// The structural shape of a schema.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Primitive(PrimitiveKind),
    /// Nil or the inner shape.
    Nullable(Box<Shape>),
    /// Fixed-arity array of heterogeneous elements.
    Tuple(Vec<Shape>),
    /// Variable-length array of one element shape.
    Sequence(Box<Shape>),
    /// Map of key shape to value shape.
    Mapping(Box<Shape>, Box<Shape>),
    /// The zero-entry map; readable from anything under the relaxed policy.
    Empty,
    /// A complex record, union, or enum node in the owning collection.
    Ref(NodeId),
}

/// One field of a complex record schema.
///
/// `has_default` is carried on read schemas only; write schemas always
/// describe an exhaustive wire map and store `false`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub schema: Shape,
    pub has_default: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Shape) -> Self {
        Field {
            name: name.into(),
            schema,
            has_default: false,
        }
    }

    pub fn with_default(name: impl Into<String>, schema: Shape) -> Self {
        Field {
            name: name.into(),
            schema,
            has_default: true,
        }
    }
}

/// One member of a union schema. The name is the member type's canonical
/// [`TypeName`] rendering.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Member {
    pub name: String,
    pub schema: Shape,
}

impl Member {
    pub fn new(name: impl Into<String>, schema: Shape) -> Self {
        Member {
            name: name.into(),
            schema,
        }
    }
}

/// Body of a by-reference node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum NodeBody {
    /// Allocated but not yet populated; only observable mid-derivation.
    Pending,
    Complex(Vec<Field>),
    Union(Vec<Member>),
    Enum(Vec<String>),
}

/// A schema describing what a serializer emits for some type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteSchema {
    pub(crate) shape: Shape,
}

impl WriteSchema {
    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

/// A schema describing what a deserializer expects for some type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadSchema {
    pub(crate) shape: Shape,
}

impl ReadSchema {
    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

/// Types that can be serialized to the wire format.
///
/// `Src` is the in-memory type being written; it is `Self` everywhere except
/// adapter types like [`containers::Bytes`], which reinterpret another type's
/// wire form and are selected per field with `#[msgpact(with = "…")]`.
pub trait SchemaWrite {
    type Src: ?Sized;

    /// The shape this type writes, built within `collection`.
    fn write_schema(collection: &mut SchemaCollection) -> Shape;

    /// Write `src` to the wire.
    fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()>;
}

/// Types that can be deserialized from the wire format.
pub trait SchemaRead {
    type Dst;

    /// The shape this type expects, built within `collection`.
    fn read_schema(collection: &mut SchemaCollection) -> Shape;

    /// Read one value from the wire.
    fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst>;
}

/// The field/member name ordering: case-insensitive lexicographic with an
/// ASCII fold. Locale-independent, so wire order is stable across processes.
pub fn cmp_names(a: &str, b: &str) -> Ordering {
    let left = a.bytes().map(|b| b.to_ascii_lowercase());
    let right = b.bytes().map(|b| b.to_ascii_lowercase());
    left.cmp(right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_ordering_folds_ascii_case() {
        assert_eq!(cmp_names("Age", "name"), Ordering::Less);
        assert_eq!(cmp_names("NAME", "name"), Ordering::Equal);
        assert_eq!(cmp_names("z", "Ab"), Ordering::Greater);
        // Underscore (0x5f) sorts before lowercase letters after the fold.
        assert_eq!(cmp_names("a_b", "ab"), Ordering::Less);
    }

    #[test]
    fn primitive_names_roundtrip() {
        for kind in [
            PrimitiveKind::Bool,
            PrimitiveKind::Int8,
            PrimitiveKind::Int16,
            PrimitiveKind::Int32,
            PrimitiveKind::Int64,
            PrimitiveKind::UInt8,
            PrimitiveKind::UInt16,
            PrimitiveKind::UInt32,
            PrimitiveKind::UInt64,
            PrimitiveKind::Float32,
            PrimitiveKind::Float64,
            PrimitiveKind::String,
            PrimitiveKind::Binary,
            PrimitiveKind::Decimal,
            PrimitiveKind::Timestamp,
            PrimitiveKind::Duration,
        ] {
            assert_eq!(PrimitiveKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(PrimitiveKind::from_name("void"), None);
    }
}
