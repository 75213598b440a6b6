//! Schema adapter types.
//!
//! An adapter stands in for a field's in-memory type and reinterprets its
//! wire form, selected with `#[msgpact(with = "…")]`. The blanket `Vec<u8>`
//! implementation encodes element-wise as a `uint8` sequence; routing the
//! field through [`Bytes`] instead uses the wire format's raw `bin` family
//! and the `bytes` primitive schema.
//!
//! ```
//! use msgpact::{containers, SchemaRead, SchemaWrite};
//!
//! #[derive(SchemaWrite, SchemaRead, Debug, PartialEq)]
//! struct Blob {
//!     #[msgpact(with = "containers::Bytes")]
//!     data: Vec<u8>,
//! }
//!
//! let blob = Blob { data: vec![1, 2, 3] };
//! let bytes = msgpact::serialize(&blob).unwrap();
//! let back: Blob = msgpact::deserialize(&bytes).unwrap();
//! assert_eq!(back, blob);
//! ```
use {
    super::{PrimitiveKind, SchemaCollection, SchemaRead, SchemaWrite, Shape},
    crate::{
        error::{ReadResult, WriteResult},
        wire::{Decoder, Encoder},
    },
    std::io::{Read, Write},
};

/// Adapter encoding a byte buffer as the raw binary primitive.
pub struct Bytes;

impl SchemaWrite for Bytes {
    type Src = [u8];

    fn write_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::Binary)
    }

    fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
        writer.write_bin(src)
    }
}

impl SchemaRead for Bytes {
    type Dst = Vec<u8>;

    fn read_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::Binary)
    }

    fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst> {
        reader.read_bin()
    }
}
