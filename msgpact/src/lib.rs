//! msgpact is a MessagePack-based serializer with structural schemas and
//! explicit read/write compatibility checking.
//!
//! Every serializable type has a *write schema* (what its serializer
//! produces) and a *read schema* (what its deserializer expects), derived
//! from the type itself rather than a separate IDL. Two schemas can be
//! compared with [`ReadSchema::can_read_from`] to decide, ahead of any byte
//! I/O, whether a reader can consume a writer's messages, under a *strict*
//! or a *relaxed* policy.
//!
//! # Quickstart
//!
//! ```
//! use msgpact::{SchemaRead, SchemaWrite};
//!
//! #[derive(SchemaWrite, SchemaRead, Debug, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: i32,
//! }
//!
//! let person = Person { name: "Bob".to_string(), age: 36 };
//! let bytes = msgpact::serialize(&person).unwrap();
//! let back: Person = msgpact::deserialize(&bytes).unwrap();
//! assert_eq!(back, person);
//! ```
//!
//! Records travel as maps whose keys are the field names in
//! case-insensitive lexicographic order; that fixed order is what makes both
//! deserialization and schema comparison single-pass merges.
//!
//! # Compatibility
//!
//! ```
//! use msgpact::{SchemaCollection, SchemaRead, SchemaWrite};
//!
//! #[derive(SchemaWrite, SchemaRead)]
//! struct Person {
//!     name: String,
//!     age: i32,
//! }
//!
//! #[derive(SchemaWrite, SchemaRead)]
//! struct PersonWithScore {
//!     name: String,
//!     age: i32,
//!     score: f64,
//! }
//!
//! let mut schemas = SchemaCollection::new();
//! let write = schemas.get_or_add_write_schema::<PersonWithScore>();
//! let read = schemas.get_or_add_read_schema::<Person>();
//!
//! // Relaxed readers skip the writer's extra field; strict readers refuse.
//! assert!(read.can_read_from(&write, true, &schemas, &schemas));
//! assert!(!read.can_read_from(&write, false, &schemas, &schemas));
//! ```
//!
//! The verdict is decided on schemas alone. What a relaxed reader tolerates —
//! skipped writer fields, defaulted absences, widened primitives, enum and
//! union supersets on the safe side — mirrors exactly what the read path can
//! absorb at runtime.
//!
//! # Unexpected fields
//!
//! Whether the deserializer silently discards unknown record fields or fails
//! is a runtime knob on [`Deserializer`], not a schema property:
//!
//! ```
//! use msgpact::{Deserializer, SchemaRead, SchemaWrite, UnexpectedFieldPolicy};
//!
//! #[derive(SchemaWrite)]
//! struct Tagged {
//!     id: u32,
//!     label: String,
//! }
//!
//! #[derive(SchemaRead, Debug)]
//! struct Plain {
//!     id: u32,
//! }
//!
//! let bytes = msgpact::serialize(&Tagged { id: 7, label: "x".into() }).unwrap();
//!
//! let lenient = Deserializer::<Plain>::new(UnexpectedFieldPolicy::Ignore);
//! assert_eq!(lenient.from_slice(&bytes).unwrap().id, 7);
//!
//! let strict = Deserializer::<Plain>::new(UnexpectedFieldPolicy::Error);
//! assert!(strict.from_slice(&bytes).is_err());
//! ```
use std::{
    any,
    io::{Read, Write},
    marker::PhantomData,
};

pub mod error;
pub use error::{
    DeserializeError, Error, ReadError, ReadResult, Result, SchemaError, WriteError, WriteResult,
};
pub mod wire;
pub use wire::{Decoder, Encoder, UnexpectedFieldPolicy};
pub mod schema;
pub use schema::{
    containers, Field, Member, NodeId, PrimitiveKind, ReadSchema, RecordReader, SchemaCollection,
    SchemaRead, SchemaWrite, Shape, TypeName, WriteSchema,
};
#[cfg(feature = "derive")]
pub use msgpact_derive::{SchemaRead, SchemaWrite};

/// Serialize `value` into a new byte vector.
pub fn serialize<T>(value: &T) -> WriteResult<Vec<u8>>
where
    T: SchemaWrite<Src = T> + ?Sized,
{
    let mut out = Vec::new();
    serialize_into(&mut out, value)?;
    Ok(out)
}

/// Serialize `value` into the given writer.
pub fn serialize_into<T, W>(writer: W, value: &T) -> WriteResult<()>
where
    T: SchemaWrite<Src = T> + ?Sized,
    W: Write,
{
    let mut encoder = Encoder::new(writer);
    T::write(&mut encoder, value)
}

/// Deserialize a `T` from a byte slice under the default
/// [`UnexpectedFieldPolicy`].
pub fn deserialize<T>(bytes: &[u8]) -> ReadResult<T>
where
    T: SchemaRead<Dst = T>,
{
    deserialize_from::<T, _>(bytes)
}

/// Deserialize a `T` from the given reader under the default
/// [`UnexpectedFieldPolicy`].
pub fn deserialize_from<T, R>(reader: R) -> ReadResult<T>
where
    T: SchemaRead<Dst = T>,
    R: Read,
{
    let mut decoder = Decoder::new(reader);
    T::read(&mut decoder)
}

/// A serialization driver for one target type.
///
/// Stateless once constructed; a single instance may serve many threads
/// provided each call owns its stream.
pub struct Serializer<T: ?Sized> {
    _target: PhantomData<fn(&T)>,
}

impl<T> Serializer<T>
where
    T: SchemaWrite<Src = T> + ?Sized,
{
    pub fn new() -> Self {
        Serializer {
            _target: PhantomData,
        }
    }

    pub fn serialize<W: Write>(&self, writer: W, value: &T) -> WriteResult<()> {
        serialize_into(writer, value)
    }

    pub fn to_vec(&self, value: &T) -> WriteResult<Vec<u8>> {
        serialize(value)
    }

    /// The schema this serializer writes, rooted in `collection`.
    pub fn write_schema(&self, collection: &mut SchemaCollection) -> WriteSchema {
        collection.get_or_add_write_schema::<T>()
    }
}

impl<T> Default for Serializer<T>
where
    T: SchemaWrite<Src = T> + ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A deserialization driver for one target type, carrying the
/// [`UnexpectedFieldPolicy`] and attaching type context to faults.
pub struct Deserializer<T> {
    policy: UnexpectedFieldPolicy,
    _target: PhantomData<fn() -> T>,
}

impl<T> Deserializer<T>
where
    T: SchemaRead<Dst = T>,
{
    pub fn new(policy: UnexpectedFieldPolicy) -> Self {
        Deserializer {
            policy,
            _target: PhantomData,
        }
    }

    pub fn deserialize<R: Read>(&self, reader: R) -> core::result::Result<T, DeserializeError> {
        let mut decoder = Decoder::with_policy(reader, self.policy);
        T::read(&mut decoder).map_err(|source| DeserializeError {
            target: any::type_name::<T>(),
            source,
        })
    }

    pub fn from_slice(&self, bytes: &[u8]) -> core::result::Result<T, DeserializeError> {
        self.deserialize(bytes)
    }

    /// The schema this deserializer expects, rooted in `collection`.
    pub fn read_schema(&self, collection: &mut SchemaCollection) -> ReadSchema {
        collection.get_or_add_read_schema::<T>()
    }
}

impl<T> Default for Deserializer<T>
where
    T: SchemaRead<Dst = T>,
{
    fn default() -> Self {
        Self::new(UnexpectedFieldPolicy::default())
    }
}
