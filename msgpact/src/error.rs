//! Error types and helpers.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Faults raised while producing wire bytes.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Collection length {0} exceeds the wire format's 32-bit framing")]
    LengthOverflow(usize),
    #[error("String length {0} exceeds the wire format's 32-bit framing")]
    StringOverflow(usize),
    #[error("Timestamp is outside the encodable range of signed 64-bit nanoseconds")]
    TimestampRange,
    #[error("Duration is outside the encodable range of unsigned 64-bit nanoseconds")]
    DurationRange,
}

/// Faults raised while consuming wire bytes.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Expected {expected} on the wire, found marker 0x{found:02x}")]
    WireType { expected: &'static str, found: u8 },
    #[error("Marker 0xc1 is reserved and never valid")]
    ReservedMarker,
    #[error("Integer value does not fit in {0}")]
    IntegerOutOfRange(&'static str),
    #[error(transparent)]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("Cannot parse {0:?} as a decimal")]
    InvalidDecimal(String),
    #[error("Unknown enum member {0:?}")]
    UnknownEnumMember(String),
    #[error("Unknown union member {0:?}")]
    UnknownUnionMember(String),
    #[error("Union framing must be a 2-element array, found {0} elements")]
    UnionArity(usize),
    #[error("Expected a tuple of {expected} elements, found {found}")]
    TupleArity { expected: usize, found: usize },
    #[error("Missing required field {0:?}")]
    MissingRequiredField(String),
    #[error("Unexpected field {0:?}")]
    UnexpectedField(String),
}

/// Faults raised while building or loading schemas.
///
/// Schema derivation from Rust types treats invariant violations (duplicate
/// case-insensitive names) as programmer errors and panics; this type covers
/// the fallible surface: loading schemas from their XML form.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Malformed schema XML: {0}")]
    MalformedXml(String),
    #[error("Unknown schema element <{0}>")]
    UnknownElement(String),
    #[error("Unresolved schema reference {0:?}")]
    UnresolvedReference(String),
    #[error("Duplicate schema id {0:?}")]
    DuplicateId(String),
    #[error("Duplicate field name {0:?}")]
    DuplicateField(String),
    #[error("Duplicate union member {0:?}")]
    DuplicateUnionMember(String),
    #[error("Duplicate enum member {0:?}")]
    DuplicateEnumMember(String),
}

/// A [`ReadError`] annotated with the type the deserializer was producing.
#[derive(Error, Debug)]
#[error("Failed to deserialize {target}: {source}")]
pub struct DeserializeError {
    pub target: &'static str,
    #[source]
    pub source: ReadError,
}

pub type Result<T> = core::result::Result<T, Error>;
pub type WriteResult<T> = core::result::Result<T, WriteError>;
pub type ReadResult<T> = core::result::Result<T, ReadError>;
