//! `SchemaWrite`/`SchemaRead` implementations for std types.
//!
//! Integer reads are range-checked rather than marker-checked: any integer
//! marker whose value fits the destination is accepted, which is what the
//! relaxed-mode widening table promises at runtime.
use {
    super::{PrimitiveKind, SchemaCollection, SchemaRead, SchemaWrite, Shape},
    crate::{
        error::{ReadError, ReadResult, WriteError, WriteResult},
        wire::{Decoder, Encoder},
    },
    rust_decimal::Decimal,
    std::{
        collections::{BTreeMap, HashMap},
        hash::Hash,
        io::{Read, Write},
        time::{Duration, SystemTime, UNIX_EPOCH},
    },
};

// Containers grow in bounded steps so corrupt headers cannot trigger huge
// up-front allocations.
const PREALLOC_LIMIT: usize = 1024;

macro_rules! impl_unsigned {
    ($ty:ty, $kind:ident) => {
        impl SchemaWrite for $ty {
            type Src = $ty;

            fn write_schema(_collection: &mut SchemaCollection) -> Shape {
                Shape::Primitive(PrimitiveKind::$kind)
            }

            fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
                writer.write_uint(*src as u64)
            }
        }

        impl SchemaRead for $ty {
            type Dst = $ty;

            fn read_schema(_collection: &mut SchemaCollection) -> Shape {
                Shape::Primitive(PrimitiveKind::$kind)
            }

            fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst> {
                let value = reader.read_uint()?;
                <$ty>::try_from(value).map_err(|_| ReadError::IntegerOutOfRange(stringify!($ty)))
            }
        }
    };
}

macro_rules! impl_signed {
    ($ty:ty, $kind:ident) => {
        impl SchemaWrite for $ty {
            type Src = $ty;

            fn write_schema(_collection: &mut SchemaCollection) -> Shape {
                Shape::Primitive(PrimitiveKind::$kind)
            }

            fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
                writer.write_int(*src as i64)
            }
        }

        impl SchemaRead for $ty {
            type Dst = $ty;

            fn read_schema(_collection: &mut SchemaCollection) -> Shape {
                Shape::Primitive(PrimitiveKind::$kind)
            }

            fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst> {
                let value = reader.read_int()?;
                <$ty>::try_from(value).map_err(|_| ReadError::IntegerOutOfRange(stringify!($ty)))
            }
        }
    };
}

impl_unsigned!(u8, UInt8);
impl_unsigned!(u16, UInt16);
impl_unsigned!(u32, UInt32);
impl_unsigned!(u64, UInt64);
impl_signed!(i8, Int8);
impl_signed!(i16, Int16);
impl_signed!(i32, Int32);
impl_signed!(i64, Int64);

impl SchemaWrite for bool {
    type Src = bool;

    fn write_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::Bool)
    }

    fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
        writer.write_bool(*src)
    }
}

impl SchemaRead for bool {
    type Dst = bool;

    fn read_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::Bool)
    }

    fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst> {
        reader.read_bool()
    }
}

impl SchemaWrite for f32 {
    type Src = f32;

    fn write_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::Float32)
    }

    fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
        writer.write_f32(*src)
    }
}

impl SchemaRead for f32 {
    type Dst = f32;

    fn read_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::Float32)
    }

    fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst> {
        reader.read_f32()
    }
}

impl SchemaWrite for f64 {
    type Src = f64;

    fn write_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::Float64)
    }

    fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
        writer.write_f64(*src)
    }
}

impl SchemaRead for f64 {
    type Dst = f64;

    fn read_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::Float64)
    }

    fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst> {
        reader.read_f64()
    }
}

impl SchemaWrite for String {
    type Src = String;

    fn write_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::String)
    }

    fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
        writer.write_str(src)
    }
}

impl SchemaRead for String {
    type Dst = String;

    fn read_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::String)
    }

    fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst> {
        reader.read_str()
    }
}

impl SchemaWrite for str {
    type Src = str;

    fn write_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::String)
    }

    fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
        writer.write_str(src)
    }
}

impl SchemaWrite for Decimal {
    type Src = Decimal;

    fn write_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::Decimal)
    }

    fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
        // The locale-neutral decimal literal preserves exactness.
        writer.write_str(&src.to_string())
    }
}

impl SchemaRead for Decimal {
    type Dst = Decimal;

    fn read_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::Decimal)
    }

    fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst> {
        let text = reader.read_str()?;
        match text.parse() {
            Ok(value) => Ok(value),
            Err(_) => Err(ReadError::InvalidDecimal(text)),
        }
    }
}

impl SchemaWrite for SystemTime {
    type Src = SystemTime;

    fn write_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::Timestamp)
    }

    fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
        // Signed nanoseconds relative to the Unix epoch.
        let nanos = match src.duration_since(UNIX_EPOCH) {
            Ok(after) => {
                i64::try_from(after.as_nanos()).map_err(|_| WriteError::TimestampRange)?
            }
            Err(before) => {
                -i64::try_from(before.duration().as_nanos())
                    .map_err(|_| WriteError::TimestampRange)?
            }
        };
        writer.write_int(nanos)
    }
}

impl SchemaRead for SystemTime {
    type Dst = SystemTime;

    fn read_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::Timestamp)
    }

    fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst> {
        let nanos = reader.read_int()?;
        Ok(if nanos >= 0 {
            UNIX_EPOCH + Duration::from_nanos(nanos as u64)
        } else {
            UNIX_EPOCH - Duration::from_nanos(nanos.unsigned_abs())
        })
    }
}

impl SchemaWrite for Duration {
    type Src = Duration;

    fn write_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::Duration)
    }

    fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
        let nanos = u64::try_from(src.as_nanos()).map_err(|_| WriteError::DurationRange)?;
        writer.write_uint(nanos)
    }
}

impl SchemaRead for Duration {
    type Dst = Duration;

    fn read_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Primitive(PrimitiveKind::Duration)
    }

    fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst> {
        Ok(Duration::from_nanos(reader.read_uint()?))
    }
}

impl SchemaWrite for () {
    type Src = ();

    fn write_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Empty
    }

    fn write(writer: &mut Encoder<impl Write>, _src: &Self::Src) -> WriteResult<()> {
        writer.write_map_len(0)
    }
}

impl SchemaRead for () {
    type Dst = ();

    fn read_schema(_collection: &mut SchemaCollection) -> Shape {
        Shape::Empty
    }

    fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst> {
        // An empty reader consumes whatever single value the writer produced.
        reader.skip_value()
    }
}

impl<T: SchemaWrite<Src = T>> SchemaWrite for Option<T> {
    type Src = Option<T>;

    fn write_schema(collection: &mut SchemaCollection) -> Shape {
        Shape::Nullable(Box::new(T::write_schema(collection)))
    }

    fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
        match src {
            None => writer.write_nil(),
            Some(value) => T::write(writer, value),
        }
    }
}

impl<T: SchemaRead> SchemaRead for Option<T> {
    type Dst = Option<T::Dst>;

    fn read_schema(collection: &mut SchemaCollection) -> Shape {
        Shape::Nullable(Box::new(T::read_schema(collection)))
    }

    fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst> {
        if reader.try_read_nil()? {
            Ok(None)
        } else {
            Ok(Some(T::read(reader)?))
        }
    }
}

impl<T: SchemaWrite<Src = T>> SchemaWrite for Vec<T> {
    type Src = Vec<T>;

    fn write_schema(collection: &mut SchemaCollection) -> Shape {
        Shape::Sequence(Box::new(T::write_schema(collection)))
    }

    fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
        <[T]>::write(writer, src)
    }
}

impl<T: SchemaRead> SchemaRead for Vec<T> {
    type Dst = Vec<T::Dst>;

    fn read_schema(collection: &mut SchemaCollection) -> Shape {
        Shape::Sequence(Box::new(T::read_schema(collection)))
    }

    fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst> {
        let len = reader.read_array_len()?;
        let mut out = Vec::with_capacity(len.min(PREALLOC_LIMIT));
        for _ in 0..len {
            out.push(T::read(reader)?);
        }
        Ok(out)
    }
}

impl<T: SchemaWrite<Src = T>> SchemaWrite for [T] {
    type Src = [T];

    fn write_schema(collection: &mut SchemaCollection) -> Shape {
        Shape::Sequence(Box::new(T::write_schema(collection)))
    }

    fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
        writer.write_array_len(src.len())?;
        for element in src {
            T::write(writer, element)?;
        }
        Ok(())
    }
}

impl<T: SchemaWrite<Src = T>> SchemaWrite for Box<T> {
    type Src = Box<T>;

    fn write_schema(collection: &mut SchemaCollection) -> Shape {
        T::write_schema(collection)
    }

    fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
        T::write(writer, src)
    }
}

impl<T: SchemaRead> SchemaRead for Box<T> {
    type Dst = Box<T::Dst>;

    fn read_schema(collection: &mut SchemaCollection) -> Shape {
        T::read_schema(collection)
    }

    fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst> {
        Ok(Box::new(T::read(reader)?))
    }
}

macro_rules! impl_map {
    ($map:ident, $($read_bound:tt)+) => {
        impl<K, V> SchemaWrite for $map<K, V>
        where
            K: SchemaWrite<Src = K>,
            V: SchemaWrite<Src = V>,
        {
            type Src = $map<K, V>;

            fn write_schema(collection: &mut SchemaCollection) -> Shape {
                Shape::Mapping(
                    Box::new(K::write_schema(collection)),
                    Box::new(V::write_schema(collection)),
                )
            }

            fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
                writer.write_map_len(src.len())?;
                for (key, value) in src {
                    K::write(writer, key)?;
                    V::write(writer, value)?;
                }
                Ok(())
            }
        }

        impl<K, V> SchemaRead for $map<K, V>
        where
            K: SchemaRead,
            V: SchemaRead,
            K::Dst: $($read_bound)+,
        {
            type Dst = $map<K::Dst, V::Dst>;

            fn read_schema(collection: &mut SchemaCollection) -> Shape {
                Shape::Mapping(
                    Box::new(K::read_schema(collection)),
                    Box::new(V::read_schema(collection)),
                )
            }

            fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst> {
                let len = reader.read_map_len()?;
                let mut out = $map::new();
                for _ in 0..len {
                    let key = K::read(reader)?;
                    let value = V::read(reader)?;
                    out.insert(key, value);
                }
                Ok(out)
            }
        }
    };
}

impl_map!(HashMap, Eq + Hash);
impl_map!(BTreeMap, Ord);

macro_rules! impl_tuple {
    ($(($ty:ident, $idx:tt)),+) => {
        impl<$($ty: SchemaWrite<Src = $ty>),+> SchemaWrite for ($($ty,)+) {
            type Src = ($($ty,)+);

            fn write_schema(collection: &mut SchemaCollection) -> Shape {
                Shape::Tuple(vec![$($ty::write_schema(collection)),+])
            }

            fn write(writer: &mut Encoder<impl Write>, src: &Self::Src) -> WriteResult<()> {
                writer.write_array_len([$(stringify!($ty)),+].len())?;
                $( $ty::write(writer, &src.$idx)?; )+
                Ok(())
            }
        }

        impl<$($ty: SchemaRead),+> SchemaRead for ($($ty,)+) {
            type Dst = ($($ty::Dst,)+);

            fn read_schema(collection: &mut SchemaCollection) -> Shape {
                Shape::Tuple(vec![$($ty::read_schema(collection)),+])
            }

            fn read(reader: &mut Decoder<impl Read>) -> ReadResult<Self::Dst> {
                let expected = [$(stringify!($ty)),+].len();
                let found = reader.read_array_len()?;
                if found != expected {
                    return Err(ReadError::TupleArity { expected, found });
                }
                Ok(($($ty::read(reader)?,)+))
            }
        }
    };
}

impl_tuple!((A, 0), (B, 1));
impl_tuple!((A, 0), (B, 1), (C, 2));
impl_tuple!((A, 0), (B, 1), (C, 2), (D, 3));
impl_tuple!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4));
impl_tuple!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5));
impl_tuple!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6));
impl_tuple!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7));
