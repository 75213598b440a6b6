//! Low-level MessagePack framing.
//!
//! [`Encoder`] and [`Decoder`] cover the subset of MessagePack the schema
//! model emits: nil, booleans, integers, floats, strings, raw bytes, and
//! array/map headers. Integers are written in their smallest representation;
//! the decoder accepts any integer marker whose value fits the requested
//! range, which is what makes the relaxed-mode widening conversions work
//! without a second decode path.
use {
    crate::error::{ReadError, ReadResult, WriteError, WriteResult},
    std::io::{Read, Write},
};

// Payloads are consumed in bounded chunks so a corrupt length prefix cannot
// force a giant allocation up front.
const PREALLOC_CHUNK: usize = 64 << 10;

/// What the deserializer does with a wire field the target type lacks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnexpectedFieldPolicy {
    /// Discard the field's value and continue.
    #[default]
    Ignore,
    /// Fail with [`ReadError::UnexpectedField`].
    Error,
}

/// Writes MessagePack values to an [`io::Write`](std::io::Write) sink.
pub struct Encoder<W> {
    writer: W,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Encoder { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn write_nil(&mut self) -> WriteResult<()> {
        Ok(self.writer.write_all(&[0xc0])?)
    }

    pub fn write_bool(&mut self, value: bool) -> WriteResult<()> {
        Ok(self.writer.write_all(&[if value { 0xc3 } else { 0xc2 }])?)
    }

    pub fn write_uint(&mut self, value: u64) -> WriteResult<()> {
        if value < 0x80 {
            self.writer.write_all(&[value as u8])?;
        } else if value <= u8::MAX as u64 {
            self.writer.write_all(&[0xcc, value as u8])?;
        } else if value <= u16::MAX as u64 {
            self.writer.write_all(&[0xcd])?;
            self.writer.write_all(&(value as u16).to_be_bytes())?;
        } else if value <= u32::MAX as u64 {
            self.writer.write_all(&[0xce])?;
            self.writer.write_all(&(value as u32).to_be_bytes())?;
        } else {
            self.writer.write_all(&[0xcf])?;
            self.writer.write_all(&value.to_be_bytes())?;
        }
        Ok(())
    }

    pub fn write_int(&mut self, value: i64) -> WriteResult<()> {
        if value >= 0 {
            return self.write_uint(value as u64);
        }
        if value >= -32 {
            self.writer.write_all(&[value as u8])?;
        } else if value >= i8::MIN as i64 {
            self.writer.write_all(&[0xd0, value as u8])?;
        } else if value >= i16::MIN as i64 {
            self.writer.write_all(&[0xd1])?;
            self.writer.write_all(&(value as i16).to_be_bytes())?;
        } else if value >= i32::MIN as i64 {
            self.writer.write_all(&[0xd2])?;
            self.writer.write_all(&(value as i32).to_be_bytes())?;
        } else {
            self.writer.write_all(&[0xd3])?;
            self.writer.write_all(&value.to_be_bytes())?;
        }
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> WriteResult<()> {
        self.writer.write_all(&[0xca])?;
        Ok(self.writer.write_all(&value.to_be_bytes())?)
    }

    pub fn write_f64(&mut self, value: f64) -> WriteResult<()> {
        self.writer.write_all(&[0xcb])?;
        Ok(self.writer.write_all(&value.to_be_bytes())?)
    }

    pub fn write_str(&mut self, value: &str) -> WriteResult<()> {
        let len = value.len();
        if len < 32 {
            self.writer.write_all(&[0xa0 | len as u8])?;
        } else if len <= u8::MAX as usize {
            self.writer.write_all(&[0xd9, len as u8])?;
        } else if len <= u16::MAX as usize {
            self.writer.write_all(&[0xda])?;
            self.writer.write_all(&(len as u16).to_be_bytes())?;
        } else if len <= u32::MAX as usize {
            self.writer.write_all(&[0xdb])?;
            self.writer.write_all(&(len as u32).to_be_bytes())?;
        } else {
            return Err(WriteError::StringOverflow(len));
        }
        Ok(self.writer.write_all(value.as_bytes())?)
    }

    pub fn write_bin(&mut self, value: &[u8]) -> WriteResult<()> {
        let len = value.len();
        if len <= u8::MAX as usize {
            self.writer.write_all(&[0xc4, len as u8])?;
        } else if len <= u16::MAX as usize {
            self.writer.write_all(&[0xc5])?;
            self.writer.write_all(&(len as u16).to_be_bytes())?;
        } else if len <= u32::MAX as usize {
            self.writer.write_all(&[0xc6])?;
            self.writer.write_all(&(len as u32).to_be_bytes())?;
        } else {
            return Err(WriteError::LengthOverflow(len));
        }
        Ok(self.writer.write_all(value)?)
    }

    pub fn write_array_len(&mut self, len: usize) -> WriteResult<()> {
        if len < 16 {
            self.writer.write_all(&[0x90 | len as u8])?;
        } else if len <= u16::MAX as usize {
            self.writer.write_all(&[0xdc])?;
            self.writer.write_all(&(len as u16).to_be_bytes())?;
        } else if len <= u32::MAX as usize {
            self.writer.write_all(&[0xdd])?;
            self.writer.write_all(&(len as u32).to_be_bytes())?;
        } else {
            return Err(WriteError::LengthOverflow(len));
        }
        Ok(())
    }

    pub fn write_map_len(&mut self, len: usize) -> WriteResult<()> {
        if len < 16 {
            self.writer.write_all(&[0x80 | len as u8])?;
        } else if len <= u16::MAX as usize {
            self.writer.write_all(&[0xde])?;
            self.writer.write_all(&(len as u16).to_be_bytes())?;
        } else if len <= u32::MAX as usize {
            self.writer.write_all(&[0xdf])?;
            self.writer.write_all(&(len as u32).to_be_bytes())?;
        } else {
            return Err(WriteError::LengthOverflow(len));
        }
        Ok(())
    }
}

/// Reads MessagePack values from an [`io::Read`](std::io::Read) source.
///
/// Carries the [`UnexpectedFieldPolicy`] so record readers deep in a value
/// tree can consult it without any extra plumbing.
pub struct Decoder<R> {
    reader: R,
    peeked: Option<u8>,
    policy: UnexpectedFieldPolicy,
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_policy(reader, UnexpectedFieldPolicy::default())
    }

    pub fn with_policy(reader: R, policy: UnexpectedFieldPolicy) -> Self {
        Decoder {
            reader,
            peeked: None,
            policy,
        }
    }

    pub fn policy(&self) -> UnexpectedFieldPolicy {
        self.policy
    }

    fn read_byte(&mut self) -> ReadResult<u8> {
        if let Some(byte) = self.peeked.take() {
            return Ok(byte);
        }
        let mut buf = [0u8; 1];
        self.reader.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn peek_byte(&mut self) -> ReadResult<u8> {
        if let Some(byte) = self.peeked {
            return Ok(byte);
        }
        let byte = self.read_byte()?;
        self.peeked = Some(byte);
        Ok(byte)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> ReadResult<()> {
        let mut start = 0;
        if !buf.is_empty() {
            if let Some(byte) = self.peeked.take() {
                buf[0] = byte;
                start = 1;
            }
        }
        self.reader.read_exact(&mut buf[start..])?;
        Ok(())
    }

    fn read_vec(&mut self, len: usize) -> ReadResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(len.min(PREALLOC_CHUNK));
        while buf.len() < len {
            let take = (len - buf.len()).min(PREALLOC_CHUNK);
            let at = buf.len();
            buf.resize(at + take, 0);
            self.read_exact(&mut buf[at..])?;
        }
        Ok(buf)
    }

    fn read_be<const N: usize>(&mut self) -> ReadResult<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Consume a nil marker if one is next. Returns whether it was consumed.
    pub fn try_read_nil(&mut self) -> ReadResult<bool> {
        if self.peek_byte()? == 0xc0 {
            self.read_byte()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn read_bool(&mut self) -> ReadResult<bool> {
        match self.read_byte()? {
            0xc2 => Ok(false),
            0xc3 => Ok(true),
            found => Err(ReadError::WireType {
                expected: "boolean",
                found,
            }),
        }
    }

    /// Read any integer marker as an unsigned value.
    ///
    /// Signed markers are accepted when the stored value is non-negative.
    pub fn read_uint(&mut self) -> ReadResult<u64> {
        match self.read_int_raw()? {
            Int::Unsigned(v) => Ok(v),
            Int::Signed(v) => {
                u64::try_from(v).map_err(|_| ReadError::IntegerOutOfRange("unsigned integer"))
            }
        }
    }

    /// Read any integer marker as a signed value.
    pub fn read_int(&mut self) -> ReadResult<i64> {
        match self.read_int_raw()? {
            Int::Signed(v) => Ok(v),
            Int::Unsigned(v) => {
                i64::try_from(v).map_err(|_| ReadError::IntegerOutOfRange("int64"))
            }
        }
    }

    fn read_int_raw(&mut self) -> ReadResult<Int> {
        let marker = self.read_byte()?;
        match marker {
            0x00..=0x7f => Ok(Int::Unsigned(marker as u64)),
            0xe0..=0xff => Ok(Int::Signed(marker as i8 as i64)),
            0xcc => Ok(Int::Unsigned(self.read_be::<1>()?[0] as u64)),
            0xcd => Ok(Int::Unsigned(u16::from_be_bytes(self.read_be()?) as u64)),
            0xce => Ok(Int::Unsigned(u32::from_be_bytes(self.read_be()?) as u64)),
            0xcf => Ok(Int::Unsigned(u64::from_be_bytes(self.read_be()?))),
            0xd0 => Ok(Int::Signed(self.read_be::<1>()?[0] as i8 as i64)),
            0xd1 => Ok(Int::Signed(i16::from_be_bytes(self.read_be()?) as i64)),
            0xd2 => Ok(Int::Signed(i32::from_be_bytes(self.read_be()?) as i64)),
            0xd3 => Ok(Int::Signed(i64::from_be_bytes(self.read_be()?))),
            found => Err(ReadError::WireType {
                expected: "integer",
                found,
            }),
        }
    }

    pub fn read_f32(&mut self) -> ReadResult<f32> {
        match self.read_byte()? {
            0xca => Ok(f32::from_be_bytes(self.read_be()?)),
            found => Err(ReadError::WireType {
                expected: "float32",
                found,
            }),
        }
    }

    /// Read a float64, promoting a float32 on the wire.
    pub fn read_f64(&mut self) -> ReadResult<f64> {
        match self.read_byte()? {
            0xcb => Ok(f64::from_be_bytes(self.read_be()?)),
            0xca => Ok(f32::from_be_bytes(self.read_be()?) as f64),
            found => Err(ReadError::WireType {
                expected: "float64",
                found,
            }),
        }
    }

    pub fn read_str(&mut self) -> ReadResult<String> {
        let len = match self.read_byte()? {
            m @ 0xa0..=0xbf => (m & 0x1f) as usize,
            0xd9 => self.read_be::<1>()?[0] as usize,
            0xda => u16::from_be_bytes(self.read_be()?) as usize,
            0xdb => u32::from_be_bytes(self.read_be()?) as usize,
            found => {
                return Err(ReadError::WireType {
                    expected: "string",
                    found,
                })
            }
        };
        Ok(String::from_utf8(self.read_vec(len)?)?)
    }

    pub fn read_bin(&mut self) -> ReadResult<Vec<u8>> {
        let len = match self.read_byte()? {
            0xc4 => self.read_be::<1>()?[0] as usize,
            0xc5 => u16::from_be_bytes(self.read_be()?) as usize,
            0xc6 => u32::from_be_bytes(self.read_be()?) as usize,
            found => {
                return Err(ReadError::WireType {
                    expected: "binary",
                    found,
                })
            }
        };
        self.read_vec(len)
    }

    pub fn read_array_len(&mut self) -> ReadResult<usize> {
        match self.read_byte()? {
            m @ 0x90..=0x9f => Ok((m & 0x0f) as usize),
            0xdc => Ok(u16::from_be_bytes(self.read_be()?) as usize),
            0xdd => Ok(u32::from_be_bytes(self.read_be()?) as usize),
            found => Err(ReadError::WireType {
                expected: "array",
                found,
            }),
        }
    }

    pub fn read_map_len(&mut self) -> ReadResult<usize> {
        match self.read_byte()? {
            m @ 0x80..=0x8f => Ok((m & 0x0f) as usize),
            0xde => Ok(u16::from_be_bytes(self.read_be()?) as usize),
            0xdf => Ok(u32::from_be_bytes(self.read_be()?) as usize),
            found => Err(ReadError::WireType {
                expected: "map",
                found,
            }),
        }
    }

    /// Read the `[name, payload]` union framing up to and including the name.
    ///
    /// The payload is left on the wire for the dispatched member reader.
    pub fn begin_union(&mut self) -> ReadResult<String> {
        let len = self.read_array_len()?;
        if len != 2 {
            return Err(ReadError::UnionArity(len));
        }
        self.read_str()
    }

    /// Consume and discard one complete value of any shape.
    pub fn skip_value(&mut self) -> ReadResult<()> {
        let marker = self.read_byte()?;
        let skip = match marker {
            0x00..=0x7f | 0xe0..=0xff | 0xc0 | 0xc2 | 0xc3 => 0,
            0xcc | 0xd0 => 1,
            0xcd | 0xd1 => 2,
            0xce | 0xd2 | 0xca => 4,
            0xcf | 0xd3 | 0xcb => 8,
            m @ 0xa0..=0xbf => (m & 0x1f) as usize,
            0xd9 | 0xc4 => self.read_be::<1>()?[0] as usize,
            0xda | 0xc5 => u16::from_be_bytes(self.read_be()?) as usize,
            0xdb | 0xc6 => u32::from_be_bytes(self.read_be()?) as usize,
            0xd4 => 2,
            0xd5 => 3,
            0xd6 => 5,
            0xd7 => 9,
            0xd8 => 17,
            0xc7 => self.read_be::<1>()?[0] as usize + 1,
            0xc8 => u16::from_be_bytes(self.read_be()?) as usize + 1,
            0xc9 => u32::from_be_bytes(self.read_be()?) as usize + 1,
            m @ (0x90..=0x9f | 0xdc | 0xdd) => {
                let len = match m {
                    0xdc => u16::from_be_bytes(self.read_be()?) as usize,
                    0xdd => u32::from_be_bytes(self.read_be()?) as usize,
                    _ => (m & 0x0f) as usize,
                };
                for _ in 0..len {
                    self.skip_value()?;
                }
                0
            }
            m @ (0x80..=0x8f | 0xde | 0xdf) => {
                let len = match m {
                    0xde => u16::from_be_bytes(self.read_be()?) as usize,
                    0xdf => u32::from_be_bytes(self.read_be()?) as usize,
                    _ => (m & 0x0f) as usize,
                };
                for _ in 0..len {
                    self.skip_value()?;
                    self.skip_value()?;
                }
                0
            }
            0xc1 => return Err(ReadError::ReservedMarker),
        };
        self.skip_bytes(skip)
    }

    fn skip_bytes(&mut self, mut n: usize) -> ReadResult<()> {
        let mut buf = [0u8; 256];
        while n > 0 {
            let take = n.min(buf.len());
            self.read_exact(&mut buf[..take])?;
            n -= take;
        }
        Ok(())
    }
}

enum Int {
    Unsigned(u64),
    Signed(i64),
}
