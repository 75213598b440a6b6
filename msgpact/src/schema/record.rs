//! Single-pass reading of complex records.
//!
//! Records are written as maps whose keys are case-insensitively sorted, and
//! a reader expects its fields in that same order, so consumption is a linear
//! merge of two sorted lists with no lookahead beyond the current key:
//!
//! - key equals the expected name: the value feeds the field;
//! - key sorts after the expected name: the field is absent, so its default
//!   stands in or the record is unreadable;
//! - key sorts before the expected name: the writer produced a field this
//!   reader does not know, which the [`UnexpectedFieldPolicy`] settles.
//!
//! [`UnexpectedFieldPolicy`]: crate::UnexpectedFieldPolicy
use {
    super::{cmp_names, SchemaRead},
    crate::{
        error::{ReadError, ReadResult},
        wire::{Decoder, UnexpectedFieldPolicy},
    },
    std::{cmp::Ordering, io::Read},
};

/// Merge-walk state for one incoming record.
///
/// Drive it with one [`field`](RecordReader::field) call per expected field
/// in schema order, then [`finish`](RecordReader::finish). The derive macros
/// generate exactly that sequence.
pub struct RecordReader {
    /// Map entries whose key has not been read yet.
    remaining: usize,
    /// A key read from the wire but not yet matched to a field.
    pending: Option<String>,
}

impl RecordReader {
    /// Consume the record's map header.
    pub fn begin(reader: &mut Decoder<impl Read>) -> ReadResult<Self> {
        Ok(RecordReader {
            remaining: reader.read_map_len()?,
            pending: None,
        })
    }

    /// Produce the value for the next expected field, `name`.
    ///
    /// Expected fields must be requested in case-insensitive lexicographic
    /// name order; the walk is single-pass and cannot revisit earlier keys.
    pub fn field<T, R, F>(
        &mut self,
        reader: &mut Decoder<R>,
        name: &str,
        default: Option<F>,
    ) -> ReadResult<T::Dst>
    where
        T: SchemaRead,
        R: Read,
        F: FnOnce() -> T::Dst,
    {
        loop {
            if self.pending.is_none() {
                if self.remaining == 0 {
                    // Incoming stream exhausted before this field.
                    return match default {
                        Some(make) => Ok(make()),
                        None => Err(ReadError::MissingRequiredField(name.to_string())),
                    };
                }
                self.pending = Some(reader.read_str()?);
                self.remaining -= 1;
            }
            let key = self.pending.as_deref().unwrap_or_default();
            match cmp_names(key, name) {
                Ordering::Equal => {
                    self.pending = None;
                    return T::read(reader);
                }
                Ordering::Greater => {
                    // The writer moved past this name without supplying it.
                    return match default {
                        Some(make) => Ok(make()),
                        None => Err(ReadError::MissingRequiredField(name.to_string())),
                    };
                }
                Ordering::Less => self.unexpected(reader)?,
            }
        }
    }

    /// Drain trailing keys after the last expected field.
    pub fn finish(mut self, reader: &mut Decoder<impl Read>) -> ReadResult<()> {
        loop {
            if self.pending.is_none() {
                if self.remaining == 0 {
                    return Ok(());
                }
                self.pending = Some(reader.read_str()?);
                self.remaining -= 1;
            }
            self.unexpected(reader)?;
        }
    }

    fn unexpected(&mut self, reader: &mut Decoder<impl Read>) -> ReadResult<()> {
        let key = self.pending.take().unwrap_or_default();
        match reader.policy() {
            UnexpectedFieldPolicy::Error => Err(ReadError::UnexpectedField(key)),
            UnexpectedFieldPolicy::Ignore => reader.skip_value(),
        }
    }
}
