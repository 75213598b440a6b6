//! The compatibility engine.
//!
//! Decides whether data produced under a write schema can be consumed under a
//! read schema, by structural recursion over both shapes. Complex fields and
//! union members are already held in case-insensitive lexicographic order, so
//! both walks are linear merges of sorted lists.
//!
//! Relaxed mode tolerates what the read path can absorb at runtime: writer
//! fields the reader skips, reader fields with defaults, enum and union
//! supersets on the appropriate side, and the primitive widening table.
//! Strict mode demands exact structural agreement. Structural mismatch is a
//! `false` verdict, never an error.
use {
    super::{cmp_names, Field, Member, NodeBody, NodeId, PrimitiveKind, ReadSchema, Shape, WriteSchema},
    crate::schema::SchemaCollection,
    std::{cmp::Ordering, collections::HashSet},
};

impl ReadSchema {
    /// Can a message produced under `write` be read under `self`?
    ///
    /// `relaxed` enables the tolerant mode; `false` is the strict mode.
    /// `reader` and `writer` are the collections each schema is rooted in
    /// (the same collection may be passed for both sides).
    pub fn can_read_from(
        &self,
        write: &WriteSchema,
        relaxed: bool,
        reader: &SchemaCollection,
        writer: &SchemaCollection,
    ) -> bool {
        let mut compat = Compat {
            reader,
            writer,
            relaxed,
            assumed: HashSet::new(),
        };
        compat.check(&self.shape, &write.shape)
    }
}

struct Compat<'a> {
    reader: &'a SchemaCollection,
    writer: &'a SchemaCollection,
    relaxed: bool,
    /// Node pairs currently being compared. Cyclic re-entry assumes
    /// compatibility, which the outer comparison then confirms or refutes.
    assumed: HashSet<(NodeId, NodeId)>,
}

impl Compat<'_> {
    fn check(&mut self, read: &Shape, write: &Shape) -> bool {
        match (read, write) {
            (Shape::Empty, Shape::Empty) => true,
            // An empty reader discards whatever the writer produced.
            (Shape::Empty, _) => self.relaxed,
            (Shape::Primitive(r), Shape::Primitive(w)) => {
                r == w || (self.relaxed && widens(*w, *r))
            }
            (Shape::Nullable(r), Shape::Nullable(w)) => self.check(r, w),
            // A writer that always produces a value satisfies a reader
            // prepared for its absence. The converse never holds.
            (Shape::Nullable(r), w) => self.check(r, w),
            (Shape::Sequence(r), Shape::Sequence(w)) => self.check(r, w),
            (Shape::Mapping(rk, rv), Shape::Mapping(wk, wv)) => {
                self.check(rk, wk) && self.check(rv, wv)
            }
            (Shape::Tuple(r), Shape::Tuple(w)) => {
                if r.len() != w.len() {
                    return false;
                }
                r.iter().zip(w).all(|(r, w)| self.check(r, w))
            }
            (Shape::Ref(r), Shape::Ref(w)) => self.check_nodes(*r, *w),
            _ => false,
        }
    }

    fn check_nodes(&mut self, read: NodeId, write: NodeId) -> bool {
        if !self.assumed.insert((read, write)) {
            return true;
        }
        let (reader, writer) = (self.reader, self.writer);
        let verdict = match (reader.body(read), writer.body(write)) {
            (NodeBody::Complex(r), NodeBody::Complex(w)) => self.check_complex(r, w),
            (NodeBody::Union(r), NodeBody::Union(w)) => self.check_union(r, w),
            (NodeBody::Enum(r), NodeBody::Enum(w)) => check_enum(r, w, self.relaxed),
            _ => false,
        };
        self.assumed.remove(&(read, write));
        verdict
    }

    fn check_complex(&mut self, read: &[Field], write: &[Field]) -> bool {
        let (mut r, mut w) = (0, 0);
        loop {
            match (read.get(r), write.get(w)) {
                (None, None) => return true,
                // Reader fields the writer never supplies: a default may
                // stand in, but only in relaxed mode.
                (Some(field), None) => {
                    if self.relaxed && field.has_default {
                        r += 1;
                    } else {
                        return false;
                    }
                }
                // Writer fields the reader does not know: skippable when
                // relaxed.
                (None, Some(_)) => {
                    if self.relaxed {
                        w += 1;
                    } else {
                        return false;
                    }
                }
                (Some(rf), Some(wf)) => match cmp_names(&rf.name, &wf.name) {
                    Ordering::Equal => {
                        if !self.check(&rf.schema, &wf.schema) {
                            return false;
                        }
                        r += 1;
                        w += 1;
                    }
                    Ordering::Less => {
                        if self.relaxed && rf.has_default {
                            r += 1;
                        } else {
                            return false;
                        }
                    }
                    Ordering::Greater => {
                        if self.relaxed {
                            w += 1;
                        } else {
                            return false;
                        }
                    }
                },
            }
        }
    }

    fn check_union(&mut self, read: &[Member], write: &[Member]) -> bool {
        let (mut r, mut w) = (0, 0);
        loop {
            match (read.get(r), write.get(w)) {
                (None, None) => return true,
                // Reader-only members are never produced; tolerable relaxed.
                (Some(_), None) => {
                    if self.relaxed {
                        r += 1;
                    } else {
                        return false;
                    }
                }
                // A writer member the reader cannot dispatch is fatal in
                // both modes.
                (None, Some(_)) => return false,
                (Some(rm), Some(wm)) => match cmp_names(&rm.name, &wm.name) {
                    Ordering::Equal => {
                        if !self.check(&rm.schema, &wm.schema) {
                            return false;
                        }
                        r += 1;
                        w += 1;
                    }
                    Ordering::Less => {
                        if self.relaxed {
                            r += 1;
                        } else {
                            return false;
                        }
                    }
                    Ordering::Greater => return false,
                },
            }
        }
    }
}

fn check_enum(read: &[String], write: &[String], relaxed: bool) -> bool {
    let reader_names: HashSet<String> = read.iter().map(|n| n.to_ascii_lowercase()).collect();
    let superset = write
        .iter()
        .all(|n| reader_names.contains(&n.to_ascii_lowercase()));
    // Member names are unique case-insensitively, so superset plus equal
    // cardinality is set equality.
    superset && (relaxed || read.len() == write.len())
}

/// The widening table: lossless primitive conversions permitted in relaxed
/// mode only.
fn widens(write: PrimitiveKind, read: PrimitiveKind) -> bool {
    use PrimitiveKind::*;
    matches!(
        (write, read),
        (Int8, Int16 | Int32 | Int64)
            | (Int16, Int32 | Int64)
            | (Int32, Int64)
            | (UInt8, UInt16 | UInt32 | UInt64 | Int16 | Int32 | Int64)
            | (UInt16, UInt32 | UInt64 | Int32 | Int64)
            | (UInt32, UInt64 | Int64)
            | (Float32, Float64)
    )
}
