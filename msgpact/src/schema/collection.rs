//! The memoizing schema factory.
//!
//! A [`SchemaCollection`] owns every by-reference node derived through it and
//! is the unit of sharing: equal nodes are interned once, and recursive types
//! close into cycles through a two-phase allocate-then-fill bind. Collections
//! are mutable while schemas are being derived and read-only afterwards;
//! share a fully populated collection freely, but serialize concurrent
//! derivation externally.
use {
    super::{
        cmp_names, Field, Member, NodeBody, NodeId, ReadSchema, SchemaRead, SchemaWrite, Shape,
        WriteSchema,
    },
    std::{
        any::{type_name, TypeId},
        cmp::Ordering,
        collections::{BTreeMap, HashMap},
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Direction {
    Write,
    Read,
}

#[derive(Default, Debug)]
pub struct SchemaCollection {
    pub(crate) nodes: BTreeMap<NodeId, NodeBody>,
    by_type: HashMap<(TypeId, Direction), Shape>,
    interned: HashMap<NodeBody, NodeId>,
    next_id: u32,
}

impl SchemaCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// The write schema for `T`, derived on first request and memoized.
    pub fn get_or_add_write_schema<T: SchemaWrite + ?Sized>(&mut self) -> WriteSchema {
        WriteSchema {
            shape: T::write_schema(self),
        }
    }

    /// The read schema for `T`, derived on first request and memoized.
    pub fn get_or_add_read_schema<T: SchemaRead + ?Sized>(&mut self) -> ReadSchema {
        ReadSchema {
            shape: T::read_schema(self),
        }
    }

    /// Fields of a complex record shape, in wire order.
    pub fn complex_fields(&self, shape: &Shape) -> Option<&[Field]> {
        match self.resolve(shape) {
            Some(NodeBody::Complex(fields)) => Some(fields),
            _ => None,
        }
    }

    /// Members of a union shape, sorted by member name.
    pub fn union_members(&self, shape: &Shape) -> Option<&[Member]> {
        match self.resolve(shape) {
            Some(NodeBody::Union(members)) => Some(members),
            _ => None,
        }
    }

    /// Members of an enum shape, in declaration order.
    pub fn enum_members(&self, shape: &Shape) -> Option<&[String]> {
        match self.resolve(shape) {
            Some(NodeBody::Enum(members)) => Some(members),
            _ => None,
        }
    }

    fn resolve(&self, shape: &Shape) -> Option<&NodeBody> {
        match shape {
            Shape::Ref(id) => self.nodes.get(id),
            _ => None,
        }
    }

    pub(crate) fn body(&self, id: NodeId) -> &NodeBody {
        &self.nodes[&id]
    }

    /// Build (or find) the complex write schema node for `T`.
    ///
    /// `fields` supplies the fields in any order; they are sorted into the
    /// canonical case-insensitive order here. Write schemas describe an
    /// exhaustive wire map, so defaults are stripped.
    pub fn complex_write_schema<T: 'static>(
        &mut self,
        fields: impl FnOnce(&mut Self) -> Vec<Field>,
    ) -> Shape {
        self.node_schema::<T>(Direction::Write, |collection| {
            let mut fields = fields(collection);
            for field in &mut fields {
                field.has_default = false;
            }
            NodeBody::Complex(sort_fields::<T>(fields))
        })
    }

    /// Build (or find) the complex read schema node for `T`, keeping each
    /// field's `has_default`.
    pub fn complex_read_schema<T: 'static>(
        &mut self,
        fields: impl FnOnce(&mut Self) -> Vec<Field>,
    ) -> Shape {
        self.node_schema::<T>(Direction::Read, |collection| {
            NodeBody::Complex(sort_fields::<T>(fields(collection)))
        })
    }

    /// Build (or find) the union write schema node for `T`.
    pub fn union_write_schema<T: 'static>(
        &mut self,
        members: impl FnOnce(&mut Self) -> Vec<Member>,
    ) -> Shape {
        self.node_schema::<T>(Direction::Write, |collection| {
            NodeBody::Union(sort_members::<T>(members(collection)))
        })
    }

    /// Build (or find) the union read schema node for `T`.
    pub fn union_read_schema<T: 'static>(
        &mut self,
        members: impl FnOnce(&mut Self) -> Vec<Member>,
    ) -> Shape {
        self.node_schema::<T>(Direction::Read, |collection| {
            NodeBody::Union(sort_members::<T>(members(collection)))
        })
    }

    /// Build (or find) the enum write schema node for `T`. Member order is
    /// declaration order.
    pub fn enum_write_schema<T: 'static>(&mut self, members: &[&str]) -> Shape {
        self.node_schema::<T>(Direction::Write, |_| NodeBody::Enum(enum_body::<T>(members)))
    }

    /// Build (or find) the enum read schema node for `T`.
    pub fn enum_read_schema<T: 'static>(&mut self, members: &[&str]) -> Shape {
        self.node_schema::<T>(Direction::Read, |_| NodeBody::Enum(enum_body::<T>(members)))
    }

    /// The two-phase bind: allocate a pending node, register it so recursive
    /// field derivations resolve to it, fill the body, then intern.
    fn node_schema<T: 'static>(
        &mut self,
        direction: Direction,
        build: impl FnOnce(&mut Self) -> NodeBody,
    ) -> Shape {
        let key = (TypeId::of::<T>(), direction);
        if let Some(shape) = self.by_type.get(&key) {
            return shape.clone();
        }
        let id = self.alloc_pending();
        self.by_type.insert(key, Shape::Ref(id));
        let body = build(self);
        let final_id = self.finalize(id, body);
        let shape = Shape::Ref(final_id);
        self.by_type.insert(key, shape.clone());
        shape
    }

    pub(crate) fn alloc_pending(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, NodeBody::Pending);
        id
    }

    /// Populate a pending node, or discard it in favor of an existing equal
    /// node when one is already interned. This is the get-or-create step
    /// every construction path funnels through.
    pub(crate) fn finalize(&mut self, id: NodeId, body: NodeBody) -> NodeId {
        if let Some(&existing) = self.interned.get(&body) {
            if existing != id {
                self.nodes.remove(&id);
                return existing;
            }
        }
        self.nodes.insert(id, body.clone());
        self.interned.insert(body, id);
        id
    }

    /// Register a body for a pre-allocated node without dedup. Used by the
    /// XML loader, whose ids are fixed before bodies exist.
    pub(crate) fn set_body(&mut self, id: NodeId, body: NodeBody) {
        self.interned.entry(body.clone()).or_insert(id);
        self.nodes.insert(id, body);
    }

    /// Recreate `shape` (rooted in `source`) inside this collection.
    pub(crate) fn copy_shape(
        &mut self,
        shape: &Shape,
        source: &SchemaCollection,
        memo: &mut HashMap<NodeId, NodeId>,
    ) -> Shape {
        match shape {
            Shape::Primitive(kind) => Shape::Primitive(*kind),
            Shape::Empty => Shape::Empty,
            Shape::Nullable(inner) => {
                Shape::Nullable(Box::new(self.copy_shape(inner, source, memo)))
            }
            Shape::Sequence(elem) => Shape::Sequence(Box::new(self.copy_shape(elem, source, memo))),
            Shape::Mapping(key, value) => Shape::Mapping(
                Box::new(self.copy_shape(key, source, memo)),
                Box::new(self.copy_shape(value, source, memo)),
            ),
            Shape::Tuple(elems) => Shape::Tuple(
                elems
                    .iter()
                    .map(|e| self.copy_shape(e, source, memo))
                    .collect(),
            ),
            Shape::Ref(old) => {
                if let Some(&new) = memo.get(old) {
                    return Shape::Ref(new);
                }
                let fresh = self.alloc_pending();
                memo.insert(*old, fresh);
                let body = match source.body(*old) {
                    NodeBody::Pending => NodeBody::Pending,
                    NodeBody::Enum(members) => NodeBody::Enum(members.clone()),
                    NodeBody::Complex(fields) => NodeBody::Complex(
                        fields
                            .iter()
                            .map(|f| Field {
                                name: f.name.clone(),
                                schema: self.copy_shape(&f.schema, source, memo),
                                has_default: f.has_default,
                            })
                            .collect(),
                    ),
                    NodeBody::Union(members) => NodeBody::Union(
                        members
                            .iter()
                            .map(|m| Member {
                                name: m.name.clone(),
                                schema: self.copy_shape(&m.schema, source, memo),
                            })
                            .collect(),
                    ),
                };
                let final_id = self.finalize(fresh, body);
                memo.insert(*old, final_id);
                Shape::Ref(final_id)
            }
        }
    }
}

impl WriteSchema {
    /// Recreate this schema in another collection, sharing nothing with the
    /// source. Structurally equal, never identity-equal.
    pub fn copy_to(&self, source: &SchemaCollection, target: &mut SchemaCollection) -> WriteSchema {
        let mut memo = HashMap::new();
        WriteSchema {
            shape: target.copy_shape(&self.shape, source, &mut memo),
        }
    }
}

impl ReadSchema {
    /// Recreate this schema in another collection.
    pub fn copy_to(&self, source: &SchemaCollection, target: &mut SchemaCollection) -> ReadSchema {
        let mut memo = HashMap::new();
        ReadSchema {
            shape: target.copy_shape(&self.shape, source, &mut memo),
        }
    }
}

fn sort_fields<T>(mut fields: Vec<Field>) -> Vec<Field> {
    fields.sort_by(|a, b| cmp_names(&a.name, &b.name));
    for pair in fields.windows(2) {
        if cmp_names(&pair[0].name, &pair[1].name) == Ordering::Equal {
            panic!(
                "duplicate field name `{}` in schema for {}",
                pair[1].name,
                type_name::<T>()
            );
        }
    }
    fields
}

fn sort_members<T>(mut members: Vec<Member>) -> Vec<Member> {
    members.sort_by(|a, b| cmp_names(&a.name, &b.name));
    for pair in members.windows(2) {
        if cmp_names(&pair[0].name, &pair[1].name) == Ordering::Equal {
            panic!(
                "duplicate union member `{}` in schema for {}",
                pair[1].name,
                type_name::<T>()
            );
        }
    }
    members
}

fn enum_body<T>(members: &[&str]) -> Vec<String> {
    for (i, a) in members.iter().enumerate() {
        for b in &members[i + 1..] {
            if cmp_names(a, b) == Ordering::Equal {
                panic!(
                    "duplicate enum member `{}` in schema for {}",
                    b,
                    type_name::<T>()
                );
            }
        }
    }
    members.iter().map(|m| m.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use {super::*, crate::schema::PrimitiveKind};

    fn int32() -> Shape {
        Shape::Primitive(PrimitiveKind::Int32)
    }

    struct Inches;
    struct Millimetres;

    #[test]
    fn structurally_equal_nodes_are_interned_once() {
        let mut collection = SchemaCollection::new();
        let a = collection.complex_write_schema::<Inches>(|_| vec![Field::new("value", int32())]);
        let b =
            collection.complex_write_schema::<Millimetres>(|_| vec![Field::new("value", int32())]);
        assert_eq!(a, b);
    }

    #[test]
    fn fields_are_sorted_case_insensitively() {
        let mut collection = SchemaCollection::new();
        let shape = collection.complex_write_schema::<Inches>(|_| {
            vec![
                Field::new("Zed", int32()),
                Field::new("alpha", int32()),
                Field::new("Beta", int32()),
            ]
        });
        let names: Vec<_> = collection
            .complex_fields(&shape)
            .unwrap()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, ["alpha", "Beta", "Zed"]);
    }

    #[test]
    #[should_panic(expected = "duplicate field name")]
    fn case_insensitive_duplicate_fields_panic() {
        let mut collection = SchemaCollection::new();
        collection.complex_write_schema::<Inches>(|_| {
            vec![Field::new("value", int32()), Field::new("VALUE", int32())]
        });
    }

    #[test]
    fn copy_to_reproduces_recursive_graphs() {
        struct Tree;
        let mut source = SchemaCollection::new();
        let shape = source.complex_write_schema::<Tree>(|c| {
            let children = Shape::Sequence(Box::new(c.complex_write_schema::<Tree>(|_| {
                unreachable!("recursion resolves through the pending node")
            })));
            vec![
                Field::new("value", int32()),
                Field::new("children", children),
            ]
        });
        let schema = WriteSchema { shape };

        let mut target = SchemaCollection::new();
        let copied = schema.copy_to(&source, &mut target);
        let fields = target.complex_fields(copied.shape()).unwrap();
        assert_eq!(fields.len(), 2);
        // The child sequence element points back at the copied node itself.
        match &fields[0].schema {
            Shape::Sequence(elem) => assert_eq!(elem.as_ref(), copied.shape()),
            other => panic!("unexpected child shape {other:?}"),
        }
    }
}
