//! The canonical XML schema form.
//!
//! One element per shape variant: `Primitive`, `Nullable`, `List`,
//! `Dictionary`, `Tuple`, `Empty`, `Complex`, `Union`, `Enum`. By-reference
//! nodes are defined once with an `Id` attribute and referenced thereafter
//! with `Contract="#id"`. Ids are renumbered `Schema1`, `Schema2`, … in
//! emission order, so structurally equal schemas render to identical
//! documents regardless of the arena ids behind them.
//!
//! Loading is a two-phase bind: every `Id`-carrying element is allocated
//! first, then bodies are filled and `Contract` references resolved, which
//! also permits forward references.
use {
    super::{
        cmp_names, Field, Member, NodeBody, NodeId, ReadSchema, SchemaCollection, Shape,
        WriteSchema,
    },
    crate::error::SchemaError,
    quick_xml::{
        events::{BytesEnd, BytesStart, Event},
        Reader, Writer,
    },
    std::{cmp::Ordering, collections::HashMap},
};

impl WriteSchema {
    /// Render this schema as canonical XML.
    pub fn to_xml(&self, collection: &SchemaCollection) -> String {
        emit_schema(&self.shape, collection)
    }

    /// Load a schema from its canonical XML form into `collection`.
    pub fn from_xml(collection: &mut SchemaCollection, xml: &str) -> Result<Self, SchemaError> {
        Ok(WriteSchema {
            shape: load_schema(collection, xml)?,
        })
    }
}

impl ReadSchema {
    /// Render this schema as canonical XML.
    pub fn to_xml(&self, collection: &SchemaCollection) -> String {
        emit_schema(&self.shape, collection)
    }

    /// Load a schema from its canonical XML form into `collection`.
    pub fn from_xml(collection: &mut SchemaCollection, xml: &str) -> Result<Self, SchemaError> {
        Ok(ReadSchema {
            shape: load_schema(collection, xml)?,
        })
    }
}

impl SchemaCollection {
    /// Render every by-reference node in this collection.
    pub fn to_xml(&self) -> String {
        let mut emitter = Emitter::new(self);
        for (index, id) in self.nodes.keys().enumerate() {
            emitter.ids.insert(*id, format!("Schema{}", index + 1));
        }
        emitter.event(Event::Start(BytesStart::new("SchemaCollection")));
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in ids {
            emitter.emit_def(id);
        }
        emitter.event(Event::End(BytesEnd::new("SchemaCollection")));
        emitter.finish()
    }

    /// Rebuild a collection from [`SchemaCollection::to_xml`] output.
    pub fn from_xml(xml: &str) -> Result<Self, SchemaError> {
        let root = parse_tree(xml)?;
        if root.name != "SchemaCollection" {
            return Err(SchemaError::MalformedXml(format!(
                "expected <SchemaCollection>, found <{}>",
                root.name
            )));
        }
        let mut collection = SchemaCollection::new();
        let mut loader = Loader {
            collection: &mut collection,
            ids: HashMap::new(),
        };
        loader.scan_ids(&root)?;
        for child in &root.children {
            loader.shape(child)?;
        }
        Ok(collection)
    }
}

fn emit_schema(shape: &Shape, collection: &SchemaCollection) -> String {
    let mut emitter = Emitter::new(collection);
    emitter.emit_shape(shape);
    emitter.finish()
}

struct Emitter<'a> {
    collection: &'a SchemaCollection,
    writer: Writer<Vec<u8>>,
    ids: HashMap<NodeId, String>,
}

impl<'a> Emitter<'a> {
    fn new(collection: &'a SchemaCollection) -> Self {
        Emitter {
            collection,
            writer: Writer::new(Vec::new()),
            ids: HashMap::new(),
        }
    }

    fn event(&mut self, event: Event<'_>) {
        self.writer
            .write_event(event)
            .expect("in-memory XML emission cannot fail");
    }

    fn finish(self) -> String {
        String::from_utf8(self.writer.into_inner()).expect("XML output is UTF-8")
    }

    fn emit_shape(&mut self, shape: &Shape) {
        match shape {
            Shape::Primitive(kind) => {
                let mut el = BytesStart::new("Primitive");
                el.push_attribute(("Kind", kind.name()));
                self.event(Event::Empty(el));
            }
            Shape::Empty => self.event(Event::Empty(BytesStart::new("Empty"))),
            Shape::Nullable(inner) => {
                self.event(Event::Start(BytesStart::new("Nullable")));
                self.emit_shape(inner);
                self.event(Event::End(BytesEnd::new("Nullable")));
            }
            Shape::Sequence(element) => {
                self.event(Event::Start(BytesStart::new("List")));
                self.emit_shape(element);
                self.event(Event::End(BytesEnd::new("List")));
            }
            Shape::Mapping(key, value) => {
                self.event(Event::Start(BytesStart::new("Dictionary")));
                self.emit_shape(key);
                self.emit_shape(value);
                self.event(Event::End(BytesEnd::new("Dictionary")));
            }
            Shape::Tuple(elements) => {
                self.event(Event::Start(BytesStart::new("Tuple")));
                for element in elements {
                    self.emit_shape(element);
                }
                self.event(Event::End(BytesEnd::new("Tuple")));
            }
            Shape::Ref(id) => {
                if let Some(existing) = self.ids.get(id) {
                    let tag = node_tag(self.collection.body(*id));
                    let contract = format!("#{existing}");
                    let mut el = BytesStart::new(tag);
                    el.push_attribute(("Contract", contract.as_str()));
                    self.event(Event::Empty(el));
                } else {
                    let name = format!("Schema{}", self.ids.len() + 1);
                    self.ids.insert(*id, name);
                    self.emit_def(*id);
                }
            }
        }
    }

    fn emit_def(&mut self, id: NodeId) {
        let body = self.collection.body(id).clone();
        let tag = node_tag(&body);
        let name = self.ids[&id].clone();
        let mut el = BytesStart::new(tag);
        el.push_attribute(("Id", name.as_str()));
        self.event(Event::Start(el));
        match body {
            NodeBody::Complex(fields) => {
                for field in &fields {
                    let mut fe = BytesStart::new("Field");
                    fe.push_attribute(("Name", field.name.as_str()));
                    if field.has_default {
                        fe.push_attribute(("HasDefault", "true"));
                    }
                    self.event(Event::Start(fe));
                    self.emit_shape(&field.schema);
                    self.event(Event::End(BytesEnd::new("Field")));
                }
            }
            NodeBody::Union(members) => {
                for member in &members {
                    let mut me = BytesStart::new("Member");
                    me.push_attribute(("Name", member.name.as_str()));
                    self.event(Event::Start(me));
                    self.emit_shape(&member.schema);
                    self.event(Event::End(BytesEnd::new("Member")));
                }
            }
            NodeBody::Enum(members) => {
                for member in &members {
                    let mut me = BytesStart::new("Member");
                    me.push_attribute(("Name", member.as_str()));
                    self.event(Event::Empty(me));
                }
            }
            NodeBody::Pending => unreachable!("pending node in XML emission"),
        }
        self.event(Event::End(BytesEnd::new(tag)));
    }
}

fn node_tag(body: &NodeBody) -> &'static str {
    match body {
        NodeBody::Complex(_) => "Complex",
        NodeBody::Union(_) => "Union",
        NodeBody::Enum(_) => "Enum",
        NodeBody::Pending => unreachable!("pending node in XML emission"),
    }
}

/// A parsed XML element; schema data lives entirely in names and attributes.
struct XNode {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<XNode>,
}

impl XNode {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn only_child(&self) -> Result<&XNode, SchemaError> {
        if self.children.len() != 1 {
            return Err(SchemaError::MalformedXml(format!(
                "<{}> requires exactly one child, found {}",
                self.name,
                self.children.len()
            )));
        }
        Ok(&self.children[0])
    }
}

fn parse_tree(xml: &str) -> Result<XNode, SchemaError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XNode> = Vec::new();
    let mut root: Option<XNode> = None;
    loop {
        let event = reader
            .read_event()
            .map_err(|e| SchemaError::MalformedXml(e.to_string()))?;
        match event {
            Event::Start(el) => stack.push(element(&el)?),
            Event::Empty(el) => {
                let node = element(&el)?;
                place(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| SchemaError::MalformedXml("unbalanced end tag".into()))?;
                place(&mut stack, &mut root, node)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| SchemaError::MalformedXml(e.to_string()))?;
                if !text.trim().is_empty() {
                    return Err(SchemaError::MalformedXml(format!(
                        "unexpected text {:?}",
                        text.trim()
                    )));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !stack.is_empty() {
        return Err(SchemaError::MalformedXml("unclosed element".into()));
    }
    root.ok_or_else(|| SchemaError::MalformedXml("document has no root element".into()))
}

fn place(
    stack: &mut Vec<XNode>,
    root: &mut Option<XNode>,
    node: XNode,
) -> Result<(), SchemaError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else if root.is_some() {
        return Err(SchemaError::MalformedXml(
            "multiple root elements".into(),
        ));
    } else {
        *root = Some(node);
    }
    Ok(())
}

fn element(el: &BytesStart<'_>) -> Result<XNode, SchemaError> {
    let name = String::from_utf8(el.name().as_ref().to_vec())
        .map_err(|e| SchemaError::MalformedXml(e.to_string()))?;
    let mut attrs = Vec::new();
    for attr in el.attributes() {
        let attr = attr.map_err(|e| SchemaError::MalformedXml(e.to_string()))?;
        let key = String::from_utf8(attr.key.as_ref().to_vec())
            .map_err(|e| SchemaError::MalformedXml(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| SchemaError::MalformedXml(e.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(XNode {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn load_schema(collection: &mut SchemaCollection, xml: &str) -> Result<Shape, SchemaError> {
    let root = parse_tree(xml)?;
    let mut loader = Loader {
        collection,
        ids: HashMap::new(),
    };
    loader.scan_ids(&root)?;
    loader.shape(&root)
}

struct Loader<'a> {
    collection: &'a mut SchemaCollection,
    /// Document id to arena node, fixed before any body is read.
    ids: HashMap<String, NodeId>,
}

impl Loader<'_> {
    fn scan_ids(&mut self, node: &XNode) -> Result<(), SchemaError> {
        if let Some(id) = node.attr("Id") {
            let allocated = self.collection.alloc_pending();
            if self.ids.insert(id.to_string(), allocated).is_some() {
                return Err(SchemaError::DuplicateId(id.to_string()));
            }
        }
        for child in &node.children {
            self.scan_ids(child)?;
        }
        Ok(())
    }

    fn shape(&mut self, node: &XNode) -> Result<Shape, SchemaError> {
        match node.name.as_str() {
            "Primitive" => {
                let kind = node.attr("Kind").ok_or_else(|| {
                    SchemaError::MalformedXml("<Primitive> requires a Kind attribute".into())
                })?;
                let kind = super::PrimitiveKind::from_name(kind).ok_or_else(|| {
                    SchemaError::MalformedXml(format!("unknown primitive kind {kind:?}"))
                })?;
                Ok(Shape::Primitive(kind))
            }
            "Empty" => Ok(Shape::Empty),
            "Nullable" => Ok(Shape::Nullable(Box::new(self.shape(node.only_child()?)?))),
            "List" => Ok(Shape::Sequence(Box::new(self.shape(node.only_child()?)?))),
            "Dictionary" => {
                if node.children.len() != 2 {
                    return Err(SchemaError::MalformedXml(format!(
                        "<Dictionary> requires key and value children, found {}",
                        node.children.len()
                    )));
                }
                Ok(Shape::Mapping(
                    Box::new(self.shape(&node.children[0])?),
                    Box::new(self.shape(&node.children[1])?),
                ))
            }
            "Tuple" => {
                let mut elements = Vec::with_capacity(node.children.len());
                for child in &node.children {
                    elements.push(self.shape(child)?);
                }
                Ok(Shape::Tuple(elements))
            }
            "Complex" | "Union" | "Enum" => self.node_shape(node),
            other => Err(SchemaError::UnknownElement(other.to_string())),
        }
    }

    fn node_shape(&mut self, node: &XNode) -> Result<Shape, SchemaError> {
        if let Some(contract) = node.attr("Contract") {
            let key = contract.strip_prefix('#').unwrap_or(contract);
            return match self.ids.get(key) {
                Some(&id) => Ok(Shape::Ref(id)),
                None => Err(SchemaError::UnresolvedReference(contract.to_string())),
            };
        }
        let id = match node.attr("Id") {
            Some(name) => self.ids[name],
            None => self.collection.alloc_pending(),
        };
        let body = match node.name.as_str() {
            "Complex" => NodeBody::Complex(self.fields(node)?),
            "Union" => NodeBody::Union(self.members(node)?),
            "Enum" => NodeBody::Enum(enum_members(node)?),
            _ => unreachable!(),
        };
        self.collection.set_body(id, body);
        Ok(Shape::Ref(id))
    }

    fn fields(&mut self, node: &XNode) -> Result<Vec<Field>, SchemaError> {
        let mut fields = Vec::with_capacity(node.children.len());
        for child in &node.children {
            if child.name != "Field" {
                return Err(SchemaError::MalformedXml(format!(
                    "<Complex> children must be <Field>, found <{}>",
                    child.name
                )));
            }
            let name = child.attr("Name").ok_or_else(|| {
                SchemaError::MalformedXml("<Field> requires a Name attribute".into())
            })?;
            let has_default = child.attr("HasDefault") == Some("true");
            fields.push(Field {
                name: name.to_string(),
                schema: self.shape(child.only_child()?)?,
                has_default,
            });
        }
        fields.sort_by(|a, b| cmp_names(&a.name, &b.name));
        for pair in fields.windows(2) {
            if cmp_names(&pair[0].name, &pair[1].name) == Ordering::Equal {
                return Err(SchemaError::DuplicateField(pair[1].name.clone()));
            }
        }
        Ok(fields)
    }

    fn members(&mut self, node: &XNode) -> Result<Vec<Member>, SchemaError> {
        let mut members = Vec::with_capacity(node.children.len());
        for child in &node.children {
            if child.name != "Member" {
                return Err(SchemaError::MalformedXml(format!(
                    "<Union> children must be <Member>, found <{}>",
                    child.name
                )));
            }
            let name = child.attr("Name").ok_or_else(|| {
                SchemaError::MalformedXml("<Member> requires a Name attribute".into())
            })?;
            members.push(Member {
                name: name.to_string(),
                schema: self.shape(child.only_child()?)?,
            });
        }
        members.sort_by(|a, b| cmp_names(&a.name, &b.name));
        for pair in members.windows(2) {
            if cmp_names(&pair[0].name, &pair[1].name) == Ordering::Equal {
                return Err(SchemaError::DuplicateUnionMember(pair[1].name.clone()));
            }
        }
        Ok(members)
    }
}

fn enum_members(node: &XNode) -> Result<Vec<String>, SchemaError> {
    let mut members: Vec<String> = Vec::with_capacity(node.children.len());
    for child in &node.children {
        if child.name != "Member" {
            return Err(SchemaError::MalformedXml(format!(
                "<Enum> children must be <Member>, found <{}>",
                child.name
            )));
        }
        let name = child.attr("Name").ok_or_else(|| {
            SchemaError::MalformedXml("<Member> requires a Name attribute".into())
        })?;
        for existing in &members {
            if cmp_names(existing, name) == Ordering::Equal {
                return Err(SchemaError::DuplicateEnumMember(name.to_string()));
            }
        }
        members.push(name.to_string());
    }
    Ok(members)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::schema::PrimitiveKind,
    };

    fn prim(kind: PrimitiveKind) -> Shape {
        Shape::Primitive(kind)
    }

    struct Person;
    struct Clone1;
    struct Clone2;

    fn person_shape<T: 'static>(collection: &mut SchemaCollection) -> Shape {
        collection.complex_write_schema::<T>(|_| {
            vec![
                Field::new("name", prim(PrimitiveKind::String)),
                Field::new("age", prim(PrimitiveKind::Int32)),
            ]
        })
    }

    #[test]
    fn canonical_person_document() {
        let mut collection = SchemaCollection::new();
        let schema = WriteSchema {
            shape: person_shape::<Person>(&mut collection),
        };
        assert_eq!(
            schema.to_xml(&collection),
            "<Complex Id=\"Schema1\">\
             <Field Name=\"age\"><Primitive Kind=\"int32\"/></Field>\
             <Field Name=\"name\"><Primitive Kind=\"string\"/></Field>\
             </Complex>"
        );
    }

    #[test]
    fn xml_roundtrips_through_a_fresh_collection() {
        let mut collection = SchemaCollection::new();
        let schema = WriteSchema {
            shape: person_shape::<Person>(&mut collection),
        };
        let xml = schema.to_xml(&collection);

        let mut other = SchemaCollection::new();
        let loaded = WriteSchema::from_xml(&mut other, &xml).unwrap();
        assert_eq!(loaded.to_xml(&other), xml);
    }

    #[test]
    fn structurally_equal_schemas_render_identically() {
        let mut a = SchemaCollection::new();
        let mut b = SchemaCollection::new();
        // Pad the second collection so arena ids differ.
        struct Padding;
        b.enum_write_schema::<Padding>(&["X"]);
        let left = WriteSchema {
            shape: person_shape::<Clone1>(&mut a),
        };
        let right = WriteSchema {
            shape: person_shape::<Clone2>(&mut b),
        };
        assert_eq!(left.to_xml(&a), right.to_xml(&b));
    }

    #[test]
    fn shared_nodes_are_defined_once() {
        let mut collection = SchemaCollection::new();
        struct Flag;
        struct Pair;
        let flag = collection.enum_write_schema::<Flag>(&["On", "Off"]);
        let shape = collection.complex_write_schema::<Pair>(|_| {
            vec![
                Field::new("left", flag.clone()),
                Field::new("right", flag.clone()),
            ]
        });
        let schema = WriteSchema { shape };
        let xml = schema.to_xml(&collection);
        assert_eq!(xml.matches("Id=").count(), 2);
        assert_eq!(xml.matches("Contract=\"#Schema2\"").count(), 1);

        let mut other = SchemaCollection::new();
        let loaded = WriteSchema::from_xml(&mut other, &xml).unwrap();
        assert_eq!(loaded.to_xml(&other), xml);
    }

    #[test]
    fn recursive_schemas_roundtrip() {
        struct Tree;
        let mut collection = SchemaCollection::new();
        let shape = collection.complex_write_schema::<Tree>(|c| {
            let children =
                Shape::Sequence(Box::new(c.complex_write_schema::<Tree>(|_| unreachable!())));
            vec![
                Field::new("value", prim(PrimitiveKind::Int32)),
                Field::new("children", children),
            ]
        });
        let schema = WriteSchema { shape };
        let xml = schema.to_xml(&collection);
        assert!(xml.contains("Contract=\"#Schema1\""));

        let mut other = SchemaCollection::new();
        let loaded = WriteSchema::from_xml(&mut other, &xml).unwrap();
        assert_eq!(loaded.to_xml(&other), xml);
    }

    #[test]
    fn forward_references_resolve() {
        let xml = "<SchemaCollection>\
                   <Complex Id=\"a\"><Field Name=\"flag\"><Enum Contract=\"#b\"/></Field></Complex>\
                   <Enum Id=\"b\"><Member Name=\"Yes\"/><Member Name=\"No\"/></Enum>\
                   </SchemaCollection>";
        let collection = SchemaCollection::from_xml(xml).unwrap();
        assert_eq!(collection.nodes.len(), 2);
    }

    #[test]
    fn read_schema_defaults_survive_the_roundtrip() {
        struct Measured;
        let mut collection = SchemaCollection::new();
        let shape = collection.complex_read_schema::<Measured>(|_| {
            vec![
                Field::new("name", prim(PrimitiveKind::String)),
                Field::with_default("height", prim(PrimitiveKind::Float64)),
            ]
        });
        let schema = ReadSchema { shape };
        let xml = schema.to_xml(&collection);
        assert!(xml.contains("HasDefault=\"true\""));

        let mut other = SchemaCollection::new();
        let loaded = ReadSchema::from_xml(&mut other, &xml).unwrap();
        let fields = other.complex_fields(loaded.shape()).unwrap();
        assert!(fields.iter().any(|f| f.name == "height" && f.has_default));
    }

    #[test]
    fn faults_are_typed() {
        let mut collection = SchemaCollection::new();
        assert!(matches!(
            WriteSchema::from_xml(&mut collection, "<Complex><oops"),
            Err(SchemaError::MalformedXml(_))
        ));
        assert!(matches!(
            WriteSchema::from_xml(&mut collection, "<Widget/>"),
            Err(SchemaError::UnknownElement(name)) if name == "Widget"
        ));
        assert!(matches!(
            WriteSchema::from_xml(&mut collection, "<Complex Contract=\"#nowhere\"/>"),
            Err(SchemaError::UnresolvedReference(_))
        ));
        let duplicate = "<Complex Id=\"x\">\
                         <Field Name=\"a\"><Primitive Kind=\"bool\"/></Field>\
                         <Field Name=\"A\"><Primitive Kind=\"bool\"/></Field>\
                         </Complex>";
        assert!(matches!(
            WriteSchema::from_xml(&mut collection, duplicate),
            Err(SchemaError::DuplicateField(_))
        ));
    }
}
