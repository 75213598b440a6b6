//! End-to-end scenarios: serialize under one type, deserialize under
//! another, and check that the compatibility verdicts agree with what the
//! wire actually does.
use msgpact::{
    deserialize, serialize, Deserializer, ReadError, SchemaCollection, SchemaRead, SchemaWrite,
    UnexpectedFieldPolicy, WriteSchema,
};

#[derive(SchemaWrite, SchemaRead, Debug, PartialEq)]
struct Person {
    name: String,
    age: i32,
}

#[derive(SchemaWrite, SchemaRead, Debug, PartialEq)]
struct PersonWithScore {
    name: String,
    age: i32,
    score: f64,
}

fn nan() -> f64 {
    f64::NAN
}

#[derive(SchemaWrite, SchemaRead, Debug)]
struct PersonWithDefaultHeight {
    name: String,
    age: i32,
    #[msgpact(default = "nan")]
    height: f64,
}

#[derive(SchemaWrite, SchemaRead, Debug)]
struct PersonWithNote {
    name: String,
    age: i32,
    #[msgpact(default)]
    note: String,
}

#[derive(SchemaWrite, SchemaRead, Debug, PartialEq)]
struct OnlyAge {
    age: i32,
}

#[derive(SchemaWrite, SchemaRead, Debug, PartialEq)]
enum EnumAbc {
    A,
    B,
    C,
}

#[derive(SchemaWrite, SchemaRead, Debug, PartialEq)]
enum EnumAbcd {
    A,
    B,
    C,
    D,
}

#[derive(SchemaWrite, SchemaRead, Debug, PartialEq)]
enum NumberOrText {
    Number(i32),
    Text(String),
}

#[derive(SchemaWrite, SchemaRead, Debug, PartialEq)]
enum NumberTextOrFloat {
    Number(i32),
    Text(String),
    Float(f64),
}

#[derive(SchemaWrite, SchemaRead, Debug, PartialEq)]
struct TreeNode {
    value: i32,
    children: Vec<TreeNode>,
}

fn bob() -> Person {
    Person {
        name: "Bob".to_string(),
        age: 36,
    }
}

/// (relaxed, strict) verdicts for reading `R` from `W`'s output.
fn verdicts<W: SchemaWrite, R: SchemaRead>() -> (bool, bool) {
    let mut schemas = SchemaCollection::new();
    let write = schemas.get_or_add_write_schema::<W>();
    let read = schemas.get_or_add_read_schema::<R>();
    (
        read.can_read_from(&write, true, &schemas, &schemas),
        read.can_read_from(&write, false, &schemas, &schemas),
    )
}

#[test]
fn matching_complex_fields() {
    let bytes = serialize(&bob()).unwrap();
    assert_eq!(deserialize::<Person>(&bytes).unwrap(), bob());
    assert_eq!(verdicts::<Person, Person>(), (true, true));
}

#[test]
fn extra_writer_field() {
    let bytes = serialize(&PersonWithScore {
        name: "Bob".to_string(),
        age: 36,
        score: 100.0,
    })
    .unwrap();

    assert_eq!(deserialize::<Person>(&bytes).unwrap(), bob());

    let throwing = Deserializer::<Person>::new(UnexpectedFieldPolicy::Error);
    let fault = throwing.from_slice(&bytes).unwrap_err();
    assert!(fault.target.contains("Person"));
    assert!(matches!(
        fault.source,
        ReadError::UnexpectedField(name) if name == "score"
    ));

    assert_eq!(verdicts::<PersonWithScore, Person>(), (true, false));
}

#[test]
fn missing_defaulted_field_in_the_middle() {
    // `height` sorts between `age` and `name`, so the default is taken
    // mid-walk.
    let bytes = serialize(&bob()).unwrap();
    let person = deserialize::<PersonWithDefaultHeight>(&bytes).unwrap();
    assert_eq!(person.name, "Bob");
    assert_eq!(person.age, 36);
    assert!(person.height.is_nan());

    // The deserializer applies defaults regardless of any compatibility
    // mode; the strict verdict still refuses to rely on them.
    assert_eq!(verdicts::<Person, PersonWithDefaultHeight>(), (true, false));
}

#[test]
fn missing_defaulted_trailing_field() {
    let bytes = serialize(&bob()).unwrap();
    let person = deserialize::<PersonWithNote>(&bytes).unwrap();
    assert_eq!(person.note, "");
    assert_eq!(verdicts::<Person, PersonWithNote>(), (true, false));
}

#[test]
fn missing_required_field_faults() {
    let bytes = serialize(&OnlyAge { age: 36 }).unwrap();
    assert!(matches!(
        deserialize::<Person>(&bytes),
        Err(ReadError::MissingRequiredField(name)) if name == "name"
    ));
    assert_eq!(verdicts::<OnlyAge, Person>(), (false, false));
}

#[test]
fn enum_widening() {
    let bytes = serialize(&EnumAbc::A).unwrap();
    assert_eq!(deserialize::<EnumAbcd>(&bytes).unwrap(), EnumAbcd::A);
    assert_eq!(verdicts::<EnumAbc, EnumAbcd>(), (true, false));

    // The reverse direction fails at runtime too.
    let bytes = serialize(&EnumAbcd::D).unwrap();
    assert!(matches!(
        deserialize::<EnumAbc>(&bytes),
        Err(ReadError::UnknownEnumMember(name)) if name == "D"
    ));
    assert_eq!(verdicts::<EnumAbcd, EnumAbc>(), (false, false));
}

#[test]
fn union_widening() {
    let bytes = serialize(&NumberOrText::Number(1)).unwrap();
    assert_eq!(
        deserialize::<NumberTextOrFloat>(&bytes).unwrap(),
        NumberTextOrFloat::Number(1)
    );
    assert_eq!(verdicts::<NumberOrText, NumberTextOrFloat>(), (true, false));
}

#[test]
fn union_narrowing_is_forbidden() {
    // The verdict is decided on schemas alone, even though this particular
    // payload would have dispatched.
    assert_eq!(verdicts::<NumberTextOrFloat, NumberOrText>(), (false, false));

    let bytes = serialize(&NumberTextOrFloat::Float(1.5)).unwrap();
    assert!(matches!(
        deserialize::<NumberOrText>(&bytes),
        Err(ReadError::UnknownUnionMember(name)) if name == "float64"
    ));
}

#[test]
fn union_member_names_are_case_insensitive_on_the_wire() {
    let mut bytes = serialize(&NumberOrText::Text("hi".to_string())).unwrap();
    // Uppercase the member name in place: ["string", "hi"] -> ["STRING", ...]
    let name: &[u8] = b"string";
    let at = bytes
        .windows(name.len())
        .position(|w| w == name)
        .expect("member name on the wire");
    bytes[at..at + name.len()].make_ascii_uppercase();
    assert_eq!(
        deserialize::<NumberOrText>(&bytes).unwrap(),
        NumberOrText::Text("hi".to_string())
    );
}

#[test]
fn empty_reader_accepts_any_writer() {
    let bytes = serialize(&bob()).unwrap();
    deserialize::<()>(&bytes).unwrap();
    assert_eq!(verdicts::<Person, ()>(), (true, false));
    assert_eq!(verdicts::<(), ()>(), (true, true));
}

#[test]
fn lists_of_compatible_records() {
    let people = vec![
        PersonWithScore {
            name: "Bob".to_string(),
            age: 36,
            score: 100.0,
        },
        PersonWithScore {
            name: "Alice".to_string(),
            age: 40,
            score: 99.5,
        },
    ];
    let bytes = serialize(&people).unwrap();
    let read: Vec<Person> = deserialize(&bytes).unwrap();
    assert_eq!(read[0], bob());
    assert_eq!(read.len(), 2);
    assert_eq!(verdicts::<Vec<PersonWithScore>, Vec<Person>>(), (true, false));
}

#[test]
fn reflexivity_is_strict() {
    assert_eq!(verdicts::<Person, Person>(), (true, true));
    assert_eq!(verdicts::<PersonWithScore, PersonWithScore>(), (true, true));
    assert_eq!(verdicts::<EnumAbc, EnumAbc>(), (true, true));
    assert_eq!(verdicts::<NumberOrText, NumberOrText>(), (true, true));
    assert_eq!(verdicts::<Vec<Person>, Vec<Person>>(), (true, true));
    assert_eq!(verdicts::<Option<Person>, Option<Person>>(), (true, true));
    assert_eq!(verdicts::<(i32, String), (i32, String)>(), (true, true));
    assert_eq!(verdicts::<TreeNode, TreeNode>(), (true, true));
}

#[test]
fn complex_fields_are_sorted_without_duplicates() {
    let mut schemas = SchemaCollection::new();
    let write = schemas.get_or_add_write_schema::<PersonWithScore>();
    let fields = schemas.complex_fields(write.shape()).unwrap();
    let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["age", "name", "score"]);
}

#[test]
fn union_members_are_sorted_by_name() {
    let mut schemas = SchemaCollection::new();
    let write = schemas.get_or_add_write_schema::<NumberTextOrFloat>();
    let members = schemas.union_members(write.shape()).unwrap();
    let names: Vec<_> = members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["float64", "int32", "string"]);
}

#[derive(SchemaWrite, SchemaRead, Debug, PartialEq)]
struct NoFields {}

#[derive(SchemaWrite, SchemaRead, Debug, PartialEq)]
enum OneState {
    Only,
}

#[derive(SchemaWrite, SchemaRead, Debug, PartialEq)]
enum OneMember {
    Value(i32),
}

#[test]
fn degenerate_shapes_roundtrip() {
    let bytes = serialize(&NoFields {}).unwrap();
    assert_eq!(bytes, [0x80]);
    assert_eq!(deserialize::<NoFields>(&bytes).unwrap(), NoFields {});
    assert_eq!(verdicts::<NoFields, NoFields>(), (true, true));

    let bytes = serialize(&OneState::Only).unwrap();
    assert_eq!(deserialize::<OneState>(&bytes).unwrap(), OneState::Only);
    assert_eq!(verdicts::<OneState, OneState>(), (true, true));

    let bytes = serialize(&OneMember::Value(-7)).unwrap();
    assert_eq!(deserialize::<OneMember>(&bytes).unwrap(), OneMember::Value(-7));
    assert_eq!(verdicts::<OneMember, OneMember>(), (true, true));

    let empty: Vec<Person> = Vec::new();
    let bytes = serialize(&empty).unwrap();
    assert_eq!(deserialize::<Vec<Person>>(&bytes).unwrap(), empty);
}

#[test]
fn recursive_types_roundtrip() {
    let tree = TreeNode {
        value: 1,
        children: vec![
            TreeNode {
                value: 2,
                children: vec![],
            },
            TreeNode {
                value: 3,
                children: vec![TreeNode {
                    value: 4,
                    children: vec![],
                }],
            },
        ],
    };
    let bytes = serialize(&tree).unwrap();
    assert_eq!(deserialize::<TreeNode>(&bytes).unwrap(), tree);
}

#[test]
fn schemas_travel_as_xml() {
    // A writer ships its schema; the reader loads it into its own
    // collection and checks compatibility across the two.
    let mut writer_schemas = SchemaCollection::new();
    let write = writer_schemas.get_or_add_write_schema::<Person>();
    let xml = write.to_xml(&writer_schemas);

    let mut reader_schemas = SchemaCollection::new();
    let loaded = WriteSchema::from_xml(&mut reader_schemas, &xml).unwrap();
    let read = reader_schemas.get_or_add_read_schema::<PersonWithDefaultHeight>();

    assert!(read.can_read_from(&loaded, true, &reader_schemas, &reader_schemas));
    assert!(!read.can_read_from(&loaded, false, &reader_schemas, &reader_schemas));
}

#[test]
fn copied_schemas_stay_compatible() {
    let mut source = SchemaCollection::new();
    let write = source.get_or_add_write_schema::<TreeNode>();

    let mut target = SchemaCollection::new();
    let copied = write.copy_to(&source, &mut target);
    let read = target.get_or_add_read_schema::<TreeNode>();
    assert!(read.can_read_from(&copied, false, &target, &target));
}
