use {
    darling::{
        ast::{Data, Fields, Style},
        util::Override,
        Error, FromDeriveInput, FromField, FromVariant, Result,
    },
    std::cmp::Ordering,
    syn::{parse_quote, Generics, Ident, Path, Type},
};

#[derive(FromDeriveInput)]
#[darling(attributes(msgpact), supports(struct_named, struct_unit, enum_any))]
pub(crate) struct SchemaArgs {
    pub(crate) ident: Ident,
    pub(crate) generics: Generics,
    pub(crate) data: Data<Variant, Field>,

    /// Path to the msgpact crate, for re-exports under another name.
    #[darling(default, rename = "crate")]
    pub(crate) krate: Option<Path>,
}

impl SchemaArgs {
    pub(crate) fn crate_path(&self) -> Path {
        self.krate
            .clone()
            .unwrap_or_else(|| parse_quote!(::msgpact))
    }

    pub(crate) fn type_params(&self) -> Vec<Ident> {
        self.generics
            .type_params()
            .map(|param| param.ident.clone())
            .collect()
    }
}

#[derive(FromField)]
#[darling(attributes(msgpact))]
pub(crate) struct Field {
    pub(crate) ident: Option<Ident>,
    pub(crate) ty: Type,

    /// Adapter type standing in for the field's own schema implementations.
    ///
    /// For example:
    /// ```ignore
    /// struct Blob {
    ///     #[msgpact(with = "containers::Bytes")]
    ///     data: Vec<u8>,
    /// }
    /// ```
    #[darling(default)]
    pub(crate) with: Option<Type>,

    /// Marks the field defaultable when absent from the wire. Bare
    /// `default` uses `Default::default`; `default = "path"` calls `path()`.
    #[darling(default)]
    pub(crate) default: Option<Override<Path>>,
}

impl Field {
    /// The type whose `SchemaWrite`/`SchemaRead` impls serve this field.
    pub(crate) fn target(&self) -> &Type {
        self.with.as_ref().unwrap_or(&self.ty)
    }

    pub(crate) fn name(&self) -> String {
        self.ident
            .as_ref()
            .expect("named struct fields have idents")
            .to_string()
    }
}

#[derive(FromVariant)]
#[darling(attributes(msgpact))]
pub(crate) struct Variant {
    pub(crate) ident: Ident,
    pub(crate) fields: Fields<Field>,
}

/// How a type maps onto the schema model.
pub(crate) enum TypeShape<'a> {
    /// Named struct: a complex record.
    Record(&'a Fields<Field>),
    /// Unit struct: the empty schema.
    Unit,
    /// Fieldless enum: an enum schema keyed by variant name.
    Enum(&'a [Variant]),
    /// Newtype-variant enum: a union keyed by payload type name.
    Union(Vec<(&'a Ident, &'a Type)>),
}

pub(crate) fn classify(args: &SchemaArgs) -> Result<TypeShape<'_>> {
    match &args.data {
        Data::Struct(fields) => match fields.style {
            Style::Struct => Ok(TypeShape::Record(fields)),
            Style::Unit => Ok(TypeShape::Unit),
            Style::Tuple => Err(Error::custom(
                "tuple structs have no field names to key the record map; use named fields",
            )
            .with_span(&args.ident)),
        },
        Data::Enum(variants) => {
            if variants.is_empty() {
                return Err(Error::custom("empty enums have no wire form").with_span(&args.ident));
            }
            if variants.iter().all(|v| v.fields.fields.is_empty()) {
                Ok(TypeShape::Enum(variants))
            } else if variants
                .iter()
                .all(|v| v.fields.style == Style::Tuple && v.fields.fields.len() == 1)
            {
                Ok(TypeShape::Union(
                    variants
                        .iter()
                        .map(|v| (&v.ident, &v.fields.fields[0].ty))
                        .collect(),
                ))
            } else {
                Err(Error::custom(
                    "variants must be all unit (an enum schema) or all newtype (a union schema)",
                )
                .with_span(&args.ident))
            }
        }
    }
}

/// Fields in the canonical wire order: case-insensitive lexicographic by
/// name, with an ASCII fold.
pub(crate) fn sorted_fields(fields: &Fields<Field>) -> Vec<&Field> {
    let mut sorted: Vec<&Field> = fields.fields.iter().collect();
    sorted.sort_by(|a, b| cmp_names(&a.name(), &b.name()));
    sorted
}

fn cmp_names(a: &str, b: &str) -> Ordering {
    let left = a.bytes().map(|b| b.to_ascii_lowercase());
    let right = b.bytes().map(|b| b.to_ascii_lowercase());
    left.cmp(right)
}
