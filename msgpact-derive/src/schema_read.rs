use {
    crate::common::{classify, sorted_fields, SchemaArgs, TypeShape},
    darling::{util::Override, FromDeriveInput, Result},
    proc_macro2::TokenStream,
    quote::{format_ident, quote},
    syn::{parse_quote, DeriveInput},
};

pub(crate) fn generate(input: DeriveInput) -> Result<TokenStream> {
    let args = SchemaArgs::from_derive_input(&input)?;
    let krate = args.crate_path();
    let ident = &args.ident;
    let shape = classify(&args)?;

    let (schema_body, read_body, needs_type_names) = match &shape {
        TypeShape::Record(fields) => {
            let sorted = sorted_fields(fields);
            let schema_fields = sorted.iter().map(|field| {
                let name = field.name();
                let target = field.target();
                let constructor = if field.default.is_some() {
                    quote!(with_default)
                } else {
                    quote!(new)
                };
                quote! {
                    #krate::Field::#constructor(
                        #name,
                        <#target as #krate::SchemaRead>::read_schema(collection),
                    )
                }
            });
            let reads = sorted.iter().map(|field| {
                let name = field.name();
                let target = field.target();
                let member = field.ident.as_ref().unwrap();
                let binding = format_ident!("__{}", member);
                let default = match &field.default {
                    None => quote! {
                        ::core::option::Option::<fn() -> <#target as #krate::SchemaRead>::Dst>::None
                    },
                    Some(Override::Inherit) => quote! {
                        ::core::option::Option::Some(|| ::core::default::Default::default())
                    },
                    Some(Override::Explicit(path)) => quote! {
                        ::core::option::Option::Some(|| #path())
                    },
                };
                quote! {
                    let #binding = record.field::<#target, _, _>(reader, #name, #default)?;
                }
            });
            let construct = sorted.iter().map(|field| {
                let member = field.ident.as_ref().unwrap();
                let binding = format_ident!("__{}", member);
                quote! { #member: #binding }
            });
            (
                quote! {
                    collection.complex_read_schema::<Self>(|collection| ::std::vec![
                        #(#schema_fields),*
                    ])
                },
                quote! {
                    let mut record = #krate::RecordReader::begin(reader)?;
                    #(#reads)*
                    record.finish(reader)?;
                    ::core::result::Result::Ok(Self { #(#construct),* })
                },
                false,
            )
        }
        TypeShape::Unit => (
            quote! {
                let _ = collection;
                #krate::Shape::Empty
            },
            quote! {
                reader.skip_value()?;
                ::core::result::Result::Ok(Self)
            },
            false,
        ),
        TypeShape::Enum(variants) => {
            let names: Vec<String> = variants.iter().map(|v| v.ident.to_string()).collect();
            let arms = variants.iter().zip(&names).map(|(variant, name)| {
                let vid = &variant.ident;
                quote! {
                    if name.eq_ignore_ascii_case(#name) {
                        return ::core::result::Result::Ok(Self::#vid);
                    }
                }
            });
            (
                quote! {
                    collection.enum_read_schema::<Self>(&[#(#names),*])
                },
                quote! {
                    let name = reader.read_str()?;
                    #(#arms)*
                    ::core::result::Result::Err(#krate::ReadError::UnknownEnumMember(name))
                },
                false,
            )
        }
        TypeShape::Union(members) => {
            let schema_members = members.iter().map(|(_, payload)| {
                quote! {
                    #krate::Member::new(
                        <#payload as #krate::TypeName>::type_name(),
                        <#payload as #krate::SchemaRead>::read_schema(collection),
                    )
                }
            });
            let arms = members.iter().map(|(vid, payload)| {
                quote! {
                    if name.eq_ignore_ascii_case(&<#payload as #krate::TypeName>::type_name()) {
                        return ::core::result::Result::Ok(Self::#vid(
                            <#payload as #krate::SchemaRead>::read(reader)?,
                        ));
                    }
                }
            });
            (
                quote! {
                    collection.union_read_schema::<Self>(|collection| ::std::vec![
                        #(#schema_members),*
                    ])
                },
                quote! {
                    let name = reader.begin_union()?;
                    #(#arms)*
                    ::core::result::Result::Err(#krate::ReadError::UnknownUnionMember(name))
                },
                true,
            )
        }
    };

    let mut generics = args.generics.clone();
    for param in args.type_params() {
        let bound: syn::WherePredicate = if needs_type_names {
            parse_quote!(#param: #krate::SchemaRead<Dst = #param> + #krate::TypeName + 'static)
        } else {
            parse_quote!(#param: #krate::SchemaRead<Dst = #param> + 'static)
        };
        generics.make_where_clause().predicates.push(bound);
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics #krate::SchemaRead for #ident #ty_generics #where_clause {
            type Dst = Self;

            fn read_schema(collection: &mut #krate::SchemaCollection) -> #krate::Shape {
                #schema_body
            }

            fn read(
                reader: &mut #krate::Decoder<impl ::std::io::Read>,
            ) -> #krate::ReadResult<Self::Dst> {
                #read_body
            }
        }
    })
}
