use {
    crate::common::{classify, sorted_fields, SchemaArgs, TypeShape},
    darling::{FromDeriveInput, Result},
    proc_macro2::TokenStream,
    quote::quote,
    syn::{parse_quote, DeriveInput},
};

pub(crate) fn generate(input: DeriveInput) -> Result<TokenStream> {
    let args = SchemaArgs::from_derive_input(&input)?;
    let krate = args.crate_path();
    let ident = &args.ident;
    let shape = classify(&args)?;

    let (schema_body, write_body, needs_type_names) = match &shape {
        TypeShape::Record(fields) => {
            let sorted = sorted_fields(fields);
            let count = sorted.len();
            let schema_fields = sorted.iter().map(|field| {
                let name = field.name();
                let target = field.target();
                quote! {
                    #krate::Field::new(
                        #name,
                        <#target as #krate::SchemaWrite>::write_schema(collection),
                    )
                }
            });
            let writes = sorted.iter().map(|field| {
                let name = field.name();
                let target = field.target();
                let member = field.ident.as_ref().unwrap();
                quote! {
                    writer.write_str(#name)?;
                    <#target as #krate::SchemaWrite>::write(writer, &src.#member)?;
                }
            });
            (
                quote! {
                    collection.complex_write_schema::<Self>(|collection| ::std::vec![
                        #(#schema_fields),*
                    ])
                },
                quote! {
                    writer.write_map_len(#count)?;
                    #(#writes)*
                    ::core::result::Result::Ok(())
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
                let _ = src;
                writer.write_map_len(0)
            },
            false,
        ),
        TypeShape::Enum(variants) => {
            let names: Vec<String> = variants.iter().map(|v| v.ident.to_string()).collect();
            let arms = variants.iter().zip(&names).map(|(variant, name)| {
                let vid = &variant.ident;
                quote! { Self::#vid => writer.write_str(#name), }
            });
            (
                quote! {
                    collection.enum_write_schema::<Self>(&[#(#names),*])
                },
                quote! {
                    match src {
                        #(#arms)*
                    }
                },
                false,
            )
        }
        TypeShape::Union(members) => {
            let schema_members = members.iter().map(|(_, payload)| {
                quote! {
                    #krate::Member::new(
                        <#payload as #krate::TypeName>::type_name(),
                        <#payload as #krate::SchemaWrite>::write_schema(collection),
                    )
                }
            });
            let arms = members.iter().map(|(vid, payload)| {
                quote! {
                    Self::#vid(value) => {
                        writer.write_array_len(2)?;
                        writer.write_str(&<#payload as #krate::TypeName>::type_name())?;
                        <#payload as #krate::SchemaWrite>::write(writer, value)
                    }
                }
            });
            (
                quote! {
                    collection.union_write_schema::<Self>(|collection| ::std::vec![
                        #(#schema_members),*
                    ])
                },
                quote! {
                    match src {
                        #(#arms)*
                    }
                },
                true,
            )
        }
    };

    let mut generics = args.generics.clone();
    for param in args.type_params() {
        let bound: syn::WherePredicate = if needs_type_names {
            parse_quote!(#param: #krate::SchemaWrite<Src = #param> + #krate::TypeName + 'static)
        } else {
            parse_quote!(#param: #krate::SchemaWrite<Src = #param> + 'static)
        };
        generics.make_where_clause().predicates.push(bound);
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let type_name_impl = type_name_impl(&args);

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics #krate::SchemaWrite for #ident #ty_generics #where_clause {
            type Src = Self;

            fn write_schema(collection: &mut #krate::SchemaCollection) -> #krate::Shape {
                #schema_body
            }

            fn write(
                writer: &mut #krate::Encoder<impl ::std::io::Write>,
                src: &Self::Src,
            ) -> #krate::WriteResult<()> {
                #write_body
            }
        }

        #type_name_impl
    })
}

/// The canonical type name, emitted with `SchemaWrite` so any derived type
/// can serve as a union member.
fn type_name_impl(args: &SchemaArgs) -> TokenStream {
    let krate = args.crate_path();
    let ident = &args.ident;
    let name = ident.to_string();
    let params = args.type_params();

    let mut generics = args.generics.clone();
    for param in &params {
        generics
            .make_where_clause()
            .predicates
            .push(parse_quote!(#param: #krate::TypeName));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = if params.is_empty() {
        quote! { ::std::string::String::from(#name) }
    } else {
        quote! {
            let arguments = [#(<#params as #krate::TypeName>::type_name()),*];
            ::std::format!("{}({})", #name, arguments.join(","))
        }
    };

    quote! {
        #[automatically_derived]
        impl #impl_generics #krate::TypeName for #ident #ty_generics #where_clause {
            fn type_name() -> ::std::string::String {
                #body
            }
        }
    }
}
