//! Derive macros for `SchemaWrite` and `SchemaRead`.
//!
//! Named structs become complex records, unit structs become the empty
//! schema, fieldless enums become enum schemas keyed by variant name, and
//! newtype-variant enums become unions keyed by the payload's canonical type
//! name. Refer to the [`msgpact`](https://docs.rs/msgpact) crate for
//! examples and the attribute reference.
use {
    proc_macro::TokenStream,
    syn::{parse_macro_input, DeriveInput},
};

mod common;
mod schema_read;
mod schema_write;

/// Implement `SchemaWrite` (and `TypeName`) for a struct or enum.
#[proc_macro_derive(SchemaWrite, attributes(msgpact))]
pub fn derive_schema_write(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match schema_write::generate(input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.write_errors().into(),
    }
}

/// Implement `SchemaRead` for a struct or enum.
#[proc_macro_derive(SchemaRead, attributes(msgpact))]
pub fn derive_schema_read(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match schema_read::generate(input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.write_errors().into(),
    }
}
