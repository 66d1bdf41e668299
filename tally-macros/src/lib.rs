mod decode_column;
mod decode_table;

use decode_column::{ColumnMetadata, KeyPart};
use decode_table::{TableMetadata, decode_table};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

/// Derive `tally::Entity` for a struct with named fields.
///
/// The struct must implement `Default`: columns missing from a row keep the default value.
///
/// Struct attribute: `#[tally(name = "table")]`, the table name defaults to the snake case struct
/// name. Field attributes, inside `#[tally(..)]`:
/// - `key`, `key2`: the identity of the row, `key` is mandatory.
/// - `generated`: the database generates the key when it is left at its default.
/// - `name = "column"`: column name, defaults to the field name.
/// - `high_frequency`: writes to this column leave the row cache entry alone.
/// - `uncached`: never served from the cache.
/// - `converter = Type`: a `tally::Converter` translating the field to its stored value.
/// - `sql_type = "TYPE"`: SQL type used when creating the table.
/// - `skip`: not a column.
#[proc_macro_derive(Entity, attributes(tally))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemStruct);
    match decode_table(item) {
        Ok(table) => encode_entity(&table).into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn encode_column_def(column: &ColumnMetadata) -> TokenStream2 {
    let name = &column.name;
    let ty = &column.ty;
    let prototype = match &column.converter {
        Some(converter) => quote!(<#converter as ::tally::Converter<#ty>>::storage_type()),
        None => quote!(<#ty as ::tally::AsValue>::as_empty_value()),
    };
    let mut modifiers = Vec::new();
    if column.nullable {
        modifiers.push(quote!(.nullable()));
    }
    match column.key {
        KeyPart::Key => modifiers.push(quote!(.key())),
        KeyPart::Key2 => modifiers.push(quote!(.key2())),
        KeyPart::None => {}
    }
    if column.generated {
        modifiers.push(quote!(.generated()));
    }
    if column.high_frequency {
        modifiers.push(quote!(.high_frequency()));
    }
    if column.uncached {
        modifiers.push(quote!(.uncached()));
    }
    if let Some(sql_type) = &column.sql_type {
        modifiers.push(quote!(.sql_type(#sql_type)));
    }
    quote!(::tally::ColumnDef::new(#name, #prototype) #(#modifiers)*)
}

fn encode_entity(table: &TableMetadata) -> TokenStream2 {
    let struct_name = &table.item.ident;
    let (impl_generics, ty_generics, where_clause) = table.item.generics.split_for_impl();
    let table_name = &table.name;
    let column_defs = table.mapped().map(encode_column_def);
    let key = table.key;
    let key_descriptor = match table.key2 {
        Some(key2) => quote!(::tally::KeyDescriptor::Composite(#key, #key2)),
        None => quote!(::tally::KeyDescriptor::Single(#key)),
    };
    let map_columns = table.mapped().map(|c| {
        let ident = &c.ident;
        let ty = &c.ty;
        let name = &c.name;
        let decode = match &c.converter {
            Some(converter) => quote!(<#converter as ::tally::Converter<#ty>>::from_storage),
            None => quote!(<#ty as ::tally::AsValue>::try_from_value),
        };
        quote! {
            ::tally::map_column(row, #name, mode, &mut entity.#ident, #decode)?;
        }
    });
    let extract_fields = table.mapped().map(|c| {
        let ident = &c.ident;
        let ty = &c.ty;
        let name = &c.name;
        match &c.converter {
            Some(converter) => quote! {
                (#name, <#converter as ::tally::Converter<#ty>>::to_storage(&self.#ident)?)
            },
            None => quote! {
                (#name, <#ty as ::tally::AsValue>::as_value(::std::clone::Clone::clone(&self.#ident)))
            },
        }
    });
    let key_value = |column: &ColumnMetadata| {
        let ident = &column.ident;
        let ty = &column.ty;
        quote!(<#ty as ::tally::AsValue>::as_value(::std::clone::Clone::clone(&self.#ident)))
    };
    let mapped = table.mapped().collect::<Vec<_>>();
    let primary_key = match table.key2 {
        Some(key2) => {
            let (key, key2) = (key_value(mapped[table.key]), key_value(mapped[key2]));
            quote!(::tally::EntityKey::Composite(#key, #key2))
        }
        None => {
            let key = key_value(mapped[table.key]);
            quote!(::tally::EntityKey::Single(#key))
        }
    };
    quote! {
        impl #impl_generics ::tally::Entity for #struct_name #ty_generics #where_clause {
            fn descriptor() -> &'static ::tally::EntityDescriptor {
                static DESCRIPTOR: ::std::sync::LazyLock<::tally::EntityDescriptor> =
                    ::std::sync::LazyLock::new(|| ::tally::EntityDescriptor {
                        table: #table_name,
                        columns: vec![#(#column_defs),*],
                        key: #key_descriptor,
                    });
                &DESCRIPTOR
            }

            fn from_row_with(
                row: &::tally::RowLabeled,
                mode: ::tally::MappingMode,
            ) -> ::tally::Result<Self> {
                let mut entity = <Self as ::std::default::Default>::default();
                #(#map_columns)*
                Ok(entity)
            }

            fn extract_fields(&self) -> ::tally::Result<Vec<(&'static str, ::tally::Value)>> {
                Ok(vec![#(#extract_fields),*])
            }

            fn primary_key(&self) -> ::tally::EntityKey {
                #primary_key
            }
        }
    }
}
