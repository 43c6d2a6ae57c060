mod decode_column;
mod decode_table;
mod encode_column_def;
mod from_row_trait;

use decode_table::{TableMetadata, decode_table};
use encode_column_def::encode_column_def;
use from_row_trait::from_row_trait;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

/// Implements `Entity` (and `Persistable` when a field is tagged `id`) from the `#[keel(...)]` field tags.
#[proc_macro_derive(Entity, attributes(keel))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemStruct);
    decode_table(item)
        .map(|table| encode_entity(&table))
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn encode_entity(table: &TableMetadata) -> TokenStream2 {
    let item = &table.item;
    let name = &item.ident;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();
    let table_name = &table.name;
    let columns_count = table.columns.len();
    let column_defs = table.columns.iter().map(encode_column_def);
    let selected = table.columns.iter().filter(|c| !c.ignored);
    let values_count = selected.clone().count();
    let values = selected.map(|c| {
        let ident = &c.ident;
        quote!(::keel::AsValue::as_value(::std::clone::Clone::clone(&self.#ident)))
    });
    let from_row = from_row_trait(table);
    let persistable = table.id.map(|i| {
        let column = &table.columns[i];
        let ident = &column.ident;
        let id_column = &column.name;
        quote! {
            impl #impl_generics ::keel::Persistable for #name #ty_generics #where_clause {
                const ID_COLUMN: &'static str = #id_column;

                fn id(&self) -> i64 {
                    <i64 as ::std::convert::From<_>>::from(self.#ident)
                }

                fn set_id(&mut self, id: i64) -> ::keel::Result<()> {
                    self.#ident = ::std::convert::TryFrom::try_from(id).map_err(|e| {
                        ::keel::Error::new(e).context(format!(
                            "Identifier {} does not fit the field `{}`",
                            id,
                            ::std::stringify!(#ident)
                        ))
                    })?;
                    Ok(())
                }
            }
        }
    });
    quote! {
        impl #impl_generics ::keel::Entity for #name #ty_generics #where_clause {
            fn table_name() -> &'static str {
                #table_name
            }

            fn columns() -> &'static [::keel::ColumnDef] {
                static COLUMNS: [::keel::ColumnDef; #columns_count] = [#(#column_defs),*];
                &COLUMNS
            }

            fn row(&self) -> ::keel::Row {
                let values: [::keel::Value; #values_count] = [#(#values),*];
                ::std::boxed::Box::new(values)
            }

            fn from_row(row: ::keel::RowLabeled) -> ::keel::Result<Self> {
                #from_row
            }
        }
        #persistable
    }
}
