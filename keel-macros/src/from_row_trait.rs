use crate::decode_table::TableMetadata;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// Body of `Entity::from_row`.
///
/// Labels are matched without regard to case, skipped fields take their default value.
pub(crate) fn from_row_trait(table: &TableMetadata) -> TokenStream {
    let columns = table.columns.iter().filter(|c| !c.ignored);
    let holders = columns
        .clone()
        .enumerate()
        .map(|(i, _)| format_ident!("__field_{}__", i))
        .collect::<Vec<_>>();
    let holder_declarations = columns.clone().zip(&holders).map(|(c, holder)| {
        let ty = &c.ty;
        quote! {
            let mut #holder: ::std::option::Option<#ty> = None;
        }
    });
    let field_assignment = columns.clone().zip(&holders).map(|(c, holder)| {
        let name = &c.name;
        let ty = &c.ty;
        quote! {
            if __n__.eq_ignore_ascii_case(#name) {
                #holder = Some(
                    <#ty as ::keel::AsValue>::try_from_value(__v__).map_err(|e| {
                        e.context(format!("While decoding the column `{}`", #name))
                    })?,
                );
                continue;
            }
        }
    });
    let create_result = columns.clone().zip(&holders).map(|(c, holder)| {
        let ident = &c.ident;
        let name = &c.name;
        quote! {
            #ident: #holder.ok_or_else(|| __make_error__(#name))?
        }
    });
    let remaining = table.columns.iter().filter(|c| c.ignored).map(|c| {
        let ident = &c.ident;
        quote!(#ident: ::std::default::Default::default())
    });
    quote! {
        #(#holder_declarations)*
        for (__n__, __v__) in ::std::iter::zip(row.labels.iter(), ::std::vec::Vec::from(row.values)) {
            #(#field_assignment)*
        }
        let __make_error__ = |name: &str| ::keel::Error::msg(format!(
            "Column `{}` does not exist in the row provided",
            name
        ));
        Ok(Self {
            #(#create_result,)*
            #(#remaining,)*
        })
    }
}
