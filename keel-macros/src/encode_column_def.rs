use crate::decode_column::ColumnMetadata;
use proc_macro2::TokenStream;
use quote::quote;

pub fn encode_column_def(metadata: &ColumnMetadata) -> TokenStream {
    let name = &metadata.name;
    let column_type = metadata.column_type.as_deref().unwrap_or_default();
    let ignored = metadata.ignored;
    let passive = metadata.passive;
    let order_by = metadata.order_by;
    quote! {
        ::keel::ColumnDef {
            name: #name,
            column_type: #column_type,
            ignored: #ignored,
            passive: #passive,
            order_by: #order_by,
        }
    }
}
