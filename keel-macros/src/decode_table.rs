use crate::decode_column::{ColumnMetadata, decode_column};
use syn::{Error, Fields, ItemStruct, Result};

pub(crate) struct TableMetadata {
    pub(crate) columns: Vec<ColumnMetadata>,
    pub(crate) name: String,
    pub(crate) item: ItemStruct,
    /// Index in `columns` of the identifier field.
    pub(crate) id: Option<usize>,
}

pub fn decode_table(item: ItemStruct) -> Result<TableMetadata> {
    let Fields::Named(..) = item.fields else {
        return Err(Error::new_spanned(
            &item.ident,
            "Entity can only be derived for structs with named fields",
        ));
    };
    let columns = item
        .fields
        .iter()
        .map(decode_column)
        .collect::<Result<Vec<_>>>()?;
    let mut ids = columns.iter().enumerate().filter(|(_, c)| c.id);
    let id = ids.next().map(|(i, _)| i);
    if let Some((_, c)) = ids.next() {
        return Err(Error::new_spanned(
            &c.ident,
            "Only one field can be marked with `#[keel(id)]`",
        ));
    }
    Ok(TableMetadata {
        columns,
        name: item.ident.to_string(),
        item,
        id,
    })
}
