use syn::{Error, Expr, Field, Ident, LitStr, Result, Token, Type, parse::ParseBuffer};

pub(crate) struct ColumnMetadata {
    pub(crate) ident: Ident,
    pub(crate) ty: Type,
    pub(crate) name: String,
    pub(crate) column_type: Option<String>,
    pub(crate) ignored: bool,
    pub(crate) passive: bool,
    pub(crate) order_by: bool,
    pub(crate) id: bool,
}

const USAGE: &str = "use it like: `#[keel(type = \"varchar(255)\", skip_on_write, order_by)]`";

pub fn decode_column(field: &Field) -> Result<ColumnMetadata> {
    let Some(ident) = field.ident.clone() else {
        return Err(Error::new_spanned(field, "Field is expected to have a name"));
    };
    let mut metadata = ColumnMetadata {
        name: ident.to_string(),
        ident,
        ty: field.ty.clone(),
        column_type: None,
        ignored: false,
        passive: false,
        order_by: false,
        id: false,
    };
    if metadata.name.starts_with('_') {
        metadata.name.remove(0);
    }
    for attr in &field.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("keel") {
            continue;
        }
        let list = meta.require_list().map_err(|e| {
            Error::new(
                e.span(),
                format!("Error while parsing `keel`, {USAGE}"),
            )
        })?;
        list.parse_nested_meta(|arg| {
            let flag = |name: &str| {
                if arg.input.peek(Token![=]) {
                    return Err(arg.error(format!(
                        "`{name}` does not take a value, use it like: `#[keel({name})]`"
                    )));
                }
                Ok(true)
            };
            if arg.path.is_ident("type") {
                let v = arg.value().and_then(ParseBuffer::parse::<LitStr>).map_err(|_| {
                    arg.error("Error while parsing `type`, use it like: `#[keel(type = \"varchar(255)\")]`")
                })?;
                metadata.column_type = Some(v.value());
            } else if arg.path.is_ident("name") {
                let v = arg.value().and_then(ParseBuffer::parse::<LitStr>).map_err(|_| {
                    arg.error("Error while parsing `name`, use it like: `#[keel(name = \"my_column\")]`")
                })?;
                metadata.name = v.value();
            } else if arg.path.is_ident("skip") {
                metadata.ignored = flag("skip")?;
                metadata.passive = true;
            } else if arg.path.is_ident("skip_on_write") {
                metadata.passive = flag("skip_on_write")?;
            } else if arg.path.is_ident("order_by") {
                // The payload, if any, carries no meaning
                if arg.input.peek(Token![=]) {
                    arg.value().and_then(ParseBuffer::parse::<Expr>)?;
                }
                metadata.order_by = true;
            } else if arg.path.is_ident("id") {
                metadata.id = flag("id")?;
            } else {
                let path = arg.path.get_ident().map(Ident::to_string).unwrap_or_default();
                return Err(arg.error(format!(
                    "Unknown attribute `{path}` inside keel macro, {USAGE}"
                )));
            }
            Ok(())
        })?;
    }
    if !metadata.ignored && metadata.column_type.is_none() {
        return Err(Error::new_spanned(
            &metadata.ident,
            format!(
                "Field `{}` needs a storage type, use it like: `#[keel(type = \"varchar(255)\")]` or exclude it with `#[keel(skip)]`",
                metadata.ident
            ),
        ));
    }
    if metadata.ignored && metadata.id {
        return Err(Error::new_spanned(
            &metadata.ident,
            "The identifier field cannot be skipped",
        ));
    }
    Ok(metadata)
}
