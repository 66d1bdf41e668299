use quote::ToTokens;
use syn::{
    Error, Field, GenericArgument, Ident, LitStr, PathArguments, Result, Type,
    parse::ParseBuffer, spanned::Spanned,
};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyPart {
    #[default]
    None,
    Key,
    Key2,
}

pub(crate) struct ColumnMetadata {
    pub(crate) ident: Ident,
    pub(crate) ty: Type,
    pub(crate) name: String,
    pub(crate) nullable: bool,
    pub(crate) key: KeyPart,
    pub(crate) generated: bool,
    pub(crate) high_frequency: bool,
    pub(crate) uncached: bool,
    pub(crate) converter: Option<Type>,
    pub(crate) sql_type: Option<String>,
    /// Not mapped to any column, always left at its default.
    pub(crate) skip: bool,
}

/// `Option<T>` fields are nullable columns.
fn is_option(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    let Some(last) = path.path.segments.last() else {
        return false;
    };
    last.ident == "Option"
        && matches!(
            &last.arguments,
            PathArguments::AngleBracketed(args)
                if matches!(args.args.first(), Some(GenericArgument::Type(..)))
        )
}

fn flag(arg: &syn::meta::ParseNestedMeta, name: &str) -> Result<bool> {
    if arg.input.peek(syn::Token![=]) {
        return Err(arg.error(format!(
            "`{}` takes no value, use it like: `#[tally({})]`",
            name, name
        )));
    }
    Ok(true)
}

pub(crate) fn decode_column(field: &Field) -> Result<ColumnMetadata> {
    let Some(ident) = field.ident.clone() else {
        return Err(Error::new(
            field.span(),
            "Entity can only be derived for structs with named fields",
        ));
    };
    let mut name = ident.to_string();
    if let Some(stripped) = name.strip_prefix("r#") {
        name = stripped.to_string();
    }
    let mut metadata = ColumnMetadata {
        ident,
        ty: field.ty.clone(),
        name,
        nullable: is_option(&field.ty),
        key: KeyPart::None,
        generated: false,
        high_frequency: false,
        uncached: false,
        converter: None,
        sql_type: None,
        skip: false,
    };
    for attr in &field.attrs {
        if !attr.path().is_ident("tally") {
            continue;
        }
        attr.parse_nested_meta(|arg| {
            if arg.path.is_ident("key") {
                metadata.key = KeyPart::Key;
                flag(&arg, "key")?;
            } else if arg.path.is_ident("key2") {
                metadata.key = KeyPart::Key2;
                flag(&arg, "key2")?;
            } else if arg.path.is_ident("generated") {
                metadata.generated = flag(&arg, "generated")?;
            } else if arg.path.is_ident("high_frequency") {
                metadata.high_frequency = flag(&arg, "high_frequency")?;
            } else if arg.path.is_ident("uncached") {
                metadata.uncached = flag(&arg, "uncached")?;
            } else if arg.path.is_ident("skip") {
                metadata.skip = flag(&arg, "skip")?;
            } else if arg.path.is_ident("name") {
                let value = arg.value().and_then(ParseBuffer::parse::<LitStr>).map_err(|e| {
                    Error::new(
                        e.span(),
                        "Error while parsing `name`, use it like: `#[tally(name = \"my_column\")]`",
                    )
                })?;
                metadata.name = value.value();
            } else if arg.path.is_ident("sql_type") {
                let value = arg.value().and_then(ParseBuffer::parse::<LitStr>).map_err(|e| {
                    Error::new(
                        e.span(),
                        "Error while parsing `sql_type`, use it like: `#[tally(sql_type = \"VARCHAR(64)\")]`",
                    )
                })?;
                metadata.sql_type = Some(value.value());
            } else if arg.path.is_ident("converter") {
                let value = arg.value().and_then(ParseBuffer::parse::<Type>).map_err(|e| {
                    Error::new(
                        e.span(),
                        "Error while parsing `converter`, use it like: `#[tally(converter = Json)]`",
                    )
                })?;
                metadata.converter = Some(value);
            } else {
                return Err(arg.error(format!(
                    "Unknown attribute `{}` inside tally macro",
                    arg.path.to_token_stream()
                )));
            }
            Ok(())
        })?;
    }
    if metadata.key != KeyPart::None {
        if metadata.nullable {
            return Err(Error::new(field.ty.span(), "Key columns cannot be `Option`"));
        }
        if metadata.converter.is_some() {
            return Err(Error::new(
                field.span(),
                "Key columns cannot use a converter",
            ));
        }
    }
    if metadata.generated && metadata.key != KeyPart::Key {
        return Err(Error::new(
            field.span(),
            "Only the `key` column can be `generated`",
        ));
    }
    if metadata.skip
        && (metadata.key != KeyPart::None
            || metadata.converter.is_some()
            || metadata.high_frequency
            || metadata.uncached)
    {
        return Err(Error::new(
            field.span(),
            "A `skip` field cannot carry other column attributes",
        ));
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::{ItemStruct, parse_quote};

    fn fields(item: ItemStruct) -> Vec<Result<ColumnMetadata>> {
        item.fields.iter().map(decode_column).collect()
    }

    #[test]
    fn decodes_attributes() {
        let decoded = fields(parse_quote! {
            struct Account {
                #[tally(key, generated)]
                id: i64,
                #[tally(name = "credit_amount", high_frequency)]
                credit: i64,
                nickname: Option<String>,
                #[tally(converter = Json, sql_type = "TEXT")]
                settings: Settings,
            }
        });
        let [id, credit, nickname, settings] = decoded.try_into().ok().unwrap();
        let (id, credit, nickname, settings) = (
            id.unwrap(),
            credit.unwrap(),
            nickname.unwrap(),
            settings.unwrap(),
        );
        assert_eq!(id.key, KeyPart::Key);
        assert!(id.generated);
        assert_eq!(credit.name, "credit_amount");
        assert!(credit.high_frequency);
        assert!(nickname.nullable);
        assert!(!credit.nullable);
        assert!(settings.converter.is_some());
        assert_eq!(settings.sql_type.as_deref(), Some("TEXT"));
    }

    #[test]
    fn rejects_invalid_combinations() {
        let decoded = fields(parse_quote! {
            struct Invalid {
                #[tally(key)]
                id: Option<i64>,
                #[tally(generated)]
                other: i64,
                #[tally(unknown)]
                third: i64,
            }
        });
        assert!(decoded.iter().all(|v| v.is_err()));
    }
}
