use crate::decode_column::{ColumnMetadata, KeyPart, decode_column};
use convert_case::{Case, Casing};
use syn::{Error, Fields, ItemStruct, LitStr, Result, parse::ParseBuffer, spanned::Spanned};

pub(crate) struct TableMetadata {
    pub(crate) item: ItemStruct,
    pub(crate) name: String,
    pub(crate) columns: Vec<ColumnMetadata>,
    /// Index of the `key` column inside the mapped columns.
    pub(crate) key: usize,
    pub(crate) key2: Option<usize>,
}

impl TableMetadata {
    /// Columns stored in the table, `skip` fields excluded.
    pub(crate) fn mapped(&self) -> impl Iterator<Item = &ColumnMetadata> + Clone {
        self.columns.iter().filter(|c| !c.skip)
    }
}

pub(crate) fn decode_table(item: ItemStruct) -> Result<TableMetadata> {
    if !matches!(item.fields, Fields::Named(..)) {
        return Err(Error::new(
            item.span(),
            "Entity can only be derived for structs with named fields",
        ));
    }
    let mut name = item.ident.to_string().to_case(Case::Snake);
    if name.starts_with('_') {
        name.remove(0);
    }
    for attr in &item.attrs {
        if !attr.path().is_ident("tally") {
            continue;
        }
        attr.parse_nested_meta(|arg| {
            if arg.path.is_ident("name") {
                let value = arg.value().and_then(ParseBuffer::parse::<LitStr>).map_err(|e| {
                    Error::new(
                        e.span(),
                        "Error while parsing `name`, use it like: `#[tally(name = \"my_table\")]`",
                    )
                })?;
                name = value.value();
                Ok(())
            } else {
                Err(arg.error("Unknown attribute inside tally macro, only `name` is accepted on the struct"))
            }
        })?;
    }
    let columns = item
        .fields
        .iter()
        .map(decode_column)
        .collect::<Result<Vec<_>>>()?;
    let position = |part: KeyPart| -> Result<Option<usize>> {
        let mut found = columns
            .iter()
            .filter(|c| !c.skip)
            .enumerate()
            .filter(|(_, c)| c.key == part);
        let first = found.next();
        if let Some((_, c)) = found.next() {
            return Err(Error::new(
                c.ident.span(),
                "Only one `key` and one `key2` column are supported",
            ));
        }
        Ok(first.map(|(i, _)| i))
    };
    let Some(key) = position(KeyPart::Key)? else {
        return Err(Error::new(
            item.ident.span(),
            format!(
                "Entity `{}` must mark one field with `#[tally(key)]`",
                item.ident
            ),
        ));
    };
    let key2 = position(KeyPart::Key2)?;
    if key2.is_some() && columns.iter().any(|c| c.generated) {
        return Err(Error::new(
            item.ident.span(),
            "A composite key cannot be `generated`",
        ));
    }
    let mut names = columns.iter().filter(|c| !c.skip).map(|c| &c.name).collect::<Vec<_>>();
    names.sort();
    if let Some(duplicate) = names.windows(2).find(|w| w[0] == w[1]) {
        return Err(Error::new(
            item.ident.span(),
            format!("Column `{}` is declared more than once", duplicate[0]),
        ));
    }
    Ok(TableMetadata {
        item,
        name,
        columns,
        key,
        key2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn default_name_is_snake_case() {
        let table = decode_table(parse_quote! {
            struct UserBalance {
                #[tally(key)]
                user_id: i64,
                #[tally(key2)]
                guild_id: String,
                #[tally(skip)]
                scratch: u8,
                credit: i64,
            }
        })
        .unwrap();
        assert_eq!(table.name, "user_balance");
        assert_eq!((table.key, table.key2), (0, Some(1)));
        assert_eq!(table.mapped().count(), 3);
    }

    #[test]
    fn explicit_name() {
        let table = decode_table(parse_quote! {
            #[tally(name = "Accounts")]
            struct Account {
                #[tally(key)]
                id: i64,
            }
        })
        .unwrap();
        assert_eq!(table.name, "Accounts");
    }

    #[test]
    fn key_is_required() {
        assert!(
            decode_table(parse_quote! {
                struct Keyless {
                    value: i64,
                }
            })
            .is_err()
        );
        assert!(
            decode_table(parse_quote! {
                struct TwoKeys {
                    #[tally(key)]
                    a: i64,
                    #[tally(key)]
                    b: i64,
                }
            })
            .is_err()
        );
    }
}
