//! Declarative statement construction.
//!
//! Every function returns a [`Statement`] whose placeholders are numbered in the order the
//! parameters appear in `Statement::params`. Identifiers go through the dialect quoting, values
//! are always bound, never inlined. Null conditions are the one exception: they are written as
//! `column IS NULL` and bind nothing, so a statement can hold fewer parameters than conditions.

use crate::{
    EngineError, EntityDescriptor, Order, Result, SqlWriter, Statement, Value, separated_by,
    writer::{Context, Fragment},
};

/// Declarative row selection: equality conditions, ordering and pagination.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Filter {
    pub conditions: Vec<(String, Value)>,
    pub order: Vec<(String, Order)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Filter {
    pub fn new() -> Self {
        Default::default()
    }
    /// Match rows where `column` equals `value`, a null `value` matches `column IS NULL`.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }
    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order.push((column.into(), order));
        self
    }
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Null values become `IS NULL` without a parameter, `= NULL` would match nothing.
fn write_conditions<C: AsRef<str>>(
    writer: &dyn SqlWriter,
    context: &mut Context,
    out: &mut Statement,
    keys: &[(C, Value)],
) {
    for (i, (column, value)) in keys.iter().enumerate() {
        if i > 0 {
            out.sql.push_str(" AND ");
        }
        writer.write_identifier_quoted(context, &mut out.sql, column.as_ref());
        if value.is_null() {
            out.sql.push_str(" IS NULL");
        } else {
            out.sql.push_str(" = ");
            writer.write_parameter(context, out, value.clone());
        }
    }
}

/// Append ` WHERE ...` for `keys`, refusing an empty clause unless `allow_empty`.
fn write_where<C: AsRef<str>>(
    writer: &dyn SqlWriter,
    context: &mut Context,
    out: &mut Statement,
    keys: &[(C, Value)],
    allow_empty: bool,
    operation: &'static str,
    table: &str,
) -> Result<()> {
    if keys.is_empty() {
        if allow_empty {
            return Ok(());
        }
        return Err(EngineError::UnscopedOperation {
            operation,
            table: table.to_string(),
        }
        .into());
    }
    out.sql.push_str(" WHERE ");
    write_conditions(writer, context, out, keys);
    Ok(())
}

/// AND-joined `column = placeholder` pairs in input order, without the `WHERE` keyword.
///
/// A null value is written as `column IS NULL` and binds no parameter, the placeholders stay
/// numbered in the order of the remaining values.
///
/// Fails with [`EngineError::UnscopedOperation`] when `keys` is empty and `allow_empty` is false.
pub fn build_where<C: AsRef<str>>(
    writer: &dyn SqlWriter,
    keys: &[(C, Value)],
    allow_empty: bool,
) -> Result<Statement> {
    if keys.is_empty() && !allow_empty {
        return Err(EngineError::UnscopedOperation {
            operation: "statement",
            table: String::new(),
        }
        .into());
    }
    let mut context = Context::new(Fragment::SqlSelectWhere);
    let mut out = Statement::default();
    write_conditions(writer, &mut context, &mut out, keys);
    Ok(out)
}

/// `INSERT INTO table (...) VALUES (...)`, skipping `exclude_columns`.
///
/// Non empty `output_columns` asks the dialect to return them.
pub fn build_insert<C: AsRef<str>>(
    writer: &dyn SqlWriter,
    table: &str,
    values: &[(C, Value)],
    output_columns: &[&str],
    exclude_columns: &[&str],
) -> Statement {
    let mut context = Context::new(Fragment::SqlInsertInto);
    let mut out = Statement::default();
    let values = values
        .iter()
        .filter(|(name, _)| !exclude_columns.contains(&name.as_ref()))
        .collect::<Vec<_>>();
    out.sql.push_str("INSERT INTO ");
    writer.write_identifier_quoted(&mut context, &mut out.sql, table);
    if values.is_empty() {
        writer.write_output_clause(&mut context, &mut out.sql, output_columns);
        writer.write_default_values(&mut context, &mut out.sql);
    } else {
        out.sql.push_str(" (");
        separated_by(
            &mut out.sql,
            &values,
            |out, (name, _)| writer.write_identifier_quoted(&mut context, out, name.as_ref()),
            ", ",
        );
        out.sql.push(')');
        writer.write_output_clause(&mut context, &mut out.sql, output_columns);
        out.sql.push_str(" VALUES (");
        let mut context = context.switch_fragment(Fragment::SqlInsertIntoValues);
        for (i, (_, value)) in values.iter().enumerate() {
            if i > 0 {
                out.sql.push_str(", ");
            }
            writer.write_parameter(&mut context.current, &mut out, value.clone());
        }
        out.sql.push(')');
    }
    writer.write_returning_clause(&mut context, &mut out.sql, output_columns);
    out
}

/// `UPDATE table SET ... WHERE ...`, rejecting an empty `where_keys`.
pub fn build_update<C: AsRef<str>, K: AsRef<str>>(
    writer: &dyn SqlWriter,
    table: &str,
    set_values: &[(C, Value)],
    where_keys: &[(K, Value)],
    output_columns: &[&str],
) -> Result<Statement> {
    if set_values.is_empty() {
        return Err(crate::Error::msg(format!(
            "Update of `{}` does not set any column",
            table
        )));
    }
    let mut context = Context::new(Fragment::SqlUpdateSet);
    let mut out = Statement::default();
    out.sql.push_str("UPDATE ");
    writer.write_identifier_quoted(&mut context, &mut out.sql, table);
    out.sql.push_str(" SET ");
    for (i, (column, value)) in set_values.iter().enumerate() {
        if i > 0 {
            out.sql.push_str(", ");
        }
        writer.write_identifier_quoted(&mut context, &mut out.sql, column.as_ref());
        out.sql.push_str(" = ");
        writer.write_parameter(&mut context, &mut out, value.clone());
    }
    writer.write_output_clause(&mut context, &mut out.sql, output_columns);
    {
        let mut context = context.switch_fragment(Fragment::SqlUpdateWhere);
        write_where(
            writer,
            &mut context.current,
            &mut out,
            where_keys,
            false,
            "update",
            table,
        )?;
    }
    writer.write_returning_clause(&mut context, &mut out.sql, output_columns);
    Ok(out)
}

/// Insert or update on conflict of `key_columns`, in the dialect native form.
pub fn build_upsert(
    writer: &dyn SqlWriter,
    table: &str,
    values: &[(&str, Value)],
    key_columns: &[&str],
) -> Result<Statement> {
    if key_columns.is_empty() {
        return Err(EngineError::MissingKey(table.to_string()).into());
    }
    let mut context = Context::new(Fragment::SqlUpsert);
    let mut out = Statement::default();
    writer.write_upsert(&mut context, &mut out, table, values, key_columns);
    Ok(out)
}

/// `DELETE FROM table WHERE ...`, rejecting an empty `where_keys`.
pub fn build_delete<C: AsRef<str>>(
    writer: &dyn SqlWriter,
    table: &str,
    where_keys: &[(C, Value)],
) -> Result<Statement> {
    let mut context = Context::new(Fragment::SqlDeleteFromWhere);
    let mut out = Statement::default();
    out.sql.push_str("DELETE FROM ");
    writer.write_identifier_quoted(&mut context, &mut out.sql, table);
    write_where(
        writer,
        &mut context,
        &mut out,
        where_keys,
        false,
        "delete",
        table,
    )?;
    Ok(out)
}

/// `SELECT columns FROM table WHERE ... ORDER BY ...` plus pagination and the row lock.
pub fn build_select(
    writer: &dyn SqlWriter,
    table: &str,
    columns: &[&str],
    filter: &Filter,
    lock: bool,
) -> Result<Statement> {
    let mut context = Context::new(Fragment::SqlSelect);
    let mut out = Statement::default();
    out.sql.push_str("SELECT ");
    writer.write_select_top(&mut context, &mut out.sql, filter.limit, filter.offset);
    if columns.is_empty() {
        out.sql.push('*');
    } else {
        separated_by(
            &mut out.sql,
            columns,
            |out, v| writer.write_identifier_quoted(&mut context, out, v),
            ", ",
        );
    }
    out.sql.push_str(" FROM ");
    writer.write_identifier_quoted(&mut context, &mut out.sql, table);
    if lock {
        writer.write_lock_hint(&mut context, &mut out.sql);
    }
    {
        let mut context = context.switch_fragment(Fragment::SqlSelectWhere);
        write_where(
            writer,
            &mut context.current,
            &mut out,
            &filter.conditions,
            true,
            "select",
            table,
        )?;
    }
    if !filter.order.is_empty() {
        out.sql.push_str(" ORDER BY ");
        separated_by(
            &mut out.sql,
            &filter.order,
            |out, (column, order)| {
                writer.write_identifier_quoted(&mut context, out, column);
                if *order == Order::Desc {
                    out.push_str(" DESC");
                }
            },
            ", ",
        );
    }
    writer.write_pagination(
        &mut context,
        &mut out.sql,
        filter.limit,
        filter.offset,
        !filter.order.is_empty(),
    );
    if lock {
        writer.write_lock_clause(&mut context, &mut out.sql);
    }
    Ok(out)
}

/// `SELECT COUNT(*) FROM table WHERE ...`, an empty filter counts every row.
pub fn build_count(writer: &dyn SqlWriter, table: &str, filter: &Filter) -> Result<Statement> {
    let mut context = Context::new(Fragment::SqlSelect);
    let mut out = Statement::default();
    out.sql.push_str("SELECT COUNT(*) AS ");
    writer.write_identifier_quoted(&mut context, &mut out.sql, "count");
    out.sql.push_str(" FROM ");
    writer.write_identifier_quoted(&mut context, &mut out.sql, table);
    write_where(
        writer,
        &mut context,
        &mut out,
        &filter.conditions,
        true,
        "count",
        table,
    )?;
    Ok(out)
}

/// Select a single constant row when `keys` match.
pub fn build_exists<C: AsRef<str>>(
    writer: &dyn SqlWriter,
    table: &str,
    keys: &[(C, Value)],
) -> Result<Statement> {
    let mut context = Context::new(Fragment::SqlSelect);
    let mut out = Statement::default();
    out.sql.push_str("SELECT ");
    writer.write_select_top(&mut context, &mut out.sql, Some(1), None);
    out.sql.push_str("1 AS ");
    writer.write_identifier_quoted(&mut context, &mut out.sql, "found");
    out.sql.push_str(" FROM ");
    writer.write_identifier_quoted(&mut context, &mut out.sql, table);
    write_where(writer, &mut context, &mut out, keys, false, "exists", table)?;
    writer.write_pagination(&mut context, &mut out.sql, Some(1), None, false);
    Ok(out)
}

/// `UPDATE table SET field = COALESCE(field, 0) + delta WHERE ...`, returning the new value.
pub fn build_increment<C: AsRef<str>>(
    writer: &dyn SqlWriter,
    table: &str,
    field: &str,
    delta: Value,
    where_keys: &[(C, Value)],
) -> Result<Statement> {
    let mut context = Context::new(Fragment::SqlUpdateSet);
    let mut out = Statement::default();
    out.sql.push_str("UPDATE ");
    writer.write_identifier_quoted(&mut context, &mut out.sql, table);
    out.sql.push_str(" SET ");
    writer.write_increment(&mut context, &mut out, field, delta);
    writer.write_output_clause(&mut context, &mut out.sql, &[field]);
    {
        let mut context = context.switch_fragment(Fragment::SqlUpdateWhere);
        write_where(
            writer,
            &mut context.current,
            &mut out,
            where_keys,
            false,
            "increment",
            table,
        )?;
    }
    writer.write_returning_clause(&mut context, &mut out.sql, &[field]);
    Ok(out)
}

/// `CREATE TABLE` if it does not exist yet.
pub fn build_create_table(writer: &dyn SqlWriter, descriptor: &EntityDescriptor) -> Statement {
    let mut context = Context::new(Fragment::SqlCreateTable);
    let mut out = Statement::default();
    writer.write_create_table(&mut context, &mut out.sql, descriptor);
    out
}

/// Rewrite `{0}, {1}, …` in `template` into bound parameters taken from `args`.
///
/// Every occurrence binds its own placeholder so the resulting parameters follow the textual
/// order. `{{` and `}}` produce literal braces, text inside single quoted literals is left alone.
pub fn resolve_template(writer: &dyn SqlWriter, template: &str, args: &[Value]) -> Result<Statement> {
    let mut context = Context::new(Fragment::SqlTemplate);
    let mut out = Statement::default();
    out.sql.reserve(template.len());
    let mut chars = template.char_indices().peekable();
    let mut in_literal = false;
    while let Some((i, c)) = chars.next() {
        if in_literal {
            out.sql.push(c);
            if c == '\'' {
                in_literal = false;
            }
            continue;
        }
        match c {
            '\'' => {
                in_literal = true;
                out.sql.push(c);
            }
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                out.sql.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                out.sql.push('}');
            }
            '{' => {
                let rest = &template[i + 1..];
                let Some(end) = rest.find('}') else {
                    return Err(crate::Error::msg(format!(
                        "Unterminated placeholder at byte {} of the template",
                        i
                    )));
                };
                let index = rest[..end].trim().parse::<usize>().map_err(|e| {
                    crate::Error::new(e).context(format!(
                        "Invalid placeholder `{{{}}}` in the template",
                        &rest[..end]
                    ))
                })?;
                let Some(value) = args.get(index) else {
                    return Err(EngineError::MissingParameter {
                        index,
                        provided: args.len(),
                    }
                    .into());
                };
                writer.write_parameter(&mut context, &mut out, value.clone());
                for _ in 0..=end {
                    chars.next();
                }
            }
            c => out.sql.push(c),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dialect, UNSET_TIMESTAMP};

    #[test]
    fn where_is_ordered() {
        let writer = Dialect::Postgres.writer();
        let statement = build_where(
            writer,
            &[
                ("user_id", Value::Int64(Some(4))),
                ("guild_id", Value::Varchar(Some("g".into()))),
            ],
            false,
        )
        .unwrap();
        assert_eq!(statement.sql, r#""user_id" = $1 AND "guild_id" = $2"#);
        assert_eq!(
            statement.params,
            vec![Value::Int64(Some(4)), Value::Varchar(Some("g".into()))]
        );
    }

    #[test]
    fn where_null_binds_nothing() {
        let writer = Dialect::Sqlite.writer();
        let statement = build_where(
            writer,
            &[
                ("user_id", Value::Int64(Some(4))),
                ("left_at", Value::Timestamp(None)),
                ("guild_id", Value::Varchar(Some("g".into()))),
            ],
            false,
        )
        .unwrap();
        assert_eq!(
            statement.sql,
            r#""user_id" = ?1 AND "left_at" IS NULL AND "guild_id" = ?2"#
        );
        assert_eq!(
            statement.params,
            vec![Value::Int64(Some(4)), Value::Varchar(Some("g".into()))]
        );
        let only_null = build_where(writer, &[("left_at", Value::Null)], false).unwrap();
        assert_eq!(only_null.sql, r#""left_at" IS NULL"#);
        assert!(only_null.params.is_empty());
    }

    #[test]
    fn where_refuses_empty() {
        let writer = Dialect::Sqlite.writer();
        let empty: &[(&str, Value)] = &[];
        let error = build_where(writer, empty, false).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<EngineError>(),
            Some(EngineError::UnscopedOperation { .. })
        ));
        let statement = build_where(writer, empty, true).unwrap();
        assert!(statement.sql.is_empty());
        assert!(statement.params.is_empty());
    }

    #[test]
    fn insert_unset_timestamp_is_now() {
        let writer = Dialect::SqlServer.writer();
        let statement = build_insert(
            writer,
            "events",
            &[
                ("id", Value::Int64(Some(1))),
                ("created_at", Value::Timestamp(Some(UNSET_TIMESTAMP))),
                ("active", Value::Boolean(Some(true))),
            ],
            &["id"],
            &[],
        );
        assert_eq!(
            statement.sql,
            "INSERT INTO [events] ([id], [created_at], [active]) OUTPUT INSERTED.[id] VALUES (@p0, GETDATE(), @p1)"
        );
        assert_eq!(
            statement.params,
            vec![Value::Int64(Some(1)), Value::Int32(Some(1))]
        );
    }

    #[test]
    fn insert_excludes_columns() {
        let writer = Dialect::Postgres.writer();
        let statement = build_insert(
            writer,
            "accounts",
            &[("id", Value::Int64(None)), ("credit", Value::Int64(Some(5)))],
            &["id"],
            &["id"],
        );
        assert_eq!(
            statement.sql,
            r#"INSERT INTO "accounts" ("credit") VALUES ($1) RETURNING "id""#
        );
        let statement = build_insert(
            writer,
            "accounts",
            &[("id", Value::Int64(None))],
            &["id"],
            &["id"],
        );
        assert_eq!(
            statement.sql,
            r#"INSERT INTO "accounts" DEFAULT VALUES RETURNING "id""#
        );
    }

    #[test]
    fn update_requires_where() {
        let writer = Dialect::MySql.writer();
        let empty: &[(&str, Value)] = &[];
        assert!(
            build_update(
                writer,
                "accounts",
                &[("credit", Value::Int64(Some(1)))],
                empty,
                &[]
            )
            .is_err()
        );
        let statement = build_update(
            writer,
            "accounts",
            &[("credit", Value::Int64(Some(1))), ("name", "".into())],
            &[("id", Value::Int64(Some(9)))],
            &[],
        )
        .unwrap();
        assert_eq!(
            statement.sql,
            "UPDATE `accounts` SET `credit` = ?, `name` = ? WHERE `id` = ?"
        );
        assert_eq!(statement.params[1], Value::Varchar(Some(String::new())));
    }

    #[test]
    fn template() {
        let writer = Dialect::Postgres.writer();
        let statement = resolve_template(
            writer,
            "SELECT * FROM t WHERE a = {1} AND b = {0} AND c = '{0}' AND d = {1} {{x}}",
            &[Value::Int32(Some(10)), Value::Boolean(Some(false))],
        )
        .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM t WHERE a = $1 AND b = $2 AND c = '{0}' AND d = $3 {x}"
        );
        assert_eq!(
            statement.params,
            vec![
                Value::Int32(Some(0)),
                Value::Int32(Some(10)),
                Value::Int32(Some(0))
            ]
        );
        let error = resolve_template(writer, "SELECT {2}", &[]).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<EngineError>(),
            Some(EngineError::MissingParameter {
                index: 2,
                provided: 0
            })
        ));
    }

    #[test]
    fn select_paginated() {
        let filter = Filter::new()
            .eq("guild", 3i64)
            .order_by("credit", Order::Desc)
            .limit(10)
            .offset(20);
        let sql = |dialect: Dialect| {
            build_select(dialect.writer(), "accounts", &["id"], &filter, false)
                .unwrap()
                .sql
        };
        assert_eq!(
            sql(Dialect::Postgres),
            r#"SELECT "id" FROM "accounts" WHERE "guild" = $1 ORDER BY "credit" DESC LIMIT 10 OFFSET 20"#
        );
        assert_eq!(
            sql(Dialect::SqlServer),
            "SELECT [id] FROM [accounts] WHERE [guild] = @p0 ORDER BY [credit] DESC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        let top = build_select(
            Dialect::SqlServer.writer(),
            "accounts",
            &[],
            &Filter::new().limit(5),
            false,
        )
        .unwrap();
        assert_eq!(top.sql, "SELECT TOP (5) * FROM [accounts]");
    }
}
