use crate::{
    ColumnDef, EntityDescriptor, KeyPart, Statement, Value, separated_by,
    writer::{Context, Fragment},
};
use std::fmt::Write;

/// Transaction isolation requested when beginning an owning transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl DateUnit {
    pub fn keyword(&self) -> &'static str {
        match self {
            DateUnit::Second => "SECOND",
            DateUnit::Minute => "MINUTE",
            DateUnit::Hour => "HOUR",
            DateUnit::Day => "DAY",
        }
    }
    pub fn seconds(&self) -> i64 {
        match self {
            DateUnit::Second => 1,
            DateUnit::Minute => 60,
            DateUnit::Hour => 3_600,
            DateUnit::Day => 86_400,
        }
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

/// Dialect printer: every syntactic difference between the supported engines lives here.
///
/// Default methods render the ANSI / PostgreSQL flavour, each dialect overrides what differs.
/// Implementations are stateless, the only mutable state is the [`Context`] placeholder counter.
pub trait SqlWriter: Send + Sync {
    fn as_dyn(&self) -> &dyn SqlWriter;

    fn name(&self) -> &'static str;

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Opening and closing identifier quote characters.
    fn identifier_quotes(&self) -> (char, char) {
        ('"', '"')
    }

    /// Quote an identifier. Already quoted or dotted identifiers are written as they are.
    fn write_identifier_quoted(&self, _context: &mut Context, out: &mut String, value: &str) {
        let (open, close) = self.identifier_quotes();
        if value.contains('.')
            || (value.len() >= 2 && value.starts_with(open) && value.ends_with(close))
        {
            out.push_str(value);
            return;
        }
        out.push(open);
        self.write_escaped(out, value, close, &close.to_string().repeat(2));
        out.push(close);
    }

    /// Write the next bound parameter placeholder.
    fn write_placeholder(&self, context: &mut Context, out: &mut String) {
        context.counter += 1;
        out.push('?');
    }

    /// Bind `value`, writing its placeholder. The unset timestamp becomes the current time.
    fn write_parameter(&self, context: &mut Context, out: &mut Statement, value: Value) {
        if value.is_unset_timestamp() {
            self.write_now(context, &mut out.sql);
            return;
        }
        self.write_placeholder(context, &mut out.sql);
        out.params.push(value.into_bindable());
    }

    fn write_now(&self, _context: &mut Context, out: &mut String) {
        out.push_str("CURRENT_TIMESTAMP");
    }

    /// Row limiting written right after `SELECT`.
    fn write_select_top(
        &self,
        _context: &mut Context,
        _out: &mut String,
        _limit: Option<u64>,
        _offset: Option<u64>,
    ) {
    }

    /// Row limiting written at the end of the `SELECT`.
    fn write_pagination(
        &self,
        _context: &mut Context,
        out: &mut String,
        limit: Option<u64>,
        offset: Option<u64>,
        _ordered: bool,
    ) {
        if let Some(limit) = limit {
            let _ = write!(out, " LIMIT {}", limit);
        }
        if let Some(offset) = offset {
            let _ = write!(out, " OFFSET {}", offset);
        }
    }

    /// Row lock hint written after the table name.
    fn write_lock_hint(&self, _context: &mut Context, _out: &mut String) {}

    /// Row lock clause written at the end of the `SELECT`.
    fn write_lock_clause(&self, _context: &mut Context, out: &mut String) {
        out.push_str(" FOR UPDATE");
    }

    /// Whether INSERT / UPDATE / DELETE can hand back the written columns.
    fn supports_returning(&self) -> bool {
        true
    }

    /// Returned columns written before `VALUES` or `WHERE`.
    fn write_output_clause(&self, _context: &mut Context, _out: &mut String, _columns: &[&str]) {}

    /// Returned columns written at the end of the statement.
    fn write_returning_clause(&self, context: &mut Context, out: &mut String, columns: &[&str]) {
        if columns.is_empty() {
            return;
        }
        out.push_str(" RETURNING ");
        separated_by(
            out,
            columns,
            |out, v| self.write_identifier_quoted(context, out, v),
            ", ",
        );
    }

    /// Number of whole `unit`s elapsed from `from` to `to`.
    fn write_date_diff(
        &self,
        _context: &mut Context,
        out: &mut String,
        unit: DateUnit,
        from: &str,
        to: &str,
    ) {
        let _ = write!(out, "DATEDIFF({}, {}, {})", unit.keyword(), from, to);
    }

    /// `expression` moved by `amount` `unit`s.
    fn write_date_add(
        &self,
        _context: &mut Context,
        out: &mut String,
        unit: DateUnit,
        amount: i64,
        expression: &str,
    ) {
        let _ = write!(out, "DATEADD({}, {}, {})", unit.keyword(), amount, expression);
    }

    /// Render the SQL type of a column.
    fn write_column_type(&self, _context: &mut Context, out: &mut String, column: &ColumnDef) {
        if let Some(sql_type) = column.sql_type {
            out.push_str(sql_type);
            return;
        }
        out.push_str(match column.value {
            Value::Boolean(..) => "BOOLEAN",
            Value::Int32(..) => "INTEGER",
            Value::Int64(..) => "BIGINT",
            Value::Float64(..) => "DOUBLE PRECISION",
            Value::Decimal(..) => "DECIMAL(38, 10)",
            Value::Varchar(..) | Value::Null => "VARCHAR",
            Value::Blob(..) => "BLOB",
            Value::Date(..) => "DATE",
            Value::Timestamp(..) => "TIMESTAMP",
            Value::TimestampWithTimezone(..) => "TIMESTAMP WITH TIME ZONE",
            Value::Uuid(..) => "UUID",
        });
    }

    /// Written after the type of a generated key column.
    fn write_generated_key(&self, _context: &mut Context, out: &mut String) {
        out.push_str(" GENERATED BY DEFAULT AS IDENTITY");
    }

    fn write_create_table_head(&self, context: &mut Context, out: &mut String, table: &str) {
        out.push_str("CREATE TABLE IF NOT EXISTS ");
        self.write_identifier_quoted(context, out, table);
    }

    fn write_create_table(
        &self,
        context: &mut Context,
        out: &mut String,
        descriptor: &EntityDescriptor,
    ) {
        let mut context = context.switch_fragment(Fragment::SqlCreateTable);
        let context = &mut context.current;
        self.write_create_table_head(context, out, descriptor.table);
        out.push_str(" (\n");
        separated_by(
            out,
            &descriptor.columns,
            |out, column| {
                self.write_identifier_quoted(context, out, column.name);
                out.push(' ');
                self.write_column_type(context, out, column);
                if column.generated {
                    self.write_generated_key(context, out);
                }
                if !column.nullable || column.key != KeyPart::None {
                    out.push_str(" NOT NULL");
                }
            },
            ",\n",
        );
        out.push_str(",\nPRIMARY KEY (");
        separated_by(
            out,
            descriptor.key_names(),
            |out, v| self.write_identifier_quoted(context, out, v),
            ", ",
        );
        out.push_str(")\n)");
    }

    /// Written in place of the column list when an INSERT binds no column.
    fn write_default_values(&self, _context: &mut Context, out: &mut String) {
        out.push_str(" DEFAULT VALUES");
    }

    /// Insert or update on key conflict.
    fn write_upsert(
        &self,
        context: &mut Context,
        out: &mut Statement,
        table: &str,
        values: &[(&str, Value)],
        keys: &[&str],
    ) {
        let mut context = context.switch_fragment(Fragment::SqlUpsert);
        let context = &mut context.current;
        self.write_upsert_insert(context, out, table, values);
        out.sql.push_str(" ON CONFLICT (");
        separated_by(
            &mut out.sql,
            keys,
            |out, v| self.write_identifier_quoted(context, out, v),
            ", ",
        );
        out.sql.push(')');
        let updates = values
            .iter()
            .filter(|(name, _)| !keys.contains(name))
            .collect::<Vec<_>>();
        if updates.is_empty() {
            out.sql.push_str(" DO NOTHING");
            return;
        }
        out.sql.push_str(" DO UPDATE SET ");
        separated_by(
            &mut out.sql,
            updates,
            |out, (name, _)| {
                self.write_identifier_quoted(context, out, name);
                out.push_str(" = EXCLUDED.");
                self.write_identifier_quoted(context, out, name);
            },
            ", ",
        );
    }

    /// The `INSERT INTO t (..) VALUES (..)` part shared by the native upserts.
    fn write_upsert_insert(
        &self,
        context: &mut Context,
        out: &mut Statement,
        table: &str,
        values: &[(&str, Value)],
    ) {
        out.sql.push_str("INSERT INTO ");
        self.write_identifier_quoted(context, &mut out.sql, table);
        out.sql.push_str(" (");
        separated_by(
            &mut out.sql,
            values,
            |out, (name, _)| self.write_identifier_quoted(context, out, name),
            ", ",
        );
        out.sql.push_str(") VALUES (");
        for (i, (_, value)) in values.iter().enumerate() {
            if i > 0 {
                out.sql.push_str(", ");
            }
            self.write_parameter(context, out, value.clone());
        }
        out.sql.push(')');
    }

    /// `field = COALESCE(field, 0) + delta`, a single atomic write.
    fn write_increment(
        &self,
        context: &mut Context,
        out: &mut Statement,
        field: &str,
        delta: Value,
    ) {
        self.write_identifier_quoted(context, &mut out.sql, field);
        out.sql.push_str(" = COALESCE(");
        self.write_identifier_quoted(context, &mut out.sql, field);
        out.sql.push_str(", 0) + ");
        self.write_parameter(context, out, delta);
    }

    fn write_transaction_begin(&self, out: &mut String, isolation: Option<IsolationLevel>) {
        out.push_str("BEGIN");
        if let Some(isolation) = isolation {
            let _ = write!(out, " ISOLATION LEVEL {}", isolation.as_sql());
        }
    }

    fn write_transaction_commit(&self, out: &mut String) {
        out.push_str("COMMIT");
    }

    fn write_transaction_rollback(&self, out: &mut String) {
        out.push_str("ROLLBACK");
    }
}
