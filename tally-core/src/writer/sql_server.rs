use crate::{
    ColumnDef, IsolationLevel, SqlWriter, Statement, Value, separated_by,
    writer::{Context, Fragment},
};
use std::fmt::Write;

#[derive(Default, Debug, Clone, Copy)]
pub struct SqlServerSqlWriter {}

impl SqlWriter for SqlServerSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn identifier_quotes(&self) -> (char, char) {
        ('[', ']')
    }

    fn write_placeholder(&self, context: &mut Context, out: &mut String) {
        let _ = write!(out, "@p{}", context.counter);
        context.counter += 1;
    }

    fn write_now(&self, _context: &mut Context, out: &mut String) {
        out.push_str("GETDATE()");
    }

    fn write_select_top(
        &self,
        _context: &mut Context,
        out: &mut String,
        limit: Option<u64>,
        offset: Option<u64>,
    ) {
        if let (Some(limit), None) = (limit, offset) {
            let _ = write!(out, "TOP ({}) ", limit);
        }
    }

    fn write_pagination(
        &self,
        _context: &mut Context,
        out: &mut String,
        limit: Option<u64>,
        offset: Option<u64>,
        ordered: bool,
    ) {
        let Some(offset) = offset else {
            return;
        };
        if !ordered {
            out.push_str(" ORDER BY (SELECT NULL)");
        }
        let _ = write!(out, " OFFSET {} ROWS", offset);
        if let Some(limit) = limit {
            let _ = write!(out, " FETCH NEXT {} ROWS ONLY", limit);
        }
    }

    fn write_lock_hint(&self, _context: &mut Context, out: &mut String) {
        out.push_str(" WITH (UPDLOCK, ROWLOCK)");
    }

    fn write_lock_clause(&self, _context: &mut Context, _out: &mut String) {}

    fn write_output_clause(&self, context: &mut Context, out: &mut String, columns: &[&str]) {
        if columns.is_empty() {
            return;
        }
        let prefix = if context.fragment == Fragment::SqlDeleteFromWhere {
            "DELETED."
        } else {
            "INSERTED."
        };
        out.push_str(" OUTPUT ");
        separated_by(
            out,
            columns,
            |out, v| {
                out.push_str(prefix);
                self.write_identifier_quoted(context, out, v);
            },
            ", ",
        );
    }

    fn write_returning_clause(&self, _context: &mut Context, _out: &mut String, _columns: &[&str]) {
    }

    fn write_column_type(&self, _context: &mut Context, out: &mut String, column: &ColumnDef) {
        if let Some(sql_type) = column.sql_type {
            out.push_str(sql_type);
            return;
        }
        out.push_str(match column.value {
            Value::Boolean(..) => "BIT",
            Value::Int32(..) => "INT",
            Value::Int64(..) => "BIGINT",
            Value::Float64(..) => "FLOAT",
            Value::Decimal(..) => "DECIMAL(38, 10)",
            Value::Varchar(..) | Value::Null if column.is_key() => "NVARCHAR(450)",
            Value::Varchar(..) | Value::Null => "NVARCHAR(MAX)",
            Value::Blob(..) => "VARBINARY(MAX)",
            Value::Date(..) => "DATE",
            Value::Timestamp(..) => "DATETIME2",
            Value::TimestampWithTimezone(..) => "DATETIMEOFFSET",
            Value::Uuid(..) => "UNIQUEIDENTIFIER",
        });
    }

    fn write_generated_key(&self, _context: &mut Context, out: &mut String) {
        out.push_str(" IDENTITY(1,1)");
    }

    fn write_create_table_head(&self, context: &mut Context, out: &mut String, table: &str) {
        out.push_str("IF OBJECT_ID(N'");
        self.write_escaped(out, table, '\'', "''");
        out.push_str("', N'U') IS NULL\nCREATE TABLE ");
        self.write_identifier_quoted(context, out, table);
    }

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
        out.sql.push_str("MERGE INTO ");
        self.write_identifier_quoted(context, &mut out.sql, table);
        out.sql.push_str(" WITH (HOLDLOCK) AS target\nUSING (SELECT ");
        for (i, (name, value)) in values.iter().enumerate() {
            if i > 0 {
                out.sql.push_str(", ");
            }
            self.write_parameter(context, out, value.clone());
            out.sql.push_str(" AS ");
            self.write_identifier_quoted(context, &mut out.sql, name);
        }
        out.sql.push_str(") AS source\nON ");
        separated_by(
            &mut out.sql,
            keys,
            |out, v| {
                out.push_str("target.");
                self.write_identifier_quoted(context, out, v);
                out.push_str(" = source.");
                self.write_identifier_quoted(context, out, v);
            },
            " AND ",
        );
        let updates = values
            .iter()
            .filter(|(name, _)| !keys.contains(name))
            .collect::<Vec<_>>();
        if !updates.is_empty() {
            out.sql.push_str("\nWHEN MATCHED THEN UPDATE SET ");
            separated_by(
                &mut out.sql,
                updates,
                |out, (name, _)| {
                    out.push_str("target.");
                    self.write_identifier_quoted(context, out, name);
                    out.push_str(" = source.");
                    self.write_identifier_quoted(context, out, name);
                },
                ", ",
            );
        }
        out.sql.push_str("\nWHEN NOT MATCHED THEN INSERT (");
        separated_by(
            &mut out.sql,
            values,
            |out, (name, _)| self.write_identifier_quoted(context, out, name),
            ", ",
        );
        out.sql.push_str(") VALUES (");
        separated_by(
            &mut out.sql,
            values,
            |out, (name, _)| {
                out.push_str("source.");
                self.write_identifier_quoted(context, out, name);
            },
            ", ",
        );
        out.sql.push_str(");");
    }

    fn write_transaction_begin(&self, out: &mut String, isolation: Option<IsolationLevel>) {
        if let Some(isolation) = isolation {
            let _ = write!(out, "SET TRANSACTION ISOLATION LEVEL {};\n", isolation.as_sql());
        }
        out.push_str("BEGIN TRANSACTION");
    }

    fn write_transaction_commit(&self, out: &mut String) {
        out.push_str("COMMIT TRANSACTION");
    }

    fn write_transaction_rollback(&self, out: &mut String) {
        out.push_str("ROLLBACK TRANSACTION");
    }
}
