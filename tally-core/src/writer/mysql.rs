use crate::{
    ColumnDef, DateUnit, IsolationLevel, SqlWriter, Statement, Value, separated_by,
    writer::{Context, Fragment},
};
use std::fmt::Write;

#[derive(Default, Debug, Clone, Copy)]
pub struct MySqlSqlWriter {}

impl SqlWriter for MySqlSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn name(&self) -> &'static str {
        "mysql"
    }

    fn identifier_quotes(&self) -> (char, char) {
        ('`', '`')
    }

    fn write_now(&self, _context: &mut Context, out: &mut String) {
        out.push_str("NOW()");
    }

    fn write_pagination(
        &self,
        _context: &mut Context,
        out: &mut String,
        limit: Option<u64>,
        offset: Option<u64>,
        _ordered: bool,
    ) {
        match (limit, offset) {
            (Some(limit), _) => {
                let _ = write!(out, " LIMIT {}", limit);
            }
            (None, Some(..)) => {
                let _ = write!(out, " LIMIT {}", u64::MAX);
            }
            (None, None) => {}
        }
        if let Some(offset) = offset {
            let _ = write!(out, " OFFSET {}", offset);
        }
    }

    fn supports_returning(&self) -> bool {
        false
    }

    fn write_returning_clause(&self, _context: &mut Context, _out: &mut String, _columns: &[&str]) {
    }

    fn write_date_diff(
        &self,
        _context: &mut Context,
        out: &mut String,
        unit: DateUnit,
        from: &str,
        to: &str,
    ) {
        let _ = write!(out, "TIMESTAMPDIFF({}, {}, {})", unit.keyword(), from, to);
    }

    fn write_date_add(
        &self,
        _context: &mut Context,
        out: &mut String,
        unit: DateUnit,
        amount: i64,
        expression: &str,
    ) {
        let _ = write!(
            out,
            "DATE_ADD({}, INTERVAL {} {})",
            expression,
            amount,
            unit.keyword()
        );
    }

    fn write_column_type(&self, _context: &mut Context, out: &mut String, column: &ColumnDef) {
        if let Some(sql_type) = column.sql_type {
            out.push_str(sql_type);
            return;
        }
        out.push_str(match column.value {
            Value::Boolean(..) => "BOOLEAN",
            Value::Int32(..) => "INT",
            Value::Int64(..) => "BIGINT",
            Value::Float64(..) => "DOUBLE",
            Value::Decimal(..) => "DECIMAL(38, 10)",
            Value::Varchar(..) | Value::Null if column.is_key() => "VARCHAR(255)",
            Value::Varchar(..) | Value::Null => "TEXT",
            Value::Blob(..) => "BLOB",
            Value::Date(..) => "DATE",
            Value::Timestamp(..) => "DATETIME(6)",
            Value::TimestampWithTimezone(..) => "TIMESTAMP(6)",
            Value::Uuid(..) => "CHAR(36)",
        });
    }

    fn write_generated_key(&self, _context: &mut Context, out: &mut String) {
        out.push_str(" AUTO_INCREMENT");
    }

    fn write_default_values(&self, _context: &mut Context, out: &mut String) {
        out.push_str(" () VALUES ()");
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
        self.write_upsert_insert(context, out, table, values);
        out.sql.push_str(" ON DUPLICATE KEY UPDATE ");
        let updates = values
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| !keys.contains(name))
            .collect::<Vec<_>>();
        if updates.is_empty() {
            separated_by(
                &mut out.sql,
                keys,
                |out, v| {
                    self.write_identifier_quoted(context, out, v);
                    out.push_str(" = ");
                    self.write_identifier_quoted(context, out, v);
                },
                ", ",
            );
            return;
        }
        separated_by(
            &mut out.sql,
            updates,
            |out, v| {
                self.write_identifier_quoted(context, out, v);
                out.push_str(" = VALUES(");
                self.write_identifier_quoted(context, out, v);
                out.push(')');
            },
            ", ",
        );
    }

    fn write_transaction_begin(&self, out: &mut String, isolation: Option<IsolationLevel>) {
        if let Some(isolation) = isolation {
            let _ = write!(out, "SET TRANSACTION ISOLATION LEVEL {};\n", isolation.as_sql());
        }
        out.push_str("START TRANSACTION");
    }
}
