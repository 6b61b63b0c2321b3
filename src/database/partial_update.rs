use serde_json::Value;
use thiserror::Error;

/// A SQL statement with positional `$n` placeholders and the values bound to them.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub query: String,
    pub params: Vec<Value>,
}

/// Caller-side precondition violations. These indicate a bug in the calling
/// layer, never bad user input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartialUpdateError {
    #[error("partial update of {table} requires at least one field")]
    NoFields { table: String },

    #[error("column {column} appears more than once in partial update of {table}")]
    DuplicateColumn { table: String, column: String },

    #[error("lookup key {key} cannot also be updated in {table}")]
    LookupKeyInFields { table: String, key: String },
}

/// Build `UPDATE <table> SET c1=$1, c2=$2 WHERE <key>=$N RETURNING *`.
///
/// `table`, `key` and every column name are interpolated as-is and must come
/// from a fixed list in the calling layer. Only the values are bound. Fields
/// keep the order they are given in; the lookup value is always the last
/// parameter.
pub fn sql_for_partial_update<I, C>(
    table: &str,
    fields: I,
    key: &str,
    key_value: impl Into<Value>,
) -> Result<SqlStatement, PartialUpdateError>
where
    I: IntoIterator<Item = (C, Value)>,
    C: AsRef<str>,
{
    let mut columns: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    for (column, value) in fields {
        let column = column.as_ref();

        if column == key {
            return Err(PartialUpdateError::LookupKeyInFields {
                table: table.to_string(),
                key: key.to_string(),
            });
        }
        if columns.iter().any(|c| c == column) {
            return Err(PartialUpdateError::DuplicateColumn {
                table: table.to_string(),
                column: column.to_string(),
            });
        }

        columns.push(column.to_string());
        params.push(value);
    }

    if columns.is_empty() {
        return Err(PartialUpdateError::NoFields { table: table.to_string() });
    }

    let set_clause = columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{}=${}", column, i + 1))
        .collect::<Vec<_>>()
        .join(", ");

    let query = format!(
        "UPDATE {} SET {} WHERE {}=${} RETURNING *",
        table,
        set_clause,
        key,
        columns.len() + 1
    );
    params.push(key_value.into());

    Ok(SqlStatement { query, params })
}
