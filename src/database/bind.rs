use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{types::Oid, PgArgumentBuffer, PgArguments, PgRow, PgTypeInfo};
use sqlx::{query::QueryAs, FromRow, Postgres, Type};

use super::partial_update::SqlStatement;

/// A NULL sent with no declared type, so Postgres takes the type from the
/// target column (`INTEGER`, `TEXT`, ...).
#[derive(Debug, Clone, Copy)]
struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        // Oid 0: unspecified parameter type
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl<'q> Encode<'q, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> IsNull {
        IsNull::Yes
    }
}

/// Prepare a typed query from a built statement, binding every parameter in order.
pub fn query_as_statement<'q, O>(statement: &'q SqlStatement) -> QueryAs<'q, Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    statement
        .params
        .iter()
        .fold(sqlx::query_as::<_, O>(&statement.query), bind_value)
}

fn bind_value<'q, O>(q: QueryAs<'q, Postgres, O, PgArguments>, v: &'q Value) -> QueryAs<'q, Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        Value::Null => q.bind(UntypedNull),
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        // JSONB
        Value::Array(_) | Value::Object(_) => q.bind(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_leaves_type_to_the_server() {
        assert_eq!(UntypedNull::type_info(), PgTypeInfo::with_oid(Oid(0)));
        assert_ne!(UntypedNull::type_info(), <Option<String> as Type<Postgres>>::type_info());
    }
}
