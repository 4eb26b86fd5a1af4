use serde_json::Value;
use chrono::{NaiveDate, NaiveDateTime};
use actix_web::error::ErrorBadRequest;


/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}


/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}


/// Typed values for hand-built WHERE clauses (list endpoints)
#[derive(Debug)]
pub enum FilterValue<'a> {
    U64(u64),
    U8(u8),
    Bool(bool),
    Str(&'a str),
    String(String),
}


/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Column names come from client JSON, so only keys present in `allowed`
/// ever reach the SQL text.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, actix_web::Error> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ErrorBadRequest("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    for key in obj.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(ErrorBadRequest(format!(
                "'{}' is not an updatable field",
                key
            )));
        }
    }

    // Build SET clause
    let set_clause = obj
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table, set_clause, id_column
    );

    let mut values = Vec::with_capacity(obj.len() + 1);

    // Convert JSON values → SqlValue
    for value in obj.values() {
        match value {
            Value::String(s) => {
                if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    values.push(SqlValue::Date(d));
                } else if let Ok(dt) =
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                {
                    values.push(SqlValue::DateTime(dt));
                } else {
                    values.push(SqlValue::String(s.clone()));
                }
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    values.push(SqlValue::I64(i));
                } else if let Some(f) = n.as_f64() {
                    values.push(SqlValue::F64(f));
                }
            }
            Value::Bool(b) => values.push(SqlValue::Bool(*b)),
            Value::Null => values.push(SqlValue::Null),
            _ => return Err(ErrorBadRequest("Unsupported JSON value type")),
        }
    }

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}


/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update<'e, E>(executor: E, update: SqlUpdate) -> Result<u64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::MySql>,
{
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(executor).await?;
    Ok(result.rows_affected())
}


/// ===============================
/// Error classification
/// ===============================
/// MySQL reports unique-key collisions as SQLSTATE 23000. Insert/update
/// handlers map those to 409 instead of a blanket 500.
pub fn is_duplicate_key(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23000"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALLOWED: &[&str] = &["name", "cpf", "is_active", "birth_date", "notes"];

    #[test]
    fn builds_set_clause_and_trailing_id() {
        let update = build_update_sql(
            "clients",
            &json!({ "is_active": false, "name": "Ana" }),
            ALLOWED,
            "id",
            42,
        )
        .unwrap();

        // serde_json object keys keep insertion order? No — Map is BTree
        // without preserve_order, so keys come back sorted.
        assert_eq!(
            update.sql,
            "UPDATE clients SET is_active = ?, name = ? WHERE id = ?"
        );
        assert_eq!(
            update.values,
            vec![
                SqlValue::Bool(false),
                SqlValue::String("Ana".into()),
                SqlValue::U64(42),
            ]
        );
    }

    #[test]
    fn rejects_columns_outside_the_whitelist() {
        let err = build_update_sql(
            "clients",
            &json!({ "password": "oops" }),
            ALLOWED,
            "id",
            1,
        )
        .unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn rejects_empty_and_non_object_payloads() {
        assert!(build_update_sql("clients", &json!({}), ALLOWED, "id", 1).is_err());
        assert!(build_update_sql("clients", &json!([1, 2]), ALLOWED, "id", 1).is_err());
    }

    #[test]
    fn maps_dates_and_nulls() {
        let update = build_update_sql(
            "clients",
            &json!({ "birth_date": "1990-04-12", "notes": null }),
            ALLOWED,
            "id",
            7,
        )
        .unwrap();

        assert_eq!(
            update.values,
            vec![
                SqlValue::Date(NaiveDate::from_ymd_opt(1990, 4, 12).unwrap()),
                SqlValue::Null,
                SqlValue::U64(7),
            ]
        );
    }

    #[test]
    fn plain_strings_stay_strings() {
        let update =
            build_update_sql("clients", &json!({ "name": "not-a-date" }), ALLOWED, "id", 1)
                .unwrap();
        assert_eq!(update.values[0], SqlValue::String("not-a-date".into()));
    }

    /// Minimal driver error carrying just a SQLSTATE code.
    #[derive(Debug)]
    struct FakeDbError(&'static str);

    impl std::fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("constraint violation")
        }
    }

    impl std::error::Error for FakeDbError {}

    impl sqlx::error::DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "constraint violation"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(self.0.into())
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    #[test]
    fn sqlstate_23000_counts_as_duplicate_key() {
        let dup = sqlx::Error::Database(Box::new(FakeDbError("23000")));
        assert!(is_duplicate_key(&dup));
    }

    #[test]
    fn other_errors_do_not_count_as_duplicate_key() {
        let other = sqlx::Error::Database(Box::new(FakeDbError("HY000")));
        assert!(!is_duplicate_key(&other));
        assert!(!is_duplicate_key(&sqlx::Error::RowNotFound));
    }
}
