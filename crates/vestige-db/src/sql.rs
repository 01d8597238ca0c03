//! Predicate → SQL compilation.
//!
//! Column and table names cannot be bound as parameters, so every identifier
//! is checked to be a plain `[A-Za-z_][A-Za-z0-9_]*` name and double-quoted.
//! Values are always bound positionally.

use vestige_core::record::{Condition, Predicate};

use crate::error::DatabaseError;
use crate::helpers::json_to_sql;

/// Validate and double-quote an identifier.
pub(crate) fn quote_ident(name: &str) -> Result<String, DatabaseError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DatabaseError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}

/// Render `predicate` as a `WHERE` clause, appending bound values to `params`.
///
/// Placeholders are numbered after any values already in `params`. The
/// empty predicate renders as an empty string (match everything).
pub(crate) fn where_clause(
    predicate: &Predicate,
    params: &mut Vec<libsql::Value>,
) -> Result<String, DatabaseError> {
    if predicate.is_empty() {
        return Ok(String::new());
    }

    let mut parts = Vec::with_capacity(predicate.conditions().len());
    for condition in predicate.conditions() {
        let column = quote_ident(condition.field())?;
        let part = match condition {
            Condition::Eq { value, .. } if value.is_null() => format!("{column} IS NULL"),
            Condition::Eq { value, .. } => {
                params.push(json_to_sql(value));
                format!("{column} = ?{}", params.len())
            }
            Condition::Ne { value, .. } if value.is_null() => format!("{column} IS NOT NULL"),
            Condition::Ne { value, .. } => {
                params.push(json_to_sql(value));
                format!("{column} <> ?{}", params.len())
            }
            Condition::In { values, .. } if values.is_empty() => "0".to_string(),
            Condition::In { values, .. } => {
                let placeholders = values
                    .iter()
                    .map(|value| {
                        params.push(json_to_sql(value));
                        format!("?{}", params.len())
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{column} IN ({placeholders})")
            }
            Condition::IsNull { .. } => format!("{column} IS NULL"),
            Condition::NotNull { .. } => format!("{column} IS NOT NULL"),
        };
        parts.push(part);
    }

    Ok(format!(" WHERE {}", parts.join(" AND ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    #[test]
    fn quote_ident_rejects_injection() {
        assert_eq!(quote_ident("order_id").unwrap(), "\"order_id\"");
        assert!(quote_ident("id; DROP TABLE orders").is_err());
        assert!(quote_ident("1abc").is_err());
        assert!(quote_ident("").is_err());
        assert!(quote_ident("a\"b").is_err());
    }

    #[test]
    fn empty_predicate_has_no_where() {
        let mut params = Vec::new();
        assert_eq!(where_clause(&Predicate::new(), &mut params).unwrap(), "");
        assert!(params.is_empty());
    }

    #[test]
    fn conditions_number_placeholders_in_order() {
        let predicate = Predicate::new()
            .eq("status", "CANCELLED")
            .is_in("region", ["eu", "us"])
            .eq("archived_at", Value::Null)
            .ne("owner", "sys");
        let mut params = vec![libsql::Value::Integer(0)];
        let clause = where_clause(&predicate, &mut params).unwrap();
        assert_eq!(
            clause,
            " WHERE \"status\" = ?2 AND \"region\" IN (?3, ?4) AND \"archived_at\" IS NULL AND \"owner\" <> ?5"
        );
        assert_eq!(params.len(), 5);
    }

    #[test]
    fn empty_in_matches_nothing() {
        let mut params = Vec::new();
        let clause = where_clause(
            &Predicate::new().is_in("id", Vec::<String>::new()),
            &mut params,
        )
        .unwrap();
        assert_eq!(clause, " WHERE 0");
    }
}
