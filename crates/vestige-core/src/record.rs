//! Records, keys, and predicates.
//!
//! A record is a column-name → JSON value map, which lets one interception
//! layer handle every entity type without generated structs. Predicates are
//! a conjunction of simple column conditions that the store compiles to SQL.

use std::borrow::Cow;
use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single row of any entity type, keyed by column name.
pub type Record = serde_json::Map<String, Value>;

/// Sentinel stored in place of a primary key that could not be read.
pub const UNKNOWN_KEY: &str = "unknown";

/// Ordered primary-key values of one record.
///
/// Component order follows the entity's declared `primary_key` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordKey(Vec<Value>);

impl RecordKey {
    #[must_use]
    pub const fn new(components: Vec<Value>) -> Self {
        Self(components)
    }

    /// Key with a single component (the common `id` case).
    #[must_use]
    pub fn single(value: impl Into<Value>) -> Self {
        Self(vec![value.into()])
    }

    /// Read the given fields out of a record, in order.
    ///
    /// Returns `None` if any field is missing or null, since a partial key
    /// cannot identify the record.
    #[must_use]
    pub fn from_record(record: &Record, fields: &[String]) -> Option<Self> {
        if fields.is_empty() {
            return None;
        }
        fields
            .iter()
            .map(|field| record.get(field).filter(|v| !v.is_null()).cloned())
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }

    #[must_use]
    pub fn components(&self) -> &[Value] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RecordKey {
    /// Strings render bare, everything else as JSON. Composite keys join
    /// with `:`, escaping `:` and `\` inside components with a backslash.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let composite = self.0.len() > 1;
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            let text = match component {
                Value::String(s) => Cow::Borrowed(s.as_str()),
                other => Cow::Owned(other.to_string()),
            };
            if !composite {
                f.write_str(&text)?;
                continue;
            }
            for ch in text.chars() {
                if matches!(ch, ':' | '\\') {
                    f.write_char('\\')?;
                }
                f.write_char(ch)?;
            }
        }
        Ok(())
    }
}

/// One column condition inside a [`Predicate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field = value` (`IS NULL` when `value` is null).
    Eq { field: String, value: Value },
    /// `field <> value`.
    Ne { field: String, value: Value },
    /// `field IN (values...)`. An empty list matches nothing.
    In { field: String, values: Vec<Value> },
    IsNull { field: String },
    NotNull { field: String },
}

impl Condition {
    /// The column this condition tests.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Eq { field, .. }
            | Self::Ne { field, .. }
            | Self::In { field, .. }
            | Self::IsNull { field }
            | Self::NotNull { field } => field,
        }
    }
}

/// Conjunction of column conditions. The empty predicate matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

impl Predicate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn ne(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Ne {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn is_in<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.conditions.push(Condition::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    #[must_use]
    pub fn is_null(mut self, field: impl Into<String>) -> Self {
        self.conditions.push(Condition::IsNull {
            field: field.into(),
        });
        self
    }

    #[must_use]
    pub fn not_null(mut self, field: impl Into<String>) -> Self {
        self.conditions.push(Condition::NotNull {
            field: field.into(),
        });
        self
    }

    /// Equality predicate binding each field to the matching key component.
    ///
    /// Fields and components are zipped positionally; callers check arity.
    #[must_use]
    pub fn for_key(fields: &[String], key: &RecordKey) -> Self {
        fields
            .iter()
            .zip(key.components())
            .fold(Self::new(), |p, (field, value)| p.eq(field.clone(), value.clone()))
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether `field` is pinned to a single non-null value by an `Eq` condition.
    #[must_use]
    pub fn binds(&self, field: &str) -> bool {
        self.conditions.iter().any(|c| {
            matches!(c, Condition::Eq { field: f, value } if f == field && !value.is_null())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn key_from_record_reads_fields_in_order() {
        let r = record(json!({"tenant": "t1", "id": 7, "name": "x"}));
        let key = RecordKey::from_record(&r, &["tenant".into(), "id".into()]).unwrap();
        assert_eq!(key.components(), &[json!("t1"), json!(7)]);
        assert_eq!(key.to_string(), "t1:7");
    }

    #[test]
    fn composite_key_display_escapes_separator() {
        let fields = ["tenant".to_string(), "id".to_string()];
        let colon = RecordKey::from_record(&record(json!({"tenant": "a:b", "id": "c"})), &fields)
            .unwrap();
        let split = RecordKey::from_record(&record(json!({"tenant": "a", "id": "b:c"})), &fields)
            .unwrap();
        assert_eq!(colon.to_string(), r"a\:b:c");
        assert_eq!(split.to_string(), r"a:b\:c");

        let slash = RecordKey::from_record(&record(json!({"tenant": r"x\", "id": "y"})), &fields)
            .unwrap();
        assert_eq!(slash.to_string(), r"x\\:y");
        assert_eq!(RecordKey::single("a:b").to_string(), "a:b");
    }

    #[test]
    fn key_from_record_rejects_missing_or_null() {
        let r = record(json!({"id": null, "name": "x"}));
        assert!(RecordKey::from_record(&r, &["id".into()]).is_none());
        assert!(RecordKey::from_record(&r, &["missing".into()]).is_none());
        assert!(RecordKey::from_record(&r, &[]).is_none());
    }

    #[test]
    fn for_key_builds_one_clause_per_field() {
        let key = RecordKey::new(vec![json!("t1"), json!(7)]);
        let p = Predicate::for_key(&["tenant_id".into(), "order_no".into()], &key);
        assert_eq!(
            p.conditions(),
            &[
                Condition::Eq {
                    field: "tenant_id".into(),
                    value: json!("t1")
                },
                Condition::Eq {
                    field: "order_no".into(),
                    value: json!(7)
                },
            ]
        );
    }

    #[test]
    fn binds_ignores_null_and_non_eq_conditions() {
        let p = Predicate::new()
            .eq("id", Value::Null)
            .ne("status", "open")
            .eq("code", "A1");
        assert!(!p.binds("id"));
        assert!(!p.binds("status"));
        assert!(p.binds("code"));
    }
}
