//! Conversion between row shapes and column maps.

use crate::error::{DbError, DbResult};
use crate::models::Value;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// A decoded result row keyed by column name.
pub type Row = serde_json::Map<String, JsonValue>;

/// Serialize a row shape into `(column, value)` pairs.
pub fn to_columns<T: Serialize>(row: &T) -> DbResult<Vec<(String, Value)>> {
    match serde_json::to_value(row)? {
        JsonValue::Object(map) => Ok(map
            .into_iter()
            .map(|(column, value)| (column, Value::from_json(value)))
            .collect()),
        other => Err(DbError::decode(format!(
            "row shape must serialize to a map of columns, got {}",
            json_kind(&other)
        ))),
    }
}

/// Decode a result row into a row shape.
///
/// Columns missing from the result (narrowed selects) and NULL columns keep
/// the row shape's default value. Loosely typed columns are coerced to the
/// field's JSON kind: integer booleans, decimal strings, JSON stored as text.
pub fn from_row<T>(row: Row) -> DbResult<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    let mut base = match serde_json::to_value(T::default())? {
        JsonValue::Object(map) => map,
        _ => return Ok(serde_json::from_value(JsonValue::Object(row))?),
    };

    for (column, value) in row {
        let merged = match (base.get(&column), value) {
            (Some(_), JsonValue::Null) => continue,
            (Some(current), value) => coerce(current, value),
            (None, value) => value,
        };
        base.insert(column, merged);
    }

    Ok(serde_json::from_value(JsonValue::Object(base))?)
}

/// Decode a single column value into a scalar, coercing like [`from_row`].
pub fn from_scalar<V>(value: JsonValue) -> DbResult<V>
where
    V: Serialize + DeserializeOwned + Default,
{
    if value.is_null() {
        return Ok(V::default());
    }
    let template = serde_json::to_value(V::default())?;
    Ok(serde_json::from_value(coerce(&template, value))?)
}

fn coerce(template: &JsonValue, value: JsonValue) -> JsonValue {
    match (template, value) {
        (JsonValue::Bool(_), JsonValue::Number(n)) => {
            JsonValue::Bool(n.as_f64().is_some_and(|v| v != 0.0))
        }
        (JsonValue::Bool(_), JsonValue::String(s)) => match s.as_str() {
            "1" | "true" | "TRUE" | "t" => JsonValue::Bool(true),
            "0" | "false" | "FALSE" | "f" => JsonValue::Bool(false),
            _ => JsonValue::String(s),
        },
        (JsonValue::Number(_), JsonValue::String(s)) => s
            .trim()
            .parse::<serde_json::Number>()
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::String(s)),
        (JsonValue::Number(_), JsonValue::Bool(b)) => JsonValue::from(b as i64),
        (JsonValue::String(_), JsonValue::Number(n)) => JsonValue::String(n.to_string()),
        (JsonValue::Object(_), JsonValue::String(s)) => {
            serde_json::from_str(&s).unwrap_or(JsonValue::String(s))
        }
        // Binary columns decode to base64 text
        (JsonValue::Array(_), JsonValue::String(s)) => serde_json::from_str(&s)
            .ok()
            .or_else(|| {
                BASE64_STANDARD
                    .decode(s.as_bytes())
                    .ok()
                    .map(JsonValue::from)
            })
            .unwrap_or(JsonValue::String(s)),
        (_, value) => value,
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct FullName {
        first: String,
        last: String,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct UserPo {
        id: i64,
        name: String,
        age: i32,
        active: bool,
        score: f64,
        full_name: FullName,
        nick: Option<String>,
    }

    fn row(value: JsonValue) -> Row {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_missing_columns_keep_defaults() {
        let user: UserPo = from_row(row(json!({"id": 3, "name": "steden"}))).unwrap();
        assert_eq!(user.id, 3);
        assert_eq!(user.name, "steden");
        assert_eq!(user.age, 0);
        assert_eq!(user.nick, None);
    }

    #[test]
    fn test_null_columns_keep_defaults() {
        let user: UserPo = from_row(row(json!({"id": 1, "name": null, "nick": null}))).unwrap();
        assert_eq!(user.name, "");
        assert_eq!(user.nick, None);
    }

    #[test]
    fn test_loose_types_are_coerced() {
        let user: UserPo = from_row(row(json!({
            "id": 1,
            "active": 1,
            "score": "12.50",
            "full_name": "{\"first\":\"s\",\"last\":\"h\"}"
        })))
        .unwrap();
        assert!(user.active);
        assert_eq!(user.score, 12.5);
        assert_eq!(user.full_name.first, "s");
    }

    #[test]
    fn test_to_columns_requires_map() {
        assert!(to_columns(&5).is_err());
        let columns = to_columns(&UserPo::default()).unwrap();
        assert!(columns.iter().any(|(c, _)| c == "full_name"));
    }

    #[test]
    fn test_base64_binary_column() {
        #[derive(Debug, Default, Serialize, Deserialize)]
        struct Blob {
            data: Vec<u8>,
        }
        let blob: Blob = from_row(row(json!({"data": "AQID"}))).unwrap();
        assert_eq!(blob.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_from_scalar() {
        assert_eq!(from_scalar::<bool>(json!(0)).unwrap(), false);
        assert_eq!(from_scalar::<i64>(json!(null)).unwrap(), 0);
        assert_eq!(from_scalar::<String>(json!(15)).unwrap(), "15");
        assert_eq!(from_scalar::<f32>(json!("3.5")).unwrap(), 3.5);
    }
}
