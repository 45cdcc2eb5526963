//! Lenient mirrors of the schema types, as they arrive from the model.
//!
//! Every field is optional. A field whose JSON type is wrong reads as absent
//! and a malformed array element is dropped, so deserializing any JSON object
//! into [`RawSchema`] cannot fail.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Top-level response payload.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSchema {
    #[serde(default, deserialize_with = "lenient")]
    pub configuration: Option<RawConfiguration>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub tables: Vec<RawTable>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub enums: Vec<RawEnum>,
    #[serde(default, deserialize_with = "lenient_vec", alias = "policies")]
    pub rls_policies: Vec<RawPolicy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfiguration {
    #[serde(default, deserialize_with = "lenient")]
    pub database_provider: Option<String>,
    /// Either `{"admin": true}` or `["admin"]`
    #[serde(default)]
    pub roles: Option<Value>,
    /// Either `{"google": true}` or `["google"]`
    #[serde(default, alias = "authentication", alias = "authMethods")]
    pub auth: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTable {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub schema: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub columns: Vec<RawColumn>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub unique_constraints: Vec<Vec<String>>,
    /// Strings or `{"expression": ...}` objects
    #[serde(default, deserialize_with = "lenient_vec")]
    pub check_constraints: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawColumn {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    pub column_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_optional: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_unique: Option<bool>,
    #[serde(default, deserialize_with = "lenient", alias = "isPrimaryKey")]
    pub is_id: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_array: Option<bool>,
    /// Any scalar; stringified during normalization
    #[serde(default, alias = "default")]
    pub default_value: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub relation: Option<RawRelation>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub attributes: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRelation {
    #[serde(default, deserialize_with = "lenient", alias = "targetTable", alias = "references")]
    pub table: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "targetField")]
    pub field: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub on_delete: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient", alias = "relationType")]
    pub relation_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub inverse_field: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEnum {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub values: Vec<RawEnumValue>,
}

/// Enum values come either as bare strings or as `{"value": ...}` objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawEnumValue {
    Literal(String),
    Entry {
        #[serde(default, deserialize_with = "lenient")]
        id: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        value: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPolicy {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "table")]
    pub table_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub operation: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec", alias = "roles")]
    pub role_policies: Vec<RawRolePolicy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRolePolicy {
    #[serde(default, deserialize_with = "lenient")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "access")]
    pub access_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "relatedTo")]
    pub related_table: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wrong_field_types_read_as_absent() {
        let raw: RawColumn = serde_json::from_value(json!({
            "name": "title",
            "type": 42,
            "isOptional": "yes",
            "attributes": "unique"
        }))
        .unwrap();

        assert_eq!(raw.name.as_deref(), Some("title"));
        assert!(raw.column_type.is_none());
        assert!(raw.is_optional.is_none());
        assert!(raw.attributes.is_empty());
    }

    #[test]
    fn test_malformed_elements_are_dropped() {
        let raw: RawSchema = serde_json::from_value(json!({
            "tables": [{"name": "posts"}, "not a table", 7],
            "enums": {"oops": true}
        }))
        .unwrap();

        assert_eq!(raw.tables.len(), 1);
        assert!(raw.enums.is_empty());
    }

    #[test]
    fn test_enum_values_accept_both_shapes() {
        let raw: RawEnum = serde_json::from_value(json!({
            "name": "PostStatus",
            "values": ["draft", {"value": "published"}, {"id": "v3"}]
        }))
        .unwrap();

        assert_eq!(raw.values.len(), 3);
        assert!(matches!(&raw.values[0], RawEnumValue::Literal(v) if v == "draft"));
    }

    #[test]
    fn test_aliases() {
        let raw: RawPolicy = serde_json::from_value(json!({
            "table": "posts",
            "operation": "SELECT",
            "roles": [{"role": "anon", "access": "global"}]
        }))
        .unwrap();

        assert_eq!(raw.table_name.as_deref(), Some("posts"));
        assert_eq!(raw.role_policies[0].access_type.as_deref(), Some("global"));
    }
}
