//! Turn a parsed generation response into a fully-populated schema.
//!
//! Normalization is total: the only failure is a span that is not valid JSON.
//! Missing identifiers are assigned, flags default to `false`, AI-sourced
//! entities are marked non-default and editable.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, warn};

use blueprint_schema::{
    new_id, AccessType, AuthMethods, Column, ColumnType, DatabaseProvider, EnumValue,
    GeneratedSchema, OnDelete, Operation, PrimitiveType, Relation, RelationType, RlsPolicy,
    Role, RoleFlags, RolePolicy, SchemaConfiguration, SchemaEnum, Table, DEFAULT_SCHEMA,
};

use crate::extract::extract_json;
use crate::raw::{
    RawColumn, RawConfiguration, RawEnum, RawEnumValue, RawPolicy, RawRelation, RawRolePolicy,
    RawSchema, RawTable,
};

/// Extract, parse and normalize a raw response.
///
/// Returns `None` only when the extracted span is not valid JSON.
pub fn parse_schema(text: &str) -> Option<GeneratedSchema> {
    let span = extract_json(text);
    match serde_json::from_str::<Value>(span) {
        Ok(value) => Some(normalize_value(value)),
        Err(e) => {
            warn!("Response is not valid JSON after extraction: {}", e);
            None
        }
    }
}

/// Normalize an already-parsed JSON value. Non-object input yields an empty schema.
pub fn normalize_value(value: Value) -> GeneratedSchema {
    let raw = serde_json::from_value::<RawSchema>(value).unwrap_or_else(|e| {
        debug!("Response root is not an object, using empty schema: {}", e);
        RawSchema::default()
    });
    Normalizer::default().schema(raw)
}

/// Hands out identifiers, replacing missing or duplicate ones.
#[derive(Default)]
struct Normalizer {
    used_ids: HashSet<String>,
}

impl Normalizer {
    fn id(&mut self, proposed: Option<String>) -> String {
        if let Some(id) = proposed.filter(|id| !id.trim().is_empty()) {
            if self.used_ids.insert(id.clone()) {
                return id;
            }
            debug!("Duplicate identifier {} replaced", id);
        }
        loop {
            let id = new_id();
            if self.used_ids.insert(id.clone()) {
                return id;
            }
        }
    }

    fn schema(mut self, raw: RawSchema) -> GeneratedSchema {
        let configuration = raw
            .configuration
            .map(configuration)
            .unwrap_or_default();

        let tables: Vec<Table> = raw
            .tables
            .into_iter()
            .filter_map(|t| self.table(t))
            .collect();
        let enums: Vec<SchemaEnum> = raw
            .enums
            .into_iter()
            .filter_map(|e| self.schema_enum(e))
            .collect();
        let rls_policies: Vec<RlsPolicy> = raw
            .rls_policies
            .into_iter()
            .filter_map(|p| self.policy(p))
            .collect();

        GeneratedSchema {
            configuration,
            tables,
            enums,
            rls_policies,
        }
    }

    fn table(&mut self, raw: RawTable) -> Option<Table> {
        let Some(name) = non_empty(raw.name) else {
            warn!("Dropping table without a name");
            return None;
        };

        let columns = raw
            .columns
            .into_iter()
            .filter_map(|c| self.column(&name, c))
            .collect();

        Some(Table {
            id: self.id(raw.id),
            schema: non_empty(raw.schema).unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            columns,
            unique_constraints: raw.unique_constraints,
            check_constraints: raw
                .check_constraints
                .into_iter()
                .filter_map(check_constraint)
                .collect(),
            is_default: false,
            is_editable: true,
            name,
        })
    }

    fn column(&mut self, table: &str, raw: RawColumn) -> Option<Column> {
        let Some(name) = non_empty(raw.name) else {
            warn!("Dropping unnamed column in {}", table);
            return None;
        };

        let relation = raw.relation.and_then(|r| relation(table, &name, r));
        let column_type = match non_empty(raw.column_type) {
            Some(t) => ColumnType::from(t),
            None if relation.is_some() => ColumnType::Primitive(PrimitiveType::IDENTIFIER),
            None => ColumnType::default(),
        };

        Some(Column {
            id: self.id(raw.id),
            name,
            column_type,
            is_optional: raw.is_optional.unwrap_or(false),
            is_unique: raw.is_unique.unwrap_or(false),
            is_id: raw.is_id.unwrap_or(false),
            is_array: raw.is_array.unwrap_or(false),
            is_default: false,
            is_editable: true,
            default_value: raw.default_value.and_then(scalar_string),
            relation,
            attributes: raw.attributes,
        })
    }

    fn schema_enum(&mut self, raw: RawEnum) -> Option<SchemaEnum> {
        let Some(name) = non_empty(raw.name) else {
            warn!("Dropping enum without a name");
            return None;
        };

        let values = raw
            .values
            .into_iter()
            .filter_map(|v| {
                let (id, value) = match v {
                    RawEnumValue::Literal(value) => (None, Some(value)),
                    RawEnumValue::Entry { id, value } => (id, value),
                };
                let value = non_empty(value)?;
                Some(EnumValue {
                    id: self.id(id),
                    value,
                })
            })
            .collect();

        Some(SchemaEnum {
            id: self.id(raw.id),
            name,
            values,
            is_default: false,
            is_editable: true,
        })
    }

    fn policy(&mut self, raw: RawPolicy) -> Option<RlsPolicy> {
        let table_name = non_empty(raw.table_name)?;
        let operation = match raw.operation.as_deref().map(str::parse::<Operation>) {
            Some(Ok(op)) => op,
            _ => {
                debug!("Dropping policy on {} with operation {:?}", table_name, raw.operation);
                return None;
            }
        };

        let role_policies = raw
            .role_policies
            .into_iter()
            .filter_map(|rp| role_policy(&table_name, rp))
            .collect();

        Some(RlsPolicy {
            id: self.id(raw.id),
            table_name,
            operation,
            role_policies,
        })
    }
}

fn relation(table: &str, column: &str, raw: RawRelation) -> Option<Relation> {
    let Some(target) = non_empty(raw.table) else {
        debug!("Dropping relation without target on {}.{}", table, column);
        return None;
    };

    Some(Relation {
        table: target,
        field: non_empty(raw.field).unwrap_or_else(|| "id".to_string()),
        on_delete: raw
            .on_delete
            .and_then(|s| s.parse::<OnDelete>().ok())
            .unwrap_or_default(),
        relation_type: raw
            .relation_type
            .and_then(|s| s.parse::<RelationType>().ok())
            .unwrap_or_default(),
        inverse_field: non_empty(raw.inverse_field),
    })
}

fn role_policy(table: &str, raw: RawRolePolicy) -> Option<RolePolicy> {
    let role = match raw.role.as_deref().map(str::parse::<Role>) {
        Some(Ok(role)) => role,
        _ => {
            debug!("Dropping unknown role {:?} on {}", raw.role, table);
            return None;
        }
    };
    let access_type = match raw.access_type.as_deref().map(str::parse::<AccessType>) {
        None => AccessType::None,
        Some(Ok(access)) => access,
        Some(Err(e)) => {
            debug!("Dropping {} policy on {}: {}", role, table, e);
            return None;
        }
    };
    let related_table = non_empty(raw.related_table);

    if access_type == AccessType::Related && related_table.is_none() {
        debug!("Related access for {} on {} has no table, using none", role, table);
        return Some(RolePolicy::new(role, AccessType::None));
    }

    Some(RolePolicy {
        role,
        access_type,
        related_table: if access_type == AccessType::Related {
            related_table
        } else {
            None
        },
    })
}

fn configuration(raw: RawConfiguration) -> SchemaConfiguration {
    let database_provider = raw
        .database_provider
        .and_then(|p| match p.parse::<DatabaseProvider>() {
            Ok(provider) => Some(provider),
            Err(e) => {
                debug!("{}, using none", e);
                None
            }
        })
        .unwrap_or_default();

    let mut roles = RoleFlags::default();
    for flag in raw.roles.as_ref().map(enabled_flags).unwrap_or_default() {
        if let Ok(role) = flag.parse::<Role>() {
            roles.enable(role);
        }
    }

    let mut auth = AuthMethods::default();
    for flag in raw.auth.as_ref().map(enabled_flags).unwrap_or_default() {
        match flag.as_str() {
            "emailpassword" | "email" | "password" => auth.email_password = true,
            "magiclink" | "otp" => auth.magic_link = true,
            "google" | "googleoauth" => auth.google = true,
            "github" | "githuboauth" => auth.github = true,
            other => debug!("Ignoring unknown auth method {}", other),
        }
    }

    SchemaConfiguration {
        database_provider,
        roles,
        auth,
    }
}

/// Names switched on in a `{"name": true}` object or a `["name"]` list,
/// lowercased with separators removed.
fn enabled_flags(value: &Value) -> Vec<String> {
    let names: Vec<&str> = match value {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| v.as_bool().unwrap_or(false))
            .map(|(k, _)| k.as_str())
            .collect(),
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    names
        .into_iter()
        .map(|name| {
            name.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .collect()
}

fn check_constraint(value: Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(Some(s)),
        Value::Object(map) => ["expression", "check", "condition"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

fn scalar_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_object_yields_default_configuration() {
        let schema = parse_schema("{}").unwrap();
        assert_eq!(schema.configuration, SchemaConfiguration::default());
        assert!(!schema.configuration.roles.admin);
        assert!(!schema.configuration.roles.authenticated);
        assert!(!schema.configuration.roles.anon);
        assert!(!schema.configuration.auth.any());
        assert!(schema.tables.is_empty());
    }

    #[test]
    fn test_invalid_json_fails() {
        assert!(parse_schema("I could not produce a schema, sorry.").is_none());
        assert!(parse_schema("```json\n{\"tables\": [\n```").is_none());
    }

    #[test]
    fn test_non_object_root_is_empty_schema() {
        let schema = parse_schema("[1, 2, 3]").unwrap();
        assert!(schema.tables.is_empty());
    }

    #[test]
    fn test_columns_get_distinct_ids() {
        let schema = normalize_value(json!({
            "tables": [{
                "name": "posts",
                "columns": [
                    {"name": "id", "type": "uuid", "isId": true},
                    {"name": "title", "type": "text"},
                    {"name": "body", "type": "text"},
                    {"name": "status", "type": "PostStatus"},
                    {"name": "created_at", "type": "timestamptz"}
                ]
            }]
        }));

        let ids: HashSet<_> = schema.tables[0].columns.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_duplicate_ids_are_replaced() {
        let schema = normalize_value(json!({
            "tables": [{
                "id": "t1",
                "name": "posts",
                "columns": [{"id": "c1", "name": "id"}, {"id": "c1", "name": "title"}]
            }]
        }));

        let table = &schema.tables[0];
        assert_eq!(table.id, "t1");
        assert_eq!(table.columns[0].id, "c1");
        assert_ne!(table.columns[1].id, "c1");
    }

    #[test]
    fn test_table_defaults() {
        let schema = normalize_value(json!({
            "tables": [{
                "name": "posts",
                "isDefault": true,
                "isEditable": false,
                "columns": [{"name": "title", "isDefault": true}]
            }]
        }));

        let table = &schema.tables[0];
        assert_eq!(table.schema, "public");
        assert!(!table.is_default);
        assert!(table.is_editable);
        assert!(table.unique_constraints.is_empty());

        let column = &table.columns[0];
        assert!(!column.is_default);
        assert!(column.is_editable);
        assert!(column.attributes.is_empty());
        assert!(column.column_type.is_text());
    }

    #[test]
    fn test_unnamed_entries_are_dropped() {
        let schema = normalize_value(json!({
            "tables": [
                {"name": "  ", "columns": []},
                {"name": "posts", "columns": [{"type": "text"}, {"name": "title"}]}
            ],
            "enums": [{"values": ["a"]}]
        }));

        assert_eq!(schema.tables.len(), 1);
        assert_eq!(schema.tables[0].columns.len(), 1);
        assert!(schema.enums.is_empty());
    }

    #[test]
    fn test_relation_defaults() {
        let schema = normalize_value(json!({
            "tables": [{
                "name": "comments",
                "columns": [{"name": "post_id", "relation": {"table": "posts", "onDelete": "SET NULL"}}]
            }]
        }));

        let column = &schema.tables[0].columns[0];
        assert_eq!(column.column_type, ColumnType::Primitive(PrimitiveType::Uuid));
        let relation = column.relation.as_ref().unwrap();
        assert_eq!(relation.field, "id");
        assert_eq!(relation.on_delete, OnDelete::SetNull);
        assert_eq!(relation.relation_type, RelationType::ManyToOne);
    }

    #[test]
    fn test_default_value_is_stringified() {
        let schema = normalize_value(json!({
            "tables": [{"name": "posts", "columns": [
                {"name": "views", "type": "integer", "defaultValue": 0},
                {"name": "published", "type": "boolean", "default": false}
            ]}]
        }));

        let columns = &schema.tables[0].columns;
        assert_eq!(columns[0].default_value.as_deref(), Some("0"));
        assert_eq!(columns[1].default_value.as_deref(), Some("false"));
    }

    #[test]
    fn test_enums_and_values_get_ids() {
        let schema = normalize_value(json!({
            "enums": [{"name": "PostStatus", "values": ["draft", {"value": "published"}, {"value": ""}]}]
        }));

        let e = &schema.enums[0];
        assert!(!e.id.is_empty());
        assert_eq!(e.values.len(), 2);
        assert!(e.values.iter().all(|v| !v.id.is_empty()));
    }

    #[test]
    fn test_policies() {
        let schema = normalize_value(json!({
            "rlsPolicies": [
                {"tableName": "posts", "operation": "select", "rolePolicies": [
                    {"role": "anon", "accessType": "global"},
                    {"role": "superuser", "accessType": "global"},
                    {"role": "authenticated", "accessType": "related"}
                ]},
                {"tableName": "posts", "operation": "MERGE", "rolePolicies": []}
            ]
        }));

        assert_eq!(schema.rls_policies.len(), 1);
        let policy = &schema.rls_policies[0];
        assert_eq!(policy.operation, Operation::Select);
        assert_eq!(policy.role_policies.len(), 2);
        assert_eq!(policy.access_for(Role::Authenticated), Some(AccessType::None));
    }

    #[test]
    fn test_policies_do_not_enable_roles() {
        let policies = json!([
            {"tableName": "posts", "operation": "DELETE", "rolePolicies": [
                {"role": "admin", "accessType": "global"}
            ]}
        ]);

        let absent = normalize_value(json!({ "rlsPolicies": policies.clone() }));
        assert_eq!(absent.configuration, SchemaConfiguration::default());
        assert!(!absent.configuration.roles.admin);

        let explicit = normalize_value(json!({
            "configuration": {"roles": {"admin": false, "authenticated": true}},
            "rlsPolicies": policies
        }));
        assert!(!explicit.configuration.roles.admin);
        assert!(explicit.configuration.roles.authenticated);
        assert_eq!(explicit.rls_policies[0].access_for(Role::Admin), Some(AccessType::Global));
    }

    #[test]
    fn test_configuration_shapes() {
        let schema = normalize_value(json!({
            "configuration": {
                "databaseProvider": "NeonDB",
                "roles": ["admin", "authenticated"],
                "auth": {"emailPassword": true, "magic_link": false, "google": true}
            }
        }));

        let config = schema.configuration;
        assert_eq!(config.database_provider, DatabaseProvider::NeonDb);
        assert!(config.roles.admin && config.roles.authenticated && !config.roles.anon);
        assert!(config.auth.email_password && config.auth.google);
        assert!(!config.auth.magic_link && !config.auth.github);
    }
}
