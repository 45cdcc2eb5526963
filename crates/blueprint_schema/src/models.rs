//! Data models for tables, columns, relations and enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::SchemaConfiguration;
use crate::error::{SchemaError, SchemaResult};
use crate::id::new_id;
use crate::policy::{Operation, RlsPolicy};

/// Column names that tie a row to the acting user.
pub const OWNERSHIP_COLUMNS: [&str; 2] = ["user_id", "profile_id"];

/// Default namespace for generated tables.
pub const DEFAULT_SCHEMA: &str = "public";

/// User table managed by the external auth provider.
pub const AUTH_USERS_TABLE: &str = "auth.users";

/// Built-in column types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Text,
    Uuid,
    Integer,
    BigInt,
    Float,
    Decimal,
    Boolean,
    Timestamp,
    Date,
    Json,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 10] = [
        Self::Text,
        Self::Uuid,
        Self::Integer,
        Self::BigInt,
        Self::Float,
        Self::Decimal,
        Self::Boolean,
        Self::Timestamp,
        Self::Date,
        Self::Json,
    ];

    /// The type used for primary and foreign keys.
    pub const IDENTIFIER: PrimitiveType = PrimitiveType::Uuid;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Uuid => "uuid",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Date => "date",
            Self::Json => "json",
        }
    }
}

impl FromStr for PrimitiveType {
    type Err = SchemaError;

    fn from_str(s: &str) -> SchemaResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "string" | "varchar" | "char" => Ok(Self::Text),
            "uuid" => Ok(Self::Uuid),
            "integer" | "int" | "int4" | "smallint" => Ok(Self::Integer),
            "bigint" | "int8" => Ok(Self::BigInt),
            "float" | "double" | "real" => Ok(Self::Float),
            "decimal" | "numeric" => Ok(Self::Decimal),
            "boolean" | "bool" => Ok(Self::Boolean),
            "timestamp" | "timestamptz" | "datetime" => Ok(Self::Timestamp),
            "date" => Ok(Self::Date),
            "json" | "jsonb" => Ok(Self::Json),
            other => Err(SchemaError::unknown("primitive type", other)),
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of a column: a primitive, or the name of an enum or another table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    Primitive(PrimitiveType),
    Named(String),
}

impl ColumnType {
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Primitive(PrimitiveType::Text))
    }

    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self {
            Self::Primitive(p) => Some(*p),
            Self::Named(_) => None,
        }
    }
}

impl Default for ColumnType {
    fn default() -> Self {
        Self::Primitive(PrimitiveType::Text)
    }
}

impl From<String> for ColumnType {
    fn from(value: String) -> Self {
        match value.parse::<PrimitiveType>() {
            Ok(p) => Self::Primitive(p),
            Err(_) => Self::Named(value),
        }
    }
}

impl From<&str> for ColumnType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => f.write_str(p.as_str()),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// What happens to referencing rows when the target row is deleted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum OnDelete {
    #[default]
    Cascade,
    Restrict,
    SetNull,
    NoAction,
}

impl FromStr for OnDelete {
    type Err = SchemaError;

    fn from_str(s: &str) -> SchemaResult<Self> {
        let folded: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "cascade" => Ok(Self::Cascade),
            "restrict" => Ok(Self::Restrict),
            "setnull" => Ok(Self::SetNull),
            "noaction" => Ok(Self::NoAction),
            _ => Err(SchemaError::unknown("delete behavior", s)),
        }
    }
}

/// Cardinality of a relation, seen from the owning column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RelationType {
    OneToMany,
    #[default]
    ManyToOne,
    OneToOne,
}

impl FromStr for RelationType {
    type Err = SchemaError;

    fn from_str(s: &str) -> SchemaResult<Self> {
        let folded: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "onetomany" => Ok(Self::OneToMany),
            "manytoone" => Ok(Self::ManyToOne),
            "onetoone" => Ok(Self::OneToOne),
            _ => Err(SchemaError::unknown("relation type", s)),
        }
    }
}

/// Foreign-key descriptor attached to a column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    /// Target table name
    pub table: String,
    /// Target field, conventionally "id"
    pub field: String,
    pub on_delete: OnDelete,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    /// Back-reference field on the target table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse_field: Option<String>,
}

impl Relation {
    /// Many-to-one reference to `table.id`.
    pub fn many_to_one(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field: "id".to_string(),
            on_delete: OnDelete::Cascade,
            relation_type: RelationType::ManyToOne,
            inverse_field: None,
        }
    }

    pub fn on_delete(mut self, on_delete: OnDelete) -> Self {
        self.on_delete = on_delete;
        self
    }
}

/// A column in a table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub is_optional: bool,
    pub is_unique: bool,
    pub is_id: bool,
    pub is_array: bool,
    /// System-managed column
    pub is_default: bool,
    pub is_editable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<Relation>,
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl Column {
    /// Create an editable, required column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            column_type,
            is_optional: false,
            is_unique: false,
            is_id: false,
            is_array: false,
            is_default: false,
            is_editable: true,
            default_value: None,
            relation: None,
            attributes: Vec::new(),
        }
    }

    /// Create a uuid primary key column.
    pub fn primary_key(name: impl Into<String>) -> Self {
        let mut column = Self::new(name, ColumnType::Primitive(PrimitiveType::IDENTIFIER));
        column.is_id = true;
        column.default_value = Some("gen_random_uuid()".to_string());
        column
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relation = Some(relation);
        self
    }
}

/// Whether a table's rows are scoped to a user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TableOwnership {
    /// Has a `user_id` or `profile_id` column
    UserOwned,
    /// Lookup or shared data, not user-scoped
    Reference,
}

/// A database table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: String,
    pub name: String,
    /// Namespace, e.g. "public" or "auth"
    pub schema: String,
    pub columns: Vec<Column>,
    /// Groups of column names that are unique together
    #[serde(default)]
    pub unique_constraints: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub check_constraints: Vec<String>,
    pub is_default: bool,
    pub is_editable: bool,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            schema: DEFAULT_SCHEMA.to_string(),
            columns: Vec::new(),
            unique_constraints: Vec::new(),
            check_constraints: Vec::new(),
            is_default: false,
            is_editable: true,
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Position of the first column marked as primary key.
    pub fn primary_key_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.is_id)
    }

    pub fn ownership(&self) -> TableOwnership {
        if OWNERSHIP_COLUMNS.iter().any(|name| self.has_column(name)) {
            TableOwnership::UserOwned
        } else {
            TableOwnership::Reference
        }
    }

    pub fn is_user_owned(&self) -> bool {
        self.ownership() == TableOwnership::UserOwned
    }
}

/// A literal value of an enum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnumValue {
    pub id: String,
    pub value: String,
}

impl EnumValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            value: value.into(),
        }
    }
}

/// A user-defined enum type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaEnum {
    pub id: String,
    pub name: String,
    pub values: Vec<EnumValue>,
    pub is_default: bool,
    pub is_editable: bool,
}

impl SchemaEnum {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: new_id(),
            name: name.into(),
            values: values.into_iter().map(EnumValue::new).collect(),
            is_default: false,
            is_editable: true,
        }
    }
}

/// The full schema aggregate produced by generation or edited by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSchema {
    pub configuration: SchemaConfiguration,
    pub tables: Vec<Table>,
    pub enums: Vec<SchemaEnum>,
    pub rls_policies: Vec<RlsPolicy>,
}

impl GeneratedSchema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    pub fn enum_named(&self, name: &str) -> Option<&SchemaEnum> {
        self.enums.iter().find(|e| e.name == name)
    }

    pub fn policies_for<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a RlsPolicy> + 'a {
        self.rls_policies.iter().filter(move |p| p.table_name == table)
    }

    pub fn policy(&self, table: &str, operation: Operation) -> Option<&RlsPolicy> {
        self.rls_policies
            .iter()
            .find(|p| p.table_name == table && p.operation == operation)
    }
}
