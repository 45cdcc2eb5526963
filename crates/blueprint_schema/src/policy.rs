//! Row-level-security policy matrix.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};
use crate::id::new_id;
use crate::models::TableOwnership;

/// Operation a policy applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [Self::Select, Self::Insert, Self::Update, Self::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl FromStr for Operation {
    type Err = SchemaError;

    fn from_str(s: &str) -> SchemaResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SELECT" | "READ" => Ok(Self::Select),
            "INSERT" | "CREATE" => Ok(Self::Insert),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            _ => Err(SchemaError::unknown("operation", s)),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database role a policy entry targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Anon,
    Authenticated,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Self::Anon, Self::Authenticated, Self::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anon => "anon",
            Self::Authenticated => "authenticated",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = SchemaError;

    fn from_str(s: &str) -> SchemaResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anon" | "anonymous" | "public" => Ok(Self::Anon),
            "authenticated" | "user" => Ok(Self::Authenticated),
            "admin" => Ok(Self::Admin),
            _ => Err(SchemaError::unknown("role", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rows a role may touch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    #[default]
    None,
    /// Every row
    Global,
    /// Rows owned by the acting user
    Own,
    /// Rows belonging to the user's organization
    Organization,
    /// Rows reachable through another table
    Related,
}

impl FromStr for AccessType {
    type Err = SchemaError;

    fn from_str(s: &str) -> SchemaResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "global" | "all" => Ok(Self::Global),
            "own" => Ok(Self::Own),
            "organization" | "org" => Ok(Self::Organization),
            "related" => Ok(Self::Related),
            _ => Err(SchemaError::unknown("access type", s)),
        }
    }
}

/// Access types the configurator may offer for a table.
///
/// `Own` requires an ownership column, so reference tables never get it.
pub fn available_access_types(ownership: TableOwnership) -> Vec<AccessType> {
    let mut types = vec![AccessType::None, AccessType::Global];
    if ownership == TableOwnership::UserOwned {
        types.push(AccessType::Own);
    }
    types.push(AccessType::Organization);
    types.push(AccessType::Related);
    types
}

/// Access rule for one role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RolePolicy {
    pub role: Role,
    pub access_type: AccessType,
    /// Table the row must be reachable through, for `Related`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_table: Option<String>,
}

impl RolePolicy {
    pub fn new(role: Role, access_type: AccessType) -> Self {
        Self {
            role,
            access_type,
            related_table: None,
        }
    }

    pub fn related(role: Role, table: impl Into<String>) -> Self {
        Self {
            role,
            access_type: AccessType::Related,
            related_table: Some(table.into()),
        }
    }
}

/// Policy for one table and one operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RlsPolicy {
    pub id: String,
    pub table_name: String,
    pub operation: Operation,
    pub role_policies: Vec<RolePolicy>,
}

impl RlsPolicy {
    pub fn new(table_name: impl Into<String>, operation: Operation) -> Self {
        Self {
            id: new_id(),
            table_name: table_name.into(),
            operation,
            role_policies: Vec::new(),
        }
    }

    pub fn with_role(mut self, role_policy: RolePolicy) -> Self {
        self.role_policies.push(role_policy);
        self
    }

    pub fn access_for(&self, role: Role) -> Option<AccessType> {
        self.role_policies
            .iter()
            .find(|rp| rp.role == role)
            .map(|rp| rp.access_type)
    }

    pub fn grants_own(&self) -> bool {
        self.role_policies
            .iter()
            .any(|rp| rp.access_type == AccessType::Own)
    }
}
