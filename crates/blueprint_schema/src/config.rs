//! Schema-level configuration: database provider, roles and auth methods.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};
use crate::policy::Role;

/// Where the database lives.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseProvider {
    Supabase,
    NeonDb,
    Both,
    #[default]
    None,
}

impl DatabaseProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supabase => "supabase",
            Self::NeonDb => "neondb",
            Self::Both => "both",
            Self::None => "none",
        }
    }
}

impl FromStr for DatabaseProvider {
    type Err = SchemaError;

    fn from_str(s: &str) -> SchemaResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(Self::Supabase),
            "neondb" | "neon" => Ok(Self::NeonDb),
            "both" => Ok(Self::Both),
            "none" | "" => Ok(Self::None),
            _ => Err(SchemaError::unknown("database provider", s)),
        }
    }
}

impl fmt::Display for DatabaseProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles the app distinguishes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RoleFlags {
    pub anon: bool,
    pub authenticated: bool,
    pub admin: bool,
}

impl RoleFlags {
    pub fn enable(&mut self, role: Role) {
        match role {
            Role::Anon => self.anon = true,
            Role::Authenticated => self.authenticated = true,
            Role::Admin => self.admin = true,
        }
    }

    pub fn is_enabled(&self, role: Role) -> bool {
        match role {
            Role::Anon => self.anon,
            Role::Authenticated => self.authenticated,
            Role::Admin => self.admin,
        }
    }
}

/// Sign-in methods the app supports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthMethods {
    pub email_password: bool,
    pub magic_link: bool,
    pub google: bool,
    pub github: bool,
}

impl AuthMethods {
    pub fn any(&self) -> bool {
        self.email_password || self.magic_link || self.google || self.github
    }
}

/// Configuration block inferred alongside the schema.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SchemaConfiguration {
    pub database_provider: DatabaseProvider,
    pub roles: RoleFlags,
    pub auth: AuthMethods,
}
