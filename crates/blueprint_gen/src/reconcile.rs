//! Mapping of the accepted schema configuration onto app technology flags.

use serde::{Deserialize, Serialize};

use blueprint_schema::{DatabaseProvider, SchemaConfiguration};

/// Technology flags of the scaffolded app.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub supabase: bool,
    pub better_auth: bool,
    pub prisma: bool,
    pub postgresql: bool,
    pub admin_plugin: bool,
    pub email_password: bool,
    pub magic_link: bool,
    pub google_oauth: bool,
    pub github_oauth: bool,
}

/// Partial update of [`AppConfig`]. `None` leaves the flag untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supabase: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub better_auth: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prisma: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgresql: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_plugin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_password: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magic_link: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_oauth: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_oauth: Option<bool>,
}

impl AppConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch, returning the merged configuration.
    pub fn apply(&self, base: AppConfig) -> AppConfig {
        AppConfig {
            supabase: self.supabase.unwrap_or(base.supabase),
            better_auth: self.better_auth.unwrap_or(base.better_auth),
            prisma: self.prisma.unwrap_or(base.prisma),
            postgresql: self.postgresql.unwrap_or(base.postgresql),
            admin_plugin: self.admin_plugin.unwrap_or(base.admin_plugin),
            email_password: self.email_password.unwrap_or(base.email_password),
            magic_link: self.magic_link.unwrap_or(base.magic_link),
            google_oauth: self.google_oauth.unwrap_or(base.google_oauth),
            github_oauth: self.github_oauth.unwrap_or(base.github_oauth),
        }
    }
}

/// Storage flags for a provider, as `(supabase, better_auth, prisma, postgresql)`.
fn provider_flags(provider: DatabaseProvider) -> (bool, bool, bool, bool) {
    match provider {
        DatabaseProvider::Supabase => (true, false, true, true),
        DatabaseProvider::NeonDb => (false, true, true, true),
        DatabaseProvider::Both => (true, true, true, true),
        DatabaseProvider::None => (false, false, false, false),
    }
}

/// Derive the app-config patch for an accepted configuration.
pub fn reconcile(configuration: &SchemaConfiguration) -> AppConfigPatch {
    let (supabase, better_auth, prisma, postgresql) =
        provider_flags(configuration.database_provider);

    let mut patch = AppConfigPatch {
        supabase: Some(supabase),
        better_auth: Some(better_auth),
        prisma: Some(prisma),
        postgresql: Some(postgresql),
        admin_plugin: Some(configuration.roles.admin),
        ..Default::default()
    };

    // Sign-in toggles belong to the auth plugin.
    if better_auth {
        let auth = &configuration.auth;
        patch.email_password = Some(auth.email_password);
        patch.magic_link = Some(auth.magic_link);
        patch.google_oauth = Some(auth.google);
        patch.github_oauth = Some(auth.github);
    }

    patch
}
