//! Prompt builders for the two generation phases.
//!
//! Phase 1 asks for a free-text design plan; phase 2 turns that plan into the
//! JSON payload described by the templates below. Both prompts embed every
//! requested table and the expected counts, which the validation engine
//! recomputes on its own side.

use blueprint_schema::{Operation, PrimitiveType, AUTH_USERS_TABLE, OWNERSHIP_COLUMNS};

use crate::types::{AppDescription, Feature, TableStub};

/// Shape of one entry in `tables`.
pub const TABLE_TEMPLATE: &str = r#"{
  "name": "posts",
  "schema": "public",
  "columns": [
    { "name": "id", "type": "uuid", "isId": true, "defaultValue": "gen_random_uuid()" },
    { "name": "user_id", "type": "uuid", "relation": { "table": "auth.users", "field": "id", "onDelete": "Cascade", "type": "many-to-one" } },
    { "name": "title", "type": "text" },
    { "name": "status", "type": "PostStatus", "defaultValue": "draft" },
    { "name": "published_at", "type": "timestamp", "isOptional": true },
    { "name": "created_at", "type": "timestamp", "defaultValue": "now()" }
  ],
  "uniqueConstraints": [["user_id", "title"]],
  "checkConstraints": ["char_length(title) > 0"]
}"#;

/// Shape of one entry in `enums`.
pub const ENUM_TEMPLATE: &str = r#"{
  "name": "PostStatus",
  "values": [{ "value": "draft" }, { "value": "published" }, { "value": "archived" }]
}"#;

/// Shape of one entry in `rlsPolicies`.
pub const POLICY_TEMPLATE: &str = r#"{
  "tableName": "posts",
  "operation": "UPDATE",
  "rolePolicies": [
    { "role": "anon", "accessType": "none" },
    { "role": "authenticated", "accessType": "own" },
    { "role": "admin", "accessType": "global" }
  ]
}"#;

/// Shape of the `configuration` block.
pub const CONFIGURATION_TEMPLATE: &str = r#"{
  "databaseProvider": "supabase",
  "roles": { "anon": true, "authenticated": true, "admin": false },
  "auth": { "emailPassword": true, "magicLink": false, "google": false, "github": false }
}"#;

/// Minimum number of RLS policies for `table_count` tables: one per CRUD operation.
pub fn policy_floor(table_count: usize) -> usize {
    table_count * Operation::ALL.len()
}

/// Build the phase-1 prompt asking for a textual design plan.
pub fn build_plan_prompt(app: &AppDescription, features: &[Feature], stubs: &[TableStub]) -> String {
    let table_count = stubs.len();

    format!(
        r#"You are a senior database architect designing the backend for the app "{name}".

Write a complete design PLAN in plain text (no JSON yet). It will be turned into a
schema in a second step, so be exhaustive and precise.

{app_section}
## Features ({feature_count})
{features}
## Requested tables ({table_count})
{tables}
## Expected counts
{counts}
## The plan must cover
1. Every requested table, by its exact name: purpose, every column with its type
   ({primitives}, or an enum name), primary key, optional/unique flags and defaults.
2. Relations between tables (target table, cardinality, delete behavior).
3. Ownership: which tables hold user data and therefore need a `{owner}` or `{profile}`
   column referencing `{auth_users}`, and which are shared reference tables.
4. Enums for every fixed set of values (statuses, types, roles, visibility).
5. Row-level security: for EVERY table and EVERY operation ({operations}), the access
   of each role (anon, authenticated, admin): none, global, own, organization or related.
   Only user-owned tables may use "own".
6. Configuration: database provider (supabase, neondb, both or none), which roles exist,
   and which sign-in methods are needed (email/password, magic link, Google, GitHub).
"#,
        name = app.name,
        app_section = app_section(app),
        feature_count = features.len(),
        features = feature_list(features),
        table_count = table_count,
        tables = stub_list(stubs),
        counts = counts_section(table_count),
        primitives = primitive_list(),
        owner = OWNERSHIP_COLUMNS[0],
        profile = OWNERSHIP_COLUMNS[1],
        auth_users = AUTH_USERS_TABLE,
        operations = operation_list(),
    )
}

/// Build the phase-2 prompt turning the plan into the JSON payload.
pub fn build_schema_prompt(plan: &str, stubs: &[TableStub], app: &AppDescription) -> String {
    let table_count = stubs.len();

    format!(
        r#"You are converting a database design plan for the app "{name}" into JSON.

## App
{description}

## Design plan
{plan}

## Requested tables ({table_count})
{tables}
## Expected counts
{counts}
## Output format
Respond with ONE fenced ```json block containing a single object:

{{
  "configuration": {configuration},
  "tables": [ ... ],
  "enums": [ ... ],
  "rlsPolicies": [ ... ]
}}

Each table looks like:
{table}

Each enum looks like:
{enum_template}

Each RLS policy looks like:
{policy}

## Rules
- Use the exact table names listed above.
- Column types are one of: {primitives}, or the name of an enum defined in "enums".
- Every table has exactly one primary key column marked "isId": true.
- Any table with an "own" policy MUST have a `{owner}` (or `{profile}`) column
  referencing `{auth_users}`; tables without such a column must never use "own".
- Use enums instead of text for status, type, role and visibility columns.
- Write one policy per table per operation ({operations}), covering all three roles.
- Do not include comments, trailing commas or any text outside the JSON block.
"#,
        name = app.name,
        description = non_blank(&app.description, "(no description)"),
        plan = plan.trim(),
        table_count = table_count,
        tables = stub_list(stubs),
        counts = counts_section(table_count),
        configuration = CONFIGURATION_TEMPLATE,
        table = TABLE_TEMPLATE,
        enum_template = ENUM_TEMPLATE,
        policy = POLICY_TEMPLATE,
        primitives = primitive_list(),
        owner = OWNERSHIP_COLUMNS[0],
        profile = OWNERSHIP_COLUMNS[1],
        auth_users = AUTH_USERS_TABLE,
        operations = operation_list(),
    )
}

fn app_section(app: &AppDescription) -> String {
    let mut section = format!("## App\n{}\n", non_blank(&app.description, "(no description)"));

    if let Some(readme) = app.readme.as_deref().filter(|r| !r.trim().is_empty()) {
        section.push_str(&format!("\n### README\n{}\n", readme.trim()));
    }

    if !app.pages.is_empty() {
        section.push_str("\n### Pages\n");
        for page in &app.pages {
            section.push_str(&format!("- {}\n", page));
        }
    }

    section
}

fn feature_list(features: &[Feature]) -> String {
    if features.is_empty() {
        return "(none inferred)\n".to_string();
    }
    features
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{}. **{}**: {}\n", i + 1, f.name, non_blank(&f.description, "-")))
        .collect()
}

fn stub_list(stubs: &[TableStub]) -> String {
    if stubs.is_empty() {
        return "(none requested; derive the tables from the features)\n".to_string();
    }
    stubs
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. **{}**: {}\n", i + 1, t.name, non_blank(&t.description, "-")))
        .collect()
}

fn counts_section(table_count: usize) -> String {
    if table_count == 0 {
        return format!(
            "- RLS policies: {} per table (one per operation)\n",
            Operation::ALL.len()
        );
    }
    format!(
        "- Tables: exactly {}\n- RLS policies: at least {} ({} tables x {} operations)\n",
        table_count,
        policy_floor(table_count),
        table_count,
        Operation::ALL.len()
    )
}

fn primitive_list() -> String {
    PrimitiveType::ALL
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn operation_list() -> String {
    Operation::ALL
        .iter()
        .map(|o| o.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn non_blank<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value.trim()
    }
}
