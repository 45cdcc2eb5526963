//! Post-generation validation and auto-fix.
//!
//! Checks a normalized schema against the counts the prompts asked for and
//! repairs the one omission that would break row-level security: tables with
//! "own" policies but no ownership column get a `user_id` injected. Every
//! other finding is advisory. Acceptance never depends on the outcome.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use blueprint_schema::{
    Column, ColumnType, GeneratedSchema, Operation, PrimitiveType, Relation, Table,
    AUTH_USERS_TABLE, OWNERSHIP_COLUMNS,
};

use crate::types::TableStub;

/// Column name substrings that usually denote a fixed set of values.
const ENUM_HINTS: [&str; 3] = ["type", "status", "role"];
/// Column name that denotes a fixed set of values only on exact match.
const ENUM_EXACT_HINT: &str = "visibility";

/// Counts the generated schema is expected to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedCounts {
    pub tables: usize,
    /// One policy per operation per table
    pub rls_floor: usize,
}

impl ExpectedCounts {
    pub fn for_tables(tables: usize) -> Self {
        Self {
            tables,
            rls_floor: tables * Operation::ALL.len(),
        }
    }

    pub fn from_stubs(stubs: &[TableStub]) -> Self {
        Self::for_tables(stubs.len())
    }
}

/// Findings of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Human-readable, surfaced to the user
    pub warnings: Vec<String>,
    /// Tables that received an injected `user_id`
    pub auto_fixed_tables: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Validate `schema` against `expected`, injecting missing ownership columns.
pub fn validate_and_fix(schema: &mut GeneratedSchema, expected: &ExpectedCounts) -> ValidationReport {
    let mut report = ValidationReport::new();

    check_table_count(schema, expected, &mut report);
    check_policy_floor(schema, expected, &mut report);
    check_enum_as_text(schema, &mut report);
    fix_missing_owners(schema, &mut report);

    info!(
        "Validated {} tables, {} enums, {} policies: {} warnings, {} auto-fixed",
        schema.tables.len(),
        schema.enums.len(),
        schema.rls_policies.len(),
        report.warnings.len(),
        report.auto_fixed_tables.len()
    );

    report
}

fn check_table_count(schema: &GeneratedSchema, expected: &ExpectedCounts, report: &mut ValidationReport) {
    // No stubs means the model chose the tables itself.
    if expected.tables == 0 {
        return;
    }
    if schema.tables.len() != expected.tables {
        report.add_warning(format!("Tables: {}/{}", schema.tables.len(), expected.tables));
    }
}

fn check_policy_floor(schema: &GeneratedSchema, expected: &ExpectedCounts, report: &mut ValidationReport) {
    let floor = if expected.tables == 0 {
        ExpectedCounts::for_tables(schema.tables.len()).rls_floor
    } else {
        expected.rls_floor
    };
    if schema.rls_policies.len() < floor {
        report.add_warning(format!("RLS policies: {}/{}+", schema.rls_policies.len(), floor));
    }
}

fn check_enum_as_text(schema: &GeneratedSchema, report: &mut ValidationReport) {
    if schema.enums.is_empty() {
        return;
    }
    for table in &schema.tables {
        for column in table.columns.iter().filter(|c| looks_like_enum(&c.name) && c.column_type.is_text()) {
            report.add_warning(format!(
                "Column {}.{} is text but looks like an enum",
                table.name, column.name
            ));
        }
    }
}

fn looks_like_enum(column_name: &str) -> bool {
    let name = column_name.to_ascii_lowercase();
    name == ENUM_EXACT_HINT || ENUM_HINTS.iter().any(|hint| name.contains(hint))
}

fn fix_missing_owners(schema: &mut GeneratedSchema, report: &mut ValidationReport) {
    let needs_owner: Vec<usize> = schema
        .tables
        .iter()
        .enumerate()
        .filter(|(_, table)| {
            !table.is_user_owned() && schema.policies_for(&table.name).any(|p| p.grants_own())
        })
        .map(|(index, _)| index)
        .collect();

    for index in needs_owner {
        let table = &mut schema.tables[index];
        inject_owner_column(table);
        report.add_warning(format!(
            "Auto-fixed {}: added {} for own-scoped policies",
            table.name, OWNERSHIP_COLUMNS[0]
        ));
        report.auto_fixed_tables.push(table.name.clone());
    }
}

/// Insert `user_id` right after the primary key, or first if there is none.
fn inject_owner_column(table: &mut Table) {
    let column = Column::new(
        OWNERSHIP_COLUMNS[0],
        ColumnType::Primitive(PrimitiveType::IDENTIFIER),
    )
    .with_relation(Relation::many_to_one(AUTH_USERS_TABLE));

    let position = table.primary_key_index().map(|i| i + 1).unwrap_or(0);
    table.columns.insert(position, column);
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_schema::{AccessType, RelationType, RlsPolicy, Role, RolePolicy, SchemaEnum};

    fn table(name: &str, columns: &[(&str, &str)]) -> Table {
        let mut table = Table::new(name);
        table.columns.push(Column::primary_key("id"));
        for (column, ty) in columns {
            table.columns.push(Column::new(*column, ColumnType::from(*ty)));
        }
        table
    }

    fn full_policies(table: &str, authenticated: AccessType) -> Vec<RlsPolicy> {
        Operation::ALL
            .iter()
            .map(|op| {
                RlsPolicy::new(table, *op)
                    .with_role(RolePolicy::new(Role::Anon, AccessType::None))
                    .with_role(RolePolicy::new(Role::Authenticated, authenticated))
            })
            .collect()
    }

    #[test]
    fn test_count_floor_arithmetic() {
        assert_eq!(ExpectedCounts::for_tables(5).rls_floor, 20);
        let stubs = vec![TableStub::new("a", ""), TableStub::new("b", "")];
        assert_eq!(ExpectedCounts::from_stubs(&stubs), ExpectedCounts { tables: 2, rls_floor: 8 });
    }

    #[test]
    fn test_floor_matches_prompt_floor() {
        for tables in 0..=50 {
            assert_eq!(
                ExpectedCounts::for_tables(tables).rls_floor,
                crate::prompts::policy_floor(tables),
                "floor disagrees for {} tables",
                tables
            );
        }
    }

    #[test]
    fn test_clean_schema() {
        let mut schema = GeneratedSchema {
            tables: vec![table("posts", &[("user_id", "uuid"), ("title", "text")])],
            rls_policies: full_policies("posts", AccessType::Own),
            ..Default::default()
        };

        let report = validate_and_fix(&mut schema, &ExpectedCounts::for_tables(1));
        assert!(report.is_clean(), "{:?}", report.warnings);
        assert_eq!(schema.tables[0].columns.len(), 3);
    }

    #[test]
    fn test_count_warnings() {
        let mut schema = GeneratedSchema {
            tables: vec![table("posts", &[]), table("comments", &[])],
            rls_policies: full_policies("posts", AccessType::Global),
            ..Default::default()
        };

        let report = validate_and_fix(&mut schema, &ExpectedCounts::for_tables(3));
        assert!(report.warnings.contains(&"Tables: 2/3".to_string()));
        assert!(report.warnings.contains(&"RLS policies: 4/12+".to_string()));
    }

    #[test]
    fn test_no_stubs_uses_actual_table_count() {
        let mut schema = GeneratedSchema {
            tables: vec![table("posts", &[]), table("tags", &[])],
            rls_policies: full_policies("posts", AccessType::Global),
            ..Default::default()
        };

        let report = validate_and_fix(&mut schema, &ExpectedCounts::for_tables(0));
        assert_eq!(report.warnings, vec!["RLS policies: 4/8+".to_string()]);
    }

    #[test]
    fn test_own_policy_injects_user_id() {
        let mut schema = GeneratedSchema {
            tables: vec![table("notes", &[("body", "text")])],
            rls_policies: vec![RlsPolicy::new("notes", Operation::Update)
                .with_role(RolePolicy::new(Role::Authenticated, AccessType::Own))],
            ..Default::default()
        };

        let report = validate_and_fix(&mut schema, &ExpectedCounts::for_tables(0));

        let notes = &schema.tables[0];
        let owners: Vec<_> = notes.columns.iter().filter(|c| c.name == "user_id").collect();
        assert_eq!(owners.len(), 1);
        assert_eq!(notes.columns[1].name, "user_id");

        let column = owners[0];
        assert_eq!(column.column_type, ColumnType::Primitive(PrimitiveType::Uuid));
        assert!(!column.is_default);
        assert!(column.is_editable);
        let relation = column.relation.as_ref().unwrap();
        assert_eq!(relation.table, AUTH_USERS_TABLE);
        assert_eq!(relation.relation_type, RelationType::ManyToOne);

        assert_eq!(report.auto_fixed_tables, vec!["notes".to_string()]);
        assert!(report.warnings.iter().any(|w| w.contains("notes")));
        assert!(notes.is_user_owned());
    }

    #[test]
    fn test_injection_without_primary_key_goes_first() {
        let mut notes = Table::new("notes");
        notes.columns.push(Column::new("body", ColumnType::default()));
        let mut schema = GeneratedSchema {
            tables: vec![notes],
            rls_policies: vec![RlsPolicy::new("notes", Operation::Select)
                .with_role(RolePolicy::new(Role::Admin, AccessType::Own))],
            ..Default::default()
        };

        validate_and_fix(&mut schema, &ExpectedCounts::for_tables(0));
        assert_eq!(schema.tables[0].columns[0].name, "user_id");
        assert_eq!(schema.tables[0].columns[1].name, "body");
    }

    #[test]
    fn test_profile_id_counts_as_owner() {
        let mut schema = GeneratedSchema {
            tables: vec![table("bookmarks", &[("profile_id", "uuid")])],
            rls_policies: full_policies("bookmarks", AccessType::Own),
            ..Default::default()
        };

        let report = validate_and_fix(&mut schema, &ExpectedCounts::for_tables(1));
        assert!(report.auto_fixed_tables.is_empty());
        assert!(!schema.tables[0].has_column("user_id"));
    }

    #[test]
    fn test_reference_table_without_own_is_untouched() {
        let mut schema = GeneratedSchema {
            tables: vec![table("categories", &[("label", "text")])],
            rls_policies: full_policies("categories", AccessType::Global),
            ..Default::default()
        };

        let report = validate_and_fix(&mut schema, &ExpectedCounts::for_tables(1));
        assert!(report.auto_fixed_tables.is_empty());
        assert_eq!(schema.tables[0].columns.len(), 2);
    }

    #[test]
    fn test_enum_as_text_heuristic() {
        let mut schema = GeneratedSchema {
            tables: vec![table(
                "posts",
                &[
                    ("status", "text"),
                    ("post_type", "PostType"),
                    ("visibility", "text"),
                    ("visibility_note", "text"),
                    ("title", "text"),
                ],
            )],
            enums: vec![SchemaEnum::new("PostType", ["article", "link"])],
            rls_policies: full_policies("posts", AccessType::Global),
            ..Default::default()
        };

        let report = validate_and_fix(&mut schema, &ExpectedCounts::for_tables(1));
        assert_eq!(
            report.warnings,
            vec![
                "Column posts.status is text but looks like an enum".to_string(),
                "Column posts.visibility is text but looks like an enum".to_string(),
            ]
        );
        assert_eq!(schema.tables[0].column("status").unwrap().column_type, ColumnType::from("text"));
    }

    #[test]
    fn test_enum_heuristic_needs_an_enum() {
        let mut schema = GeneratedSchema {
            tables: vec![table("posts", &[("status", "text")])],
            rls_policies: full_policies("posts", AccessType::Global),
            ..Default::default()
        };

        let report = validate_and_fix(&mut schema, &ExpectedCounts::for_tables(1));
        assert!(report.is_clean());
    }
}
