//! # blueprint_schema
//!
//! Data model for the backend blueprint produced by the configurator:
//! tables, columns, relations, enums, row-level-security policies and the
//! schema-level configuration block.
//!
//! The types here are plain data. Everything that produces them (prompting,
//! parsing, validation) lives in `blueprint_gen`.
//!
//! ## Example
//!
//! ```rust
//! use blueprint_schema::{Column, ColumnType, PrimitiveType, Table, TableOwnership};
//!
//! let mut table = Table::new("posts");
//! table.columns.push(Column::primary_key("id"));
//! table.columns.push(Column::new("user_id", ColumnType::Primitive(PrimitiveType::Uuid)));
//!
//! assert_eq!(table.ownership(), TableOwnership::UserOwned);
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod models;
pub mod policy;

pub use config::{AuthMethods, DatabaseProvider, RoleFlags, SchemaConfiguration};
pub use error::{SchemaError, SchemaResult};
pub use id::new_id;
pub use models::*;
pub use policy::*;
