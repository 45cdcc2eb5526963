//! Short opaque identifiers for tables, columns, enums, values and policies.

/// Length of a generated identifier in hex characters.
pub const ID_LEN: usize = 12;

/// Generate a new identifier.
///
/// Random, not checked for collisions.
pub fn new_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(ID_LEN);
    id
}
