//! Configurator session: owner of the accepted schema.
//!
//! All mutation goes through the session's write lock, so generation results
//! and user edits never interleave. Once disposed, a session rejects every
//! mutation and in-flight generation calls are cancelled.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use blueprint_schema::{new_id, GeneratedSchema, Table};

use crate::error::{GenError, GenResult};
use crate::orchestrator::GenerationPhase;

#[derive(Debug, Default)]
struct SessionState {
    schema: GeneratedSchema,
    phase: GenerationPhase,
    warnings: Vec<String>,
}

/// One configurator, holding at most one generation cycle at a time.
#[derive(Debug)]
pub struct ConfiguratorSession {
    id: String,
    state: RwLock<SessionState>,
    in_flight: AtomicBool,
    cancel: CancellationToken,
}

impl Default for ConfiguratorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfiguratorSession {
    pub fn new() -> Self {
        Self::with_schema(GeneratedSchema::default())
    }

    /// Start from an existing schema, e.g. one the user built by hand.
    pub fn with_schema(schema: GeneratedSchema) -> Self {
        Self {
            id: new_id(),
            state: RwLock::new(SessionState {
                schema,
                ..Default::default()
            }),
            in_flight: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> GenerationPhase {
        self.state.read().phase
    }

    /// Snapshot of the accepted schema.
    pub fn schema(&self) -> GeneratedSchema {
        self.state.read().schema.clone()
    }

    /// Warnings from the last accepted generation.
    pub fn warnings(&self) -> Vec<String> {
        self.state.read().warnings.clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Apply a user edit to the named table.
    pub fn edit_table<F>(&self, name: &str, edit: F) -> GenResult<()>
    where
        F: FnOnce(&mut Table),
    {
        self.ensure_live()?;
        let mut state = self.state.write();
        let table = state
            .schema
            .table_mut(name)
            .ok_or_else(|| GenError::TableNotFound(name.to_string()))?;
        if !table.is_editable {
            return Err(GenError::NotEditable(name.to_string()));
        }
        edit(table);
        debug!("Session {} edited table {}", self.id, name);
        Ok(())
    }

    /// Tear the session down, cancelling any in-flight generation.
    pub fn dispose(&self) {
        if !self.cancel.is_cancelled() {
            info!("Disposing session {}", self.id);
            self.cancel.cancel();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Claim the session for one generation cycle.
    pub(crate) fn begin_cycle(&self) -> GenResult<CycleGuard<'_>> {
        self.ensure_live()?;
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(GenError::Busy);
        }
        Ok(CycleGuard { session: self })
    }

    pub(crate) fn transition(&self, to: GenerationPhase) -> GenResult<()> {
        self.ensure_live()?;
        let mut state = self.state.write();
        Self::move_phase(&mut state, to)
    }

    /// Mark the running cycle failed. A disposed session is left as is.
    pub(crate) fn fail(&self) {
        if self.is_disposed() {
            return;
        }
        let mut state = self.state.write();
        if state.phase.can_transition_to(GenerationPhase::Failed) {
            state.phase = GenerationPhase::Failed;
        }
    }

    /// Replace the aggregate with a validated generation result.
    pub(crate) fn accept(&self, schema: GeneratedSchema, warnings: Vec<String>) -> GenResult<()> {
        self.ensure_live()?;
        let mut state = self.state.write();
        Self::move_phase(&mut state, GenerationPhase::Accepted)?;
        state.schema = schema;
        state.warnings = warnings;
        Ok(())
    }

    fn move_phase(state: &mut SessionState, to: GenerationPhase) -> GenResult<()> {
        if !state.phase.can_transition_to(to) {
            return Err(GenError::InvalidTransition {
                from: state.phase.to_string(),
                to: to.to_string(),
            });
        }
        state.phase = to;
        Ok(())
    }

    fn ensure_live(&self) -> GenResult<()> {
        if self.is_disposed() {
            return Err(GenError::Cancelled);
        }
        Ok(())
    }
}

/// Releases the in-flight claim on drop.
pub(crate) struct CycleGuard<'a> {
    session: &'a ConfiguratorSession,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.session.in_flight.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_schema::{Column, ColumnType};

    fn seeded() -> ConfiguratorSession {
        let mut profiles = Table::new("profiles");
        profiles.columns.push(Column::primary_key("id"));
        let mut users = Table::new("users");
        users.is_default = true;
        users.is_editable = false;

        ConfiguratorSession::with_schema(GeneratedSchema {
            tables: vec![profiles, users],
            ..Default::default()
        })
    }

    #[test]
    fn test_new_session() {
        let session = ConfiguratorSession::new();
        assert_eq!(session.phase(), GenerationPhase::Idle);
        assert_eq!(session.id().len(), 12);
        assert!(session.schema().tables.is_empty());
        assert!(!session.is_disposed());
    }

    #[test]
    fn test_edit_table() {
        let session = seeded();
        session
            .edit_table("profiles", |t| t.columns.push(Column::new("bio", ColumnType::default())))
            .unwrap();
        assert!(session.schema().table("profiles").unwrap().has_column("bio"));
    }

    #[test]
    fn test_edit_rejections() {
        let session = seeded();
        assert!(matches!(
            session.edit_table("users", |_| {}),
            Err(GenError::NotEditable(name)) if name == "users"
        ));
        assert!(matches!(
            session.edit_table("missing", |_| {}),
            Err(GenError::TableNotFound(_))
        ));

        session.dispose();
        assert!(matches!(session.edit_table("profiles", |_| {}), Err(GenError::Cancelled)));
    }

    #[test]
    fn test_cycle_guard_is_exclusive() {
        let session = ConfiguratorSession::new();
        {
            let _guard = session.begin_cycle().unwrap();
            assert!(session.is_in_flight());
            assert!(matches!(session.begin_cycle(), Err(GenError::Busy)));
        }
        assert!(!session.is_in_flight());
        assert!(session.begin_cycle().is_ok());
    }

    #[test]
    fn test_accept_requires_schema_phase() {
        let session = ConfiguratorSession::new();
        assert!(matches!(
            session.accept(GeneratedSchema::default(), vec![]),
            Err(GenError::InvalidTransition { .. })
        ));

        session.transition(GenerationPhase::PlanPending).unwrap();
        session.transition(GenerationPhase::SchemaPending).unwrap();
        session
            .accept(GeneratedSchema::default(), vec!["Tables: 0/1".to_string()])
            .unwrap();
        assert_eq!(session.phase(), GenerationPhase::Accepted);
        assert_eq!(session.warnings(), vec!["Tables: 0/1".to_string()]);
    }

    #[test]
    fn test_disposed_session_is_frozen() {
        let session = seeded();
        session.transition(GenerationPhase::PlanPending).unwrap();
        session.transition(GenerationPhase::SchemaPending).unwrap();
        session.dispose();

        assert!(matches!(
            session.accept(GeneratedSchema::default(), vec![]),
            Err(GenError::Cancelled)
        ));
        session.fail();
        assert_eq!(session.phase(), GenerationPhase::SchemaPending);
        assert_eq!(session.schema().tables.len(), 2);
        assert!(matches!(session.begin_cycle(), Err(GenError::Cancelled)));
    }
}
