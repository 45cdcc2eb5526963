//! Two-phase generation orchestrator.
//!
//! A cycle moves through an explicit state machine:
//!
//! ```text
//! Idle | Accepted | Failed -> PlanPending -> SchemaPending -> Accepted | Failed
//!                            PlanPending -> Failed
//! ```
//!
//! Phase 1 asks for a textual plan. Phase 2 embeds that plan and asks for the
//! JSON schema, which is extracted, normalized, validated and accepted into the
//! session. Neither phase is retried here.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use blueprint_schema::GeneratedSchema;

use crate::error::{GenError, GenResult};
use crate::llm::TextGenerator;
use crate::normalize::parse_schema;
use crate::prompts::{build_plan_prompt, build_schema_prompt};
use crate::reconcile::{reconcile, AppConfigPatch};
use crate::session::ConfiguratorSession;
use crate::settings::GeneratorSettings;
use crate::store::ConfigStore;
use crate::types::GenerationRequest;
use crate::validation::{validate_and_fix, ExpectedCounts, ValidationReport};

/// Where a session's generation cycle stands.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GenerationPhase {
    #[default]
    Idle,
    /// Waiting for the design plan
    PlanPending,
    /// Waiting for the JSON schema
    SchemaPending,
    Accepted,
    Failed,
}

impl GenerationPhase {
    pub fn can_transition_to(&self, to: GenerationPhase) -> bool {
        use GenerationPhase::*;
        matches!(
            (self, to),
            (Idle | Accepted | Failed, PlanPending)
                | (PlanPending, SchemaPending)
                | (PlanPending, Failed)
                | (SchemaPending, Accepted)
                | (SchemaPending, Failed)
        )
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::PlanPending | Self::SchemaPending)
    }
}

impl fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::PlanPending => "plan pending",
            Self::SchemaPending => "schema pending",
            Self::Accepted => "accepted",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of an accepted generation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    /// Phase-1 design plan
    pub plan: String,
    /// Schema as accepted into the session
    pub schema: GeneratedSchema,
    pub report: ValidationReport,
    pub config_patch: AppConfigPatch,
    /// Set when the accepted configuration could not be merged into the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_merge_error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Drives generation cycles against a text generator.
pub struct Orchestrator<G> {
    generator: G,
    settings: GeneratorSettings,
    config_store: Option<Arc<dyn ConfigStore>>,
}

impl<G: TextGenerator> Orchestrator<G> {
    pub fn new(generator: G) -> Self {
        Self::with_settings(generator, GeneratorSettings::default())
    }

    pub fn with_settings(generator: G, settings: GeneratorSettings) -> Self {
        Self {
            generator,
            settings,
            config_store: None,
        }
    }

    /// Merge each accepted configuration into `store`.
    pub fn with_config_store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.config_store = Some(store);
        self
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Run one full generation cycle for `session`.
    ///
    /// Rejected with [`GenError::Busy`] while another cycle is in flight.
    pub async fn run(
        &self,
        session: &ConfiguratorSession,
        request: &GenerationRequest,
    ) -> GenResult<GenerationOutcome> {
        let _guard = session.begin_cycle()?;

        let result = self.run_cycle(session, request).await;
        if let Err(e) = &result {
            error!("Generation for session {} failed: {}", session.id(), e);
            session.fail();
        }
        result
    }

    async fn run_cycle(
        &self,
        session: &ConfiguratorSession,
        request: &GenerationRequest,
    ) -> GenResult<GenerationOutcome> {
        session.transition(GenerationPhase::PlanPending)?;
        info!(
            "Phase 1: planning {} tables for {}",
            request.tables.len(),
            request.app.name
        );
        let plan_prompt = build_plan_prompt(&request.app, &request.features, &request.tables);
        let plan = self
            .call(session, &plan_prompt, self.settings.plan_max_tokens)
            .await?;

        session.transition(GenerationPhase::SchemaPending)?;
        info!("Phase 2: generating schema from {} char plan", plan.len());
        let schema_prompt = build_schema_prompt(&plan, &request.tables, &request.app);
        let response = self
            .call(session, &schema_prompt, self.settings.schema_max_tokens)
            .await?;

        let mut schema = parse_schema(&response).ok_or(GenError::InvalidResponseFormat)?;
        let report = validate_and_fix(&mut schema, &ExpectedCounts::from_stubs(&request.tables));
        let config_patch = reconcile(&schema.configuration);

        session.accept(schema.clone(), report.warnings.clone())?;
        info!(
            "Accepted {} tables, {} enums, {} policies into session {}",
            schema.tables.len(),
            schema.enums.len(),
            schema.rls_policies.len(),
            session.id()
        );

        // The schema is already accepted; a store failure is reported, not returned.
        let config_merge_error = self.config_store.as_ref().and_then(|store| {
            store.merge(&config_patch).err().map(|e| {
                error!("Failed to merge app config for session {}: {}", session.id(), e);
                e.to_string()
            })
        });

        Ok(GenerationOutcome {
            plan,
            schema,
            report,
            config_patch,
            config_merge_error,
            completed_at: Utc::now(),
        })
    }

    /// One bounded, cancellable generation call.
    async fn call(
        &self,
        session: &ConfiguratorSession,
        prompt: &str,
        max_tokens: u32,
    ) -> GenResult<String> {
        let token = session.cancellation_token();
        let timeout = self.settings.phase_timeout();

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(GenError::Cancelled),
            result = tokio::time::timeout(timeout, self.generator.generate(prompt, max_tokens)) => {
                result.map_err(|_| GenError::Timeout(timeout))?
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockTextGenerator;
    use crate::settings::{DEFAULT_PLAN_MAX_TOKENS, DEFAULT_SCHEMA_MAX_TOKENS};
    use crate::types::{AppDescription, TableStub};

    const SCHEMA_REPLY: &str = r#"```json
{"configuration": {"databaseProvider": "supabase"},
 "tables": [{"name": "notes", "columns": [{"name": "id", "type": "uuid", "isId": true}]}],
 "rlsPolicies": [{"tableName": "notes", "operation": "SELECT",
   "rolePolicies": [{"role": "authenticated", "accessType": "own"}]}]}
```"#;

    fn request() -> GenerationRequest {
        GenerationRequest::new(AppDescription {
            name: "Notes".to_string(),
            description: "Private notes".to_string(),
            ..Default::default()
        })
        .with_table(TableStub::new("notes", "A private note"))
    }

    #[test]
    fn test_phase_transitions() {
        use GenerationPhase::*;
        assert!(Idle.can_transition_to(PlanPending));
        assert!(Accepted.can_transition_to(PlanPending));
        assert!(Failed.can_transition_to(PlanPending));
        assert!(PlanPending.can_transition_to(SchemaPending));
        assert!(PlanPending.can_transition_to(Failed));
        assert!(SchemaPending.can_transition_to(Accepted));

        assert!(!Idle.can_transition_to(SchemaPending));
        assert!(!PlanPending.can_transition_to(Accepted));
        assert!(!PlanPending.can_transition_to(PlanPending));
        assert!(!SchemaPending.can_transition_to(PlanPending));
        assert!(PlanPending.is_pending());
        assert!(!Accepted.is_pending());
    }

    #[tokio::test]
    async fn test_plan_failure_skips_schema_phase() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .times(1)
            .returning(|_, _| Err(GenError::Llm("rate limited".to_string())));

        let session = ConfiguratorSession::new();
        let orchestrator = Orchestrator::new(mock);

        let result = orchestrator.run(&session, &request()).await;
        assert!(matches!(result, Err(GenError::Llm(_))));
        assert_eq!(session.phase(), GenerationPhase::Failed);
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn test_token_budgets_per_phase() {
        let mut mock = MockTextGenerator::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_generate()
            .withf(|_, max_tokens| *max_tokens == DEFAULT_PLAN_MAX_TOKENS)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("notes: id, user_id, body".to_string()));
        mock.expect_generate()
            .withf(|prompt, max_tokens| {
                *max_tokens == DEFAULT_SCHEMA_MAX_TOKENS && prompt.contains("notes: id, user_id, body")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(SCHEMA_REPLY.to_string()));

        let session = ConfiguratorSession::new();
        let outcome = Orchestrator::new(mock).run(&session, &request()).await.unwrap();

        assert_eq!(session.phase(), GenerationPhase::Accepted);
        assert_eq!(outcome.report.auto_fixed_tables, vec!["notes".to_string()]);
        assert_eq!(outcome.config_patch.supabase, Some(true));
        assert!(session.schema().table("notes").unwrap().has_column("user_id"));
    }

    struct BrokenStore;

    impl ConfigStore for BrokenStore {
        fn current(&self) -> GenResult<crate::reconcile::AppConfig> {
            Err(GenError::Io(std::io::Error::new(std::io::ErrorKind::Other, "read-only")))
        }

        fn merge(&self, _patch: &AppConfigPatch) -> GenResult<crate::reconcile::AppConfig> {
            Err(GenError::Io(std::io::Error::new(std::io::ErrorKind::Other, "read-only")))
        }
    }

    #[tokio::test]
    async fn test_store_failure_keeps_accepted_outcome() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().times(2).returning(|_, max_tokens| {
            if max_tokens == DEFAULT_PLAN_MAX_TOKENS {
                Ok("plan".to_string())
            } else {
                Ok(SCHEMA_REPLY.to_string())
            }
        });

        let session = ConfiguratorSession::new();
        let orchestrator = Orchestrator::new(mock).with_config_store(Arc::new(BrokenStore));

        let outcome = orchestrator.run(&session, &request()).await.unwrap();

        assert_eq!(session.phase(), GenerationPhase::Accepted);
        assert_eq!(outcome.schema.tables.len(), 1);
        assert_eq!(session.warnings(), outcome.report.warnings);
        assert!(outcome.config_merge_error.unwrap().contains("read-only"));
    }

    #[tokio::test]
    async fn test_unparseable_schema_is_terminal() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .times(2)
            .returning(|_, max_tokens| {
                if max_tokens == DEFAULT_PLAN_MAX_TOKENS {
                    Ok("plan".to_string())
                } else {
                    Ok("Sorry, I cannot help with that.".to_string())
                }
            });

        let session = ConfiguratorSession::new();
        let result = Orchestrator::new(mock).run(&session, &request()).await;

        assert!(matches!(result, Err(GenError::InvalidResponseFormat)));
        assert_eq!(session.phase(), GenerationPhase::Failed);
        assert!(session.schema().tables.is_empty());
    }
}
