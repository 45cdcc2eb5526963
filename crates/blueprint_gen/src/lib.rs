//! # blueprint_gen - Schema generation for blueprint
//!
//! Turns an app description into a backend schema in two LLM calls:
//! a free-text design plan, then the JSON schema derived from it. The raw
//! response is extracted, normalized into [`blueprint_schema`] types,
//! validated (with a single auto-fix for ownership columns) and accepted
//! into a [`ConfiguratorSession`]. The accepted configuration block is then
//! reconciled onto the app's technology flags.
//!
//! ## Pipeline
//!
//! ```text
//! GenerationRequest
//!       │ build_plan_prompt
//!       ▼
//!  PlanPending ──▶ TextGenerator ──▶ plan text
//!       │ build_schema_prompt
//!       ▼
//! SchemaPending ──▶ TextGenerator ──▶ response
//!       │ extract_json → normalize → validate_and_fix
//!       ▼
//!   Accepted ──▶ reconcile ──▶ ConfigStore
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use blueprint_gen::{
//!     AppDescription, ConfiguratorSession, GenerationRequest, LlmAdapter, Orchestrator, TableStub,
//! };
//!
//! # async fn example() -> blueprint_gen::GenResult<()> {
//! let orchestrator = Orchestrator::new(LlmAdapter::from_env()?);
//! let session = ConfiguratorSession::new();
//! let request = GenerationRequest::new(AppDescription {
//!     name: "Chirp".to_string(),
//!     description: "A tiny blogging platform".to_string(),
//!     ..Default::default()
//! })
//! .with_table(TableStub::new("posts", "A blog post"));
//!
//! let outcome = orchestrator.run(&session, &request).await?;
//! for warning in &outcome.report.warnings {
//!     println!("{}", warning);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extract;
pub mod llm;
pub mod mock;
pub mod normalize;
pub mod orchestrator;
pub mod prompts;
pub mod raw;
pub mod reconcile;
pub mod session;
pub mod settings;
pub mod store;
pub mod types;
pub mod validation;

pub use error::{GenError, GenResult};
pub use extract::extract_json;
pub use llm::{LlmAdapter, LlmProvider, TextGenerator};
pub use mock::{CapturedPrompt, MockGenerator, MockReply};
pub use normalize::{normalize_value, parse_schema};
pub use orchestrator::{GenerationOutcome, GenerationPhase, Orchestrator};
pub use prompts::{build_plan_prompt, build_schema_prompt, policy_floor};
pub use reconcile::{reconcile, AppConfig, AppConfigPatch};
pub use session::ConfiguratorSession;
pub use settings::GeneratorSettings;
pub use store::{ConfigStore, FileConfigStore, MemoryConfigStore};
pub use types::{AppDescription, Feature, GenerationRequest, TableStub};
pub use validation::{validate_and_fix, ExpectedCounts, ValidationReport};
