//! Intent resolution for floral arrangement prompts.
//!
//! Free text plus optional hints flows through four stages:
//!
//! 1. [`matcher`]: ranked candidates per taxonomy category.
//! 2. [`resolver`]: one mutually compatible entry per category, with a
//!    confidence score and notes for anything left unresolved.
//! 3. [`gateway`]: skip or call the external synthesis collaborator.
//! 4. [`adapter`]: enhanced prompt text or workflow slots.
//!
//! [`IntentPipeline`] runs them in order against a shared, read-only
//! [`TaxonomyStore`](floral_taxonomy::TaxonomyStore).

pub mod adapter;
pub mod confidence;
pub mod error;
pub mod gateway;
pub mod matcher;
pub mod pipeline;
pub mod resolver;
pub mod types;

pub use confidence::{Confidence, ConfidenceLabel};
pub use error::{HintError, SynthesisError};
pub use gateway::{
    FnSynthesizer, GatewayConfig, GatewayOutcome, SynthesisGateway, SynthesisPayload,
    SynthesisStatus, Synthesizer,
};
pub use matcher::{LexicalMatcher, MatcherConfig, MAX_TOP_K};
pub use adapter::{ArrangementPlan, PlanItem};
pub use pipeline::{EnhancedResult, IntentPipeline, PipelineConfig, Resolution, WorkflowResult};
pub use resolver::StructuralResolver;
pub use types::{
    CandidateSet, ConflictKind, ConflictNote, Hints, MatchCandidate, PipelineOptions,
    ResolvedSelection,
};
