//! rtwin-core library interface
//!
//! Identity resolution, affiliation merging, artifact deduplication and
//! impact scoring for researcher profiles, plus the source fetchers and the
//! pipeline that ties them together.

pub mod affiliation_merger;
pub mod artifact_dedup;
pub mod artifact_normalizer;
pub mod bibliometrics;
pub mod identity_resolver;
pub mod impact_scorer;
pub mod name_matcher;
pub mod pipeline;
pub mod sources;
pub mod text;
pub mod types;

pub use crate::affiliation_merger::AffiliationMerger;
pub use crate::identity_resolver::{IdentityResolver, Resolution, UnresolvedReason};
pub use crate::impact_scorer::{FieldMedians, ImpactScorer};
pub use crate::pipeline::{
    score_bundle, PipelineSettings, ProfilePipeline, ProfileSources, ResearcherProfile, ScoreBundle,
};
pub use crate::types::{FetchOutcome, PersonIdentity, SourceFailure, SourceName, SourceStatus};
