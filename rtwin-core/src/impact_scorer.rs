//! Impact scoring: per-artifact Quality × Impact × Collaboration and the
//! researcher-level S-index
//!
//! - Quality: FAIR gate (public AND licensed → 5, else 0) × (1 + 0.5·DOI +
//!   0.3·README + 0.2·standard format). Exactly 0 or within [5, 10].
//! - Impact: 1 + ln(1 + reuse / median_for_type), always ≥ 1.
//! - Collaboration: sqrt(max(authors, 1) × max(institutions, 1)).
//! - Paper impact: h × (1 + log10(citations + 1)), 0 when h = 0.
//! - S-index: paper impact + Σ artifact composites.
//!
//! Everything is computed at full precision; [`round_to`] is for display only.

use crate::types::{
    ArtifactRecord, ArtifactType, BibliometricRecord, ResearcherScore, ScoreResult, ScoreSummary,
    ScoredArtifact,
};
use rtwin_common::config::ScoringConfig;
use std::collections::BTreeMap;
use tracing::{debug, warn};

const FAIR_BASE: f64 = 5.0;
const DOI_BONUS: f64 = 0.5;
const README_BONUS: f64 = 0.3;
const FORMAT_BONUS: f64 = 0.2;

/// Median reuse used when nothing else is configured (code baseline)
const BASELINE_MEDIAN: f64 = 10.0;

// ============================================================================
// Field medians
// ============================================================================

/// Median reuse per artifact type
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMedians {
    medians: BTreeMap<String, f64>,
    fallback: f64,
}

impl Default for FieldMedians {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

impl FieldMedians {
    /// Build from a type → median table; `fallback_type` names the entry used
    /// for unknown types
    pub fn new(medians: BTreeMap<String, f64>, fallback_type: &str) -> Self {
        let fallback = match medians.get(fallback_type) {
            Some(m) if *m > 0.0 => *m,
            _ => {
                warn!(
                    fallback_type = %fallback_type,
                    "Fallback type has no positive median, using baseline {}", BASELINE_MEDIAN
                );
                BASELINE_MEDIAN
            }
        };
        Self { medians, fallback }
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        Self::new(config.field_medians.clone(), &config.fallback_type)
    }

    /// Median for `artifact_type`; unknown or non-positive entries use the fallback
    pub fn median_for(&self, artifact_type: ArtifactType) -> f64 {
        match self.medians.get(artifact_type.as_str()) {
            Some(m) if *m > 0.0 => *m,
            _ => self.fallback,
        }
    }
}

// ============================================================================
// Components
// ============================================================================

/// FAIR-gated quality and whether the gate passed
pub fn quality(artifact: &ArtifactRecord) -> (f64, bool) {
    let gate = artifact.is_public && artifact.has_license;
    if !gate {
        return (0.0, false);
    }

    let mut bonus = 1.0;
    if artifact.has_doi {
        bonus += DOI_BONUS;
    }
    if artifact.has_readme {
        bonus += README_BONUS;
    }
    if artifact.is_standard_format {
        bonus += FORMAT_BONUS;
    }
    (FAIR_BASE * bonus, true)
}

/// Field-normalized impact
pub fn impact(reuse_events: u64, median: f64) -> f64 {
    1.0 + (1.0 + reuse_events as f64 / median).ln()
}

/// Geometric mean of team breadth
pub fn collaboration(n_authors: u32, n_institutions: u32) -> f64 {
    (f64::from(n_authors.max(1)) * f64::from(n_institutions.max(1))).sqrt()
}

/// Paper-level term from bibliometrics
pub fn paper_impact(h_index: u32, citation_count: u64) -> f64 {
    if h_index == 0 {
        return 0.0;
    }
    f64::from(h_index) * (1.0 + (citation_count as f64 + 1.0).log10())
}

/// Full score breakdown for one artifact
pub fn score_artifact(artifact: &ArtifactRecord, medians: &FieldMedians) -> ScoreResult {
    let (quality, fair_gate) = quality(artifact);
    let impact = impact(artifact.reuse_events, medians.median_for(artifact.source_type));
    let collaboration = collaboration(artifact.n_authors, artifact.n_institutions);

    ScoreResult {
        quality,
        impact,
        collaboration,
        fair_gate,
        composite_score: quality * impact * collaboration,
    }
}

/// Round for display, after all aggregation is done
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

// ============================================================================
// Researcher aggregate
// ============================================================================

pub struct ImpactScorer {
    medians: FieldMedians,
}

impl ImpactScorer {
    pub fn new(medians: FieldMedians) -> Self {
        Self { medians }
    }

    pub fn medians(&self) -> &FieldMedians {
        &self.medians
    }

    fn score_all(&self, artifacts: &[ArtifactRecord]) -> Vec<ScoredArtifact> {
        artifacts
            .iter()
            .map(|artifact| {
                let score = score_artifact(artifact, &self.medians);
                debug!(
                    title = %artifact.title,
                    quality = score.quality,
                    impact = score.impact,
                    collaboration = score.collaboration,
                    "Artifact scored"
                );
                ScoredArtifact {
                    title: artifact.title.clone(),
                    source_type: artifact.source_type,
                    reuse_events: artifact.reuse_events,
                    score,
                }
            })
            .collect()
    }

    /// S-index over already-deduplicated, normalized artifacts
    ///
    /// Missing bibliometrics contribute a zero paper-impact term.
    pub fn score_researcher(
        &self,
        datasets: &[ArtifactRecord],
        repositories: &[ArtifactRecord],
        bibliometrics: Option<&BibliometricRecord>,
    ) -> ResearcherScore {
        let dataset_scores = self.score_all(datasets);
        let repo_scores = self.score_all(repositories);

        let paper_impact = bibliometrics
            .map(|b| paper_impact(b.h_index, b.citation_count))
            .unwrap_or(0.0);

        let artifact_total: f64 = dataset_scores
            .iter()
            .chain(repo_scores.iter())
            .map(|s| s.score.composite_score)
            .sum();

        let summary = ScoreSummary {
            total_datasets: dataset_scores.len(),
            total_repos_scored: repo_scores.len(),
            h_index: bibliometrics.map(|b| b.h_index).unwrap_or(0),
            i10_index: bibliometrics.map(|b| b.i10_index).unwrap_or(0),
            total_citations: bibliometrics.map(|b| b.citation_count).unwrap_or(0),
            total_papers: bibliometrics.map(|b| b.paper_count).unwrap_or(0),
        };

        ResearcherScore {
            s_index: paper_impact + artifact_total,
            paper_impact,
            dataset_scores,
            repo_scores,
            summary,
        }
    }
}

impl ResearcherScore {
    /// Copy with every float rounded to `places` decimals for presentation
    pub fn rounded(&self, places: u32) -> ResearcherScore {
        let round_scores = |scores: &[ScoredArtifact]| -> Vec<ScoredArtifact> {
            scores
                .iter()
                .map(|s| ScoredArtifact {
                    score: ScoreResult {
                        quality: round_to(s.score.quality, places),
                        impact: round_to(s.score.impact, places),
                        collaboration: round_to(s.score.collaboration, places),
                        fair_gate: s.score.fair_gate,
                        composite_score: round_to(s.score.composite_score, places),
                    },
                    ..s.clone()
                })
                .collect()
        };

        ResearcherScore {
            s_index: round_to(self.s_index, places),
            paper_impact: round_to(self.paper_impact, places),
            dataset_scores: round_scores(&self.dataset_scores),
            repo_scores: round_scores(&self.repo_scores),
            summary: self.summary.clone(),
        }
    }
}
