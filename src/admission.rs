use anyhow::Result;
use std::sync::Arc;

use crate::nlp::{Embedder, dense_cosine};

/// Queries whose best category similarity falls below this floor are treated
/// as having no category relationship at all.
pub const CATEGORY_SIMILARITY_FLOOR: f64 = 0.3;

/// Characters that mark a query as noise for a search engine.
const NOISE_CHARS: &str = "@#$%^&*()";

pub const DEFAULT_CATEGORIES: [&str; 7] = [
    "historical lookup",
    "urgent news",
    "weekly updates",
    "sporting events",
    "political events",
    "world events",
    "climate change",
];

pub const DEFAULT_GOALS: [&str; 3] = ["sports", "politics", "entertainment"];

/// Outcome of the pre-flight admission check on a raw user query.
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionDecision {
    Admitted { score: f64 },
    Rejected { reason: String },
}

impl AdmissionDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionDecision::Admitted { .. })
    }
}

/// Pre-flight gate deciding whether a raw query is worth dispatching to the
/// search provider at all. Three independent sub-checks combined by
/// unweighted mean; any sub-check scoring exactly zero short-circuits the
/// whole result to zero.
pub struct QueryAdmissionFilter {
    embedder: Arc<dyn Embedder>,
    categories: Vec<String>,
    goals: Vec<String>,
}

impl QueryAdmissionFilter {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            goals: DEFAULT_GOALS.iter().map(|g| g.to_string()).collect(),
        }
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_goals(mut self, goals: Vec<String>) -> Self {
        self.goals = goals;
        self
    }

    /// Admission score in [0,1]. Zero means the query failed a hard gate.
    pub async fn admit(&self, query: &str) -> Result<f64> {
        // Cheap mechanical check runs first so garbage queries never hit the
        // embedding backend.
        let ingestible_score = self.is_ingestible_for_search_engine(query);
        if ingestible_score == 0.0 {
            return Ok(0.0);
        }

        let category_score = self.has_category_relationship(query).await?;
        if category_score == 0.0 {
            return Ok(0.0);
        }

        let goal_alignment_score = self.aligns_with_goals(query);
        if goal_alignment_score == 0.0 {
            return Ok(0.0);
        }

        Ok((category_score + ingestible_score + goal_alignment_score) / 3.0)
    }

    /// Maps the raw score onto the decision bands: 0 rejects as unrelated,
    /// below 0.5 rejects as low quality, 0.5 and above admits. Backend
    /// errors become rejections carrying the error text.
    pub async fn decide(&self, query: &str) -> AdmissionDecision {
        match self.admit(query).await {
            Ok(score) if score == 0.0 => AdmissionDecision::Rejected {
                reason: "Query does not have relationship to categories".to_string(),
            },
            Ok(score) if score < 0.5 => AdmissionDecision::Rejected {
                reason: "Query is of low quality".to_string(),
            },
            Ok(score) => AdmissionDecision::Admitted { score },
            Err(e) => AdmissionDecision::Rejected {
                reason: e.to_string(),
            },
        }
    }

    /// Best embedding similarity between the query and the fixed category
    /// labels; below the floor counts as no relationship.
    async fn has_category_relationship(&self, query: &str) -> Result<f64> {
        let query_embedding = self.embedder.embed(query).await?;
        let mut best = 0.0_f64;
        for category in &self.categories {
            let category_embedding = self.embedder.embed(category).await?;
            let similarity =
                dense_cosine(&query_embedding, &category_embedding).clamp(0.0, 1.0);
            if similarity > best {
                best = similarity;
            }
        }
        if best < CATEGORY_SIMILARITY_FLOOR {
            return Ok(0.0);
        }
        Ok(best)
    }

    /// Mechanical check: long enough to mean something and free of
    /// symbol noise a search engine would choke on.
    fn is_ingestible_for_search_engine(&self, query: &str) -> f64 {
        if query.trim().len() > 5 && !query.chars().any(|c| NOISE_CHARS.contains(c)) {
            1.0
        } else {
            0.0
        }
    }

    /// Keyword containment against the goal vocabulary.
    fn aligns_with_goals(&self, query: &str) -> f64 {
        let lowered = query.to_lowercase();
        for goal in &self.goals {
            if lowered.contains(goal.as_str()) {
                return 1.0;
            }
        }
        0.0
    }
}
