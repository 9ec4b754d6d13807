use chrono::Utc;

use crate::core::comparators::Comparators;
use crate::core::scoring::ScoringEngine;
use crate::core::weights::validate;
use crate::error::MatchError;
use crate::models::{Candidate, CandidateFilter, JobRequest, MatchResult, WeightConfig};
use crate::services::MatchStore;

/// Ranks a candidate pool against one request
///
/// # Pipeline
/// 1. Re-validate the weights
/// 2. Score every candidate in the pool
/// 3. Stable sort by total score, highest first
///
/// Already-invited candidates are ranked like any other; hiding or badging
/// them is left to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchRanker {
    engine: ScoringEngine,
}

impl MatchRanker {
    pub fn new(comparators: Comparators) -> Self {
        Self {
            engine: ScoringEngine::new(comparators),
        }
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    /// Score and sort the whole pool
    ///
    /// # Returns
    /// Results sorted non-increasing by total score. Candidates with equal
    /// totals keep their pool order.
    pub fn rank(
        &self,
        request: &JobRequest,
        candidates: &[Candidate],
        weights: &WeightConfig,
    ) -> Result<Vec<MatchResult>, MatchError> {
        validate(weights)?;

        // One timestamp per run so results from the same rank share it
        let computed_at = Utc::now();

        let mut results: Vec<MatchResult> = candidates
            .iter()
            .map(|candidate| self.engine.score_at(request, candidate, weights, computed_at))
            .collect();

        // sort_by is stable
        results.sort_by(|a, b| b.total_score.cmp(&a.total_score));

        Ok(results)
    }

    /// Rank and keep only the best `limit` results
    pub fn rank_top(
        &self,
        request: &JobRequest,
        candidates: &[Candidate],
        weights: &WeightConfig,
        limit: usize,
    ) -> Result<Vec<MatchResult>, MatchError> {
        let mut results = self.rank(request, candidates, weights)?;
        results.truncate(limit);
        Ok(results)
    }

    /// Recompute the results for a request from the current weights and
    /// pool, replacing whatever was stored before.
    ///
    /// Safe to call repeatedly; this is the recovery path for stale or
    /// missing results.
    pub async fn rematch(
        &self,
        store: &dyn MatchStore,
        request_id: &str,
        filter: &CandidateFilter,
    ) -> Result<Vec<MatchResult>, MatchError> {
        if request_id.trim().is_empty() {
            return Err(MatchError::validation("requestId is required"));
        }

        let weights = store.get_weight_config().await?.unwrap_or_default();
        let request = store.get_request(request_id).await?;
        let candidates = store.list_candidate_pool(filter).await?;

        let results = self.rank(&request, &candidates, &weights)?;
        store.save_match_results(request_id, &results).await?;

        tracing::info!(
            "Rematched request {}: {} results from {} candidates",
            request_id,
            results.len(),
            candidates.len()
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn create_request() -> JobRequest {
        JobRequest {
            location: Some("Springfield".to_string()),
            interests: strings(&["music", "art"]),
            ..JobRequest::new("R1")
        }
    }

    fn create_candidate(id: &str, location: &str, interests: &[&str]) -> Candidate {
        Candidate {
            location: Some(location.to_string()),
            interests: strings(interests),
            ..Candidate::new(id)
        }
    }

    #[test]
    fn test_rank_sorted_by_score() {
        let ranker = MatchRanker::default();
        let candidates = vec![
            create_candidate("1", "Shelbyville", &["music"]),
            create_candidate("2", "Springfield", &["music", "art"]),
            create_candidate("3", "Springfield", &[]),
        ];

        let results = ranker.rank(&create_request(), &candidates, &WeightConfig::default()).unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
        assert!(results.windows(2).all(|w| w[0].total_score >= w[1].total_score));
    }

    #[test]
    fn test_ties_keep_pool_order() {
        let ranker = MatchRanker::default();
        let candidates = vec![
            create_candidate("b", "Springfield", &["music"]),
            create_candidate("a", "Springfield", &["art"]),
            create_candidate("c", "Springfield", &["music"]),
        ];

        let results = ranker.rank(&create_request(), &candidates, &WeightConfig::default()).unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let ranker = MatchRanker::default();
        let weights = WeightConfig {
            location: 90.0,
            ..WeightConfig::default()
        };

        let result = ranker.rank(&create_request(), &[create_candidate("1", "Springfield", &[])], &weights);
        assert!(matches!(result, Err(MatchError::Validation(_))));
    }

    #[test]
    fn test_empty_pool() {
        let results = MatchRanker::default()
            .rank(&create_request(), &[], &WeightConfig::default())
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_respects_limit() {
        let candidates: Vec<Candidate> = (0..20)
            .map(|i| create_candidate(&i.to_string(), "Springfield", &["music"]))
            .collect();

        let results = MatchRanker::default()
            .rank_top(&create_request(), &candidates, &WeightConfig::default(), 5)
            .unwrap();

        assert_eq!(results.len(), 5);
    }

    #[tokio::test]
    async fn test_rematch_replaces_stored_results() {
        let store = MemoryStore::new();
        store.put_request(create_request()).await;
        store.put_candidate(create_candidate("1", "Springfield", &["music"])).await;
        store.put_candidate(create_candidate("2", "Shelbyville", &["art"])).await;

        let ranker = MatchRanker::default();
        let first = ranker.rematch(&store, "R1", &CandidateFilter::default()).await.unwrap();
        assert_eq!(first.len(), 2);

        let mut moved = create_candidate("2", "Springfield", &["music", "art"]);
        moved.is_active = false;
        store.put_candidate(moved).await;

        let second = ranker.rematch(&store, "R1", &CandidateFilter::active()).await.unwrap();
        let stored = store.get_match_results("R1").await.unwrap();

        assert_eq!(second.len(), 1);
        assert_eq!(stored, second);
    }

    #[tokio::test]
    async fn test_rematch_unknown_request() {
        let store = MemoryStore::new();
        let err = MatchRanker::default()
            .rematch(&store, "missing", &CandidateFilter::default())
            .await
            .unwrap_err();

        assert!(matches!(err, MatchError::NotFound { entity: "request", .. }));
    }
}
