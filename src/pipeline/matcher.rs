use super::model::{CandidateRide, SearchQuery};
use super::PipelineError;
use crate::db::RideStore;

/// Runs the datastore's candidate search. Ranking belongs to the datastore.
pub struct CandidateMatcher<S>
where
    S: RideStore,
{
    store: S,
}

impl<S> CandidateMatcher<S>
where
    S: RideStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, query), fields(date = %query.date, radius_m = query.radius_m))]
    pub async fn find_candidates(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<CandidateRide>, PipelineError> {
        let candidates = self
            .store
            .find_candidate_rides(query)
            .await
            .map_err(|e| PipelineError::MatchQueryFailed(e.to_string()))?;

        tracing::debug!(count = candidates.len(), "candidate rides found");
        Ok(candidates)
    }
}
