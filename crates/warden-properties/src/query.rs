//! Cursor-paginated property search.
//!
//! Weather filters can reject any share of a storage batch, so one page may
//! need several batches. [`PropertyQuery::run`] keeps pulling `batch_size`
//! records past a local cursor until `limit` survivors are in hand or
//! storage comes back short. `has_more` only reports survivors beyond
//! `limit` that the last batch already produced.

use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

use crate::enrich::Enricher;
use crate::filter::apply_weather_filters;
use crate::params::ValidationError;
use crate::store::{PropertyStore, StoreError};
use crate::types::{EnrichedProperty, QueryParams, QueryResult};

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Errors from a property search.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Request parameters were rejected before any work was done.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage failed; the whole call is abandoned.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl QueryError {
    /// Message safe to show an API caller.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Storage(_) => "Internal Server Error".to_string(),
        }
    }
}

/// Search over a property store with weather enrichment.
pub struct PropertyQuery {
    store: Arc<dyn PropertyStore>,
    enricher: Arc<Enricher>,
    batch_size: usize,
}

impl PropertyQuery {
    pub fn new(store: Arc<dyn PropertyStore>, enricher: Arc<Enricher>) -> Self {
        Self {
            store,
            enricher,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Records pulled from storage per round.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Produce one page of enriched, filtered properties.
    ///
    /// Results are in ascending id order and all have ids greater than
    /// `params.cursor`. Calling again with the returned `next_cursor`
    /// continues without gaps or repeats.
    #[instrument(
        skip(self, params),
        fields(search = ?params.search_text, cursor = ?params.cursor, limit = params.limit)
    )]
    pub async fn run(&self, params: &QueryParams) -> Result<QueryResult, QueryError> {
        if params.limit == 0 {
            return Err(ValidationError::new("limit", "must be at least 1").into());
        }
        if let Some(filters) = &params.filters {
            filters.validate()?;
        }

        let search_text = params.search_text.as_deref();
        let filters = params.filters.as_ref();
        let mut cursor = params.cursor;
        let mut accumulated: Vec<EnrichedProperty> = Vec::new();
        let mut rounds = 0usize;
        let mut fetched = 0usize;

        loop {
            let batch = self.store.find_range(search_text, cursor, self.batch_size).await?;
            let Some(last) = batch.last() else {
                break;
            };

            let last_id = last.id;
            if let Some(previous) = cursor {
                if last_id <= previous {
                    return Err(StoreError::OutOfOrder {
                        cursor: previous,
                        returned: last_id,
                    }
                    .into());
                }
            }

            let batch_len = batch.len();
            rounds += 1;
            fetched += batch_len;

            let enriched = self.enricher.enrich(batch).await;
            let survivors = apply_weather_filters(enriched, filters);
            tracing::debug!(
                round = rounds,
                fetched = batch_len,
                survivors = survivors.len(),
                last_id,
                "Query round complete"
            );

            accumulated.extend(survivors);
            cursor = Some(last_id);

            if batch_len < self.batch_size || accumulated.len() >= params.limit {
                break;
            }
        }

        let has_more = accumulated.len() > params.limit;
        accumulated.truncate(params.limit);
        let next_cursor = accumulated.last().map(EnrichedProperty::id);

        tracing::info!(
            rounds,
            fetched,
            returned = accumulated.len(),
            has_more,
            "Property query complete"
        );

        Ok(QueryResult {
            properties: accumulated,
            has_more,
            next_cursor,
        })
    }
}
