//! Listing paginator - post summaries fetched one page at a time
//!
//! The paginator itself is stateless: [`PaginationState`] values go in and
//! new values come out, so a failed fetch never disturbs what the caller
//! already holds.

use serde::Serialize;
use std::collections::HashSet;

use crate::cms::{ApiResponse, ContentSource, Ordering, Predicate, Query, RawDocument};
use crate::content::{summary_fields, PostSummary};
use crate::error::CmsError;

/// Upper bound on pages followed by [`Paginator::load_all`]
pub const MAX_PAGES: usize = 1000;

/// The posts loaded so far and where to continue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginationState {
    /// Every summary loaded, in load order
    pub results: Vec<PostSummary>,
    /// URL of the next page; `None` once the listing is exhausted
    pub next_page_cursor: Option<String>,
    pub current_page: u32,
}

impl PaginationState {
    pub fn has_more(&self) -> bool {
        self.next_page_cursor.is_some()
    }
}

/// Loads summaries of one document type from a content source
pub struct Paginator<'a> {
    source: &'a dyn ContentSource,
    doc_type: String,
    page_size: usize,
    ordering: Ordering,
    reference: Option<String>,
}

impl<'a> Paginator<'a> {
    pub fn new(source: &'a dyn ContentSource, doc_type: &str, page_size: usize) -> Self {
        Self {
            source,
            doc_type: doc_type.to_string(),
            page_size: page_size.max(1),
            ordering: Ordering::publication_date_desc(),
            reference: None,
        }
    }

    /// Read from a fixed ref: a preview, or a master ref pinned for a run
    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }

    fn first_query(&self) -> Query {
        Query::new(Predicate::document_type(&self.doc_type))
            .fetch(summary_fields(&self.doc_type))
            .page_size(self.page_size)
            .ordering(self.ordering.clone())
            .reference(self.reference.clone())
    }

    /// Fetch the first page
    pub async fn initialize(&self) -> Result<PaginationState, CmsError> {
        let response = self.source.query(&self.first_query()).await?;
        let (results, next_page_cursor) = normalize(response.results, response.next_page);

        tracing::debug!(
            "Loaded page {} of {} ({} posts)",
            response.page,
            self.doc_type,
            results.len()
        );

        Ok(PaginationState {
            results,
            next_page_cursor,
            current_page: response.page.max(1),
        })
    }

    /// Append the next page to `state`
    ///
    /// Returns an unchanged copy once the cursor is exhausted. On error the
    /// caller's state is untouched and the call can simply be repeated.
    pub async fn load_next(&self, state: &PaginationState) -> Result<PaginationState, CmsError> {
        let Some(ref cursor) = state.next_page_cursor else {
            return Ok(state.clone());
        };

        let ApiResponse {
            page,
            results,
            next_page,
            ..
        } = self.source.fetch_page(cursor).await?;
        let (batch, next_page_cursor) = normalize(results, next_page);

        tracing::debug!("Loaded page {} ({} posts)", page, batch.len());

        let mut results = Vec::with_capacity(state.results.len() + batch.len());
        results.extend(state.results.iter().cloned());
        results.extend(batch);

        Ok(PaginationState {
            results,
            next_page_cursor,
            current_page: state.current_page.max(page),
        })
    }

    /// Fetch the first page and follow the cursor until the listing is
    /// exhausted
    pub async fn load_all(&self) -> Result<PaginationState, CmsError> {
        let first = self.initialize().await?;
        self.load_remaining(first).await
    }

    /// Follow the cursor of `state` until the listing is exhausted
    pub async fn load_remaining(
        &self,
        mut state: PaginationState,
    ) -> Result<PaginationState, CmsError> {
        let mut visited = HashSet::new();
        let mut pages = 1;

        while let Some(cursor) = state.next_page_cursor.clone() {
            if pages >= MAX_PAGES || !visited.insert(cursor.clone()) {
                tracing::warn!(
                    "Stopping pagination at repeated or excessive cursor {}",
                    cursor
                );
                state.next_page_cursor = None;
                break;
            }
            state = self.load_next(&state).await?;
            pages += 1;
        }

        Ok(state)
    }
}

/// Map a raw batch to summaries; an empty batch ends the listing
fn normalize(
    documents: Vec<RawDocument>,
    next_page: Option<String>,
) -> (Vec<PostSummary>, Option<String>) {
    let batch: Vec<PostSummary> = documents.into_iter().map(PostSummary::from).collect();

    let next_page = match next_page {
        Some(cursor) if batch.is_empty() => {
            tracing::warn!(
                "Empty page came with a cursor ({}), treating as the last page",
                cursor
            );
            None
        }
        other => other,
    };

    (batch, next_page)
}
