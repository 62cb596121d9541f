//! The content source seam

use async_trait::async_trait;

use super::document::{ApiResponse, RawDocument};
use super::query::{Ordering, Predicate, Query};
use crate::error::CmsError;

/// Anything that can answer search queries with pages of raw documents
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Run a search and return its first page
    async fn query(&self, query: &Query) -> Result<ApiResponse, CmsError>;

    /// Fetch a page by the `next_page` URL a previous response handed out
    async fn fetch_page(&self, url: &str) -> Result<ApiResponse, CmsError>;

    /// Ref of the currently published content
    ///
    /// Queries without a ref read whatever is published when they run; pass
    /// this ref explicitly to read every page from one snapshot.
    async fn master_ref(&self) -> Result<String, CmsError>;

    /// Look a single document up by its uid
    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        reference: Option<String>,
    ) -> Result<Option<RawDocument>, CmsError> {
        let query = Query::new(Predicate::uid(doc_type, uid))
            .page_size(1)
            .reference(reference);
        Ok(self.query(&query).await?.results.into_iter().next())
    }

    /// Look a single document up by its id
    async fn get_by_id(
        &self,
        id: &str,
        reference: Option<String>,
    ) -> Result<Option<RawDocument>, CmsError> {
        let query = Query::new(Predicate::document_id(id))
            .page_size(1)
            .reference(reference);
        Ok(self.query(&query).await?.results.into_iter().next())
    }

    /// The single document adjacent to `id` in `ordering`
    async fn neighbour(
        &self,
        doc_type: &str,
        id: &str,
        ordering: Ordering,
        fetch: &[String],
        reference: Option<String>,
    ) -> Result<Option<RawDocument>, CmsError> {
        let query = Query::new(Predicate::document_type(doc_type))
            .fetch(fetch.iter().cloned())
            .page_size(1)
            .ordering(ordering)
            .after(id)
            .reference(reference);
        Ok(self.query(&query).await?.results.into_iter().next())
    }
}
