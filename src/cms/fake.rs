//! In-memory content source for tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;

use super::document::{ApiResponse, RawDocument, RawPostData, TextField};
use super::query::{Predicate, Query};
use super::source::ContentSource;
use crate::error::CmsError;

/// Answers queries from a fixed set of documents
///
/// `next_page` cursors look like `fake://query/<n>/page/<p>` and are
/// resolved against the recorded query `n`. Responses registered with
/// [`FakeSource::script`] take precedence for their URL.
#[derive(Default)]
pub struct FakeSource {
    documents: Vec<RawDocument>,
    first_response: Option<ApiResponse>,
    scripted: HashMap<String, ApiResponse>,
    queries: Mutex<Vec<Query>>,
    fetches: AtomicUsize,
    master_refs: AtomicUsize,
    failing: AtomicBool,
}

impl FakeSource {
    pub fn new(documents: Vec<RawDocument>) -> Self {
        Self {
            documents,
            ..Default::default()
        }
    }

    /// Always answer the first query of a search with `response`
    pub fn with_first_response(mut self, response: ApiResponse) -> Self {
        self.first_response = Some(response);
        self
    }

    /// Answer `fetch_page(url)` with `response`
    pub fn script(mut self, url: &str, response: ApiResponse) -> Self {
        self.scripted.insert(url.to_string(), response);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, AtomicOrdering::SeqCst);
    }

    /// Number of `fetch_page` calls so far
    pub fn fetches(&self) -> usize {
        self.fetches.load(AtomicOrdering::SeqCst)
    }

    /// Number of `master_ref` lookups so far
    pub fn master_refs(&self) -> usize {
        self.master_refs.load(AtomicOrdering::SeqCst)
    }

    pub fn recorded_queries(&self) -> Vec<Query> {
        self.queries.lock().unwrap().clone()
    }

    fn check_failing(&self, url: &str) -> Result<(), CmsError> {
        if self.failing.load(AtomicOrdering::SeqCst) {
            return Err(CmsError::Status {
                status: 503,
                url: url.to_string(),
            });
        }
        Ok(())
    }

    fn matching(&self, query: &Query) -> Vec<RawDocument> {
        let mut docs: Vec<RawDocument> = self
            .documents
            .iter()
            .filter(|doc| query.predicates.iter().all(|p| matches(doc, p)))
            .cloned()
            .collect();

        if let Some(ref ordering) = query.ordering {
            docs.sort_by(|a, b| a.first_publication_date.cmp(&b.first_publication_date));
            if ordering.descending {
                docs.reverse();
            }
        }

        if let Some(ref after) = query.after {
            if let Some(pos) = docs.iter().position(|d| &d.id == after) {
                docs.drain(..=pos);
            }
        }

        docs
    }

    fn page_of(&self, query_index: usize, query: &Query, page: u32) -> ApiResponse {
        let docs = self.matching(query);
        let size = query.page_size.unwrap_or(20).max(1);
        let total_pages = docs.len().div_ceil(size).max(1) as u32;

        let start = (page as usize - 1) * size;
        let results: Vec<RawDocument> = docs.iter().skip(start).take(size).cloned().collect();

        let link = |p: u32| format!("fake://query/{}/page/{}", query_index, p);
        ApiResponse {
            page,
            results_per_page: size as u32,
            results_size: results.len() as u32,
            total_results_size: docs.len() as u32,
            total_pages,
            next_page: (page < total_pages).then(|| link(page + 1)),
            prev_page: (page > 1).then(|| link(page - 1)),
            results,
        }
    }
}

fn matches(doc: &RawDocument, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::At(path, value) if path == "document.type" => &doc.doc_type == value,
        Predicate::At(path, value) if path == "document.id" => &doc.id == value,
        Predicate::At(path, value) if path.ends_with(".uid") => doc.uid.as_ref() == Some(value),
        Predicate::At(..) => false,
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn query(&self, query: &Query) -> Result<ApiResponse, CmsError> {
        self.check_failing("fake://search")?;

        let index = {
            let mut queries = self.queries.lock().unwrap();
            queries.push(query.clone());
            queries.len() - 1
        };

        if let Some(ref response) = self.first_response {
            return Ok(response.clone());
        }
        Ok(self.page_of(index, query, 1))
    }

    async fn fetch_page(&self, url: &str) -> Result<ApiResponse, CmsError> {
        self.check_failing(url)?;
        self.fetches.fetch_add(1, AtomicOrdering::SeqCst);

        if let Some(response) = self.scripted.get(url) {
            return Ok(response.clone());
        }

        let parts: Vec<&str> = url
            .strip_prefix("fake://query/")
            .ok_or_else(|| CmsError::InvalidUrl(url.to_string()))?
            .split('/')
            .collect();
        let (index, page) = match parts.as_slice() {
            [index, "page", page] => (
                index.parse::<usize>().ok(),
                page.parse::<u32>().ok().filter(|p| *p > 0),
            ),
            _ => (None, None),
        };
        let (index, page) = index
            .zip(page)
            .ok_or_else(|| CmsError::InvalidUrl(url.to_string()))?;

        let query = self
            .queries
            .lock()
            .unwrap()
            .get(index)
            .cloned()
            .ok_or_else(|| CmsError::InvalidUrl(url.to_string()))?;
        Ok(self.page_of(index, &query, page))
    }

    async fn master_ref(&self) -> Result<String, CmsError> {
        self.check_failing("fake://api")?;
        self.master_refs.fetch_add(1, AtomicOrdering::SeqCst);
        Ok("fake-master".to_string())
    }
}

/// A post document with the given publication day in March 2021
pub fn post(id: &str, day: u32, title: &str) -> RawDocument {
    RawDocument {
        id: id.to_string(),
        uid: Some(format!("post-{}", id)),
        doc_type: "posts".to_string(),
        first_publication_date: Some(format!("2021-03-{:02}T12:00:00+0000", day)),
        last_publication_date: Some(format!("2021-03-{:02}T12:00:00+0000", day)),
        data: RawPostData {
            title: Some(TextField::Plain(title.to_string())),
            subtitle: Some(TextField::Plain(format!("{} subtitle", title))),
            author: Some(TextField::Plain("Joseph Oliveira".to_string())),
            ..Default::default()
        },
    }
}
