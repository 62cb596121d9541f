//! Search queries against the content source

use std::fmt;

/// A filter on document fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `path` equals `value`
    At(String, String),
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::At(path.into(), value.into())
    }

    pub fn document_type(doc_type: &str) -> Self {
        Self::at("document.type", doc_type)
    }

    pub fn document_id(id: &str) -> Self {
        Self::at("document.id", id)
    }

    pub fn uid(doc_type: &str, uid: &str) -> Self {
        Self::at(format!("my.{}.uid", doc_type), uid)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::At(path, value) => {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "[at({}, \"{}\")]", path, escaped)
            }
        }
    }
}

/// Sort key for search results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

impl Ordering {
    pub fn new(field: impl Into<String>, descending: bool) -> Self {
        Self {
            field: field.into(),
            descending,
        }
    }

    /// Newest first
    pub fn publication_date_desc() -> Self {
        Self::new("document.first_publication_date", true)
    }

    /// Oldest first
    pub fn publication_date_asc() -> Self {
        Self::new("document.first_publication_date", false)
    }
}

impl Default for Ordering {
    fn default() -> Self {
        Self::publication_date_desc()
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "[{} desc]", self.field)
        } else {
            write!(f, "[{}]", self.field)
        }
    }
}

/// A search request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    pub fetch: Vec<String>,
    pub page_size: Option<usize>,
    pub ordering: Option<Ordering>,
    /// Only return documents after this document id in the ordering
    pub after: Option<String>,
    /// Content release to read from; the master ref when absent
    pub reference: Option<String>,
}

impl Query {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicates: vec![predicate],
            ..Default::default()
        }
    }

    pub fn fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn after(mut self, id: impl Into<String>) -> Self {
        self.after = Some(id.into());
        self
    }

    pub fn reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }

    /// The `q` parameter, e.g. `[[at(document.type, "posts")]]`
    pub fn q(&self) -> String {
        let inner: String = self.predicates.iter().map(|p| p.to_string()).collect();
        format!("[{}]", inner)
    }

    /// Render as request parameters, excluding the ref
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", self.q())];

        if !self.fetch.is_empty() {
            params.push(("fetch", self.fetch.join(",")));
        }
        if let Some(size) = self.page_size {
            params.push(("pageSize", size.to_string()));
        }
        if let Some(ref ordering) = self.ordering {
            params.push(("orderings", ordering.to_string()));
        }
        if let Some(ref after) = self.after {
            params.push(("after", after.clone()));
        }

        params
    }
}
