//! Post models and their projection from raw CMS documents

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::cms::{RawDocument, RichTextSpan, TextField};

/// Fields requested when listing posts of `doc_type`
pub fn summary_fields(doc_type: &str) -> Vec<String> {
    ["title", "subtitle", "author"]
        .iter()
        .map(|field| format!("{}.{}", doc_type, field))
        .collect()
}

/// What the listing shows for one post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: String,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// A full post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub id: String,
    pub uid: String,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub last_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner: Banner,
    pub content: Vec<ContentBlock>,
}

impl PostDetail {
    /// Whether the post was edited after it first went out
    pub fn was_edited(&self) -> bool {
        match (self.first_publication_date, self.last_publication_date) {
            (Some(first), Some(last)) => last > first,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub url: String,
    pub alt: Option<String>,
}

/// A heading followed by its rich-text body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub heading: String,
    pub body: Vec<RichTextSpan>,
}

impl From<RawDocument> for PostSummary {
    fn from(doc: RawDocument) -> Self {
        let data = doc.data;
        Self {
            uid: doc.uid.unwrap_or(doc.id),
            first_publication_date: doc
                .first_publication_date
                .as_deref()
                .and_then(parse_timestamp),
            title: text_or_empty(data.title.as_ref()),
            subtitle: text_or_empty(data.subtitle.as_ref()),
            author: text_or_empty(data.author.as_ref()),
        }
    }
}

impl From<RawDocument> for PostDetail {
    fn from(doc: RawDocument) -> Self {
        let data = doc.data;
        let banner = data
            .banner
            .map(|image| Banner {
                url: image.url.unwrap_or_default(),
                alt: image.alt,
            })
            .unwrap_or_default();

        let content = data
            .content
            .into_iter()
            .map(|block| ContentBlock {
                heading: text_or_empty(block.heading.as_ref()),
                body: block.body,
            })
            .collect();

        Self {
            uid: doc.uid.unwrap_or_else(|| doc.id.clone()),
            id: doc.id,
            first_publication_date: doc
                .first_publication_date
                .as_deref()
                .and_then(parse_timestamp),
            last_publication_date: doc
                .last_publication_date
                .as_deref()
                .and_then(parse_timestamp),
            title: text_or_empty(data.title.as_ref()),
            subtitle: text_or_empty(data.subtitle.as_ref()),
            author: text_or_empty(data.author.as_ref()),
            banner,
            content,
        }
    }
}

fn text_or_empty(field: Option<&TextField>) -> String {
    field.map(TextField::as_text).unwrap_or_default()
}

/// Parse a CMS timestamp such as `2021-03-25T19:25:28+0000`
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
}
