//! Raw documents and responses as delivered by the content source

use serde::{Deserialize, Deserializer, Serialize};

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiResponse {
    pub page: u32,
    pub results_per_page: u32,
    pub results_size: u32,
    pub total_results_size: u32,
    pub total_pages: u32,
    pub next_page: Option<String>,
    pub prev_page: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub results: Vec<RawDocument>,
}

/// A document exactly as the content source returns it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDocument {
    pub id: String,
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub first_publication_date: Option<String>,
    pub last_publication_date: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub data: RawPostData,
}

/// The custom fields of a post document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPostData {
    pub title: Option<TextField>,
    pub subtitle: Option<TextField>,
    pub author: Option<TextField>,
    pub banner: Option<RawImage>,
    #[serde(deserialize_with = "null_as_default")]
    pub content: Vec<RawContentBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawImage {
    pub url: Option<String>,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawContentBlock {
    pub heading: Option<TextField>,
    #[serde(deserialize_with = "null_as_default")]
    pub body: Vec<RichTextSpan>,
}

/// A text field may be configured as key text or as a rich-text title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextField {
    Plain(String),
    Rich(Vec<RichTextSpan>),
}

impl TextField {
    /// Flatten to plain text
    pub fn as_text(&self) -> String {
        match self {
            TextField::Plain(s) => s.clone(),
            TextField::Rich(spans) => spans
                .iter()
                .map(|s| s.text.as_str())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// One rich-text element: a paragraph, heading, list item, image, ...
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RichTextSpan {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    #[serde(deserialize_with = "null_as_default")]
    pub spans: Vec<InlineSpan>,
    pub url: Option<String>,
    pub alt: Option<String>,
}

impl RichTextSpan {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: "paragraph".to_string(),
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Inline formatting over a character range of a rich-text element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InlineSpan {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanData {
    pub url: Option<String>,
    pub target: Option<String>,
    pub label: Option<String>,
}

/// The API root, used to discover refs
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiRoot {
    pub refs: Vec<ApiRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiRef {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub label: String,
    #[serde(rename = "isMasterRef")]
    pub is_master_ref: bool,
}

impl ApiRoot {
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference.as_str())
    }
}

/// Treat an explicit `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
