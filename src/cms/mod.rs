//! Content source access - documents, queries and the HTTP client

mod client;
mod document;
#[cfg(test)]
pub(crate) mod fake;
mod query;
mod source;

pub use client::HttpContentSource;
pub use document::{
    ApiRef, ApiResponse, ApiRoot, InlineSpan, RawContentBlock, RawDocument, RawImage,
    RawPostData, RichTextSpan, SpanData, TextField,
};
pub use query::{Ordering, Predicate, Query};
pub use source::ContentSource;
