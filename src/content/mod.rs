//! Content module - post models, rich text and reading time

mod post;
pub mod reading_time;
pub mod rich_text;

pub use post::{parse_timestamp, summary_fields, Banner, ContentBlock, PostDetail, PostSummary};
pub use reading_time::{estimate, DEFAULT_WORDS_PER_MINUTE};
