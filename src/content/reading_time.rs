//! Reading time estimation

use super::post::ContentBlock;

/// Average reading speed assumed when none is configured
pub const DEFAULT_WORDS_PER_MINUTE: usize = 200;

/// Count words in every heading and body element of a post
///
/// Only literal words count: formatting spans are ranges over the same
/// text, so they can neither add nor remove words.
pub fn count_words(content: &[ContentBlock]) -> usize {
    content.iter().fold(0, |total, block| {
        let heading = words_in(&block.heading);
        let body: usize = block.body.iter().map(|element| words_in(&element.text)).sum();
        total + heading + body
    })
}

/// Estimated reading time in whole minutes, rounded up
pub fn estimate(content: &[ContentBlock], words_per_minute: usize) -> usize {
    let words_per_minute = if words_per_minute == 0 {
        DEFAULT_WORDS_PER_MINUTE
    } else {
        words_per_minute
    };

    count_words(content).div_ceil(words_per_minute)
}

/// [`estimate`] at [`DEFAULT_WORDS_PER_MINUTE`]
pub fn estimate_default(content: &[ContentBlock]) -> usize {
    estimate(content, DEFAULT_WORDS_PER_MINUTE)
}

fn words_in(text: &str) -> usize {
    text.split_whitespace().count()
}
