//! List the posts in the CMS

use anyhow::{Context, Result};

use crate::cms::ContentSource;
use crate::content::{reading_time, PostDetail};
use crate::helpers::DateFormatter;
use crate::paginator::Paginator;
use crate::Site;

/// One line of the post listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub date: String,
    pub uid: String,
    pub title: String,
    pub author: String,
    pub minutes: usize,
}

/// Collect every post with its reading time, newest first
pub async fn entries(site: &Site, source: &dyn ContentSource) -> Result<Vec<ListEntry>> {
    let config = &site.config;
    let dates = DateFormatter::new(
        &config.date_format,
        &config.time_format,
        &config.language,
        &config.timezone,
    );

    let reference = source
        .master_ref()
        .await
        .context("Failed to resolve the published content version")?;
    let listing = Paginator::new(source, &config.cms.document_type, config.cms.page_size)
        .with_reference(Some(reference.clone()))
        .load_all()
        .await
        .context("Failed to load the post listing")?;

    let mut entries = Vec::with_capacity(listing.results.len());
    for summary in listing.results {
        let minutes = source
            .get_by_uid(
                &config.cms.document_type,
                &summary.uid,
                Some(reference.clone()),
            )
            .await
            .with_context(|| format!("Failed to load post {:?}", summary.uid))?
            .map(|raw| {
                let post = PostDetail::from(raw);
                reading_time::estimate(&post.content, config.words_per_minute)
            })
            .unwrap_or_default();

        entries.push(ListEntry {
            date: dates.date_or_empty(summary.first_publication_date.as_ref()),
            uid: summary.uid,
            title: summary.title,
            author: summary.author,
            minutes,
        });
    }

    Ok(entries)
}

/// Print every post
pub async fn run(site: &Site, source: &dyn ContentSource) -> Result<()> {
    let entries = entries(site, source).await?;

    println!("Posts ({}):", entries.len());
    for entry in entries {
        println!(
            "  {} - {} by {} ({} min) [{}]",
            entry.date, entry.title, entry.author, entry.minutes, entry.uid
        );
    }

    Ok(())
}
