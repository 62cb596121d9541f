//! Generate static files

use anyhow::Result;
use std::time::{Duration, Instant};

use crate::cms::ContentSource;
use crate::generator::Generator;
use crate::Site;

/// Generate the static site once
pub async fn run(site: &Site, source: &dyn ContentSource) -> Result<()> {
    let start = Instant::now();

    let stats = Generator::new(site)?.generate(source).await?;

    if stats.skipped > 0 {
        tracing::warn!("Skipped {} posts", stats.skipped);
    }
    tracing::info!(
        "Generated {} posts from {} listing pages in {:.2}s",
        stats.posts,
        stats.listing_pages,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Regenerate every `revalidate.listing_secs` until interrupted
///
/// A failed run is logged and the previous output is left in place.
pub async fn watch(site: &Site, source: &dyn ContentSource) -> Result<()> {
    let period = Duration::from_secs(site.config.revalidate.listing_secs.max(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    // The first tick completes immediately and the site was just generated
    interval.tick().await;

    tracing::info!(
        "Regenerating every {}s. Press Ctrl+C to stop.",
        period.as_secs()
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                tracing::info!("Revalidating content...");
                if let Err(e) = run(site, source).await {
                    tracing::error!("Generation failed: {:#}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping watch");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::fake::{post, FakeSource};

    #[tokio::test]
    async fn test_run_generates_into_public_dir() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();
        let source = FakeSource::new(vec![post("1", 1, "Hello")]);

        run(&site, &source).await.unwrap();
        assert!(site.public_dir.join("index.html").exists());
        assert!(site.public_dir.join("post/post-1/index.html").exists());
    }
}
