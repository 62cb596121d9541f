//! Generator module - renders the blog into static HTML files

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::cms::ContentSource;
use crate::content::{PostDetail, PostSummary};
use crate::i18n::I18n;
use crate::paginator::{PaginationState, Paginator};
use crate::templates::{Presenter, TemplateRenderer};
use crate::Site;

/// What a generation run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateStats {
    pub posts: usize,
    pub skipped: usize,
    pub listing_pages: u32,
}

/// Static site generator using the built-in templates
pub struct Generator {
    site: Site,
    renderer: TemplateRenderer,
    presenter: Presenter,
}

impl Generator {
    /// Create a new generator
    pub fn new(site: &Site) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;

        let mut i18n = I18n::new(&site.config.language);
        i18n.load_languages(site.languages_dir())?;
        let presenter = Presenter::new(&site.config, i18n);

        Ok(Self {
            site: site.clone(),
            renderer,
            presenter,
        })
    }

    /// Generate the entire site from `source`
    pub async fn generate(&self, source: &dyn ContentSource) -> Result<GenerateStats> {
        let cms = &self.site.config.cms;

        // Every page and post of a run is read from the same content version
        let reference = source
            .master_ref()
            .await
            .context("Failed to resolve the published content version")?;
        let paginator = Paginator::new(source, &cms.document_type, cms.page_size)
            .with_reference(Some(reference.clone()));

        // The listing page shows the first page; the rest is loaded in the
        // browser through the cursor
        let first = paginator
            .initialize()
            .await
            .context("Failed to load the first page of posts")?;
        let all = paginator
            .load_remaining(first.clone())
            .await
            .context("Failed to load the post listing")?;

        tracing::info!(
            "Loaded {} posts in {} pages",
            all.results.len(),
            all.current_page
        );

        fs::create_dir_all(&self.site.public_dir)?;

        self.copy_static_assets()?;
        self.generate_index_page(&first)?;
        self.generate_error_page()?;
        let (posts, skipped) = self
            .generate_post_pages(source, &reference, &all.results)
            .await?;

        Ok(GenerateStats {
            posts,
            skipped,
            listing_pages: all.current_page,
        })
    }

    /// Generate the listing page
    fn generate_index_page(&self, first: &PaginationState) -> Result<()> {
        let context = self.presenter.listing_context(first, false);
        let html = self.renderer.render("index.html", &context)?;
        self.write_page(Path::new("index.html"), &html)
    }

    /// Generate the not-found page
    fn generate_error_page(&self) -> Result<()> {
        let context = self.presenter.error_context(404, "error.not_found", false);
        let html = self.renderer.render("error.html", &context)?;
        self.write_page(Path::new("404.html"), &html)
    }

    /// Generate individual post pages, newest first in `summaries`
    async fn generate_post_pages(
        &self,
        source: &dyn ContentSource,
        reference: &str,
        summaries: &[PostSummary],
    ) -> Result<(usize, usize)> {
        let doc_type = &self.site.config.cms.document_type;
        let mut written = 0;
        let mut skipped = 0;

        for (i, summary) in summaries.iter().enumerate() {
            if !is_safe_segment(&summary.uid) {
                tracing::warn!("Skipping post with unusable uid {:?}", summary.uid);
                skipped += 1;
                continue;
            }

            let Some(raw) = source
                .get_by_uid(doc_type, &summary.uid, Some(reference.to_string()))
                .await
                .with_context(|| format!("Failed to load post {:?}", summary.uid))?
            else {
                tracing::warn!("Post {:?} disappeared from the CMS", summary.uid);
                skipped += 1;
                continue;
            };
            let post = PostDetail::from(raw);

            // Listing is newest first: the older post follows, the newer precedes
            let prev = summaries.get(i + 1);
            let next = i.checked_sub(1).and_then(|j| summaries.get(j));

            let context = self.presenter.post_context(&post, prev, next, false);
            let html = self.renderer.render("post.html", &context)?;

            let output = Path::new("post").join(&summary.uid).join("index.html");
            self.write_page(&output, &html)?;
            tracing::debug!("Generated post: {:?}", output);
            written += 1;
        }

        Ok((written, skipped))
    }

    fn write_page(&self, relative: &Path, html: &str) -> Result<()> {
        let output_path = self.site.public_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dir {:?}", parent))?;
        }
        fs::write(&output_path, html)
            .with_context(|| format!("Failed to write {:?}", output_path))?;
        Ok(())
    }

    /// Copy the static directory (stylesheets, images) into the output
    fn copy_static_assets(&self) -> Result<()> {
        let static_dir = &self.site.static_dir;
        if !static_dir.exists() {
            tracing::debug!("No static directory at {:?}", static_dir);
            return Ok(());
        }

        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = self.site.public_dir.join(relative);

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::copy(path, &dest).with_context(|| format!("Failed to copy {:?}", path))?;
        }

        Ok(())
    }
}

/// A uid usable as a single path segment
fn is_safe_segment(uid: &str) -> bool {
    !uid.is_empty() && uid != "." && uid != ".." && !uid.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::fake::{post, FakeSource};
    use crate::config::SiteConfig;

    fn site(dir: &Path) -> Site {
        let config = SiteConfig {
            language: "en".to_string(),
            ..Default::default()
        };
        Site::with_config(dir.to_path_buf(), config)
    }

    fn source() -> FakeSource {
        FakeSource::new(vec![
            post("1", 1, "First"),
            post("2", 2, "Second"),
            post("3", 3, "Third"),
        ])
    }

    #[tokio::test]
    async fn test_generate_writes_listing_and_posts() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());

        let stats = Generator::new(&site)
            .unwrap()
            .generate(&source())
            .await
            .unwrap();
        assert_eq!(
            stats,
            GenerateStats {
                posts: 3,
                skipped: 0,
                listing_pages: 2,
            }
        );

        let index = fs::read_to_string(site.public_dir.join("index.html")).unwrap();
        assert!(index.contains("Third"));
        assert!(index.contains("Second"));
        assert!(!index.contains("First"));
        assert!(index.contains(r#"data-next="fake://query/0/page/2""#));

        assert!(site.public_dir.join("404.html").exists());
        for uid in ["post-1", "post-2", "post-3"] {
            assert!(site.public_dir.join("post").join(uid).join("index.html").exists());
        }
    }

    #[tokio::test]
    async fn test_generate_reads_one_content_version() {
        let dir = tempfile::tempdir().unwrap();
        let source = source();
        Generator::new(&site(dir.path()))
            .unwrap()
            .generate(&source)
            .await
            .unwrap();

        // One listing search plus one lookup per post
        assert_eq!(source.master_refs(), 1);
        let queries = source.recorded_queries();
        assert_eq!(queries.len(), 4);
        assert!(queries
            .iter()
            .all(|q| q.reference.as_deref() == Some("fake-master")));
    }

    #[tokio::test]
    async fn test_post_pages_link_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        Generator::new(&site)
            .unwrap()
            .generate(&source())
            .await
            .unwrap();

        let middle =
            fs::read_to_string(site.public_dir.join("post/post-2/index.html")).unwrap();
        assert!(middle.contains(r#"class="prev" href="/post/post-1/""#));
        assert!(middle.contains(r#"class="next" href="/post/post-3/""#));

        let newest =
            fs::read_to_string(site.public_dir.join("post/post-3/index.html")).unwrap();
        assert!(!newest.contains(r#"class="next""#));
    }

    #[tokio::test]
    async fn test_static_assets_are_copied() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        fs::create_dir_all(site.static_dir.join("css")).unwrap();
        fs::write(site.static_dir.join("css/common.css"), "body {}").unwrap();

        Generator::new(&site)
            .unwrap()
            .generate(&FakeSource::default())
            .await
            .unwrap();

        let css = fs::read_to_string(site.public_dir.join("css/common.css")).unwrap();
        assert_eq!(css, "body {}");
    }

    #[tokio::test]
    async fn test_unsafe_uid_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        let mut evil = post("x", 4, "Evil");
        evil.uid = Some("../escape".to_string());

        let stats = Generator::new(&site)
            .unwrap()
            .generate(&FakeSource::new(vec![evil, post("1", 1, "Fine")]))
            .await
            .unwrap();
        assert_eq!(stats.posts, 1);
        assert_eq!(stats.skipped, 1);
        assert!(!site.public_dir.join("escape").exists());
    }

    #[tokio::test]
    async fn test_cms_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let source = source();
        source.set_failing(true);

        let result = Generator::new(&site(dir.path())).unwrap().generate(&source).await;
        assert!(result.is_err());
        assert!(!dir.path().join("public/index.html").exists());
    }

    #[test]
    fn test_is_safe_segment() {
        assert!(is_safe_segment("como-utilizar-hooks"));
        assert!(!is_safe_segment(""));
        assert!(!is_safe_segment(".."));
        assert!(!is_safe_segment("a/b"));
    }
}
