//! Built-in spacetraveling templates using the Tera template engine
//!
//! Templates are embedded in the binary. [`Presenter`] turns posts and
//! pagination state into the template contexts both the generator and the
//! server render.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::rich_text::{self, html_escape};
use crate::content::{reading_time, PostDetail, PostSummary};
use crate::helpers::{date_xml, DateFormatter};
use crate::i18n::I18n;
use crate::paginator::PaginationState;

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Autoescaping would also mangle URLs; CMS text is escaped by the
        // Presenter before it reaches a template
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("spacetraveling/layout.html")),
            ("index.html", include_str!("spacetraveling/index.html")),
            ("post.html", include_str!("spacetraveling/post.html")),
            ("error.html", include_str!("spacetraveling/error.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("spacetraveling/partials/header.html"),
            ),
            (
                "partials/preview.html",
                include_str!("spacetraveling/partials/preview.html"),
            ),
            (
                "partials/comments.html",
                include_str!("spacetraveling/partials/comments.html"),
            ),
            (
                "partials/post_item.html",
                include_str!("spacetraveling/partials/post_item.html"),
            ),
        ])?;

        tera.register_filter("truncate_chars", truncate_chars_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };

    if s.chars().count() <= length {
        Ok(tera::Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(tera::Value::String(format!(
            "{}{}",
            truncated.trim_end(),
            omission
        )))
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostItem {
    pub uid: String,
    pub href: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: String,
    pub date_xml: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,
    pub banner_alt: String,
    pub date: String,
    pub date_xml: String,
    pub minutes: usize,
    pub reading_time: String,
    pub edited: Option<String>,
    pub summary: String,
    pub content: Vec<BlockView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockView {
    pub heading: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavPost {
    pub title: String,
    pub href: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentsData {
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
}

/// Path of a post page
pub fn post_href(uid: &str) -> String {
    format!("/post/{}/", uid)
}

/// Escaped path of a post page, for use inside an attribute
fn post_href_attr(uid: &str) -> String {
    html_escape(&post_href(uid))
}

/// Builds template contexts from site configuration and content
pub struct Presenter {
    site: SiteData,
    dates: DateFormatter,
    i18n: I18n,
    words_per_minute: usize,
    comments: Option<CommentsData>,
}

impl Presenter {
    pub fn new(config: &SiteConfig, i18n: I18n) -> Self {
        let comments = config.comments.enabled().then(|| CommentsData {
            repo: html_escape(config.comments.repo.as_deref().unwrap_or_default()),
            issue_term: html_escape(&config.comments.issue_term),
            theme: html_escape(&config.comments.theme),
        });

        Self {
            site: SiteData {
                title: html_escape(&config.title),
                description: html_escape(&config.description),
                language: html_escape(&config.language),
            },
            dates: DateFormatter::new(
                &config.date_format,
                &config.time_format,
                &config.language,
                &config.timezone,
            ),
            i18n,
            words_per_minute: config.words_per_minute,
            comments,
        }
    }

    fn base_context(&self, preview: bool) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context.insert("t", &self.i18n.get_all_translations());
        context.insert("preview", &preview);
        context
    }

    pub fn post_item(&self, summary: &PostSummary) -> PostItem {
        PostItem {
            uid: html_escape(&summary.uid),
            href: post_href_attr(&summary.uid),
            title: html_escape(&summary.title),
            subtitle: html_escape(&summary.subtitle),
            author: html_escape(&summary.author),
            date: self
                .dates
                .date_or_empty(summary.first_publication_date.as_ref()),
            date_xml: summary
                .first_publication_date
                .as_ref()
                .map(date_xml)
                .unwrap_or_default(),
        }
    }

    pub fn post_view(&self, post: &PostDetail) -> PostView {
        let minutes = reading_time::estimate(&post.content, self.words_per_minute);
        let minutes_label = minutes.to_string();

        let edited = post
            .last_publication_date
            .as_ref()
            .filter(|_| post.was_edited())
            .map(|last| {
                let date = self.dates.date(last);
                let time = self.dates.time(last);
                self.i18n.format("edited_at", &[&date, &time])
            });

        let summary = post
            .content
            .iter()
            .flat_map(|block| block.body.iter())
            .map(|element| element.text.as_str())
            .find(|text| !text.trim().is_empty())
            .unwrap_or(post.subtitle.as_str())
            .to_string();

        PostView {
            uid: html_escape(&post.uid),
            title: html_escape(&post.title),
            subtitle: html_escape(&post.subtitle),
            author: html_escape(&post.author),
            banner_url: html_escape(&post.banner.url),
            banner_alt: html_escape(post.banner.alt.as_deref().unwrap_or_default()),
            date: self
                .dates
                .date_or_empty(post.first_publication_date.as_ref()),
            date_xml: post
                .first_publication_date
                .as_ref()
                .map(date_xml)
                .unwrap_or_default(),
            minutes,
            reading_time: self.i18n.format("reading_time", &[&minutes_label]),
            edited,
            summary,
            content: post
                .content
                .iter()
                .map(|block| BlockView {
                    heading: html_escape(&block.heading),
                    html: rich_text::as_html(&block.body),
                })
                .collect(),
        }
    }

    fn nav(summary: Option<&PostSummary>) -> Option<NavPost> {
        summary.map(|s| NavPost {
            title: html_escape(&s.title),
            href: post_href_attr(&s.uid),
        })
    }

    /// Context for the listing page
    pub fn listing_context(&self, state: &PaginationState, preview: bool) -> Context {
        let posts: Vec<PostItem> = state.results.iter().map(|s| self.post_item(s)).collect();

        let mut context = self.base_context(preview);
        context.insert("posts", &posts);
        context.insert(
            "next_page",
            &state.next_page_cursor.as_deref().map(html_escape),
        );
        context.insert("current_page", &state.current_page);
        context
    }

    /// Context for a post page; `prev` is the older and `next` the newer post
    pub fn post_context(
        &self,
        post: &PostDetail,
        prev: Option<&PostSummary>,
        next: Option<&PostSummary>,
        preview: bool,
    ) -> Context {
        let mut context = self.base_context(preview);
        context.insert("post", &self.post_view(post));
        context.insert("prev_post", &Self::nav(prev));
        context.insert("next_post", &Self::nav(next));
        context.insert("comments", &self.comments);
        context
    }

    /// Context for an error page
    pub fn error_context(&self, status: u16, message_key: &str, preview: bool) -> Context {
        let mut context = self.base_context(preview);
        context.insert("status", &status);
        context.insert("message", &self.i18n.get(message_key));
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::fake::post;
    use crate::cms::{RichTextSpan, TextField};

    fn presenter(language: &str) -> Presenter {
        let config = SiteConfig {
            language: language.to_string(),
            ..Default::default()
        };
        Presenter::new(&config, I18n::new(language))
    }

    fn detail() -> PostDetail {
        let mut raw = post("a", 15, "Como utilizar Hooks");
        raw.last_publication_date = Some("2021-03-25T19:25:28+0000".to_string());
        raw.data.content = vec![crate::cms::RawContentBlock {
            heading: Some(TextField::Plain("Intro".to_string())),
            body: vec![RichTextSpan::paragraph(vec!["word"; 250].join(" "))],
        }];
        PostDetail::from(raw)
    }

    #[test]
    fn test_truncate_filter() {
        let mut args = HashMap::new();
        args.insert("length".to_string(), tera::Value::from(5));
        let out = truncate_chars_filter(&tera::Value::from("Hello world"), &args).unwrap();
        assert_eq!(out, tera::Value::from("Hello..."));

        let out = truncate_chars_filter(&tera::Value::from("Hi"), &args).unwrap();
        assert_eq!(out, tera::Value::from("Hi"));
    }

    #[test]
    fn test_post_view() {
        let view = presenter("pt-BR").post_view(&detail());
        assert_eq!(view.minutes, 2);
        assert_eq!(view.reading_time, "2 min");
        assert_eq!(view.date, "15 mar 2021");
        assert_eq!(
            view.edited.as_deref(),
            Some("* editado em 25 mar 2021, às 19:25")
        );
        assert_eq!(view.content[0].heading, "Intro");
        assert!(view.content[0].html.starts_with("<p>word word"));
        assert!(view.summary.starts_with("word word"));
    }

    #[test]
    fn test_render_listing() {
        let presenter = presenter("en");
        let state = PaginationState {
            results: vec![PostSummary::from(post("a", 2, "Fish & <Chips>"))],
            next_page_cursor: Some("https://cms/page2".to_string()),
            current_page: 1,
        };

        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer
            .render("index.html", &presenter.listing_context(&state, false))
            .unwrap();

        assert!(html.contains("Fish &amp; &lt;Chips&gt;"));
        assert!(html.contains(r#"href="/post/post-a/""#));
        assert!(html.contains("Load more posts"));
        assert!(html.contains("load-more"));
        assert!(!html.contains("/api/exit-preview"));
    }

    #[test]
    fn test_render_listing_without_more_pages_in_preview() {
        let presenter = presenter("pt-BR");
        let state = PaginationState {
            results: vec![],
            next_page_cursor: None,
            current_page: 1,
        };

        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer
            .render("index.html", &presenter.listing_context(&state, true))
            .unwrap();

        assert!(!html.contains("load-more"));
        assert!(html.contains("/api/exit-preview"));
        assert!(html.contains("Sair do modo Preview"));
    }

    #[test]
    fn test_render_post_with_navigation_and_comments() {
        let config = SiteConfig {
            language: "en".to_string(),
            comments: crate::config::CommentsConfig {
                repo: Some("someone/comments".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let presenter = Presenter::new(&config, I18n::new("en"));
        let older = PostSummary::from(post("b", 1, "Older"));

        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer
            .render(
                "post.html",
                &presenter.post_context(&detail(), Some(&older), None, false),
            )
            .unwrap();

        assert!(html.contains("<h1>Como utilizar Hooks</h1>"));
        assert!(html.contains("2 min"));
        assert!(html.contains(r#"href="/post/post-b/""#));
        assert!(html.contains("Previous post"));
        assert!(!html.contains("Next post"));
        assert!(html.contains(r#"repo="someone/comments""#));
    }

    #[test]
    fn test_render_error_page() {
        let presenter = presenter("en");
        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer
            .render("error.html", &presenter.error_context(404, "error.not_found", false))
            .unwrap();
        assert!(html.contains("404"));
        assert!(html.contains("Post not found"));
    }
}
