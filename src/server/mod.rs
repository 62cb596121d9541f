//! Blog server - renders pages on request, with preview support

mod error;

pub use error::AppError;

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    handler::Handler,
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tera::Context;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::cms::{ContentSource, Ordering};
use crate::content::{summary_fields, PostDetail, PostSummary};
use crate::i18n::I18n;
use crate::paginator::Paginator;
use crate::templates::{Presenter, TemplateRenderer};
use crate::Site;

/// Cookie holding the preview ref while preview mode is on
pub const PREVIEW_COOKIE: &str = "spacetraveling.preview";

/// Characters escaped in cookie values and redirect paths
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Server state
pub struct AppState {
    site: Site,
    source: Arc<dyn ContentSource>,
    renderer: TemplateRenderer,
    presenter: Presenter,
}

impl AppState {
    pub fn new(site: &Site, source: Arc<dyn ContentSource>) -> Result<Self> {
        let mut i18n = I18n::new(&site.config.language);
        i18n.load_languages(site.languages_dir())?;

        Ok(Self {
            site: site.clone(),
            source,
            renderer: TemplateRenderer::new()?,
            presenter: Presenter::new(&site.config, i18n),
        })
    }

    fn doc_type(&self) -> &str {
        &self.site.config.cms.document_type
    }

    fn render(&self, template: &str, context: &Context) -> Result<Html<String>, AppError> {
        Ok(Html(self.renderer.render(template, context)?))
    }

    /// Turn a handler result into a response, rendering failures as pages
    fn respond(&self, result: Result<Response, AppError>, preview: bool) -> Response {
        let error = match result {
            Ok(response) => return response,
            Err(error) => error,
        };

        error.log();
        let status = error.status();
        let context = self
            .presenter
            .error_context(status.as_u16(), error.message_key(), preview);
        match self.renderer.render("error.html", &context) {
            Ok(html) => (status, no_store(), Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render error page: {:#}", e);
                error.into_response()
            }
        }
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let assets = ServeDir::new(&state.site.static_dir)
        .not_found_service(not_found.with_state(state.clone()));

    Router::new()
        .route("/", get(index))
        .route("/post/:uid", get(post))
        .route("/post/:uid/", get(post))
        .route("/api/preview", get(preview))
        .route("/api/exit-preview", get(exit_preview))
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the blog server
pub async fn start(site: &Site, source: Arc<dyn ContentSource>, ip: &str, port: u16) -> Result<()> {
    let state = Arc::new(AppState::new(site, source)?);
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Listing page with the first page of posts
async fn index(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let preview_ref = preview_ref(&headers);
    let preview = preview_ref.is_some();
    let result = render_index(&state, preview_ref).await;
    state.respond(result, preview)
}

async fn render_index(state: &AppState, preview_ref: Option<String>) -> Result<Response, AppError> {
    let preview = preview_ref.is_some();
    let cms = &state.site.config.cms;
    let listing = Paginator::new(state.source.as_ref(), &cms.document_type, cms.page_size)
        .with_reference(preview_ref)
        .initialize()
        .await?;

    let context = state.presenter.listing_context(&listing, preview);
    let html = state.render("index.html", &context)?;
    let cache = cache_control(preview, state.site.config.revalidate.listing_secs);
    Ok((cache, html).into_response())
}

/// A single post with its neighbours
async fn post(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Response {
    let preview_ref = preview_ref(&headers);
    let preview = preview_ref.is_some();
    let result = render_post(&state, &uid, preview_ref).await;
    state.respond(result, preview)
}

async fn render_post(
    state: &AppState,
    uid: &str,
    preview_ref: Option<String>,
) -> Result<Response, AppError> {
    let preview = preview_ref.is_some();
    let doc_type = state.doc_type();
    let raw = state
        .source
        .get_by_uid(doc_type, uid, preview_ref.clone())
        .await?
        .ok_or(AppError::NotFound)?;
    let post = PostDetail::from(raw);

    // Older post first in descending order, newer in ascending
    let fields = summary_fields(doc_type);
    let prev = state
        .source
        .neighbour(
            doc_type,
            &post.id,
            Ordering::publication_date_desc(),
            &fields,
            preview_ref.clone(),
        )
        .await?
        .map(PostSummary::from);
    let next = state
        .source
        .neighbour(
            doc_type,
            &post.id,
            Ordering::publication_date_asc(),
            &fields,
            preview_ref,
        )
        .await?
        .map(PostSummary::from);

    let context = state
        .presenter
        .post_context(&post, prev.as_ref(), next.as_ref(), preview);
    let html = state.render("post.html", &context)?;
    let cache = cache_control(preview, state.site.config.revalidate.post_secs);
    Ok((cache, html).into_response())
}

#[derive(Debug, Deserialize)]
struct PreviewParams {
    token: Option<String>,
    #[serde(rename = "documentId")]
    document_id: Option<String>,
}

/// Enter preview mode and jump to the previewed document
async fn preview(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PreviewParams>,
) -> Response {
    let result = enter_preview(&state, params).await;
    state.respond(result, false)
}

async fn enter_preview(state: &AppState, params: PreviewParams) -> Result<Response, AppError> {
    let token = params
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or(AppError::BadRequest("missing preview token"))?;

    let document = match params.document_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => state.source.get_by_id(&id, Some(token.clone())).await?,
        None => None,
    };
    let location = document
        .and_then(|doc| doc.uid)
        .map(|uid| format!("/post/{}/", utf8_percent_encode(&uid, SEGMENT)))
        .unwrap_or_else(|| "/".to_string());

    tracing::info!("Entering preview mode, redirecting to {}", location);
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        PREVIEW_COOKIE,
        utf8_percent_encode(&token, SEGMENT)
    );
    Ok(([(header::SET_COOKIE, cookie)], Redirect::temporary(&location)).into_response())
}

/// Leave preview mode
async fn exit_preview() -> Response {
    let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", PREVIEW_COOKIE);
    ([(header::SET_COOKIE, cookie)], Redirect::temporary("/")).into_response()
}

/// Requests matching neither a route nor a static file
async fn not_found(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let preview = preview_ref(&headers).is_some();
    state.respond(Err(AppError::NotFound), preview)
}

/// The preview ref carried by the request cookies, if any
fn preview_ref(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == PREVIEW_COOKIE)
        .and_then(|(_, value)| percent_decode_str(value).decode_utf8().ok())
        .map(|value| value.into_owned())
        .filter(|value| !value.is_empty())
}

fn cache_control(preview: bool, max_age: u64) -> [(header::HeaderName, HeaderValue); 1] {
    if preview {
        return no_store();
    }
    let value = format!("s-maxage={}, stale-while-revalidate", max_age);
    [(
        header::CACHE_CONTROL,
        HeaderValue::from_str(&value).unwrap_or(HeaderValue::from_static("no-cache")),
    )]
}

fn no_store() -> [(header::HeaderName, HeaderValue); 1] {
    [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))]
}
