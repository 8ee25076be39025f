use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use di::ServiceProvider;
use di_axum::RouterServiceProviderExtensions;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

pub mod chat;
pub mod view;

/// The whole HTTP surface, wired to a service provider.
pub fn app(provider: ServiceProvider) -> Router {
    Router::new()
        .route("/", get(index))
        .nest_service(
            "/static",
            ServiceBuilder::new().service(ServeDir::new("static")),
        )
        .nest("/view", view::router())
        .nest("/chat", chat::router())
        .layer(
            CorsLayer::new()
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_origin([
                    HeaderValue::from_static("http://localhost:3000"),
                    HeaderValue::from_static("http://localhost:5173"),
                ]),
        )
        .with_provider(provider)
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

pub const X_SESSION_ID: &str = "X-Session-ID";
const MAX_SESSION_ID_LEN: usize = 128;

/// Session named by the `X-Session-ID` header. Rejects requests without one.
#[derive(Debug)]
pub struct ExtractSession(pub String);

/// Like [`ExtractSession`] but tolerates a missing header.
#[derive(Debug)]
pub struct MaybeSession(pub Option<String>);

fn session_from_parts(parts: &Parts) -> Result<Option<String>, (StatusCode, &'static str)> {
    let Some(session_id) = parts.headers.get(X_SESSION_ID) else {
        return Ok(None);
    };

    let session_id = session_id
        .to_str()
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid session id"))?
        .trim();

    if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LEN {
        return Err((StatusCode::BAD_REQUEST, "invalid session id"));
    }

    Ok(Some(session_id.to_owned()))
}

#[async_trait]
impl<S> FromRequestParts<S> for ExtractSession
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, (StatusCode, &'static str)> {
        session_from_parts(parts)?
            .map(ExtractSession)
            .ok_or((StatusCode::BAD_REQUEST, "`X-Session-ID` header is missing"))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, (StatusCode, &'static str)> {
        session_from_parts(parts).map(MaybeSession)
    }
}
