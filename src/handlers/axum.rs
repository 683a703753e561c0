use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::any,
};
use futures::StreamExt;

use crate::ResearchHub;
use research_hub_core::{ApiError, ApiRequest, ApiResponse, DatabaseAdapter, HttpMethod};

/// Integration trait for the Axum web framework.
pub trait AxumIntegration<DB: DatabaseAdapter> {
    /// Create a router serving every plugin route plus `/health`.
    ///
    /// Paths are relative to the mount point, so nest the router under
    /// [`HubConfig::base_path`](research_hub_core::HubConfig::base_path).
    fn axum_router(self) -> Router;
}

impl<DB: DatabaseAdapter> AxumIntegration<DB> for Arc<ResearchHub<DB>> {
    fn axum_router(self) -> Router {
        // Every method goes to the hub: it owns method dispatch, CORS
        // preflight and the JSON 404.
        let mut paths: BTreeSet<String> = self.routes().into_iter().map(|r| r.path).collect();
        paths.insert("/health".to_string());

        let mut router = Router::new();
        for path in &paths {
            router = router.route(path, any(create_plugin_handler::<DB>()));
        }

        router
            .fallback(create_plugin_handler::<DB>())
            .with_state(self)
    }
}

fn create_plugin_handler<DB: DatabaseAdapter>() -> impl Fn(
    State<Arc<ResearchHub<DB>>>,
    Request,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Response> + Send>,
> + Clone {
    |State(hub): State<Arc<ResearchHub<DB>>>, req: Request| {
        Box::pin(async move {
            match convert_axum_request(req, hub.body_read_limit()).await {
                Ok(hub_req) => match hub.handle_request(hub_req).await {
                    Ok(response) => convert_hub_response(response),
                    Err(err) => convert_hub_error(err),
                },
                Err(err) => convert_hub_error(err),
            }
        })
    }
}

async fn convert_axum_request(req: Request, limit: usize) -> Result<ApiRequest, ApiError> {
    let (parts, body) = req.into_parts();

    let method = match parts.method {
        axum::http::Method::GET => HttpMethod::Get,
        axum::http::Method::POST => HttpMethod::Post,
        axum::http::Method::PUT => HttpMethod::Put,
        axum::http::Method::DELETE => HttpMethod::Delete,
        axum::http::Method::PATCH => HttpMethod::Patch,
        axum::http::Method::OPTIONS => HttpMethod::Options,
        axum::http::Method::HEAD => HttpMethod::Head,
        _ => {
            return Err(ApiError::InvalidRequest(
                "Unsupported HTTP method".to_string(),
            ));
        }
    };

    let mut headers = HashMap::new();
    for (name, value) in parts.headers.iter() {
        if let Ok(value) = value.to_str() {
            headers.insert(name.to_string(), value.to_string());
        }
    }

    let path = parts.uri.path().to_string();

    let mut query = HashMap::new();
    if let Some(query_str) = parts.uri.query() {
        for (key, value) in url::form_urlencoded::parse(query_str.as_bytes()) {
            query.insert(key.to_string(), value.to_string());
        }
    }

    // The body-limit middleware applies the per-content-type limit; this
    // only stops buffering past the largest of them.
    let too_large = || {
        ApiError::payload_too_large(format!(
            "Request body exceeds maximum size of {} bytes",
            limit
        ))
    };
    let declared = parts
        .headers
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(too_large());
    }

    let mut buf = Vec::new();
    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| {
            ApiError::bad_request(format!("Failed to read request body: {}", err))
        })?;
        if buf.len() + chunk.len() > limit {
            return Err(too_large());
        }
        buf.extend_from_slice(&chunk);
    }
    let body = (!buf.is_empty()).then_some(buf);

    Ok(ApiRequest::from_parts(method, path, headers, body, query))
}

fn convert_hub_response(hub_response: ApiResponse) -> Response {
    let mut response = Response::builder().status(
        StatusCode::from_u16(hub_response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    );

    for (name, value) in hub_response.headers {
        if let (Ok(header_name), Ok(header_value)) = (
            axum::http::HeaderName::from_bytes(name.as_bytes()),
            axum::http::HeaderValue::from_str(&value),
        ) {
            response = response.header(header_name, header_value);
        }
    }

    match response.body(axum::body::Body::from(hub_response.body)) {
        Ok(response) => response,
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response(),
    }
}

fn convert_hub_error(err: ApiError) -> Response {
    convert_hub_response(err.into_response())
}
