use std::convert::Infallible;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures_util::stream;
use tracing::{error, info};

use crate::models::QueryRequest;
use crate::service::query_service::QueryService;

/// POST `/query` — streams the answer as `text/plain`.
///
/// Failures are a non-2xx status with the error message as a plain-text body.
pub async fn query_handler(
    State(svc): State<QueryService>,
    Json(request): Json<QueryRequest>,
) -> Response {
    info!("Received query: {}", request.query);

    match svc.answer(request).await {
        Ok(chunks) => {
            let body = Body::from_stream(stream::iter(chunks.into_iter().map(Ok::<_, Infallible>)));
            ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
        }
        Err(err) => {
            error!("Query failed: {err}");
            err.into_response()
        }
    }
}
