use crate::server::AdminState;
use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::{HeaderMap, StatusCode};
use std::any::Any;
use std::sync::Arc;
use tracing::{error, warn};
use vitrine_exposition::{HttpExchange, Outcome};
use vitrine_observability::HandlerMetrics;

const SCRAPE_FAILED: &str = "An error has occurred while serving metrics";

/// `GET <metrics_path>`: run one exposition cycle on a blocking thread.
pub async fn scrape(State(state): State<Arc<AdminState>>, headers: HeaderMap) -> Response {
    let _in_flight = state.metrics.as_ref().map(HandlerMetrics::track);

    let handler = state.handler.clone();
    let served = tokio::task::spawn_blocking(move || {
        let mut exchange = HttpExchange::new(headers);
        handler
            .serve(&mut exchange)
            .map(|outcome| (outcome, exchange))
    })
    .await;

    let response = match served {
        Ok(Ok((outcome, exchange))) => {
            if let Outcome::HttpError { status } = outcome {
                warn!(status = status.as_u16(), "scrape answered with an error");
            }
            exchange.into_response().map(Body::from)
        }
        Ok(Err(e)) => {
            error!(error = %e, "metrics exposition failed");
            internal_error()
        }
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            error!(panic = %panic_message(&*payload), "metrics exposition panicked");
            internal_error()
        }
        Err(e) => {
            error!(error = %e, "metrics exposition task cancelled");
            internal_error()
        }
    };

    if let Some(ref metrics) = state.metrics {
        metrics.observe(response.status().as_u16());
    }
    response
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, SCRAPE_FAILED).into_response()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else {
        "non-string panic payload"
    }
}
