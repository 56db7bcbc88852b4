use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, Request, header},
    middleware::from_fn_with_state,
};
use deployment::Deployment;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info_span, warn};

pub mod error;
pub mod middleware;
pub mod routes;

use error::ApiError;
use middleware::rate_limit::{RateLimiter, limit};

const REQUEST_ID_HEADER: &str = "x-request-id";

async fn not_found() -> ApiError {
    ApiError::NotFound("Not found")
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origin = match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(e) => {
            warn!("FRONTEND_URL is not a valid origin, cross-origin requests will be refused: {e}");
            AllowOrigin::list([])
        }
    };
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, request_id.clone()])
        .expose_headers([request_id])
}

/// The full HTTP surface with its middleware stack.
pub fn app(deployment: Deployment) -> Router {
    let limits = deployment.config().rate_limits;
    let global_limiter = RateLimiter::new(limits.global_max, limits.window);
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(routes::health::router(&deployment))
        .merge(routes::auth::router(&deployment))
        .merge(routes::services::router(&deployment))
        .merge(routes::projects::router(&deployment))
        .merge(routes::consultations::router(&deployment))
        .merge(routes::appointments::router(&deployment))
        .merge(routes::ai::router(&deployment))
        .merge(routes::upload::router(&deployment))
        .merge(routes::analytics::router(&deployment))
        .fallback(not_found)
        .layer(from_fn_with_state(global_limiter, limit))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
                        let request_id = req
                            .headers()
                            .get(REQUEST_ID_HEADER)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-");
                        info_span!(
                            "request",
                            method = %req.method(),
                            uri = %req.uri(),
                            request_id = %request_id,
                        )
                    }),
                )
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(cors_layer(&deployment.config().frontend_url)),
        )
        .with_state(deployment)
}
