use super::handlers::{SOMETHING_WENT_WRONG, message};
use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use core::any::Any;
use core::panic::AssertUnwindSafe;
use futures_util::FutureExt;
use std::time::Instant;

const LOG_TARGET: &str = "   service";

/// Log every served request with its status and elapsed time.
pub async fn log_requests(matched_path: Option<MatchedPath>, request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = matched_path.map_or_else(|| request.uri().path().to_string(), |p| p.as_str().to_string());

    let response = next.run(request).await;

    log::info!(
        target: LOG_TARGET,
        "{method} {path} {} {}ms",
        response.status().as_u16(),
        started.elapsed().as_millis()
    );

    response
}

/// Turn a panicking handler into a generic 500.
pub async fn catch_panics(request: Request<Body>, next: Next) -> Response {
    let uri = request.uri().clone();

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            log::error!(target: LOG_TARGET, "Request to '{uri}' panicked: {}", panic_message(panic.as_ref()));
            message(StatusCode::INTERNAL_SERVER_ERROR, SOMETHING_WENT_WRONG)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::routing::get;
    use tower::ServiceExt;

    #[expect(clippy::panic, reason = "exercising the panic handler")]
    async fn explode() -> &'static str {
        panic!("kaboom")
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let app = Router::new()
            .route("/boom", get(explode))
            .layer(axum::middleware::from_fn(catch_panics));

        let response = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Something went wrong");
    }

    #[test]
    fn test_panic_message_variants() {
        let text: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(text.as_ref()), "static");

        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");

        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
