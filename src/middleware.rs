//! Security headers middleware.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Middleware that adds baseline security headers to all API responses.
///
/// - **Cache-Control: no-store**: responses carry credentials and account
///   data; intermediaries must not cache them.
/// - **X-Content-Type-Options: nosniff**: browsers must respect the declared
///   JSON content type.
/// - **X-Frame-Options: DENY**: the API is never served inside a frame.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));

    response
}
