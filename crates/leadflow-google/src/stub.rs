//! Local HTTP stand-in for the Google endpoints.

use axum::{http::StatusCode, Router};

/// Serves `router` on an ephemeral loopback port and returns its base URL.
pub(crate) async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub(crate) async fn token_ok() -> &'static str {
    r#"{"access_token":"ya29.test","expires_in":3599,"token_type":"Bearer"}"#
}

pub(crate) async fn token_rejected() -> (StatusCode, &'static str) {
    (
        StatusCode::BAD_REQUEST,
        r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#,
    )
}
