//! One-time Google OAuth bootstrap.
//!
//! Serves `/auth` (prints the consent URL) and `/oauth2callback` (exchanges
//! the code and prints the token set) on localhost. Run it once, copy the
//! refresh token into `GOOGLE_REFRESH_TOKEN`, then stop it.

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::Deserialize;

use leadflow_core::config::OAuthAppConfig;
use leadflow_google::{OAuthClient, TokenSet, SCOPES};

#[derive(Clone)]
struct AppState {
    oauth: OAuthClient,
}

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

fn router(oauth: OAuthClient) -> Router {
    Router::new()
        .route("/auth", get(auth))
        .route("/oauth2callback", get(oauth2callback))
        .with_state(AppState { oauth })
}

async fn auth(State(state): State<AppState>) -> &'static str {
    let url = state.oauth.authorization_url(SCOPES);
    println!("\nOpen this URL in your browser to authorize:\n{url}\n");
    tracing::info!("consent url printed");
    "Check your console for the Auth URL. Open it in your browser."
}

async fn oauth2callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, String) {
    if let Some(err) = params.error.filter(|e| !e.is_empty()) {
        tracing::warn!(error = %err, "authorization was not granted");
        return (StatusCode::BAD_REQUEST, format!("Authorization failed: {err}"));
    }
    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing code".to_string());
    };

    match state.oauth.exchange_code(&code).await {
        Ok(tokens) => {
            print_tokens(&tokens);
            (
                StatusCode::OK,
                "Tokens received. Check your console. You can close this window.".to_string(),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "code exchange failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error exchanging code for tokens.".to_string(),
            )
        }
    }
}

fn print_tokens(tokens: &TokenSet) {
    let pretty = serde_json::to_string_pretty(tokens).unwrap_or_else(|_| format!("{tokens:?}"));
    println!("\nReceived tokens:\n{pretty}\n");
    if tokens.refresh_token.is_some() {
        println!("Save the refresh_token above into GOOGLE_REFRESH_TOKEN in your .env\n");
    } else {
        println!("No refresh_token returned. Revoke the app's access and run /auth again.\n");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    leadflow_core::logging::init("leadflow-oauth")?;

    let cfg = match OAuthAppConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let oauth = OAuthClient::new(&cfg.client_id, &cfg.client_secret, &cfg.redirect_uri);
    let address = format!("127.0.0.1:{}", cfg.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("bind {address}"))?;

    println!("OAuth helper listening on http://localhost:{}", cfg.port);
    println!("Visit http://localhost:{}/auth to start the flow.", cfg.port);

    axum::serve(listener, router(oauth))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("oauth helper server")?;
    Ok(())
}
