// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use axum::serve::Serve;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::constants::{MAX_REQUEST_BODY_SIZE, REQUEST_TIMEOUT};
use crate::models::SecretValue;
use crate::routes;
use crate::tokens::TokenStore;

/// State shared by all request handlers.
#[derive(Debug)]
pub struct AppState {
    pub tokens: Arc<TokenStore>,
    pub database_password: SecretValue,
}

pub struct Application {
    port: u16,
    server: Serve<TcpListener, Router, Router>,
}

impl Application {
    pub async fn build(
        host: &str,
        port: u16,
        tokens: Arc<TokenStore>,
        database_password: SecretValue,
    ) -> Result<Self, std::io::Error> {
        let address = format!("{host}:{port}");
        let listener = TcpListener::bind(address).await?;
        let server = run(listener, tokens, database_password)?;
        let port = server.local_addr()?.port();

        tracing::info!("[broker] listening at http://{}:{}", host, port);

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

/// Builds the router with all routes and middleware.
pub fn create_router(tokens: Arc<TokenStore>, database_password: SecretValue) -> Router {
    let state = Arc::new(AppState {
        tokens,
        database_password,
    });

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/health", get(routes::health))
        .route(
            "/secrets/database/password",
            get(routes::get_database_password),
        )
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_SIZE))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
}

#[tracing::instrument(skip(listener, tokens, database_password))]
pub fn run(
    listener: TcpListener,
    tokens: Arc<TokenStore>,
    database_password: SecretValue,
) -> Result<Serve<TcpListener, Router, Router>, std::io::Error> {
    let app = create_router(tokens, database_password);
    Ok(axum::serve(listener, app))
}
