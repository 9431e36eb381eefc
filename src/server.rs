// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process wiring: state assembly, listener and graceful shutdown.

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use tokio::{net::TcpListener, task::JoinError};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    api,
    auth::{PasetoMaker, TokenError, TokenMaker},
    clock::{Clock, SystemClock},
    config::Config,
    metrics::Metrics,
    ratelimit::{ClientResolver, InMemoryCounterStore, RateLimiter},
    schema::{SchemaError, SchemaRegistry},
    state::{AppState, HttpSettings},
    storage::{AccountStore, InMemoryAccountStore, RedbAccountStore, StoreError},
    user::{compose, SessionPolicy, UserEngine},
};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to load request schemas: {0}")]
    Schema(#[from] SchemaError),

    #[error("failed to initialize token maker: {0}")]
    Token(#[from] TokenError),

    #[error("failed to open account store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] JoinError),
}

/// Assemble the application state described by `config`.
pub fn build_state(config: &Config) -> Result<AppState, ServerError> {
    let schemas = Arc::new(SchemaRegistry::load(config.schema_dir.as_deref())?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let tokens: Arc<dyn TokenMaker> = Arc::new(PasetoMaker::new(
        &config.token.secret,
        config.token.issuer.clone(),
        config.token.audience.clone(),
        clock.clone(),
    )?);

    let store: Arc<dyn AccountStore> = match &config.database_path {
        Some(path) => {
            info!(path = %path.display(), "using redb account store");
            Arc::new(RedbAccountStore::open(path)?)
        }
        None => {
            warn!("DATABASE_PATH not set, accounts are kept in memory only");
            Arc::new(InMemoryAccountStore::new())
        }
    };

    let engine = Arc::new(UserEngine::new(
        store.clone(),
        tokens.clone(),
        clock,
        config.otp_ttl,
        SessionPolicy {
            issuer: config.token.issuer.clone(),
            audience: config.token.audience.clone(),
            access_ttl: config.token.access_ttl,
            refresh_ttl: config.token.refresh_ttl,
        },
    ));

    let metrics = Arc::new(Metrics::new());
    let users = compose(engine, schemas, metrics.clone(), tokens);

    let mut state = AppState::new(users, store, metrics)
        .with_client_resolver(ClientResolver::new(config.trusted_proxies.clone()))
        .with_http(HttpSettings {
            read_timeout: config.read_timeout,
            swagger_enabled: config.swagger_enabled,
            cors_enabled: config.cors_enabled,
        });

    if config.rate_limit.enabled {
        info!(
            requests = config.rate_limit.requests_per_window,
            window_secs = config.rate_limit.window.as_secs(),
            "rate limiting enabled"
        );
        state = state.with_rate_limiter(Arc::new(RateLimiter::new(
            Arc::new(InMemoryCounterStore::default()),
            config.rate_limit.clone(),
        )));
    } else {
        warn!("rate limiting disabled");
    }

    Ok(state)
}

/// Run the server until SIGINT or SIGTERM.
pub async fn run(config: Config) -> Result<(), ServerError> {
    let state = build_state(&config)?;
    let app = api::router(state);

    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind,
            source,
        })?;
    info!(addr = %config.bind, "otp auth server listening");

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    serve(listener, app, shutdown, config.shutdown_grace).await
}

/// Serve `app` until `shutdown` fires, then give in-flight requests `grace`
/// to finish before aborting them.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
    grace: Duration,
) -> Result<(), ServerError> {
    let stop = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { stop.cancelled().await })
        .await
    });

    tokio::select! {
        joined = &mut server => return Ok(joined??),
        _ = shutdown.cancelled() => {}
    }

    info!(grace_secs = grace.as_secs(), "shutting down, draining in-flight requests");
    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => {
            joined??;
            info!("server stopped");
            Ok(())
        }
        Err(_) => {
            warn!("grace period elapsed, aborting remaining requests");
            server.abort();
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}
