use crate::{
    api::routes::{
        create_gameweek, dismiss_notification, finalize_gameweek, get_current_gameweek,
        get_display_gameweek, get_gameweek_stats, get_latest_finalized_gameweek,
        get_next_gameweek, get_snapshot, get_team_points, get_transfers_allowed, health,
        ingest_match, ingest_scores, list_gameweeks, list_notifications, resolve_gameweeks,
    },
    config::Settings,
    domain::{GameweekManager, GameweekStore, GameweekWatcher},
    infra::db::{DBConnection, DatabasePoolConfig},
};
use anyhow::anyhow;
use axum::{
    body::Body,
    extract::{connect_info::IntoMakeServiceWithConnectInfo, ConnectInfo, Request},
    http::HeaderValue,
    middleware::{self, AddExtension, Next},
    response::IntoResponse,
    routing::{delete, get, post},
    serve::Serve,
    Router,
};
use hyper::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use log::{error, info, warn};
use std::{collections::HashMap, fs, net::SocketAddr, str::FromStr};
use std::{sync::Arc, time::Duration};
use time::OffsetDateTime;
use tokio::signal::unix::{signal, SignalKind};
use tokio::{net::TcpListener, select, task::JoinHandle};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub struct Application {
    server: Serve<
        TcpListener,
        IntoMakeServiceWithConnectInfo<Router, SocketAddr>,
        AddExtension<Router, ConnectInfo<SocketAddr>>,
    >,
    cancellation_token: CancellationToken,
    background_tasks: TaskTracker,
    store: Arc<GameweekStore>,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        let address = format!(
            "{}:{}",
            config.api_settings.domain, config.api_settings.port
        );
        let listener = SocketAddr::from_str(&address)?;
        let (app_state, background_tasks, cancellation_token) = build_app(config.clone()).await?;
        let store = app_state.store.clone();
        let server = build_server(listener, app_state, config.api_settings.origins).await?;
        Ok(Self {
            server,
            cancellation_token,
            background_tasks,
            store,
        })
    }

    pub async fn run_until_stopped(self) -> Result<(), anyhow::Error> {
        info!("Starting server...");
        match self.server.with_graceful_shutdown(shutdown_signal()).await {
            Ok(_) => {
                info!("Server shutdown initiated");
                self.cancellation_token.cancel();

                let timeout = tokio::time::sleep(Duration::from_secs(10));
                select! {
                    _ = self.background_tasks.wait() => {
                        info!("Background tasks completed gracefully");
                    }
                    _ = timeout => {
                        warn!("Background tasks timed out during shutdown");
                    }
                }
                self.store.close().await;

                info!("Shutdown complete");
                Ok(())
            }
            Err(e) => {
                error!("Server shutdown error: {}", e);
                self.cancellation_token.cancel();

                let _ =
                    tokio::time::timeout(Duration::from_secs(5), self.background_tasks.wait())
                        .await;
                self.store.close().await;

                Err(anyhow!("Error during server shutdown: {}", e))
            }
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<GameweekStore>,
    pub manager: Arc<GameweekManager>,
    pub background_threads: Arc<HashMap<String, JoinHandle<()>>>,
}

pub async fn build_app(
    config: Settings,
) -> Result<(AppState, TaskTracker, CancellationToken), anyhow::Error> {
    fs::create_dir_all(&config.db_settings.data_folder)
        .map_err(|e| anyhow!("Failed to create data folder: {}", e))?;

    let pool_config: DatabasePoolConfig = config.db_settings.clone().into();

    let gameweek_db = DBConnection::new(&config.db_settings.data_folder, "gameweeks", pool_config)
        .await
        .map_err(|e| anyhow!("Error setting up gameweek db: {}", e))?;

    let store = Arc::new(
        GameweekStore::new(gameweek_db)
            .with_max_banked_transfers(config.gameweek_settings.max_banked_transfers),
    );

    let manager = Arc::new(GameweekManager::new(
        store.clone(),
        config.gameweek_settings.notification_capacity,
    ));

    // serve a populated snapshot from the first request on
    let snapshot = manager.refresh(OffsetDateTime::now_utc()).await;
    info!(
        "Gameweek manager configured, current gameweek: {:?}",
        snapshot.current.as_ref().map(|gameweek| gameweek.number)
    );

    let tracker = TaskTracker::new();
    let mut threads = HashMap::new();
    let cancel_token = CancellationToken::new();
    let gameweek_watcher = GameweekWatcher::new(
        manager.clone(),
        cancel_token.clone(),
        Duration::from_secs(config.gameweek_settings.poll_interval_secs),
    );
    let gameweek_watcher_task = tracker.spawn(async move {
        match gameweek_watcher.watch().await {
            Ok(_) => {
                info!("Successfully shutdown gameweek watcher")
            }
            Err(e) => {
                error!("Error in gameweek watcher: {}", e)
            }
        }
    });

    tracker.close();
    threads.insert(String::from("gameweek_watcher"), gameweek_watcher_task);

    let app_state = AppState {
        store,
        manager,
        background_threads: Arc::new(threads),
    };
    Ok((app_state, tracker, cancel_token))
}

pub async fn build_server(
    socket_addr: SocketAddr,
    app_state: AppState,
    origins: Vec<String>,
) -> Result<
    Serve<
        TcpListener,
        IntoMakeServiceWithConnectInfo<Router, SocketAddr>,
        AddExtension<Router, ConnectInfo<SocketAddr>>,
    >,
    anyhow::Error,
> {
    let listener = TcpListener::bind(socket_addr).await?;

    info!("Setting up service");
    let app = app(app_state, origins);
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );
    info!(
        "Service running @: http://{}:{}",
        socket_addr.ip(),
        socket_addr.port()
    );
    Ok(server)
}

pub fn app(app_state: AppState, origins: Vec<String>) -> Router {
    let origins: Vec<HeaderValue> = origins
        .into_iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION])
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true);

    let gameweek_endpoints = Router::new()
        .route("/current", get(get_current_gameweek))
        .route("/next", get(get_next_gameweek))
        .route("/latest_finalized", get(get_latest_finalized_gameweek))
        .route("/display", get(get_display_gameweek))
        .route("/snapshot", get(get_snapshot))
        .route("/resolve", post(resolve_gameweeks))
        .route("/{gameweek}/stats", get(get_gameweek_stats))
        .route("/{gameweek}/finalize", post(finalize_gameweek))
        .route("/{gameweek}/matches", post(ingest_match))
        .route("/{gameweek}/scores", post(ingest_scores));

    Router::new()
        .route("/api/v1/health_check", get(health))
        .route("/api/v1/gameweeks", get(list_gameweeks).post(create_gameweek))
        .nest("/api/v1/gameweeks", gameweek_endpoints)
        .route("/api/v1/transfers/allowed", get(get_transfers_allowed))
        .route(
            "/api/v1/teams/{team_id}/gameweeks/{gameweek}/points",
            get(get_team_points),
        )
        .route("/api/v1/notifications", get(list_notifications))
        .route("/api/v1/notifications/{id}", delete(dismiss_notification))
        .layer(middleware::from_fn(log_request))
        .with_state(Arc::new(app_state))
        .layer(cors)
}

async fn log_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let now = OffsetDateTime::now_utc();
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or_default()
        .to_owned();
    info!(target: "http_request","new request, {} {}", request.method().as_str(), path);

    let response = next.run(request).await;
    let response_time = OffsetDateTime::now_utc() - now;
    info!(target: "http_response", "response, code: {}, time: {}", response.status().as_str(), response_time);

    response
}

async fn shutdown_signal() {
    let mut sigint = signal(SignalKind::interrupt()).expect("Failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

    select! {
        _ = sigint.recv() => info!("Received SIGINT signal"),
        _ = sigterm.recv() => info!("Received SIGTERM signal"),
    }
}
