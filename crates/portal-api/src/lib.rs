pub mod cookie;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post, put},
    Json, Router,
};
use portal_auth::Authenticator;
use sea_orm::DatabaseConnection;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use utoipa::OpenApi;

pub use cookie::CookieConfig;

/// Application state shared across handlers
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub db: DatabaseConnection,
    pub cookie: CookieConfig,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Patient Portal API",
        version = "0.1.0",
        description = "Session authentication for the patient portal"
    ),
    paths(
        handlers::login,
        handlers::logout,
        handlers::get_current_user,
        handlers::register_patient,
        handlers::change_password,
        handlers::change_email,
        handlers::portal_session,
        handlers::health_check,
    ),
    components(
        schemas(
            models::ErrorResponse,
            models::MessageResponse,
            models::LoginRequest,
            models::LoginResponse,
            models::UserSummary,
            models::RegisterRequest,
            models::CurrentUser,
            models::ChangePasswordRequest,
            models::ChangeEmailRequest,
            models::HealthResponse,
        )
    ),
    tags(
        (name = "auth", description = "Login, logout and credential changes"),
        (name = "patients", description = "Patient signup"),
        (name = "portal", description = "Session-protected portal pages"),
        (name = "system", description = "System health and info endpoints")
    )
)]
struct ApiDoc;

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Enable CORS (for development)
    pub enable_cors: bool,
    /// Allowed CORS origins (if None, allows localhost origins)
    pub cors_origins: Option<Vec<String>>,
    /// Session cookie settings
    pub cookie: CookieConfig,
}

impl ApiServerConfig {
    /// Check operator-supplied settings before serving
    ///
    /// Session cookies need credentialed CORS, which cannot be combined with
    /// a wildcard origin.
    pub fn validate(&self) -> anyhow::Result<()> {
        for origin in self.cors_origins.iter().flatten() {
            if origin.trim() == "*" {
                anyhow::bail!(
                    "CORS origin '*' cannot be used with cookie sessions; list explicit origins"
                );
            }
            if HeaderValue::from_str(origin).is_err() {
                anyhow::bail!("Invalid CORS origin: {:?}", origin);
            }
        }

        Ok(())
    }
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            enable_cors: true,
            cors_origins: None,
            cookie: CookieConfig::default(),
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
    session: Arc<middleware::SessionState>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(
        config: ApiServerConfig,
        authenticator: Arc<Authenticator>,
        db: DatabaseConnection,
    ) -> Self {
        let session = Arc::new(middleware::SessionState::new(
            authenticator.clone(),
            config.cookie.name.clone(),
        ));
        let state = Arc::new(AppState {
            authenticator,
            db,
            cookie: config.cookie.clone(),
        });

        Self {
            config,
            state,
            session,
        }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        // PUBLIC routes (no session required)
        let public_router = Router::new()
            .route("/api/health", get(handlers::health_check))
            .route("/api/openapi.json", get(openapi_json))
            .route("/api/auth/login", post(handlers::login))
            .route("/api/auth/logout", post(handlers::logout))
            .route("/api/patients", post(handlers::register_patient))
            .with_state(self.state.clone());

        // PROTECTED API routes (401 without a valid session)
        let protected_router = Router::new()
            .route("/api/auth/me", get(handlers::get_current_user))
            .route("/api/auth/password", put(handlers::change_password))
            .route("/api/auth/email", put(handlers::change_email))
            .with_state(self.state.clone())
            .layer(axum_middleware::from_fn_with_state(
                self.session.clone(),
                middleware::require_auth,
            ));

        // PAGE routes (redirect to the login page without a valid session)
        let page_router = Router::new()
            .route("/portal/session", get(handlers::portal_session))
            .layer(axum_middleware::from_fn_with_state(
                self.session.clone(),
                middleware::redirect_unauthenticated,
            ));

        let mut router = public_router
            .merge(protected_router)
            .merge(page_router)
            .layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            router = router.layer(self.cors_layer());
        }

        router
    }

    fn cors_layer(&self) -> CorsLayer {
        // Cookie-based auth needs credentials, which rules out a wildcard origin
        let allow_origin = match &self.config.cors_origins {
            Some(origins) => AllowOrigin::list(
                origins
                    .iter()
                    .filter(|origin| origin.trim() != "*")
                    .filter_map(|origin| HeaderValue::from_str(origin).ok()),
            ),
            None => AllowOrigin::predicate(|origin: &HeaderValue, _| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str.starts_with("http://localhost:")
                    || origin_str.starts_with("http://127.0.0.1:")
            }),
        };

        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PUT])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true)
            .allow_origin(allow_origin)
    }

    /// Start the API server and run until Ctrl+C
    pub async fn start(self) -> Result<(), anyhow::Error> {
        self.config.validate()?;
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/api/openapi.json",
            self.config.bind_addr
        );

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        info!("API server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Error listening for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
