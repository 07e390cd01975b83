//! Server initialization and routing

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::api;
use crate::config::Config;
use crate::crypto::{EncryptionKey, FieldCipher};
use crate::domain::Role;
use crate::error::Result;
use crate::jwt::JwtManager;
use crate::middleware::{authenticate, rate_limit, require_role, AuthState, RateLimiter, RoleGate};
use crate::repository::{
    InMemoryMembershipRepository, InMemoryRecordRepository, InMemoryRefreshTokenRepository,
    InMemoryUserRepository, MembershipRepository, RecordRepository, UserRepository,
};
use crate::revocation::{InMemoryRevocationRegistry, RevocationRegistry};
use crate::service::{AuthService, LockoutTracker, RecordService};

/// Application state shared across handlers
///
/// The user, membership, record, and revocation stores sit behind trait
/// objects so an external shared store can replace the in-memory
/// implementations without touching handlers or middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub jwt: Arc<JwtManager>,
    pub cipher: FieldCipher,
    pub auth_service: Arc<AuthService>,
    pub record_service: Arc<RecordService>,
    pub revocations: Arc<dyn RevocationRegistry>,
    pub memberships: Arc<dyn MembershipRepository>,
}

impl AppState {
    /// Wire services and middleware collaborators over the given stores
    pub fn new(
        config: Config,
        users: Arc<dyn UserRepository>,
        memberships: Arc<dyn MembershipRepository>,
        records: Arc<dyn RecordRepository>,
    ) -> Result<Self> {
        let key = EncryptionKey::from_base64(&config.crypto.key_base64)?;
        let cipher = FieldCipher::new(key, config.crypto.decrypt_fallback);

        let jwt = Arc::new(JwtManager::new(config.jwt.clone()));
        let revocations: Arc<dyn RevocationRegistry> = Arc::new(InMemoryRevocationRegistry::new());
        let refresh_tokens = Arc::new(InMemoryRefreshTokenRepository::new());
        let lockout = Arc::new(LockoutTracker::new(config.lockout.clone()));

        let auth_service = Arc::new(AuthService::new(
            users,
            Arc::clone(&memberships),
            refresh_tokens,
            Arc::clone(&revocations),
            Arc::clone(&jwt),
            lockout,
        ));
        let record_service = Arc::new(RecordService::new(records));

        Ok(Self {
            config: Arc::new(config),
            jwt,
            cipher,
            auth_service,
            record_service,
            revocations,
            memberships,
        })
    }

    /// Default wiring: empty in-memory stores behind every trait seam
    pub fn with_in_memory_stores(config: Config) -> Result<Self> {
        let cipher_key = EncryptionKey::from_base64(&config.crypto.key_base64)?;
        let record_cipher = FieldCipher::new(cipher_key, config.crypto.decrypt_fallback);
        Self::new(
            config,
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryMembershipRepository::new()),
            Arc::new(InMemoryRecordRepository::new(record_cipher)),
        )
    }
}

/// Build the HTTP router
///
/// Every request traverses, outside-in: CORS, trace, the Rate Governor,
/// the authentication pipeline, then the per-route role gate.
pub fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let limiter = RateLimiter::new(state.config.rate_limit.clone());
    let auth_state = AuthState::new(
        Arc::clone(&state.jwt),
        Arc::clone(&state.revocations),
        Arc::clone(&state.memberships),
    );

    let clinical_gate = RoleGate::allow(&[Role::Admin, Role::Doctor, Role::Nurse, Role::Staff]);

    // Record endpoints: clinical roles only
    let records = Router::new()
        .route(
            "/api/v1/records",
            get(api::record::list).post(api::record::create),
        )
        .route(
            "/api/v1/records/{id}",
            get(api::record::get).put(api::record::update),
        )
        .route_layer(from_fn_with_state(clinical_gate, require_role));

    // Session and decrypt endpoints: any authenticated caller
    let authenticated = Router::new()
        .route("/api/v1/auth/logout", post(api::auth::logout))
        .route("/api/v1/auth/me", get(api::auth::me))
        .route("/api/v1/crypto/decrypt", post(api::crypto::decrypt))
        .route_layer(from_fn_with_state(
            RoleGate::any_authenticated(),
            require_role,
        ));

    // Encrypt endpoint: platform operators only
    let admin = Router::new()
        .route("/api/v1/crypto/encrypt", post(api::crypto::encrypt))
        .route_layer(from_fn_with_state(RoleGate::allow(&[Role::Admin]), require_role));

    let mut public = Router::new()
        .route("/health", get(api::health::health))
        .route("/api/v1/auth/login", post(api::auth::login))
        .route("/api/v1/auth/refresh", post(api::auth::refresh));

    if let Some(handle) = metrics_handle {
        public = public.route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
    }

    public
        .merge(authenticated)
        .merge(records)
        .merge(admin)
        .layer(from_fn_with_state(auth_state, authenticate))
        .layer(from_fn_with_state(limiter, rate_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP server until shutdown
pub async fn run(config: Config, metrics_handle: Option<PrometheusHandle>) -> anyhow::Result<()> {
    let addr = config.http_addr();
    let state = AppState::with_in_memory_stores(config)?;
    let router = build_router(state, metrics_handle);

    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    // Connect-info keeps the Rate Governor keyed when no proxy header is set
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
