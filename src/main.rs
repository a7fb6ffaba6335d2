use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use journal_backend::{
    AppState,
    cache::CachedGroupStore,
    config::Config,
    create_router,
    database::{GroupStore, MemoryGroupStore, PgGroupStore},
    middleware::RateLimiter,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!("Serving {} stages per group", config.stage_count);

    if config.teacher_password.is_none() {
        tracing::warn!("TEACHER_PASSWORD is not set, teacher login is disabled");
    }

    // 设置 Redis 客户端（可选）
    let redis = config.redis_url.as_ref().map(|url| {
        Arc::new(redis::Client::open(url.as_str()).expect("Failed to create Redis client"))
    });

    // 选择存储后端
    let store: Arc<dyn GroupStore> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .expect("Failed to connect to Postgres");
            let pg = PgGroupStore::new(pool, config.stage_count);
            pg.init_schema().await.expect("Failed to prepare schema");
            tracing::info!("Using Postgres group store");

            match &redis {
                Some(client) => Arc::new(CachedGroupStore::new(
                    pg,
                    client.clone(),
                    config.group_cache_ttl_secs,
                )),
                None => Arc::new(pg),
            }
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, using in-memory group store");
            Arc::new(MemoryGroupStore::new(config.stage_count))
        }
    };

    // 设置限流器
    let rate_limiter = redis
        .as_ref()
        .map(|client| Arc::new(RateLimiter::new(client.clone(), &config)));
    if rate_limiter.is_none() {
        tracing::info!("REDIS_URL is not set, rate limiting disabled");
    }

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );

    let state = AppState::new(store, config);

    // 浏览器端部署在其他域名下
    let app = create_router(state, rate_limiter).layer(CorsLayer::permissive());

    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
