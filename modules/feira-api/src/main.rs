use std::sync::Arc;
use std::time::Duration;

use ai_client::{Completion, OpenAi};
use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use feira_api::db::{LogActivitySink, LogRepository, PgLogStore, PgProductStore};
use feira_api::jwt::JwtService;
use feira_api::{build_router, AppState};
use feira_common::Config;
use feira_search::{FallbackParser, InterpreterGateway, SearchService};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("feira=info".parse()?);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    info!("Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations complete");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let model: Option<Arc<dyn Completion>> = config.openai_api_key.as_ref().map(|key| {
        let ai = OpenAi::new(key, &config.openai_model).with_http_client(http.clone());
        let ai = match &config.openai_base_url {
            Some(url) => ai.with_base_url(url),
            None => ai,
        };
        Arc::new(ai) as Arc<dyn Completion>
    });
    if !config.interpreter_enabled() {
        info!("OPENAI_API_KEY not set, every search uses the fallback parser");
    }

    let gateway = InterpreterGateway::new(model, config.categories.clone())
        .with_timeout(config.search_timeout);

    let logs: Arc<dyn LogRepository> = Arc::new(PgLogStore::new(pool.clone()));
    let search = SearchService::new(
        Arc::new(gateway),
        FallbackParser::new(config.categories.clone()),
        Arc::new(LogActivitySink::new(logs.clone())),
    );

    let state = AppState {
        search,
        products: Arc::new(PgProductStore::new(pool)),
        logs,
        jwt: JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()),
    };

    let app = build_router(state, &config.allowed_origins);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Feira API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
