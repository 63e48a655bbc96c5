use std::sync::Arc;

use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager},
    AsyncPgConnection,
};
use pinboard::{
    api_router, config::Config, migrations, s3::helpers::setup_storage, AppState, InnerAppState,
    COOKIES_SECRET,
};
use tower_cookies::Key;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pinboard=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env().expect("configuration");

    COOKIES_SECRET
        .set(Key::from(config.cookie_secret.as_bytes()))
        .ok()
        .expect("cookies secret key");

    migrations::run_migrations(&config.database_url)
        .await
        .expect("database migrations");

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
    let pool = Pool::builder(manager).build().expect("connection pool");

    let storage = setup_storage().expect("object storage");

    let state = AppState {
        inner: Arc::new(InnerAppState { pool, storage }),
    };

    let app = api_router(state);

    tracing::info!("listening on {}", config.address);

    axum::Server::bind(&config.address)
        .serve(app.into_make_service())
        .await
        .expect("server");
}
