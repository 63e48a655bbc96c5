use std::error::Error;

use diesel::Connection;
use diesel_async::{async_connection_wrapper::AsyncConnectionWrapper, AsyncPgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub async fn run_migrations(
    database_url: &str,
) -> std::result::Result<(), Box<dyn Error + Send + Sync>> {
    let database_url = database_url.to_string();

    tokio::task::spawn_blocking(move || {
        let mut connection =
            AsyncConnectionWrapper::<AsyncPgConnection>::establish(&database_url)?;
        connection.run_pending_migrations(MIGRATIONS)?;

        Ok(())
    })
    .await?
}
