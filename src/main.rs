use std::error::Error;
use std::sync::Arc;

use donors::config::Settings;
use donors::db::PgDb;
use donors::environment::{Config, Environment};
use donors::routes;
use log::{info, initialize_logger, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let settings = Settings::from_env().expect("read settings from environment");

    info!(logger, "Starting..."; "port" => settings.port, "api_path" => &settings.api_path, "frontend_dir" => %settings.frontend_dir.display());
    let logger = Arc::new(logger);

    info!(logger, "Creating database pool..."; "pool_size" => settings.database.pool_size);
    let db = PgDb::connect_lazy(&settings.database).expect("create database pool");

    match db.check_connection().await {
        Ok(()) => info!(logger, "Connected to database"),
        Err(e) => {
            warn!(logger, "Could not connect to database"; "error" => ?e);
            warn!(
                logger,
                "Make sure PostgreSQL is running and the `donors` table exists: \
                 set BACKEND_DB_HOST, BACKEND_DB_PORT, BACKEND_DB_USER, BACKEND_DB_PASSWORD \
                 and BACKEND_DB_NAME (or BACKEND_DB_CONNECTION_STRING), then run `initdb`"
            );
        }
    }

    let environment = Environment::new(
        logger.clone(),
        Arc::new(db),
        Config::new(settings.api_path.clone()),
    );

    let routes = routes::make_routes(environment, settings.frontend_dir.clone());

    let shutdown = {
        let logger = logger.clone();

        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(logger, "Failed to listen for Ctrl-C"; "error" => %e);
                futures::future::pending::<()>().await;
            }

            info!(logger, "Shutting down...");
        }
    };

    let (address, server) =
        warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], settings.port), shutdown);

    info!(logger, "Listening"; "address" => %address);
    server.await;

    info!(logger, "Exiting gracefully...");

    Ok(())
}
