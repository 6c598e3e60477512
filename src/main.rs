//! TicketDesk engine
//!
//! Main application entry point

use tracing::info;

use TicketDesk::{
    config::Settings,
    database::connection::{create_pool, run_migrations, DatabaseConfig},
    services::ServiceFactory,
    utils::logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard keeps file output flushing until exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", TicketDesk::info());

    // Initialize database connection
    info!("Connecting to database...");
    let db_config = DatabaseConfig {
        url: settings.database.url.clone(),
        max_connections: settings.database.max_connections,
        min_connections: settings.database.min_connections,
        ..DatabaseConfig::default()
    };
    let db_pool = create_pool(&db_config).await?;

    // Run database migrations
    run_migrations(&db_pool).await?;

    // Initialize services
    info!("Initializing services...");
    let services = ServiceFactory::new(db_pool, &settings)?;

    let health = services.health_check().await;
    for issue in health.get_issues() {
        tracing::warn!(issue = %issue, "Service degraded at startup");
    }

    // Background sweep for expired reservations
    let sweeper_handle = services.sweeper.spawn();
    info!(
        interval_minutes = settings.sweeper.interval_minutes,
        hold_minutes = settings.sweeper.hold_minutes,
        "Reservation sweeper started"
    );

    info!("TicketDesk engine is ready");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    sweeper_handle.abort();
    info!("TicketDesk engine has been shut down.");

    Ok(())
}
