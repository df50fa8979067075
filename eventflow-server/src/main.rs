use std::{env, sync::Arc, time::Duration};

use log::{info, warn};
use tokio::time::timeout;

use eventflow_server::{logging, run_server, BoxedStorage, MemoryStore, PgStore};

/// How long the database gets to answer before the server gives up on it
const DATABASE_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    logging::init_logger();

    let storage = select_storage().await;

    run_server(storage).await;
}

/// Connects to PostgreSQL when a database is configured and reachable,
/// falling back to the in-memory store otherwise. The fallback keeps the
/// server usable in development without any infrastructure.
async fn select_storage() -> BoxedStorage {
    let Ok(url) = env::var("EVENTFLOW_DATABASE_URL") else {
        info!("No database configured, using the in-memory store.");
        return Arc::new(MemoryStore::new());
    };

    match timeout(DATABASE_PROBE_TIMEOUT, PgStore::connect(&url)).await {
        Ok(Ok(store)) => {
            info!("Connected to PostgreSQL.");
            Arc::new(store)
        }
        Ok(Err(e)) => {
            warn!("Could not connect to PostgreSQL: {}", e);
            warn!("Falling back to the in-memory store. Data will not survive a restart.");
            Arc::new(MemoryStore::new())
        }
        Err(_) => {
            warn!("The database did not answer within {:?}.", DATABASE_PROBE_TIMEOUT);
            warn!("Falling back to the in-memory store. Data will not survive a restart.");
            Arc::new(MemoryStore::new())
        }
    }
}
