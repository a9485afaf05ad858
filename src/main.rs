//! Collaboration server - binary entry point
//!
//! Speaks JSON-RPC over stdio. Logs go to stderr.

use std::sync::Arc;

use collab_engine::methods::register_all_methods;
use collab_engine::utils::init_tracing;
use collab_engine::{spawn_reaper, CollabResult, CollabServer, EngineConfig, SessionRegistry};
use tracing::info;

#[tokio::main]
async fn main() -> CollabResult<()> {
    init_tracing();

    let config = EngineConfig::from_env();
    info!(?config, "Starting collaboration server");

    let registry = Arc::new(SessionRegistry::new(config));
    let reaper = spawn_reaper(Arc::clone(&registry));

    let mut server = CollabServer::new();
    register_all_methods(&mut server, Arc::clone(&registry));

    let result = tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    };

    reaper.abort();
    info!(
        sessions = registry.session_count(),
        recordings = registry.recordings().len(),
        "Server stopped"
    );
    result
}
