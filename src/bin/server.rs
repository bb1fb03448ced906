use log::{error, info, warn};
use warp::Filter;

use chartroom::config::ServerConfig;
use chartroom::core::RoomRegistry;
use chartroom::handlers::chart_routes;

#[tokio::main]
async fn main() {
    // Initialize env
    match dotenvy::dotenv() {
        Ok(_) => info!("Environment variables loaded from .env file"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    // Initialize logging
    env_logger::init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, room_queue={}",
        config.host, config.port, config.room_queue_capacity
    );

    // Validated above, so this only fails on a broken environment
    let addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    let registry = RoomRegistry::new(config.room_queue_capacity);
    let routes = chart_routes(registry).with(warp::log("chartroom"));

    info!("Starting chartroom server on {}", addr);
    warp::serve(routes).run(addr).await;
}
