use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use memosync::args::Args;
use memosync::backend::Backend;
use memosync::memosync::MemoSync;
use memosync::routes::routes;

#[tokio::main]
async fn main() {
    // a missing .env is fine, the environment may carry everything
    let _ = dotenv::dotenv();
    pretty_env_logger::init();

    let config = match Args::parse().config() {
        Ok(config) => config,
        Err(e) => {
            error!("invalid listen address: {e}");
            std::process::exit(2);
        }
    };

    let backend = Backend::new(&config.database).await;
    let sync = Arc::new(MemoSync::new(backend, &config));

    info!("listening on {}", config.addr);
    warp::serve(routes(sync)).run(config.addr).await;
}
