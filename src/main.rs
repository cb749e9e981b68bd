use clap::Parser;
use constellation::config::Config;
use constellation::server::ConstellationServer;

#[tokio::main]
async fn main() {
    let config = Config::parse();
    config.init_tracing();

    let server = ConstellationServer::new(&config)
        .await
        .expect("failed to build server");

    tracing::info!(addr = %server.addr, "listening");

    server
        .serve_with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}
