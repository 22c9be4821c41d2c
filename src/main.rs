use estateguard_lib::api::start_proxy_server;
use estateguard_lib::config::{self, ProxyConfig};

#[tokio::main]
async fn main() {
    estateguard_lib::init_tracing();
    tracing::info!("{} proxy starting v{}", config::APP_NAME, config::APP_VERSION);

    let proxy_config = ProxyConfig::from_env();
    let server = match start_proxy_server(&proxy_config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };
    tracing::info!(addr = %server.session.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {e}");
    }
    server.stop().await;
}
