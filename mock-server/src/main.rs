use mock_server::Layout;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let layout = match std::env::var("MOCK_LAYOUT") {
        Ok(name) => Layout::from_name(&name).unwrap_or_else(|| {
            tracing::warn!(%name, "unknown MOCK_LAYOUT, using wrapped");
            Layout::Wrapped
        }),
        Err(_) => Layout::Wrapped,
    };
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, ?layout, "listening");
    mock_server::run_with(listener, layout).await
}
