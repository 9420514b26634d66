use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    // SEED may point at a JSON file keyed by resource name.
    let store = match std::env::var("SEED") {
        Ok(path) => {
            let raw = tokio::fs::read_to_string(&path).await?;
            let seed: serde_json::Value = serde_json::from_str(&raw)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            mock_server::Store::from_seed(&seed)
        }
        Err(_) => mock_server::Store::new(),
    };
    mock_server::run_with(listener, store).await
}
