use std::sync::Arc;

use iracing_auth::{AuthenticatedClient, Config, TokenManager};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt().try_init();

    // IRACING_CLIENT_SECRET, IRACING_USERNAME and IRACING_PASSWORD must be set
    let cfg = Config::from_env();
    let manager = Arc::new(TokenManager::new(cfg)?);
    let client = AuthenticatedClient::new(manager.clone(), reqwest::Client::new());

    let resp = client
        .get("https://members-ng.iracing.com/data/member/info")
        .await?;
    println!("member/info -> {}", resp.status());

    let snapshot = manager.snapshot().await;
    println!("access token expires at {:?}", snapshot.access_expires_at);
    Ok(())
}
