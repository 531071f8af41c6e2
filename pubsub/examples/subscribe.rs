use futures::StreamExt;
use ping_pubsub::PubsubSource;
use solana_commitment_config::CommitmentConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ping_pubsub=debug".parse()?),
        )
        .init();

    let ws_url = std::env::var("WS_ENDPOINT")
        .unwrap_or_else(|_| "wss://api.mainnet-beta.solana.com".to_string());
    let source = PubsubSource::new(ws_url, CommitmentConfig::confirmed());

    // slot updates and the blockhash window side by side
    let mut slots = source.subscribe_slot_updates().await?;
    let mut anchors = source.subscribe_recent_anchors().await?;

    tracing::info!("subscribed, waiting for updates...");

    let mut count = 0u64;
    loop {
        tokio::select! {
            Some(event) = slots.next() => {
                let event = event?;
                count += 1;
                tracing::info!("[{}] slot: {} type: {}", count, event.slot, event.kind.as_str());
            }
            Some(window) = anchors.next() => {
                let window = window?;
                tracing::info!(
                    "blockhash window at slot {}: {} entries, newest {}",
                    window.slot,
                    window.anchors.len(),
                    window.anchors[0]
                );
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}
