//! Realtime stream: authenticated updates plus public trades and depth.
//!
//! Runs until Ctrl-C. Reads `COINDCX_API_KEY` / `COINDCX_API_SECRET` from the
//! environment or a `.env` file.

use coindcx_futures::{build_stream, Channel, ConnectionState, ExchangeConfig, StreamEvent};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = ExchangeConfig::from_env_file("COINDCX")?;
    let stream = build_stream(&config)?;

    stream
        .register(StreamEvent::OrderUpdate, |payload| {
            info!(%payload, "order update");
            Ok(())
        })
        .await?;
    stream
        .register(StreamEvent::PositionUpdate, |payload| {
            info!(%payload, "position update");
            Ok(())
        })
        .await?;
    stream
        .register(StreamEvent::NewTrade, |payload| {
            info!(%payload, "trade");
            Ok(())
        })
        .await?;
    stream
        .register(StreamEvent::DepthUpdate, |payload| {
            info!(%payload, "depth");
            Ok(())
        })
        .await?;

    stream.connect().await?;
    stream.wait_for(ConnectionState::Connected).await?;

    stream.subscribe(Channel::trades("B-BTC_USDT")).await?;
    stream
        .subscribe(Channel::orderbook("B-BTC_USDT", 20)?)
        .await?;

    let mut states = stream.state_changes();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow();
                info!(%state, "connection state");
            }
        }
    }

    stream.disconnect().await?;
    Ok(())
}
