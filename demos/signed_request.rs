//! Signed and public REST calls.
//!
//! Reads `COINDCX_API_KEY` / `COINDCX_API_SECRET` from the environment or a
//! `.env` file.

use coindcx_futures::core::kernel::RestClient;
use coindcx_futures::{build_public_rest_client, build_rest_client, ExchangeConfig};
use serde_json::{json, Map};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = ExchangeConfig::from_env_file("COINDCX")?;
    let rest = build_rest_client(&config)?;

    let mut body = Map::new();
    body.insert("page".to_string(), json!("1"));
    body.insert("size".to_string(), json!("10"));
    body.insert("margin_currency_short_name".to_string(), json!(["USDT"]));

    match rest
        .post("/exchange/v1/derivatives/futures/positions", Some(body))
        .await
    {
        Ok(positions) => info!(%positions, "open positions"),
        Err(e) => error!(error = %e, status = ?e.status(), "positions request failed"),
    }

    let public = build_public_rest_client(None)?;
    let book = public
        .get("/market_data/v3/orderbook/B-BTC_USDT-futures/10", &[])
        .await?;
    info!(bids = %book["bids"], "order book");

    Ok(())
}
