use crate::core::errors::ExchangeError;
use std::fmt;

/// Name of the private channel carrying order, position and balance updates.
pub const AUTHENTICATED_CHANNEL: &str = "coindcx";

/// Order book depths the stream accepts.
pub const ORDERBOOK_DEPTHS: [u32; 3] = [10, 20, 50];

/// Opaque key of a realtime topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(String);

impl Channel {
    /// Wrap an arbitrary channel name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The private `coindcx` channel; its join must be signed.
    pub fn authenticated() -> Self {
        Self(AUTHENTICATED_CHANNEL.to_string())
    }

    /// `{pair}@trades-futures`
    pub fn trades(pair: &str) -> Self {
        Self(format!("{}@trades-futures", pair))
    }

    /// `{pair}@prices-futures`
    pub fn prices(pair: &str) -> Self {
        Self(format!("{}@prices-futures", pair))
    }

    /// `{pair}@orderbook@{depth}-futures`; depth must be 10, 20 or 50.
    pub fn orderbook(pair: &str, depth: u32) -> Result<Self, ExchangeError> {
        if !ORDERBOOK_DEPTHS.contains(&depth) {
            return Err(ExchangeError::InvalidParameters(format!(
                "unsupported orderbook depth {} (expected one of {:?})",
                depth, ORDERBOOK_DEPTHS
            )));
        }
        Ok(Self(format!("{}@orderbook@{}-futures", pair, depth)))
    }

    /// `{pair}_{interval}-futures`, e.g. interval `1m`, `1h`, `1d`.
    pub fn candlesticks(pair: &str, interval: &str) -> Self {
        Self(format!("{}_{}-futures", pair, interval))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_authenticated(&self) -> bool {
        self.0 == AUTHENTICATED_CHANNEL
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Channel {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Channel {
    fn from(name: String) -> Self {
        Self(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        assert_eq!(Channel::trades("B-BTC_USDT").as_str(), "B-BTC_USDT@trades-futures");
        assert_eq!(Channel::prices("B-ETH_USDT").as_str(), "B-ETH_USDT@prices-futures");
        assert_eq!(
            Channel::orderbook("B-BTC_USDT", 50).unwrap().as_str(),
            "B-BTC_USDT@orderbook@50-futures"
        );
        assert_eq!(
            Channel::candlesticks("B-BTC_USDT", "1m").as_str(),
            "B-BTC_USDT_1m-futures"
        );
    }

    #[test]
    fn test_orderbook_depth_validated() {
        assert!(Channel::orderbook("B-BTC_USDT", 10).is_ok());
        assert!(matches!(
            Channel::orderbook("B-BTC_USDT", 25),
            Err(ExchangeError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_authenticated_channel() {
        assert!(Channel::authenticated().is_authenticated());
        assert!(Channel::from("coindcx").is_authenticated());
        assert!(!Channel::trades("coindcx").is_authenticated());
    }
}
