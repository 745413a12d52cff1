use std::fmt;

/// Inbound events the stream can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamEvent {
    OrderUpdate,
    PositionUpdate,
    BalanceUpdate,
    PriceChange,
    NewTrade,
    DepthUpdate,
    Candlestick,
}

impl StreamEvent {
    pub const ALL: [Self; 7] = [
        Self::OrderUpdate,
        Self::PositionUpdate,
        Self::BalanceUpdate,
        Self::PriceChange,
        Self::NewTrade,
        Self::DepthUpdate,
        Self::Candlestick,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrderUpdate => "order-update",
            Self::PositionUpdate => "position-update",
            Self::BalanceUpdate => "balance-update",
            Self::PriceChange => "price-change",
            Self::NewTrade => "new-trade",
            Self::DepthUpdate => "depth-update",
            Self::Candlestick => "candlestick",
        }
    }

    /// Map a wire event name. Futures order and position updates arrive with
    /// a `df-` prefix; both spellings are accepted. Unknown names yield `None`.
    pub fn from_wire(name: &str) -> Option<Self> {
        let name = match name {
            "df-order-update" => "order-update",
            "df-position-update" => "position-update",
            other => other,
        };
        Self::ALL.into_iter().find(|event| event.as_str() == name)
    }
}

impl fmt::Display for StreamEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for event in StreamEvent::ALL {
            assert_eq!(StreamEvent::from_wire(event.as_str()), Some(event));
        }
    }

    #[test]
    fn test_futures_prefixed_names() {
        assert_eq!(
            StreamEvent::from_wire("df-order-update"),
            Some(StreamEvent::OrderUpdate)
        );
        assert_eq!(
            StreamEvent::from_wire("df-position-update"),
            Some(StreamEvent::PositionUpdate)
        );
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(StreamEvent::from_wire("funding-update"), None);
        assert_eq!(StreamEvent::from_wire(""), None);
    }
}
