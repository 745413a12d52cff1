use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A wire string that names no known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized {kind}: {value:?}")]
pub struct ParseVariantError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseVariantError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(ParseVariantError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseVariantError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for &'static str {
            fn from(value: $name) -> Self {
                value.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    OrderSide, "order side" {
        Buy => "buy",
        Sell => "sell",
    }
}

wire_enum! {
    OrderType, "order type" {
        Market => "market_order",
        Limit => "limit_order",
        StopLimit => "stop_limit",
        StopMarket => "stop_market",
        TakeProfitLimit => "take_profit_limit",
        TakeProfitMarket => "take_profit_market",
    }
}

wire_enum! {
    OrderStatus, "order status" {
        Open => "open",
        Filled => "filled",
        Cancelled => "cancelled",
        Untriggered => "untriggered",
        Initial => "initial",
    }
}

wire_enum! {
    /// Order lifetime policy.
    TimeInForce, "time in force" {
        GoodTillCancel => "good_till_cancel",
        ImmediateOrCancel => "immediate_or_cancel",
        FillOrKill => "fill_or_kill",
    }
}

wire_enum! {
    /// Whether collateral is ring-fenced per position or shared.
    MarginType, "margin type" {
        Isolated => "isolated",
        Cross => "cross",
    }
}

impl OrderType {
    /// Limit-style orders must carry a price.
    pub fn requires_price(self) -> bool {
        matches!(self, Self::Limit | Self::StopLimit | Self::TakeProfitLimit)
    }
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_values() {
        assert_eq!("buy".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!("market_order".parse::<OrderType>().unwrap(), OrderType::Market);
        assert_eq!(
            "good_till_cancel".parse::<TimeInForce>().unwrap(),
            TimeInForce::GoodTillCancel
        );
        assert_eq!("cross".parse::<MarginType>().unwrap(), MarginType::Cross);
        assert_eq!("untriggered".parse::<OrderStatus>().unwrap(), OrderStatus::Untriggered);
    }

    #[test]
    fn test_unknown_value_is_named_error() {
        let err = "BUY".parse::<OrderSide>().unwrap_err();
        assert_eq!(err.kind, "order side");
        assert_eq!(err.value, "BUY");
        assert_eq!(err.to_string(), r#"unrecognized order side: "BUY""#);
    }

    #[test]
    fn test_serde_uses_wire_strings() {
        let json = serde_json::to_string(&OrderType::TakeProfitMarket).unwrap();
        assert_eq!(json, r#""take_profit_market""#);

        let side: OrderSide = serde_json::from_str(r#""sell""#).unwrap();
        assert_eq!(side, OrderSide::Sell);

        let err = serde_json::from_str::<TimeInForce>(r#""day""#).unwrap_err();
        assert!(err.to_string().contains("unrecognized time in force"));
    }

    #[test]
    fn test_requires_price() {
        assert!(OrderType::Limit.requires_price());
        assert!(OrderType::StopLimit.requires_price());
        assert!(!OrderType::Market.requires_price());
        assert!(!OrderType::StopMarket.requires_price());
    }

    #[test]
    fn test_opposite_side() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }
}
