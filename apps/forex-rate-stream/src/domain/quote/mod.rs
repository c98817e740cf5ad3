//! Quote Snapshot
//!
//! A single bid/ask/mid snapshot for one currency pair as returned by the
//! quote service. Derived values are computed on read and never stored.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Immutable quote for one currency pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Base currency code.
    #[serde(rename = "from")]
    pub base: String,
    /// Quote currency code.
    #[serde(rename = "to")]
    pub quote: String,
    /// Bid price.
    pub bid: Decimal,
    /// Ask price.
    pub ask: Decimal,
    /// Mid price.
    pub price: Decimal,
    /// Source timestamp (ISO-8601).
    #[serde(rename = "time_stamp")]
    pub timestamp: String,
}

impl Quote {
    /// Create a new quote.
    #[must_use]
    pub fn new(
        base: impl Into<String>,
        quote: impl Into<String>,
        bid: Decimal,
        ask: Decimal,
        price: Decimal,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
            bid,
            ask,
            price,
            timestamp: timestamp.into(),
        }
    }

    /// Pair identifier in `BASE/QUOTE` form.
    #[must_use]
    pub fn pair(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }

    /// Ask minus bid.
    #[must_use]
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }

    /// Spread as a percentage of the mid price.
    ///
    /// Returns `None` when the mid price is zero.
    #[must_use]
    pub fn spread_percentage(&self) -> Option<Decimal> {
        self.spread()
            .checked_div(self.price)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
    }

    /// Source timestamp parsed as RFC 3339, if well-formed.
    #[must_use]
    pub fn source_time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}
