//! Currencies and Tradable Instruments
//!
//! The closed set of currencies and currency pairs the watchlist can track.
//!
//! # Design
//!
//! Both sets are closed enums so that base/quote decomposition is a total
//! function. The declaration order of [`Instrument`] is the canonical
//! enumeration order used everywhere a list of instruments is presented.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// Currency
// =============================================================================

/// ISO 4217 currency supported by the quote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// US Dollar.
    Usd,
    /// Japanese Yen.
    Jpy,
    /// Euro.
    Eur,
    /// British Pound.
    Gbp,
    /// Australian Dollar.
    Aud,
    /// Canadian Dollar.
    Cad,
    /// Swiss Franc.
    Chf,
    /// Chinese Yuan.
    Cny,
}

impl Currency {
    /// Get all currencies.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Usd,
            Self::Jpy,
            Self::Eur,
            Self::Gbp,
            Self::Aud,
            Self::Cad,
            Self::Chf,
            Self::Cny,
        ]
    }

    /// Three-letter currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Jpy => "JPY",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Aud => "AUD",
            Self::Cad => "CAD",
            Self::Chf => "CHF",
            Self::Cny => "CNY",
        }
    }

    /// Human-readable currency name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Usd => "US Dollar",
            Self::Jpy => "Japanese Yen",
            Self::Eur => "Euro",
            Self::Gbp => "British Pound",
            Self::Aud => "Australian Dollar",
            Self::Cad => "Canadian Dollar",
            Self::Chf => "Swiss Franc",
            Self::Cny => "Chinese Yuan",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = UnknownInstrument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.code() == s)
            .ok_or_else(|| UnknownInstrument(s.to_string()))
    }
}

// =============================================================================
// Instrument
// =============================================================================

/// A currency pair the watchlist can track.
///
/// Serialized as its `BASE/QUOTE` identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Instrument {
    /// US Dollar / Japanese Yen.
    UsdJpy,
    /// Euro / US Dollar.
    EurUsd,
    /// British Pound / US Dollar.
    GbpUsd,
    /// Australian Dollar / US Dollar.
    AudUsd,
    /// US Dollar / Canadian Dollar.
    UsdCad,
    /// US Dollar / Swiss Franc.
    UsdChf,
    /// US Dollar / Chinese Yuan.
    UsdCny,
    /// Euro / Japanese Yen.
    EurJpy,
    /// British Pound / Japanese Yen.
    GbpJpy,
}

impl Instrument {
    /// Get all instruments in enumeration order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::UsdJpy,
            Self::EurUsd,
            Self::GbpUsd,
            Self::AudUsd,
            Self::UsdCad,
            Self::UsdChf,
            Self::UsdCny,
            Self::EurJpy,
            Self::GbpJpy,
        ]
    }

    /// Identifier in `BASE/QUOTE` form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UsdJpy => "USD/JPY",
            Self::EurUsd => "EUR/USD",
            Self::GbpUsd => "GBP/USD",
            Self::AudUsd => "AUD/USD",
            Self::UsdCad => "USD/CAD",
            Self::UsdChf => "USD/CHF",
            Self::UsdCny => "USD/CNY",
            Self::EurJpy => "EUR/JPY",
            Self::GbpJpy => "GBP/JPY",
        }
    }

    /// Base currency (left side of the pair).
    #[must_use]
    pub const fn base(self) -> Currency {
        match self {
            Self::UsdJpy | Self::UsdCad | Self::UsdChf | Self::UsdCny => Currency::Usd,
            Self::EurUsd | Self::EurJpy => Currency::Eur,
            Self::GbpUsd | Self::GbpJpy => Currency::Gbp,
            Self::AudUsd => Currency::Aud,
        }
    }

    /// Quote currency (right side of the pair).
    #[must_use]
    pub const fn quote(self) -> Currency {
        match self {
            Self::UsdJpy | Self::EurJpy | Self::GbpJpy => Currency::Jpy,
            Self::EurUsd | Self::GbpUsd | Self::AudUsd => Currency::Usd,
            Self::UsdCad => Currency::Cad,
            Self::UsdChf => Currency::Chf,
            Self::UsdCny => Currency::Cny,
        }
    }

    /// Symbol sent to the quote service (`USDJPY`).
    #[must_use]
    pub fn api_symbol(self) -> String {
        format!("{}{}", self.base().code(), self.quote().code())
    }

    /// Instruments in enumeration order that are not in `excluding`.
    #[must_use]
    pub fn available<'a, I>(excluding: I) -> Vec<Self>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let excluded: Vec<Self> = excluding.into_iter().copied().collect();
        Self::all()
            .iter()
            .copied()
            .filter(|i| !excluded.contains(i))
            .collect()
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Instrument {
    type Err = UnknownInstrument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|i| i.as_str() == trimmed)
            .ok_or_else(|| UnknownInstrument(s.to_string()))
    }
}

impl Serialize for Instrument {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Instrument {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier outside the supported currency or pair set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported instrument: {0}")]
pub struct UnknownInstrument(pub String);

// =============================================================================
// Tests
// =============================================================================
