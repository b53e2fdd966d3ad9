#![allow(dead_code)]
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TradingPair {
    BTCUSDT,
    ETHUSDT,
    SOLUSDT,
    ADAUSDT,
    XRPUSDT,
    LTCUSDT,
    DOGEUSDT,
    BNBUSDT,
}

impl TradingPair {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradingPair::BTCUSDT => "BTCUSDT",
            TradingPair::ETHUSDT => "ETHUSDT",
            TradingPair::SOLUSDT => "SOLUSDT",
            TradingPair::ADAUSDT => "ADAUSDT",
            TradingPair::XRPUSDT => "XRPUSDT",
            TradingPair::LTCUSDT => "LTCUSDT",
            TradingPair::DOGEUSDT => "DOGEUSDT",
            TradingPair::BNBUSDT => "BNBUSDT",
        }
    }

    pub fn base_asset(&self) -> &'static str {
        match self {
            TradingPair::BTCUSDT => "BTC",
            TradingPair::ETHUSDT => "ETH",
            TradingPair::SOLUSDT => "SOL",
            TradingPair::ADAUSDT => "ADA",
            TradingPair::XRPUSDT => "XRP",
            TradingPair::LTCUSDT => "LTC",
            TradingPair::DOGEUSDT => "DOGE",
            TradingPair::BNBUSDT => "BNB",
        }
    }

    pub fn quote_asset(&self) -> &'static str {
        "USDT"
    }

    pub fn max_position_pct(&self) -> Decimal {
        match self {
            TradingPair::BTCUSDT => Decimal::new(40, 2), // 40%
            TradingPair::ETHUSDT => Decimal::new(30, 2), // 30%
            TradingPair::SOLUSDT => Decimal::new(25, 2), // 25%
            TradingPair::BNBUSDT => Decimal::new(20, 2), // 20%
            TradingPair::ADAUSDT => Decimal::new(15, 2), // 15%
            TradingPair::XRPUSDT => Decimal::new(15, 2), // 15%
            TradingPair::LTCUSDT => Decimal::new(15, 2), // 15%
            TradingPair::DOGEUSDT => Decimal::new(10, 2), // 10%
        }
    }

    /// The full eight-symbol USDT perpetual universe this core trades.
    pub fn universe() -> Vec<TradingPair> {
        vec![
            TradingPair::BTCUSDT,
            TradingPair::ETHUSDT,
            TradingPair::SOLUSDT,
            TradingPair::ADAUSDT,
            TradingPair::XRPUSDT,
            TradingPair::LTCUSDT,
            TradingPair::DOGEUSDT,
            TradingPair::BNBUSDT,
        ]
    }

    pub fn all() -> Vec<TradingPair> {
        Self::universe()
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BTCUSDT" => Some(TradingPair::BTCUSDT),
            "ETHUSDT" => Some(TradingPair::ETHUSDT),
            "SOLUSDT" => Some(TradingPair::SOLUSDT),
            "BNBUSDT" => Some(TradingPair::BNBUSDT),
            "ADAUSDT" => Some(TradingPair::ADAUSDT),
            "XRPUSDT" => Some(TradingPair::XRPUSDT),
            "LTCUSDT" => Some(TradingPair::LTCUSDT),
            "DOGEUSDT" => Some(TradingPair::DOGEUSDT),
            _ => None,
        }
    }

    pub fn correlation_group(&self) -> &'static str {
        match self {
            TradingPair::BTCUSDT => "btc",
            TradingPair::ETHUSDT | TradingPair::SOLUSDT => "alt_major",
            _ => "alt_minor",
        }
    }

    /// Sector bucket used by portfolio concentration checks.
    pub fn sector(&self) -> &'static str {
        match self {
            TradingPair::BTCUSDT | TradingPair::ETHUSDT | TradingPair::BNBUSDT => {
                "crypto_large_cap"
            }
            TradingPair::SOLUSDT | TradingPair::ADAUSDT => "crypto_alt_l1",
            TradingPair::XRPUSDT | TradingPair::LTCUSDT => "crypto_payment",
            TradingPair::DOGEUSDT => "crypto_meme",
        }
    }

    pub fn min_notional(&self) -> Decimal {
        Decimal::new(10, 0) // $10 minimum
    }

    pub fn price_precision(&self) -> u32 {
        match self {
            TradingPair::BTCUSDT => 2,
            TradingPair::ETHUSDT => 2,
            TradingPair::SOLUSDT => 2,
            TradingPair::BNBUSDT => 2,
            TradingPair::ADAUSDT => 4,
            TradingPair::XRPUSDT => 4,
            TradingPair::LTCUSDT => 2,
            TradingPair::DOGEUSDT => 5,
        }
    }

    pub fn quantity_precision(&self) -> u32 {
        match self {
            TradingPair::BTCUSDT => 5,
            TradingPair::ETHUSDT => 4,
            TradingPair::SOLUSDT => 2,
            TradingPair::BNBUSDT => 2,
            TradingPair::ADAUSDT => 1,
            TradingPair::XRPUSDT => 1,
            TradingPair::LTCUSDT => 3,
            TradingPair::DOGEUSDT => 0,
        }
    }
}

/// Static pairwise correlation table for symbols with a well-known historical
/// co-movement; pairs absent from this table default to 0.5 in
/// `correlation_between` (moderate, unknown correlation).
const CORRELATION_TABLE: &[(TradingPair, TradingPair, f64)] = &[
    (TradingPair::BTCUSDT, TradingPair::ETHUSDT, 0.85),
    (TradingPair::BTCUSDT, TradingPair::BNBUSDT, 0.80),
    (TradingPair::ETHUSDT, TradingPair::BNBUSDT, 0.82),
    (TradingPair::SOLUSDT, TradingPair::ADAUSDT, 0.75),
    (TradingPair::XRPUSDT, TradingPair::LTCUSDT, 0.70),
];

/// Correlation pairs considered "high" for the portfolio's correlated-group cap.
pub const HIGH_CORRELATION_THRESHOLD: f64 = 0.7;

pub fn correlation_between(a: TradingPair, b: TradingPair) -> f64 {
    if a == b {
        return 1.0;
    }
    for &(x, y, corr) in CORRELATION_TABLE {
        if (x == a && y == b) || (x == b && y == a) {
            return corr;
        }
    }
    0.5
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFrame {
    M1,   // 1 minute
    M5,   // 5 minutes
    M15,  // 15 minutes
    H1,   // 1 hour
    H4,   // 4 hours
    D1,   // 1 day
}

impl TimeFrame {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFrame::M1 => "1m",
            TimeFrame::M5 => "5m",
            TimeFrame::M15 => "15m",
            TimeFrame::H1 => "1h",
            TimeFrame::H4 => "4h",
            TimeFrame::D1 => "1d",
        }
    }

    pub fn to_minutes(&self) -> u64 {
        match self {
            TimeFrame::M1 => 1,
            TimeFrame::M5 => 5,
            TimeFrame::M15 => 15,
            TimeFrame::H1 => 60,
            TimeFrame::H4 => 240,
            TimeFrame::D1 => 1440,
        }
    }

    pub fn to_milliseconds(&self) -> u64 {
        self.to_minutes() * 60 * 1000
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "M1" | "1M" => Some(TimeFrame::M1),
            "M5" | "5M" => Some(TimeFrame::M5),
            "M15" | "15M" => Some(TimeFrame::M15),
            "H1" | "1H" => Some(TimeFrame::H1),
            "H4" | "4H" => Some(TimeFrame::H4),
            "D1" | "1D" => Some(TimeFrame::D1),
            _ => None,
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradingMode {
    Paper,
    Live,
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingMode::Paper => write!(f, "Paper"),
            TradingMode::Live => write!(f, "Live"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegacySignal {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl LegacySignal {
    pub fn strength(&self) -> i8 {
        match self {
            LegacySignal::StrongBuy => 2,
            LegacySignal::Buy => 1,
            LegacySignal::Neutral => 0,
            LegacySignal::Sell => -1,
            LegacySignal::StrongSell => -2,
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, LegacySignal::StrongBuy | LegacySignal::Buy)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, LegacySignal::StrongSell | LegacySignal::Sell)
    }
}
