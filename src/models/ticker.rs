use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

fn symbol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Base symbol with an optional share-class suffix, e.g. BRK.B or BF-B
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9]{1,6}([.\-][A-Z0-9]{1,3})?$").unwrap())
}

/// Short immutable identifier of a tracked equity or fund.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TickerSymbol(String);

impl TickerSymbol {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let symbol = raw.trim().to_uppercase();
        if symbol_pattern().is_match(&symbol) {
            Ok(Self(symbol))
        } else {
            Err(format!("invalid ticker symbol '{}'", raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TickerSymbol {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TickerSymbol> for String {
    fn from(value: TickerSymbol) -> Self {
        value.0
    }
}

/// One entry of the tracked universe. The company name widens the news query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedTicker {
    pub symbol: TickerSymbol,
    pub company: String,
}

impl TrackedTicker {
    pub fn new(symbol: TickerSymbol, company: impl Into<String>) -> Self {
        Self {
            symbol,
            company: company.into(),
        }
    }

    /// Provider search query, e.g. `AAPL OR "Apple"`.
    pub fn news_query(&self) -> String {
        if self.company.is_empty() || self.company.eq_ignore_ascii_case(self.symbol.as_str()) {
            self.symbol.to_string()
        } else {
            format!("{} OR \"{}\"", self.symbol, self.company)
        }
    }
}

/// The static, duplicate-free set of tickers processed every cycle.
#[derive(Debug, Clone)]
pub struct TickerUniverse {
    tickers: Vec<TrackedTicker>,
}

impl TickerUniverse {
    pub fn new(tickers: Vec<TrackedTicker>) -> Result<Self, String> {
        if tickers.is_empty() {
            return Err("ticker universe is empty".to_string());
        }

        let mut seen = HashSet::new();
        for t in &tickers {
            if !seen.insert(t.symbol.clone()) {
                return Err(format!("duplicate ticker '{}' in universe", t.symbol));
            }
        }

        Ok(Self { tickers })
    }

    /// Parse `SYM:Company Name,SYM2:Company` (company part optional).
    pub fn parse(list: &str) -> Result<Self, String> {
        let tickers = list
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (symbol, company) = match entry.split_once(':') {
                    Some((s, c)) => (s, c.trim()),
                    None => (entry, ""),
                };
                Ok(TrackedTicker::new(TickerSymbol::parse(symbol)?, company))
            })
            .collect::<Result<Vec<_>, String>>()?;

        Self::new(tickers)
    }

    pub fn default_universe() -> Self {
        let tickers = DEFAULT_UNIVERSE
            .iter()
            .filter_map(|(symbol, company)| {
                TickerSymbol::parse(symbol)
                    .ok()
                    .map(|s| TrackedTicker::new(s, *company))
            })
            .collect();

        Self { tickers }
    }

    pub fn tickers(&self) -> &[TrackedTicker] {
        &self.tickers
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }
}

const DEFAULT_UNIVERSE: &[(&str, &str)] = &[
    ("AAPL", "Apple"),
    ("MSFT", "Microsoft"),
    ("NVDA", "NVIDIA"),
    ("AMZN", "Amazon"),
    ("GOOGL", "Alphabet"),
    ("META", "Meta Platforms"),
    ("TSLA", "Tesla"),
    ("BRK.B", "Berkshire Hathaway"),
    ("AVGO", "Broadcom"),
    ("JPM", "JPMorgan Chase"),
    ("LLY", "Eli Lilly"),
    ("V", "Visa"),
    ("UNH", "UnitedHealth"),
    ("XOM", "Exxon Mobil"),
    ("MA", "Mastercard"),
    ("JNJ", "Johnson & Johnson"),
    ("PG", "Procter & Gamble"),
    ("HD", "Home Depot"),
    ("COST", "Costco"),
    ("MRK", "Merck"),
    ("ABBV", "AbbVie"),
    ("CVX", "Chevron"),
    ("CRM", "Salesforce"),
    ("AMD", "Advanced Micro Devices"),
    ("NFLX", "Netflix"),
    ("PEP", "PepsiCo"),
    ("KO", "Coca-Cola"),
    ("BAC", "Bank of America"),
    ("WMT", "Walmart"),
    ("ADBE", "Adobe"),
    ("TMO", "Thermo Fisher"),
    ("ACN", "Accenture"),
    ("MCD", "McDonald's"),
    ("CSCO", "Cisco"),
    ("ABT", "Abbott Laboratories"),
    ("LIN", "Linde"),
    ("ORCL", "Oracle"),
    ("INTC", "Intel"),
    ("DIS", "Disney"),
    ("WFC", "Wells Fargo"),
    ("DHR", "Danaher"),
    ("VZ", "Verizon"),
    ("TXN", "Texas Instruments"),
    ("QCOM", "Qualcomm"),
    ("INTU", "Intuit"),
    ("PM", "Philip Morris"),
    ("CMCSA", "Comcast"),
    ("IBM", "IBM"),
    ("AMGN", "Amgen"),
    ("NKE", "Nike"),
    ("UNP", "Union Pacific"),
    ("CAT", "Caterpillar"),
    ("GE", "General Electric"),
    ("NOW", "ServiceNow"),
    ("SPGI", "S&P Global"),
    ("HON", "Honeywell"),
    ("LOW", "Lowe's"),
    ("BA", "Boeing"),
    ("GS", "Goldman Sachs"),
    ("AMAT", "Applied Materials"),
    ("RTX", "RTX"),
    ("PFE", "Pfizer"),
    ("ISRG", "Intuitive Surgical"),
    ("MS", "Morgan Stanley"),
    ("BKNG", "Booking Holdings"),
    ("T", "AT&T"),
    ("BLK", "BlackRock"),
    ("SBUX", "Starbucks"),
    ("DE", "Deere"),
    ("MDT", "Medtronic"),
    ("LMT", "Lockheed Martin"),
    ("GILD", "Gilead Sciences"),
    ("ADP", "Automatic Data Processing"),
    ("PLD", "Prologis"),
    ("SYK", "Stryker"),
    ("MU", "Micron Technology"),
    ("LRCX", "Lam Research"),
    ("ADI", "Analog Devices"),
    ("C", "Citigroup"),
    ("SCHW", "Charles Schwab"),
    ("MDLZ", "Mondelez"),
    ("CB", "Chubb"),
    ("TJX", "TJX Companies"),
    ("REGN", "Regeneron"),
    ("MMC", "Marsh McLennan"),
    ("PANW", "Palo Alto Networks"),
    ("VRTX", "Vertex Pharmaceuticals"),
    ("SO", "Southern Company"),
    ("ZTS", "Zoetis"),
    ("BMY", "Bristol-Myers Squibb"),
    ("UBER", "Uber"),
    ("PYPL", "PayPal"),
    ("SHOP", "Shopify"),
    ("PLTR", "Palantir"),
    ("SNOW", "Snowflake"),
    ("F", "Ford"),
    ("GM", "General Motors"),
    ("COIN", "Coinbase"),
    ("SPY", "S&P 500"),
    ("QQQ", "Nasdaq 100"),
];
