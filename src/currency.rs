//! Supported currencies
//!
//! Account currency codes are validated against this fixed set before an
//! account is provisioned. Transfers do not revalidate them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Unsupported currency: '{0}'")]
pub struct CurrencyError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    Usd,
    Eur,
    Cad,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Cad];

    pub fn as_str(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Cad => "CAD",
        }
    }
}

impl FromStr for Currency {
    type Err = CurrencyError;

    /// Codes are exact and uppercase: "USD" parses, "usd" does not
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "CAD" => Ok(Currency::Cad),
            other => Err(CurrencyError(other.to_string())),
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = CurrencyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.as_str().to_string()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_supported_currency(code: &str) -> bool {
    code.parse::<Currency>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported() {
        assert!(is_supported_currency("USD"));
        assert!(is_supported_currency("EUR"));
        assert!(is_supported_currency("CAD"));
        assert!(!is_supported_currency("GBP"));
        assert!(!is_supported_currency("usd"));
        assert!(!is_supported_currency(""));
    }

    #[test]
    fn test_round_trip_display() {
        for c in Currency::ALL {
            assert_eq!(c.to_string().parse::<Currency>().unwrap(), c);
        }
    }

    #[test]
    fn test_serde_rejects_unknown() {
        let c: Currency = serde_json::from_str("\"EUR\"").unwrap();
        assert_eq!(c, Currency::Eur);
        assert!(serde_json::from_str::<Currency>("\"JPY\"").is_err());
        assert_eq!(serde_json::to_string(&Currency::Cad).unwrap(), "\"CAD\"");
    }
}
