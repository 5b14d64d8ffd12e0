use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::borrow::Borrow;

/// An uppercase ticker symbol (eg/ `USDT`, `BTC`), used as the [`Currency`] graph node key.
///
/// Construction always upper-cases the input so that `Currency::new("usdt") ==
/// Currency::new("USDT")`; equality, ordering and hashing are therefore stable regardless of
/// how an exchange happened to case the symbol in its API response.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
#[serde(try_from = "SmolStr", into = "SmolStr")]
pub struct Currency(SmolStr);

impl Currency {
    pub fn new<S: AsRef<str>>(symbol: S) -> Self {
        Self(SmolStr::new(symbol.as_ref().to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Borrow<str> for Currency {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl<S> From<S> for Currency
where
    S: AsRef<str>,
{
    fn from(value: S) -> Self {
        Self::new(value)
    }
}

impl TryFrom<SmolStr> for Currency {
    type Error = std::convert::Infallible;

    fn try_from(value: SmolStr) -> Result<Self, Self::Error> {
        Ok(Self::new(value.as_str()))
    }
}

impl From<Currency> for SmolStr {
    fn from(value: Currency) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_to_uppercase() {
        assert_eq!(Currency::new("usdt"), Currency::new("USDT"));
        assert_eq!(Currency::new("Btc").as_str(), "BTC");
    }

    #[test]
    fn serde_roundtrip() {
        let ccy = Currency::new("eth");
        let json = serde_json::to_string(&ccy).unwrap();
        assert_eq!(json, "\"ETH\"");
        let back: Currency = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ccy);
    }
}
