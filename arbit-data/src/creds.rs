use arbit_instrument::ExchangeId;
use arbit_integration::protocol::http::private::Credentials;
use std::env;

/// Read API credentials for `id` out of the process environment, following
/// `original_source`'s `creds_from_env`: a venue is only considered configured once every
/// required variable (key, secret, and password for the four password-bearing venues) is
/// present, otherwise `None` — no partial credential set is ever handed to an adapter.
pub fn creds_from_env(id: ExchangeId) -> Option<Credentials> {
    let var = |name: &str| env::var(name).ok().filter(|value| !value.is_empty());

    match id {
        ExchangeId::Binance => Some(Credentials {
            api_key: var("BINANCE_API_KEY")?,
            secret: var("BINANCE_API_SECRET")?,
            passphrase: None,
        }),
        ExchangeId::Bybit => Some(Credentials {
            api_key: var("BYBIT_API_KEY")?,
            secret: var("BYBIT_API_SECRET")?,
            passphrase: None,
        }),
        ExchangeId::Bitget => Some(Credentials {
            api_key: var("BITGET_API_KEY")?,
            secret: var("BITGET_API_SECRET")?,
            passphrase: Some(var("BITGET_PASSWORD")?),
        }),
        ExchangeId::Coinbase => Some(Credentials {
            api_key: var("COINBASE_API_KEY")?,
            secret: var("COINBASE_API_SECRET")?,
            passphrase: Some(var("COINBASE_API_PASSWORD")?),
        }),
        ExchangeId::Okx => Some(Credentials {
            api_key: var("OKX_API_KEY")?,
            secret: var("OKX_API_SECRET")?,
            passphrase: Some(var("OKX_API_PASSWORD").or_else(|| var("OKX_PASSWORD"))?),
        }),
        ExchangeId::Kucoin => Some(Credentials {
            api_key: var("KUCOIN_API_KEY")?,
            secret: var("KUCOIN_API_SECRET")?,
            passphrase: Some(var("KUCOIN_API_PASSWORD")?),
        }),
        ExchangeId::Gateio => Some(Credentials {
            api_key: var("GATEIO_API_KEY").or_else(|| var("GATE_API_KEY"))?,
            secret: var("GATEIO_API_SECRET").or_else(|| var("GATE_API_SECRET"))?,
            passphrase: None,
        }),
        ExchangeId::Mexc => Some(Credentials {
            api_key: var("MEXC_API_KEY")?,
            secret: var("MEXC_API_SECRET")?,
            passphrase: None,
        }),
        // Not present in original_source's creds_from_env; these venues follow the same
        // plain key/secret shape as the majority of the table.
        ExchangeId::Kraken => Some(Credentials {
            api_key: var("KRAKEN_API_KEY")?,
            secret: var("KRAKEN_API_SECRET")?,
            passphrase: None,
        }),
        ExchangeId::Hyperliquid => Some(Credentials {
            api_key: var("HYPERLIQUID_API_KEY")?,
            secret: var("HYPERLIQUID_API_SECRET")?,
            passphrase: None,
        }),
        ExchangeId::Mock => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn missing_password_withholds_credentials_for_password_venues() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            env::remove_var("BITGET_API_KEY");
            env::remove_var("BITGET_API_SECRET");
            env::remove_var("BITGET_PASSWORD");
            env::set_var("BITGET_API_KEY", "key");
            env::set_var("BITGET_API_SECRET", "secret");
        }
        assert!(creds_from_env(ExchangeId::Bitget).is_none());
        unsafe {
            env::set_var("BITGET_PASSWORD", "pass");
        }
        assert!(creds_from_env(ExchangeId::Bitget).is_some());
        unsafe {
            env::remove_var("BITGET_API_KEY");
            env::remove_var("BITGET_API_SECRET");
            env::remove_var("BITGET_PASSWORD");
        }
    }

    #[test]
    fn gateio_accepts_the_gate_alias_env_vars() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            env::remove_var("GATEIO_API_KEY");
            env::remove_var("GATEIO_API_SECRET");
            env::set_var("GATE_API_KEY", "key");
            env::set_var("GATE_API_SECRET", "secret");
        }
        assert!(creds_from_env(ExchangeId::Gateio).is_some());
        unsafe {
            env::remove_var("GATE_API_KEY");
            env::remove_var("GATE_API_SECRET");
        }
    }
}
