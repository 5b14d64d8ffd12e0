use arbit_instrument::ExchangeId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Static per-venue REST/WS endpoint layout and default taker fee, looked up once at adapter
/// construction time so the rest of the engine never has to branch on [`ExchangeId`] to find
/// "where do I even send this request" (§9 "policy, not branches").
#[derive(Debug, Clone, Copy)]
pub struct VenueProfile {
    pub exchange_id: ExchangeId,
    pub rest_base_url: &'static str,
    pub ws_base_url: &'static str,
    pub taker_fee_bps: Decimal,
    pub api_key_header: &'static str,
    pub passphrase_header: Option<&'static str>,
}

/// Look up the static profile for `id`. Every venue named in spec §4.1's quirks table has an
/// entry; [`ExchangeId::Mock`] is handled separately by [`super::mock::MockAdapter`].
pub fn profile(id: ExchangeId) -> VenueProfile {
    match id {
        ExchangeId::Binance => VenueProfile {
            exchange_id: id,
            rest_base_url: "https://api.binance.com",
            ws_base_url: "wss://stream.binance.com:9443/ws",
            taker_fee_bps: dec!(10),
            api_key_header: "X-MBX-APIKEY",
            passphrase_header: None,
        },
        ExchangeId::Bitget => VenueProfile {
            exchange_id: id,
            rest_base_url: "https://api.bitget.com",
            ws_base_url: "wss://ws.bitget.com/spot/v1/stream",
            taker_fee_bps: dec!(10),
            api_key_header: "ACCESS-KEY",
            passphrase_header: Some("ACCESS-PASSPHRASE"),
        },
        ExchangeId::Bybit => VenueProfile {
            exchange_id: id,
            rest_base_url: "https://api.bybit.com",
            ws_base_url: "wss://stream.bybit.com/v5/public/spot",
            taker_fee_bps: dec!(10),
            api_key_header: "X-BAPI-API-KEY",
            passphrase_header: None,
        },
        ExchangeId::Coinbase => VenueProfile {
            exchange_id: id,
            rest_base_url: "https://api.exchange.coinbase.com",
            ws_base_url: "wss://ws-feed.exchange.coinbase.com",
            taker_fee_bps: dec!(40),
            api_key_header: "CB-ACCESS-KEY",
            passphrase_header: Some("CB-ACCESS-PASSPHRASE"),
        },
        ExchangeId::Gateio => VenueProfile {
            exchange_id: id,
            rest_base_url: "https://api.gateio.ws",
            ws_base_url: "wss://api.gateio.ws/ws/v4/",
            taker_fee_bps: dec!(20),
            api_key_header: "KEY",
            passphrase_header: None,
        },
        ExchangeId::Hyperliquid => VenueProfile {
            exchange_id: id,
            rest_base_url: "https://api.hyperliquid.xyz",
            ws_base_url: "wss://api.hyperliquid.xyz/ws",
            taker_fee_bps: dec!(7),
            api_key_header: "X-API-KEY",
            passphrase_header: None,
        },
        ExchangeId::Kraken => VenueProfile {
            exchange_id: id,
            rest_base_url: "https://api.kraken.com",
            ws_base_url: "wss://ws.kraken.com",
            taker_fee_bps: dec!(26),
            api_key_header: "API-Key",
            passphrase_header: None,
        },
        ExchangeId::Kucoin => VenueProfile {
            exchange_id: id,
            rest_base_url: "https://api.kucoin.com",
            ws_base_url: "wss://ws-api-spot.kucoin.com",
            taker_fee_bps: dec!(10),
            api_key_header: "KC-API-KEY",
            passphrase_header: Some("KC-API-PASSPHRASE"),
        },
        ExchangeId::Mexc => VenueProfile {
            exchange_id: id,
            rest_base_url: "https://api.mexc.com",
            ws_base_url: "wss://wbs.mexc.com/ws",
            taker_fee_bps: dec!(10),
            api_key_header: "X-MEXC-APIKEY",
            passphrase_header: None,
        },
        ExchangeId::Okx => VenueProfile {
            exchange_id: id,
            rest_base_url: "https://www.okx.com",
            ws_base_url: "wss://ws.okx.com:8443/ws/v5/public",
            taker_fee_bps: dec!(10),
            api_key_header: "OK-ACCESS-KEY",
            passphrase_header: Some("OK-ACCESS-PASSPHRASE"),
        },
        ExchangeId::Mock => VenueProfile {
            exchange_id: id,
            rest_base_url: "https://mock.invalid",
            ws_base_url: "wss://mock.invalid/ws",
            taker_fee_bps: dec!(10),
            api_key_header: "X-MOCK-KEY",
            passphrase_header: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_bearing_venues_match_spec_table() {
        assert!(profile(ExchangeId::Bitget).passphrase_header.is_some());
        assert!(profile(ExchangeId::Coinbase).passphrase_header.is_some());
        assert!(profile(ExchangeId::Okx).passphrase_header.is_some());
        assert!(profile(ExchangeId::Kucoin).passphrase_header.is_some());
        assert!(profile(ExchangeId::Binance).passphrase_header.is_none());
    }
}
