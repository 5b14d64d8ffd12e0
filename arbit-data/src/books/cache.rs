use super::{Level, OrderBook};
use arbit_instrument::Market;
use dashmap::DashMap;
use futures_util::StreamExt;
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const BACKOFF_INITIAL: Duration = Duration::from_secs(1);
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// One reconnecting task per symbol maintaining the top-of-book partial depth snapshot over a
/// venue's WebSocket feed, grounded on `original_source`'s `BinanceL2PartialBook`: no diff/merge
/// logic, just replace-on-message, with `last_book()`/`latency_ms()` accessors that never block
/// on network I/O — only on a `parking_lot::RwLock` read, following
/// `jackbot-data::books::manager`'s choice of `parking_lot` over the local order book.
pub struct PartialBookCache {
    entries: DashMap<Market, Arc<Entry>>,
}

struct Entry {
    book: Arc<RwLock<OrderBook>>,
    last_received: Arc<RwLock<Option<Instant>>>,
    handle: JoinHandle<()>,
}

impl Default for PartialBookCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialBookCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Spawn a reconnecting depth-stream task for `market` at `stream_url`, parsing incoming
    /// frames with `parse`. `parse` converts a venue's raw text frame into `(bids, asks)` pairs;
    /// adapters differ in wire shape but never in the reconnect/backoff policy, which lives here.
    pub fn subscribe<F>(&self, market: Market, stream_url: String, parse: F)
    where
        F: Fn(&str) -> Option<(Vec<Level>, Vec<Level>)> + Send + Sync + 'static,
    {
        let book = Arc::new(RwLock::new(OrderBook::default()));
        let last_received = Arc::new(RwLock::new(None));

        let task_book = book.clone();
        let task_last_received = last_received.clone();
        let task_market = market.clone();
        let handle = tokio::spawn(async move {
            run_reconnect_loop(task_market, stream_url, parse, task_book, task_last_received).await;
        });

        self.entries.insert(
            market,
            Arc::new(Entry {
                book,
                last_received,
                handle,
            }),
        );
    }

    /// A snapshot of the last received book for `market`, if any has arrived yet.
    pub fn last_book(&self, market: &Market) -> Option<OrderBook> {
        self.entries
            .get(market)
            .map(|entry| entry.book.read().clone())
    }

    /// Milliseconds since the last message was received for `market`, or `None` if nothing
    /// has arrived yet.
    pub fn latency_ms(&self, market: &Market) -> Option<u64> {
        self.entries.get(market).and_then(|entry| {
            entry
                .last_received
                .read()
                .as_ref()
                .map(|instant| instant.elapsed().as_millis() as u64)
        })
    }

    /// Stop and drop the reconnect task for `market`.
    pub fn unsubscribe(&self, market: &Market) {
        if let Some((_, entry)) = self.entries.remove(market) {
            entry.handle.abort();
        }
    }
}

async fn run_reconnect_loop<F>(
    market: Market,
    stream_url: String,
    parse: F,
    book: Arc<RwLock<OrderBook>>,
    last_received: Arc<RwLock<Option<Instant>>>,
) where
    F: Fn(&str) -> Option<(Vec<Level>, Vec<Level>)> + Send + Sync + 'static,
{
    let mut backoff = BACKOFF_INITIAL;

    loop {
        match tokio_tungstenite::connect_async(stream_url.as_str()).await {
            Ok((stream, _response)) => {
                info!(%market, %stream_url, "partial book stream connected");
                backoff = BACKOFF_INITIAL;

                let (_write, mut read) = stream.split();
                while let Some(message) = read.next().await {
                    match message {
                        Ok(Message::Text(text)) => {
                            if let Some((bids, asks)) = parse(&text) {
                                if !bids.is_empty() && !asks.is_empty() {
                                    let sequence = book.read().sequence + 1;
                                    book.write().replace(sequence, None, bids, asks);
                                    *last_received.write() = Some(Instant::now());
                                }
                            }
                        }
                        Ok(Message::Close(_)) => {
                            debug!(%market, "partial book stream closed by peer");
                            break;
                        }
                        Ok(_) => {}
                        Err(error) => {
                            warn!(%market, ?error, "partial book stream error");
                            break;
                        }
                    }
                }
            }
            Err(error) => {
                warn!(%market, ?error, "failed to connect partial book stream");
            }
        }

        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(BACKOFF_MAX);
    }
}

/// Binance-shaped `depth20@100ms` partial book frame: `{"bids": [[price, qty], ...], "asks": [...]}`.
#[derive(Deserialize)]
struct BinancePartialDepth {
    #[serde(default)]
    bids: Vec<(String, String)>,
    #[serde(default)]
    asks: Vec<(String, String)>,
}

/// Parse a Binance-compatible partial depth frame into `(bids, asks)` [`Level`]s. Several
/// venues in this engine's universe speak this exact wire shape for their spot depth stream;
/// venues that don't supply their own `parse` closure when calling
/// [`PartialBookCache::subscribe`].
pub fn parse_binance_partial_depth(text: &str) -> Option<(Vec<Level>, Vec<Level>)> {
    let frame: BinancePartialDepth = serde_json::from_str(text).ok()?;
    let to_levels = |raw: Vec<(String, String)>| -> Vec<Level> {
        raw.into_iter()
            .filter_map(|(price, amount)| {
                let price: rust_decimal::Decimal = price.parse().ok()?;
                let amount: rust_decimal::Decimal = amount.parse().ok()?;
                Some(Level::new(price, amount))
            })
            .collect()
    };
    Some((to_levels(frame.bids), to_levels(frame.asks)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_binance_partial_depth_frame() {
        let frame = r#"{"bids":[["100.5","1.2"],["100.4","2"]],"asks":[["100.6","0.5"]]}"#;
        let (bids, asks) = parse_binance_partial_depth(frame).unwrap();
        assert_eq!(bids.len(), 2);
        assert_eq!(asks.len(), 1);
        assert_eq!(asks[0].price.to_string(), "100.6");
    }

    #[test]
    fn ignores_malformed_frame() {
        assert!(parse_binance_partial_depth("not json").is_none());
    }
}
