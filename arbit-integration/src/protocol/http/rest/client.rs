use super::RestRequest;
use crate::error::SocketError;
use crate::protocol::http::{BuildStrategy, HttpParser};
use crate::rate_limit::{Priority, RateLimiter};
use tracing::debug;
use url::Url;

/// Configurable Http client that executes [`RestRequest`]s against a venue's REST API,
/// building each request with a [`BuildStrategy`] (public or HMAC-signed) and parsing the
/// response with an [`HttpParser`] (venue-specific error body shape).
///
/// Every outbound request passes through the shared [`RateLimiter`] first, so a venue's REST
/// weight budget is respected regardless of which part of the engine issued the call (batch
/// ticker refresh, depth revalidation, order placement all share one limiter per venue).
#[derive(Debug, Clone)]
pub struct RestClient<Strategy, Parser> {
    http_client: reqwest::Client,
    base_url: Url,
    strategy: Strategy,
    parser: Parser,
    rate_limiter: RateLimiter,
}

impl<Strategy, Parser> RestClient<Strategy, Parser>
where
    Strategy: BuildStrategy,
    Parser: HttpParser,
{
    pub fn new(
        base_url: Url,
        strategy: Strategy,
        parser: Parser,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url,
            strategy,
            parser,
            rate_limiter,
        }
    }

    /// Execute `request` at the given [`Priority`], returning the parsed response or a
    /// [`Parser::OutputError`](HttpParser::OutputError).
    pub async fn execute<Req>(
        &self,
        request: Req,
        priority: Priority,
    ) -> Result<Req::Response, Parser::OutputError>
    where
        Req: RestRequest,
    {
        self.rate_limiter.acquire(priority).await;

        let url = self
            .base_url
            .join(&request.path())
            .map_err(|error| Parser::OutputError::from(SocketError::from(error)))?;

        let mut builder = self
            .http_client
            .request(Req::method(), url)
            .timeout(Req::timeout());

        if let Some(query) = request.query_params() {
            builder = builder.query(query);
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let http_request = self
            .strategy
            .build(request, builder)
            .map_err(Parser::OutputError::from)?;

        debug!(method = %http_request.method(), url = %http_request.url(), "executing rest request");

        let response = self
            .http_client
            .execute(http_request)
            .await
            .map_err(|error| Parser::OutputError::from(SocketError::from(error)))?;

        let status = response.status();
        if status.as_u16() == 429 || status.as_u16() == 418 {
            self.rate_limiter.report_violation().await;
        } else {
            self.rate_limiter.reset_backoff().await;
        }

        let payload = response
            .bytes()
            .await
            .map_err(|error| Parser::OutputError::from(SocketError::from(error)))?;

        self.parser.parse(status, &payload)
    }
}
