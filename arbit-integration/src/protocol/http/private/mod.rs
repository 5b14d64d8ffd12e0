use super::BuildStrategy;
use crate::error::SocketError;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderName, HeaderValue};
use sha2::Sha256;

/// Credentials resolved by [`crate::creds_from_env`](crate)-style lookups. `passphrase` is
/// `Some` only for venues whose [`VenuePolicy::needs_password`](arbit_instrument::VenuePolicy)
/// is set (Bitget, Coinbase, Okx, Kucoin).
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub secret: String,
    pub passphrase: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret", &"***")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A [`BuildStrategy`] that signs requests with HMAC-SHA256 over the query string, the way
/// every one of this engine's venues does it (Binance et al. all sign
/// `query + "&timestamp=..." + "&recvWindow=..."` and append the hex digest as `signature`).
///
/// Mirrors `jackbot-integration`'s `RequestSigner` role described in `protocol::http::mod`'s
/// doc comment, specialised to the one signing scheme this engine's venues share rather than
/// a per-venue configurable strategy object, per §9 "policy, not branches".
#[derive(Debug, Clone)]
pub struct RequestSigner {
    credentials: Credentials,
    api_key_header: HeaderName,
    passphrase_header: Option<HeaderName>,
    recv_window_ms: i64,
}

impl RequestSigner {
    pub fn new(credentials: Credentials, api_key_header: &'static str, recv_window_ms: i64) -> Self {
        Self {
            credentials,
            api_key_header: HeaderName::from_static(api_key_header),
            passphrase_header: None,
            recv_window_ms,
        }
    }

    /// Attach the header name used to carry the API passphrase, for venues where
    /// `VenuePolicy::needs_password` is set.
    pub fn with_passphrase_header(mut self, header: &'static str) -> Self {
        self.passphrase_header = Some(HeaderName::from_static(header));
        self
    }

    fn sign(&self, payload: &str) -> Result<String, SocketError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.credentials.secret.as_bytes())
            .map_err(|_| SocketError::MissingCredentials)?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl BuildStrategy for RequestSigner {
    fn build<Request>(
        &self,
        _request: Request,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Request, SocketError>
    where
        Request: super::rest::RestRequest,
    {
        let mut http_request = builder.build()?;

        let timestamp = chrono::Utc::now().timestamp_millis();
        {
            let mut pairs = http_request.url_mut().query_pairs_mut();
            pairs.append_pair("timestamp", &timestamp.to_string());
            pairs.append_pair("recvWindow", &self.recv_window_ms.to_string());
        }

        let query = http_request.url().query().unwrap_or_default().to_owned();
        let signature = self.sign(&query)?;
        http_request
            .url_mut()
            .query_pairs_mut()
            .append_pair("signature", &signature);

        let headers = http_request.headers_mut();
        headers.insert(
            self.api_key_header.clone(),
            HeaderValue::from_str(&self.credentials.api_key)
                .map_err(|_| SocketError::MissingCredentials)?,
        );

        if let (Some(header), Some(passphrase)) =
            (&self.passphrase_header, &self.credentials.passphrase)
        {
            headers.insert(
                header.clone(),
                HeaderValue::from_str(passphrase).map_err(|_| SocketError::MissingCredentials)?,
            );
        }

        Ok(http_request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            api_key: "key".into(),
            secret: "secret".into(),
            passphrase: Some("pass".into()),
        }
    }

    #[test]
    fn sign_is_deterministic_for_same_payload() {
        let signer = RequestSigner::new(credentials(), "X-MBX-APIKEY", 5000);
        let a = signer.sign("timestamp=1&recvWindow=5000").unwrap();
        let b = signer.sign("timestamp=1&recvWindow=5000").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64, "hex-encoded sha256 digest is 64 chars");
    }

    #[test]
    fn sign_changes_with_payload() {
        let signer = RequestSigner::new(credentials(), "X-MBX-APIKEY", 5000);
        let a = signer.sign("timestamp=1").unwrap();
        let b = signer.sign("timestamp=2").unwrap();
        assert_ne!(a, b);
    }
}
