//! Twirp JSON transport for server APIs

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{ApiCredentials, TokenIssuer, VideoGrants, http_base_url};
use crate::{Error, Result};

/// Error body returned by a Twirp endpoint
#[derive(Debug, Deserialize)]
struct TwirpError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    msg: String,
}

/// Authenticated Twirp caller for one project
#[derive(Debug, Clone)]
pub(crate) struct TwirpClient {
    client: Client,
    base_url: String,
    issuer: TokenIssuer,
}

impl TwirpClient {
    pub(crate) fn new(url: &str, credentials: ApiCredentials) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            base_url: http_base_url(url)?,
            issuer: TokenIssuer::new(credentials),
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` to `livekit.{service}/{method}` with a token carrying `grants`
    pub(crate) async fn call<Req, Resp>(
        &self,
        service: &str,
        method: &str,
        grants: VideoGrants,
        body: &Req,
    ) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/twirp/livekit.{service}/{method}", self.base_url);
        let token = self.issuer.server_token(grants)?;

        tracing::debug!(url = %url, "twirp request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(service_error(service, status, &body));
        }

        Ok(response.json().await?)
    }
}

/// Map a non-2xx Twirp response to [`Error::ExternalService`]
fn service_error(service: &str, status: reqwest::StatusCode, body: &str) -> Error {
    let (code, message) = match serde_json::from_str::<TwirpError>(body) {
        Ok(err) if !err.code.is_empty() => (err.code, err.msg),
        _ => (status.as_u16().to_string(), body.trim().to_string()),
    };

    Error::ExternalService {
        service: format!("livekit.{service}"),
        code,
        message,
    }
}
