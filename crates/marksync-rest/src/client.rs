//! Thin HTTP client for the hosted REST surface.

use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use marksync_core::error::{Error, StoreReadError, StoreWriteError};
use marksync_core::Result;

fn read_transport(err: reqwest::Error) -> Error {
    Error::StoreRead(StoreReadError::Unavailable {
        message: err.to_string(),
    })
}

fn write_transport(err: reqwest::Error) -> Error {
    Error::StoreWrite(StoreWriteError::Unavailable {
        message: err.to_string(),
    })
}

/// Error body shape the backend answers with.
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct RestClient {
    base: Url,
    api_key: String,
    bearer: Option<String>,
    http: reqwest::Client,
}

impl RestClient {
    pub(crate) fn new(base: Url, api_key: impl Into<String>) -> Self {
        Self {
            base,
            api_key: api_key.into(),
            bearer: None,
            http: reqwest::Client::new(),
        }
    }

    pub(crate) fn set_bearer(&mut self, token: impl Into<String>) {
        self.bearer = Some(token.into());
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base.join(path).map_err(|e| {
            Error::StoreRead(StoreReadError::Unavailable {
                message: format!("invalid endpoint '{}': {}", path, e),
            })
        })
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        // The anon key doubles as the bearer until a user token exists.
        let bearer = self.bearer.as_deref().unwrap_or(&self.api_key);
        request
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");

        let response = self
            .authed(self.http.get(url))
            .query(query)
            .send()
            .await
            .map_err(read_transport)?;

        let response = check_read(response).await?;
        response.json().await.map_err(|e| {
            Error::StoreRead(StoreReadError::Corrupt {
                message: e.to_string(),
            })
        })
    }

    pub(crate) async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");

        let response = self
            .authed(self.http.post(url))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(write_transport)?;

        let response = check_write(response).await?;
        response.json().await.map_err(|e| {
            Error::StoreWrite(StoreWriteError::Unavailable {
                message: format!("unreadable representation: {}", e),
            })
        })
    }

    pub(crate) async fn delete(&self, path: &str, query: &[(&str, String)]) -> Result<()> {
        let url = self.endpoint(path)?;
        debug!(%url, "DELETE");

        let response = self
            .authed(self.http.delete(url))
            .query(query)
            .send()
            .await
            .map_err(write_transport)?;

        check_write(response).await?;
        Ok(())
    }
}

async fn error_message(response: Response) -> Option<String> {
    let text = response.text().await.ok()?;
    if let Ok(body) = serde_json::from_str::<ErrorBody>(&text)
        && let Some(message) = body.message
    {
        return Some(message);
    }
    (!text.is_empty()).then_some(text)
}

async fn check_read(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(StoreReadError::Backend {
        status: status.as_u16(),
        message: error_message(response).await,
    }
    .into())
}

async fn check_write(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = error_message(response)
        .await
        .unwrap_or_else(|| "no detail".to_string());

    let err = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreWriteError::Denied { message },
        status if status.is_client_error() => StoreWriteError::Constraint { message },
        status => StoreWriteError::Backend {
            status: status.as_u16(),
            message: Some(message),
        },
    };

    Err(err.into())
}
