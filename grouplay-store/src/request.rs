use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Client, StoreError, StoreResult, validate_key};

/// Making requests to the REST store.
impl Client {
    /// Build the URL of a node within the bound session. An empty path addresses
    /// the session root. Each segment is percent-encoded as a single path segment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotBound`] if the client has no session, and
    /// [`StoreError::InvalidKey`] if the session ID or a segment is not a valid key.
    pub(crate) fn session_url(&self, path: &[&str]) -> StoreResult<String> {
        let session_id = self.session_id.as_deref().ok_or(StoreError::NotBound)?;
        validate_key(session_id)?;
        for segment in path {
            validate_key(segment)?;
        }

        let invalid_base = |message: String| StoreError::InvalidBaseUrl {
            base_url: self.base_url.clone(),
            message,
        };
        let mut url =
            reqwest::Url::parse(&self.base_url).map_err(|e| invalid_base(e.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| invalid_base("cannot be a base".to_string()))?;
            segments.pop_if_empty().push(Self::SESSIONS_ROOT);
            let (last, parents) = match path.split_last() {
                Some((last, parents)) => (*last, parents),
                None => (session_id, &[][..]),
            };
            if !path.is_empty() {
                segments.push(session_id);
            }
            segments.extend(parents);
            segments.push(&format!("{last}.json"));
        }
        Ok(url.into())
    }

    /// Read a node. A missing node is returned as [`Value::Null`].
    pub(crate) async fn get_json(&self, url: &str) -> StoreResult<Value> {
        let bytes = self.send(self.client.get(url)).await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Overwrite a node.
    pub(crate) async fn put_json<T: Serialize>(&self, url: &str, body: &T) -> StoreResult<()> {
        let body = serde_json::to_vec(body)?;
        self.send(
            self.client
                .put(url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body),
        )
        .await?;
        Ok(())
    }

    /// Delete a node. Deleting a missing node succeeds.
    pub(crate) async fn delete(&self, url: &str) -> StoreResult<()> {
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn send(&self, mut request: reqwest::RequestBuilder) -> StoreResult<Vec<u8>> {
        if let Some(token) = &self.auth_token {
            request = request.query(&[("auth", token)]);
        }
        let response = request.send().await?;
        let status = response.status();
        let bytes: Vec<u8> = response.bytes().await?.into();
        if !status.is_success() {
            return Err(Self::parse_error(status.as_u16(), &bytes));
        }
        Ok(bytes)
    }

    fn parse_error(status: u16, bytes: &[u8]) -> StoreError {
        let message = serde_json::from_slice::<ResponseError>(bytes)
            .ok()
            .map(|e| e.error);
        StoreError::ServerError { status, message }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// The body the store returns alongside a failing status.
struct ResponseError {
    error: String,
}
