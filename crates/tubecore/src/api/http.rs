//! HttpGateway — the download service over HTTP/JSON.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::api::types::{
    DownloadedFile, ErrorBody, InfoRequest, ProgressSnapshot, SubmitRequest, SubmitResponse, TaskId, VideoInfo,
};
use crate::api::Gateway;
use crate::core::config::ClientConfig;
use crate::core::error::{AppError, AppResult};

/// Fallback messages for non-2xx responses without an `error` field.
mod generic {
    pub const INFO: &str = "failed to fetch video info";
    pub const SUBMIT: &str = "download failed";
    pub const PROGRESS: &str = "failed to fetch progress";
    pub const LIST: &str = "failed to list downloads";
    pub const DELETE: &str = "delete failed";
}

/// Talks to one download service instance.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base: Url,
    action_timeout: Option<Duration>,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base: config.server_url.clone(),
            action_timeout: config.action_timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        Ok(self.base.join(path)?)
    }

    /// Request for a user-triggered action; carries the action timeout.
    fn action(&self, method: Method, url: Url) -> RequestBuilder {
        log::debug!("{} {}", method, url);
        let request = self.client.request(method, url);
        match self.action_timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }

    fn action_json<B: Serialize + ?Sized>(&self, method: Method, url: Url, body: &B) -> RequestBuilder {
        self.action(method, url).json(body)
    }
}

/// Decodes a 2xx body as `T`, or turns a failure status into `AppError::Remote`.
async fn read_json<T: DeserializeOwned>(response: Response, generic: &str) -> AppResult<T> {
    let response = check_status(response, generic).await?;
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

async fn check_status(response: Response, generic: &str) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // The body is only used for its message; unreadable bodies fall back to `generic`.
    let message = match response.text().await {
        Ok(body) => serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::message),
        Err(e) => {
            log::debug!("failed to read error body: {}", e);
            None
        }
    };
    log::debug!("service answered {}: {:?}", status, message);

    Err(AppError::remote(Some(status.as_u16()), message, generic))
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn video_info(&self, url: &str) -> Result<VideoInfo, AppError> {
        let endpoint = self.endpoint("api/info")?;
        let response = self
            .action_json(Method::POST, endpoint, &InfoRequest { url })
            .send()
            .await?;
        read_json(response, generic::INFO).await
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<TaskId, AppError> {
        let endpoint = self.endpoint("api/download")?;
        let response = self.action_json(Method::POST, endpoint, request).send().await?;
        let body: SubmitResponse = read_json(response, generic::SUBMIT).await?;
        Ok(body.task_id)
    }

    async fn progress(&self, task_id: &TaskId) -> Result<ProgressSnapshot, AppError> {
        let endpoint = self.endpoint(&format!("api/progress/{}", urlencoding::encode(task_id.as_str())))?;
        log::debug!("GET {}", endpoint);
        // No timeout: a slow poll delays the next tick instead of failing it.
        let response = self.client.get(endpoint).send().await?;
        read_json(response, generic::PROGRESS).await
    }

    async fn list_downloads(&self) -> Result<Vec<DownloadedFile>, AppError> {
        let endpoint = self.endpoint("api/downloads")?;
        let response = self.action(Method::GET, endpoint).send().await?;
        read_json(response, generic::LIST).await
    }

    async fn delete_download(&self, name: &str) -> Result<(), AppError> {
        let endpoint = self.endpoint(&format!("api/delete/{}", urlencoding::encode(name)))?;
        let response = self.action(Method::DELETE, endpoint).send().await?;
        check_status(response, generic::DELETE).await?;
        Ok(())
    }

    fn artifact_url(&self, name: &str) -> Result<Url, AppError> {
        self.endpoint(&format!("download/{}", urlencoding::encode(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> HttpGateway {
        HttpGateway::new(&ClientConfig::new(base).unwrap()).unwrap()
    }

    #[test]
    fn test_endpoints_keep_base_path() {
        let gw = gateway("http://media.local:5000/ytdlp");
        assert_eq!(
            gw.endpoint("api/downloads").unwrap().as_str(),
            "http://media.local:5000/ytdlp/api/downloads"
        );
    }

    #[test]
    fn test_artifact_url_is_percent_encoded() {
        let gw = gateway("http://127.0.0.1:5000/");
        let url = gw.artifact_url("My Song #1.mp3").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/download/My%20Song%20%231.mp3");
    }

    #[test]
    fn test_artifact_url_keeps_slashes_inside_name() {
        let gw = gateway("http://127.0.0.1:5000/");
        let url = gw.artifact_url("../secret").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/download/..%2Fsecret");
    }
}
