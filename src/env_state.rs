//! # tesscope environment state
//!
//! This module defines [`crate::env_state::TesscopeEnv`], the **shared environment object**
//! handed to the MAST service clients. It owns:
//!
//! - A persistent **HTTP client** ([`reqwest::Client`]) configured with the connect and
//!   request timeouts from [`PipelineConfig`].
//! - The [`PipelineConfig`] itself, so every client reads endpoints and sizes from one place.
//!
//! The object is **cheaply cloneable** (the reqwest client is reference counted) and is
//! meant to be shared by every worker of a batch.
//!
//! ## Error mapping
//!
//! Transport failures are converted with [`TesscopeError::from_transport`], so a connect
//! timeout reaches the caller as [`TesscopeError::ConnectTimeout`] and stays distinguishable
//! from a malformed answer. Non-2xx answers become [`TesscopeError::QueryError`].
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};

use crate::{config::PipelineConfig, tesscope_errors::TesscopeError};

#[derive(Debug, Clone)]
pub struct TesscopeEnv {
    pub http_client: Client,
    pub config: PipelineConfig,
}

impl TesscopeEnv {
    /// Create the environment from an explicit configuration.
    ///
    /// Return
    /// ------
    /// * The environment, or [`TesscopeError::ReqwestError`] if the HTTP client cannot be built.
    pub fn new(config: PipelineConfig) -> Result<Self, TesscopeError> {
        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(concat!("tesscope/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(TesscopeEnv {
            http_client,
            config,
        })
    }

    async fn check_status(service: &str, response: Response) -> Result<Response, TesscopeError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TesscopeError::QueryError(format!(
            "{service}: HTTP {status}: {}",
            body.chars().take(200).collect::<String>()
        )))
    }

    /// GET `url` with the given query string and decode the JSON answer.
    pub(crate) async fn get_json<Q, T>(
        &self,
        service: &str,
        url: &str,
        query: &Q,
    ) -> Result<T, TesscopeError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        log::debug!("GET {url} ({service})");
        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| TesscopeError::from_transport(service, e))?;
        let response = Self::check_status(service, response).await?;
        let text = response
            .text()
            .await
            .map_err(|e| TesscopeError::from_transport(service, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// GET `url` with the given query string and return the raw body.
    pub(crate) async fn get_bytes<Q>(
        &self,
        service: &str,
        url: &str,
        query: &Q,
    ) -> Result<Vec<u8>, TesscopeError>
    where
        Q: Serialize + ?Sized,
    {
        log::debug!("GET {url} ({service})");
        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| TesscopeError::from_transport(service, e))?;
        let response = Self::check_status(service, response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TesscopeError::from_transport(service, e))?;
        Ok(bytes.to_vec())
    }

    /// POST a urlencoded form to `url` and decode the JSON answer.
    pub(crate) async fn post_form_json<F, T>(
        &self,
        service: &str,
        url: &str,
        form: &F,
    ) -> Result<T, TesscopeError>
    where
        F: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        log::debug!("POST {url} ({service})");
        let response = self
            .http_client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| TesscopeError::from_transport(service, e))?;
        let response = Self::check_status(service, response).await?;
        let text = response
            .text()
            .await
            .map_err(|e| TesscopeError::from_transport(service, e))?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod env_state_test {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_env_from_config() {
        let config = PipelineConfig::default().with_batch_concurrency(2);
        let env = TesscopeEnv::new(config.clone()).unwrap();
        assert_eq!(env.config, config);
    }

    /// A listener that accepts connections but never answers.
    async fn silent_server() -> (tokio::net::TcpListener, String) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        (listener, url)
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_query_error() {
        let mut config = PipelineConfig::default();
        config.connect_timeout = Duration::from_millis(200);
        config.request_timeout = Duration::from_millis(500);
        let env = TesscopeEnv::new(config).unwrap();

        // bind then drop: nothing listens on that port any more
        let (listener, url) = silent_server().await;
        drop(listener);

        let result: Result<serde_json::Value, _> = env
            .get_json("tesscut", &format!("{url}/sector"), &[("ra", "1.0")])
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, TesscopeError::QueryError(_)), "{err:?}");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_silent_service_is_a_connect_timeout() {
        let mut config = PipelineConfig::default();
        config.request_timeout = Duration::from_millis(200);
        let env = TesscopeEnv::new(config).unwrap();
        let (_listener, url) = silent_server().await;

        let result: Result<serde_json::Value, _> = env
            .get_json("tesscut", &format!("{url}/sector"), &[("ra", "1.0")])
            .await;
        let err = result.unwrap_err();
        assert_eq!(err, TesscopeError::ConnectTimeout("tesscut".into()));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_from_transport_maps_timeouts() {
        let (_listener, url) = silent_server().await;
        let client = Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let err = client.get(&url).send().await.unwrap_err();
        assert!(err.is_timeout());

        assert_eq!(
            TesscopeError::from_transport("Mast.Name.Lookup", err),
            TesscopeError::ConnectTimeout("Mast.Name.Lookup".into())
        );
    }
}
