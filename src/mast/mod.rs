//! # MAST service clients
//!
//! [`MastClient`] implements both collaborator traits of the pipeline over HTTP:
//!
//! - [`FootprintService`] through the Tesscut API ([`tesscut`]),
//! - [`CatalogService`] through the portal `invoke` API ([`invoke`]).
//!
//! Tesscut only accepts positions, so name and `"TIC <n>"` queries are first
//! resolved with `Mast.Name.Lookup`; an unknown name surfaces as
//! [`TesscopeError::InvalidObjectName`]. Resolved positions are kept for the
//! lifetime of the client (and its clones), so the window query, the cutout
//! query and the catalog query of one name share a single lookup.
//!
//! ## Example
//!
//! ```rust, no_run
//! use tesscope::{config::PipelineConfig, mast::MastClient, footprint::FootprintService};
//!
//! # async fn run() -> Result<(), tesscope::tesscope_errors::TesscopeError> {
//! let client = MastClient::new(PipelineConfig::default())?;
//! let betelgeuse = client.resolve_name("Betelgeuse").await?;
//! println!("{betelgeuse}");
//! # Ok(())
//! # }
//! ```

pub mod cutout_archive;
pub mod fits_header;
pub mod invoke;
pub mod tesscut;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{
    catalog::{CatalogRow, CatalogService},
    config::PipelineConfig,
    constants::Degree,
    coordinates::SkyCoord,
    env_state::TesscopeEnv,
    footprint::{Cutout, FootprintQuery, FootprintService, SectorWindow},
    resolver::TicId,
    tesscope_errors::TesscopeError,
};

#[derive(Debug, Clone)]
pub struct MastClient {
    env: TesscopeEnv,
    /// Successful `Mast.Name.Lookup` answers, by name
    resolved: Arc<Mutex<HashMap<String, SkyCoord>>>,
}

impl MastClient {
    pub fn new(config: PipelineConfig) -> Result<Self, TesscopeError> {
        Ok(MastClient::from_env(TesscopeEnv::new(config)?))
    }

    pub fn from_env(env: TesscopeEnv) -> Self {
        MastClient {
            env,
            resolved: Arc::default(),
        }
    }

    pub fn env(&self) -> &TesscopeEnv {
        &self.env
    }

    fn cached(&self, name: &str) -> Option<SkyCoord> {
        self.resolved
            .lock()
            .ok()
            .and_then(|resolved| resolved.get(name).copied())
    }

    fn remember(&self, name: &str, coord: SkyCoord) {
        if let Ok(mut resolved) = self.resolved.lock() {
            resolved.insert(name.to_string(), coord);
        }
    }

    async fn lookup(&self, name: &str) -> Result<SkyCoord, TesscopeError> {
        if let Some(coord) = self.cached(name) {
            log::debug!("{name}: cached position {coord}");
            return Ok(coord);
        }
        let coord = invoke::lookup_name(&self.env, name).await?;
        self.remember(name, coord);
        Ok(coord)
    }

    async fn position(&self, query: &FootprintQuery) -> Result<SkyCoord, TesscopeError> {
        match query {
            FootprintQuery::Coordinates(coord) => Ok(*coord),
            FootprintQuery::ObjectName(name) | FootprintQuery::CatalogId(name) => {
                self.lookup(name).await
            }
        }
    }
}

impl FootprintService for MastClient {
    async fn get_sectors(
        &self,
        query: &FootprintQuery,
        radius: Degree,
    ) -> Result<Vec<SectorWindow>, TesscopeError> {
        let coord = self.position(query).await?;
        tesscut::get_sectors(&self.env, &coord, radius).await
    }

    async fn get_cutouts(&self, query: &FootprintQuery) -> Result<Vec<Cutout>, TesscopeError> {
        let coord = self.position(query).await?;
        tesscut::get_cutouts(&self.env, &coord).await
    }

    async fn resolve_name(&self, name: &str) -> Result<SkyCoord, TesscopeError> {
        self.lookup(name).await
    }
}

impl CatalogService for MastClient {
    async fn query_by_id(&self, tic_id: &TicId) -> Result<Vec<CatalogRow>, TesscopeError> {
        invoke::tic_by_id(&self.env, tic_id).await
    }

    async fn query_by_name(
        &self,
        name: &str,
        radius: Degree,
    ) -> Result<Vec<CatalogRow>, TesscopeError> {
        let coord = self.lookup(name).await?;
        invoke::tic_cone(&self.env, &coord, radius).await
    }

    async fn query_by_region(
        &self,
        coord: &SkyCoord,
        radius: Degree,
    ) -> Result<Vec<CatalogRow>, TesscopeError> {
        invoke::tic_cone(&self.env, coord, radius).await
    }
}

#[cfg(test)]
mod mast_test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    use super::*;

    /// Read one HTTP request: headers, then `content-length` bytes of body.
    async fn read_request(socket: &mut TcpStream) {
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&request).to_ascii_lowercase();
            if let Some(end) = text.find("\r\n\r\n") {
                let body_len = text
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|len| len.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + body_len {
                    return;
                }
            }
        }
    }

    /// Answer every request with `body`, counting the requests.
    async fn canned_service(body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/invoke", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = listener.accept().await.unwrap();
                read_request(&mut socket).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });
        (url, hits)
    }

    #[tokio::test]
    async fn test_name_is_looked_up_once() {
        let (url, hits) =
            canned_service(r#"{"resolvedCoordinate": [{"ra": 88.7929583, "decl": 7.4070639}]}"#)
                .await;
        let client = MastClient::new(PipelineConfig::default().with_endpoints(&url, &url)).unwrap();

        let coord = client.resolve_name("Betelgeuse").await.unwrap();
        assert_eq!((coord.ra, coord.dec), (88.7929583, 7.4070639));

        let query = FootprintQuery::ObjectName("Betelgeuse".into());
        assert_eq!(client.position(&query).await.unwrap(), coord);
        assert_eq!(client.clone().position(&query).await.unwrap(), coord);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        client.resolve_name("TIC 141914082").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_name_is_not_cached() {
        let (url, hits) = canned_service(r#"{"resolvedCoordinate": []}"#).await;
        let client = MastClient::new(PipelineConfig::default().with_endpoints(&url, &url)).unwrap();

        for _ in 0..2 {
            assert!(matches!(
                client.resolve_name("Not A Star").await,
                Err(TesscopeError::InvalidObjectName(_))
            ));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
