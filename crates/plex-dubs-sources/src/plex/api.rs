use anyhow::{Context, Result};
use reqwest::{Client, Method, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const CLIENT_IDENTIFIER: &str = "plex-dubs";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Plex metadata type numbers used by the library endpoints
pub const TYPE_MOVIE: u32 = 1;
pub const TYPE_SHOW: u32 = 2;
pub const TYPE_EPISODE: u32 = 4;
const TYPE_COLLECTION: u32 = 18;

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryInfo {
    pub key: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataItem {
    pub rating_key: String,
    #[serde(default)]
    pub title: String,
    /// Season number, for episodes
    #[serde(default)]
    pub parent_index: Option<u32>,
    /// Episode number within the season
    #[serde(default)]
    pub index: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaContainer {
    #[serde(rename = "machineIdentifier", default)]
    machine_identifier: Option<String>,
    #[serde(rename = "Metadata", default)]
    metadata: Vec<MetadataItem>,
    #[serde(rename = "Directory", default)]
    directory: Vec<LibraryInfo>,
}

#[derive(Debug, Deserialize)]
struct PlexResponse {
    #[serde(rename = "MediaContainer", default)]
    media_container: MediaContainer,
}

/// Thin wrapper over the Plex Media Server HTTP API
#[derive(Debug, Clone)]
pub struct PlexHttpClient {
    client: Client,
    server_url: String,
}

impl PlexHttpClient {
    pub fn new(server_url: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::ACCEPT,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers.insert(
                    reqwest::header::HeaderName::from_static("x-plex-token"),
                    reqwest::header::HeaderValue::from_str(token).context("Invalid token format")?,
                );
                headers.insert(
                    reqwest::header::HeaderName::from_static("x-plex-client-identifier"),
                    reqwest::header::HeaderValue::from_static(CLIENT_IDENTIFIER),
                );
                headers.insert(
                    reqwest::header::HeaderName::from_static("x-plex-product"),
                    reqwest::header::HeaderValue::from_static(CLIENT_IDENTIFIER),
                );
                headers
            })
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// The server's machine identifier, needed to build item URIs
    pub async fn identity(&self) -> Result<String> {
        let container = self.get_container("/identity", "Failed to get server identity").await?;
        container
            .machine_identifier
            .ok_or_else(|| anyhow::anyhow!("Plex identity response has no machineIdentifier"))
    }

    /// Connect to the server, retrying with exponential backoff.
    ///
    /// Returns the machine identifier of the server.
    pub async fn connect_with_retry(&self, max_attempts: u32, initial_delay: Duration) -> Result<String> {
        let mut delay = initial_delay;
        let mut attempt = 1;

        loop {
            match self.identity().await {
                Ok(machine_id) => {
                    info!(
                        operation = "plex_connect",
                        server = %self.server_url,
                        attempt,
                        "Connected to Plex server"
                    );
                    return Ok(machine_id);
                }
                Err(e) if attempt < max_attempts => {
                    warn!(
                        "Plex connection attempt {}/{} failed: {:#}. Retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e).context(format!(
                        "Failed to connect to Plex at {} after {} attempts",
                        self.server_url, max_attempts
                    ));
                }
            }
        }
    }

    pub async fn get_libraries(&self) -> Result<Vec<LibraryInfo>> {
        let container = self
            .get_container("/library/sections", "Failed to get libraries")
            .await?;
        Ok(container.directory)
    }

    /// Items of `type_num` in a section whose title matches `title` (server side search)
    pub async fn search_library(&self, section_key: &str, type_num: u32, title: &str) -> Result<Vec<MetadataItem>> {
        let path = format!(
            "/library/sections/{}/all?type={}&title={}",
            section_key,
            type_num,
            urlencoding::encode(title)
        );
        let container = self.get_container(&path, "Failed to search library").await?;
        Ok(container.metadata)
    }

    /// Every item of `type_num` in a section
    pub async fn list_library(&self, section_key: &str, type_num: u32) -> Result<Vec<MetadataItem>> {
        let path = format!("/library/sections/{}/all?type={}", section_key, type_num);
        let container = self.get_container(&path, "Failed to list library").await?;
        Ok(container.metadata)
    }

    /// All episodes of a show
    pub async fn get_all_leaves(&self, show_rating_key: &str) -> Result<Vec<MetadataItem>> {
        let path = format!("/library/metadata/{}/allLeaves", show_rating_key);
        let container = self.get_container(&path, "Failed to get episodes").await?;
        Ok(container.metadata)
    }

    pub async fn get_collections(&self, section_key: &str) -> Result<Vec<MetadataItem>> {
        let path = format!("/library/sections/{}/collections", section_key);
        let container = self.get_container(&path, "Failed to get collections").await?;
        Ok(container.metadata)
    }

    /// Items of a collection in their current sort order
    pub async fn collection_items(&self, collection_key: &str) -> Result<Vec<MetadataItem>> {
        let path = format!("/library/collections/{}/children", collection_key);
        let container = self
            .get_container(&path, "Failed to get collection items")
            .await?;
        Ok(container.metadata)
    }

    /// Create a collection seeded with one item; returns the collection's rating key
    pub async fn create_collection(
        &self,
        section_key: &str,
        type_num: u32,
        title: &str,
        machine_id: &str,
        rating_key: &str,
    ) -> Result<String> {
        let path = format!(
            "/library/collections?type={}&title={}&smart=0&sectionId={}&uri={}",
            type_num,
            urlencoding::encode(title),
            section_key,
            urlencoding::encode(&self.item_uri(machine_id, rating_key))
        );
        let response = self.send(Method::POST, &path, "Failed to create collection").await?;
        let body: PlexResponse = response
            .json()
            .await
            .context("Failed to parse create collection response")?;

        body.media_container
            .metadata
            .into_iter()
            .next()
            .map(|item| item.rating_key)
            .ok_or_else(|| anyhow::anyhow!("Create collection response has no collection"))
    }

    /// Switch a collection to manual ("custom") ordering
    pub async fn set_custom_sort(&self, section_key: &str, collection_key: &str) -> Result<()> {
        let path = format!(
            "/library/sections/{}/all?type={}&id={}&collectionSort=2",
            section_key, TYPE_COLLECTION, collection_key
        );
        self.send(Method::PUT, &path, "Failed to set collection sort").await?;
        Ok(())
    }

    pub async fn add_to_collection(&self, collection_key: &str, machine_id: &str, rating_key: &str) -> Result<()> {
        let path = format!(
            "/library/collections/{}/items?uri={}",
            collection_key,
            urlencoding::encode(&self.item_uri(machine_id, rating_key))
        );
        self.send(Method::PUT, &path, "Failed to add item to collection").await?;
        Ok(())
    }

    /// Move an item to the front of a custom-sorted collection
    pub async fn move_to_front(&self, collection_key: &str, rating_key: &str) -> Result<()> {
        let path = format!("/library/collections/{}/items/{}/move", collection_key, rating_key);
        self.send(Method::PUT, &path, "Failed to move collection item").await?;
        Ok(())
    }

    pub async fn remove_from_collection(&self, collection_key: &str, rating_key: &str) -> Result<()> {
        let path = format!("/library/collections/{}/items/{}", collection_key, rating_key);
        self.send(Method::DELETE, &path, "Failed to remove item from collection").await?;
        Ok(())
    }

    fn item_uri(&self, machine_id: &str, rating_key: &str) -> String {
        format!(
            "server://{}/com.plexapp.plugins.library/library/metadata/{}",
            machine_id, rating_key
        )
    }

    async fn get_container(&self, path: &str, context: &'static str) -> Result<MediaContainer> {
        let response = self.send(Method::GET, path, context).await?;
        let body: PlexResponse = response
            .json()
            .await
            .with_context(|| format!("{}: unparseable response", context))?;
        Ok(body.media_container)
    }

    async fn send(&self, method: Method, path: &str, context: &'static str) -> Result<Response> {
        let url = format!("{}{}", self.server_url, path);
        debug!("Plex API: {} {}", method, url);

        let response = self
            .client
            .request(method, &url)
            .send()
            .await
            .context(context)?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(anyhow::anyhow!("{}: HTTP {} {}", context, status, body))
        }
    }
}
