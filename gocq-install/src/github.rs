use crate::error::{GoCqError, Result};
use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt, TryStreamExt};
use octocrab::Octocrab;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Public GitHub REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Body of a download response, consumed chunk by chunk.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// One published release.
///
/// Only the fields the installer reads are typed; everything else the API
/// returned is kept in `extra` so it can be written back out as metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

pub struct GitHubClient {
    octocrab: Octocrab,
    http_client: Client,
}

impl GitHubClient {
    pub fn new(api_base: &str) -> Result<Self> {
        let builder = Octocrab::builder().base_uri(api_base)?;
        let octocrab = if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            builder.personal_token(token).build()?
        } else {
            builder.build()?
        };

        // no request timeout: the download stream may legitimately run long
        let http_client = Client::builder().user_agent("gocq-install").build()?;

        Ok(Self {
            octocrab,
            http_client,
        })
    }

    /// Fetch release by tag or get latest release
    pub async fn release(&self, repo: &str, tag: Option<&str>) -> Result<Release> {
        match tag {
            Some(tag) => self.release_by_tag(repo, tag).await,
            None => self.latest_release(repo).await,
        }
    }

    /// First entry of the release list, which GitHub orders newest first.
    pub async fn latest_release(&self, repo: &str) -> Result<Release> {
        tracing::debug!("Fetching latest release for {}", repo);

        let releases: Vec<Release> = self
            .octocrab
            .get(format!("/repos/{repo}/releases"), None::<&()>)
            .await
            .map_err(|e| not_found_or(e, repo, "latest"))?;

        releases
            .into_iter()
            .next()
            .ok_or_else(|| GoCqError::NotFound {
                repo: repo.to_string(),
                tag: "latest".to_string(),
            })
    }

    pub async fn release_by_tag(&self, repo: &str, tag: &str) -> Result<Release> {
        tracing::debug!("Fetching release '{}' for {}", tag, repo);

        self.octocrab
            .get(format!("/repos/{repo}/releases/tags/{tag}"), None::<&()>)
            .await
            .map_err(|e| not_found_or(e, repo, tag))
    }

    /// Issue the download request and hand back the response body as a stream.
    pub async fn open_download(&self, url: &str) -> Result<ByteStream> {
        tracing::info!("Downloading {}", url);

        let response = self.http_client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GoCqError::Download {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed())
    }
}

fn not_found_or(err: octocrab::Error, repo: &str, tag: &str) -> GoCqError {
    match &err {
        octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 404 => {
            GoCqError::NotFound {
                repo: repo.to_string(),
                tag: tag.to_string(),
            }
        }
        _ => {
            tracing::error!("Failed to fetch release '{}' for {}: {}", tag, repo, err);
            err.into()
        }
    }
}
