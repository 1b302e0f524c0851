use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::asset;
use crate::config::InstallSettings;
use crate::error::{GoCqError, Result};
use crate::github::{ByteStream, GitHubClient, Release};
use crate::materialize::Materialization;
use crate::mirror;
use crate::platform::{HostInfo, PlatformTarget};
use crate::utils;

/// Release metadata written next to the installed binary.
pub const METADATA_FILE: &str = "index.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// A matching binary was already present; nothing was downloaded.
    AlreadyInstalled(PathBuf),
    Installed { tag: String, binary: PathBuf },
}

/// The release as persisted: every field except the asset list.
#[derive(Serialize)]
struct ReleaseRecord<'a> {
    tag_name: &'a str,
    #[serde(flatten)]
    extra: &'a serde_json::Map<String, serde_json::Value>,
}

pub struct Installer {
    settings: InstallSettings,
    target: PlatformTarget,
    github_client: GitHubClient,
}

impl Installer {
    pub fn new(settings: InstallSettings, host: &HostInfo) -> Result<Self> {
        let target = PlatformTarget::resolve(host)?;
        let github_client = GitHubClient::new(&settings.api_base)?;

        Ok(Self {
            settings,
            target,
            github_client,
        })
    }

    pub fn target(&self) -> PlatformTarget {
        self.target
    }

    pub fn out_dir(&self) -> &Path {
        &self.settings.out_dir
    }

    /// Fetch the configured release and install it.
    pub async fn run(&self) -> Result<InstallOutcome> {
        if let Some(existing) = self.installed()? {
            return Ok(InstallOutcome::AlreadyInstalled(existing));
        }

        tracing::info!(
            "Installing from {} (tag: {})",
            self.settings.repo,
            self.settings.tag.as_deref().unwrap_or("latest")
        );

        let release = self
            .github_client
            .release(&self.settings.repo, self.settings.tag.as_deref())
            .await?;

        self.install_release(&release).await
    }

    /// Install the binary for this host from `release`.
    ///
    /// On error the output directory has been removed.
    pub async fn install(&self, release: &Release) -> Result<InstallOutcome> {
        if let Some(existing) = self.installed()? {
            return Ok(InstallOutcome::AlreadyInstalled(existing));
        }

        self.install_release(release).await
    }

    fn installed(&self) -> Result<Option<PathBuf>> {
        let existing = utils::find_installed(&self.settings.out_dir, &self.settings.binary)?;
        if let Some(path) = &existing {
            tracing::info!("{} is already installed, skipping", path.display());
        }
        Ok(existing)
    }

    async fn install_release(&self, release: &Release) -> Result<InstallOutcome> {
        let asset = asset::select_asset(release, &self.settings.binary, &self.target)?;
        let url = mirror::rewrite(&asset.browser_download_url, self.settings.mirror.as_deref());
        let out_dir = &self.settings.out_dir;

        tracing::info!("Selected {} from release {}", asset.name, release.tag_name);

        let existed = out_dir.exists();
        let (created, download) = tokio::join!(
            create_out_dir(out_dir),
            self.github_client.open_download(&url)
        );
        let stream = match created.and(download) {
            Ok(stream) => stream,
            Err(e) if existed => return Err(e),
            Err(e) => return Err(rollback(out_dir, e).await),
        };

        let binary = self.commit(release, stream).await?;

        tracing::info!("Installed {} ({})", binary.display(), release.tag_name);
        Ok(InstallOutcome::Installed {
            tag: release.tag_name.clone(),
            binary,
        })
    }

    /// Write the metadata record and materialize `stream` into the output
    /// directory, which must already exist. Both run concurrently; if either
    /// fails the whole directory is removed before the error is returned.
    pub async fn commit(&self, release: &Release, stream: ByteStream) -> Result<PathBuf> {
        let out_dir = &self.settings.out_dir;
        let materialization =
            Materialization::for_target(&self.target, &self.settings.binary, out_dir);

        // wait for both, so no writer outlives the rollback
        let (metadata, binary) = tokio::join!(
            write_metadata(release, out_dir),
            materialization.consume(stream)
        );

        match metadata.and(binary) {
            Ok(binary) => Ok(binary),
            Err(e) => Err(rollback(out_dir, e).await),
        }
    }
}

async fn create_out_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| GoCqError::fs(dir, e))
}

async fn write_metadata(release: &Release, dir: &Path) -> Result<()> {
    let record = ReleaseRecord {
        tag_name: &release.tag_name,
        extra: &release.extra,
    };
    let json = serde_json::to_vec_pretty(&record)?;

    let path = dir.join(METADATA_FILE);
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| GoCqError::fs(&path, e))
}

/// Read back the metadata record of an installed release.
pub fn read_metadata(dir: &Path) -> Result<Release> {
    let path = dir.join(METADATA_FILE);
    let content = std::fs::read(&path).map_err(|e| GoCqError::fs(&path, e))?;
    Ok(serde_json::from_slice(&content)?)
}

/// Remove `dir` after `cause`. A failed removal is reported together with
/// the original error.
async fn rollback(dir: &Path, cause: GoCqError) -> GoCqError {
    tracing::warn!("Install failed, removing {}: {}", dir.display(), cause);

    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => cause,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => cause,
        Err(source) => {
            tracing::error!("Failed to remove {}: {}", dir.display(), source);
            GoCqError::RollbackFailed {
                path: dir.to_path_buf(),
                cause: Box::new(cause),
                source,
            }
        }
    }
}
