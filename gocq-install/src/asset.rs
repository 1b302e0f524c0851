use crate::error::{GoCqError, Result};
use crate::github::{Asset, Release};
use crate::platform::PlatformTarget;

/// Extension of the packaged (non-Windows) distributions.
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// Name of the release asset built for `target`.
pub fn expected_asset_name(binary: &str, target: &PlatformTarget) -> String {
    let ext = if target.is_windows() {
        "exe"
    } else {
        ARCHIVE_EXTENSION
    };
    format!("{binary}_{}_{}.{ext}", target.os, target.arch)
}

/// Find the asset built for `target`. There is no fallback naming scheme.
pub fn select_asset<'a>(
    release: &'a Release,
    binary: &str,
    target: &PlatformTarget,
) -> Result<&'a Asset> {
    let expected = expected_asset_name(binary, target);

    release
        .assets
        .iter()
        .find(|asset| asset.name == expected)
        .ok_or_else(|| {
            let available = release
                .assets
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            GoCqError::AssetNotFound {
                expected,
                tag: release.tag_name.clone(),
                available: if available.is_empty() {
                    "No assets available".to_string()
                } else {
                    available
                },
            }
        })
}
