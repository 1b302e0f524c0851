//! Download URL rewriting for network-restricted environments.

/// Environment variable overriding the download mirror.
pub const MIRROR_ENV: &str = "GITHUB_MIRROR";

/// Mirror used when no override is configured.
pub const DEFAULT_MIRROR: &str = "https://download.fastgit.org";

const CANONICAL_HOST: &str = "https://github.com";

/// Replace the canonical GitHub host of `url` with `mirror`, or the default
/// mirror when none is given. URLs on other hosts are returned unchanged.
pub fn rewrite(url: &str, mirror: Option<&str>) -> String {
    let mirror = mirror.unwrap_or(DEFAULT_MIRROR).trim_end_matches('/');

    match url.strip_prefix(CANONICAL_HOST) {
        Some(path) if path.is_empty() || path.starts_with('/') => format!("{mirror}{path}"),
        _ => url.to_string(),
    }
}
