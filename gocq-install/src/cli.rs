use crate::error::{GoCqError, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[clap(
    name = "gocq-install",
    version,
    about = "Install the go-cqhttp binary for this machine from GitHub Releases",
    long_about = None
)]
pub struct Args {
    /// Repository to install from
    /// Format: owner/repo[@tag]
    /// Examples: Mrs4s/go-cqhttp, Mrs4s/go-cqhttp@v1.0.0
    #[clap(value_name = "OWNER/REPO[@TAG]")]
    pub repo: Option<String>,

    /// Release tag (defaults to the most recent release)
    #[clap(short, long)]
    pub tag: Option<String>,

    /// Directory receiving the binary and its release metadata
    #[clap(short = 'd', long)]
    pub out_dir: Option<String>,

    /// Download mirror replacing https://github.com
    #[clap(long)]
    pub mirror: Option<String>,

    /// Configuration file path
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[clap(long)]
    pub verbose: bool,
}

impl Args {
    /// Split the positional repository into `owner/repo` and an optional tag.
    /// A tag given with `@` wins over `--tag`.
    pub fn parse_repo(&self) -> Result<Option<(String, Option<String>)>> {
        let Some(input) = self.repo.as_deref() else {
            return Ok(None);
        };

        let (repo, tag) = parse_repo_spec(input)?;
        Ok(Some((repo, tag.or_else(|| self.tag.clone()))))
    }
}

pub fn parse_repo_spec(input: &str) -> Result<(String, Option<String>)> {
    let (repo_part, tag_part) = match input.rsplit_once('@') {
        Some((repo, tag)) => (repo, Some(tag.to_string())),
        None => (input, None),
    };

    let parts: Vec<&str> = repo_part.split('/').collect();
    let valid = parts.len() == 2
        && parts.iter().all(|p| !p.is_empty())
        && tag_part.as_deref().map(|t| !t.is_empty()).unwrap_or(true);
    if !valid {
        return Err(GoCqError::InvalidRepo {
            input: input.to_string(),
        });
    }

    Ok((repo_part.to_string(), tag_part))
}
