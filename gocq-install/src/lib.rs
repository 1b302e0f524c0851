//! # gocq-install
//!
//! Downloads and installs the prebuilt `go-cqhttp` binary for the host machine
//! from a GitHub release.
//!
//! ## Overview
//!
//! The host's architecture and operating system are mapped to the release
//! naming convention (`go-cqhttp_<platform>_<arch>.<ext>`), the matching asset
//! is located in the release metadata, and its bytes are streamed into the
//! output directory: written directly for Windows, extracted from a `.tar.gz`
//! everywhere else. The release metadata (minus its asset list) is stored as
//! `index.json` beside the binary.
//!
//! The output directory is either fully installed or absent once an install
//! attempt returns. If any step of materialization fails, the directory is
//! removed before the error is reported.
//!
//! ## Usage
//!
//! ```no_run
//! use gocq_install::config::InstallSettings;
//! use gocq_install::installer::Installer;
//! use gocq_install::platform::HostInfo;
//!
//! # async fn demo() -> gocq_install::error::Result<()> {
//! let host = HostInfo::current();
//! let mut settings = InstallSettings::new("./bin");
//! settings.mirror = host.mirror.clone();
//! let installer = Installer::new(settings, &host)?;
//! installer.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! `GITHUB_MIRROR` overrides the download mirror; without it, download URLs are
//! rewritten to `https://download.fastgit.org`. A TOML file at
//! `~/.config/gocq-install.toml` can set the repository, output directory,
//! API base URL and mirror.

/// Asset naming and selection within a release
pub mod asset;

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Configuration file handling and settings resolution
pub mod config;

/// Error types and error handling utilities
pub mod error;

/// GitHub API client for release metadata and asset downloads
pub mod github;

/// The install pipeline: idempotence check, download, commit and rollback
pub mod installer;

/// Direct-write and archive-extraction strategies for a download stream
pub mod materialize;

/// Download mirror rewriting
pub mod mirror;

/// Host architecture and platform resolution
pub mod platform;

/// Filesystem helpers
pub mod utils;
