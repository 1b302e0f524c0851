//! Host detection and mapping to the release naming convention.

use crate::error::{GoCqError, Result};
use crate::mirror::MIRROR_ENV;
use std::fmt;

/// Raw identifiers describing the machine we are installing for.
///
/// Captured once from the running process by [`HostInfo::current`]; tests build
/// synthetic hosts directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub arch: String,
    pub os: String,
    pub mirror: Option<String>,
}

impl HostInfo {
    pub fn current() -> Self {
        Self {
            arch: std::env::consts::ARCH.to_string(),
            os: std::env::consts::OS.to_string(),
            mirror: std::env::var(MIRROR_ENV).ok().filter(|m| !m.is_empty()),
        }
    }

    pub fn new(arch: impl Into<String>, os: impl Into<String>) -> Self {
        Self {
            arch: arch.into(),
            os: os.into(),
            mirror: None,
        }
    }

    pub fn with_mirror(mut self, mirror: impl Into<String>) -> Self {
        self.mirror = Some(mirror.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86,
    X86_64,
    Arm64,
    ArmV7,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86 => "386",
            Arch::X86_64 => "amd64",
            Arch::Arm64 => "arm64",
            Arch::ArmV7 => "armv7",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Darwin,
    Linux,
    Windows,
}

impl Os {
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Darwin => "darwin",
            Os::Linux => "linux",
            Os::Windows => "windows",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The platform/arch pair a release asset is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformTarget {
    pub os: Os,
    pub arch: Arch,
}

impl PlatformTarget {
    pub fn resolve(host: &HostInfo) -> Result<Self> {
        Ok(Self {
            os: resolve_platform(host)?,
            arch: resolve_arch(host)?,
        })
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }
}

pub fn resolve_arch(host: &HostInfo) -> Result<Arch> {
    match host.arch.as_str() {
        "x86" | "i386" | "i686" => Ok(Arch::X86),
        "x86_64" | "amd64" => Ok(Arch::X86_64),
        "aarch64" | "arm64" => Ok(Arch::Arm64),
        "arm" | "armv7" => Ok(Arch::ArmV7),
        other => Err(GoCqError::UnsupportedArchitecture {
            arch: other.to_string(),
        }),
    }
}

pub fn resolve_platform(host: &HostInfo) -> Result<Os> {
    match host.os.as_str() {
        "macos" | "darwin" => Ok(Os::Darwin),
        "linux" => Ok(Os::Linux),
        "windows" => Ok(Os::Windows),
        other => Err(GoCqError::UnsupportedPlatform {
            os: other.to_string(),
        }),
    }
}
