//! Host platform and architecture resolution.
//!
//! The catalog keys binaries by platform (`linux`, `mac`, `win`) and
//! architecture (`x64`, `ia32`, `arm64`). This module maps the compile-time
//! target onto those keys.

use std::fmt;
use std::str::FromStr;

/// Operating system family, as named in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {
    Linux,
    Mac,
    Win,
}

impl Platform {
    /// Catalog key for this platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Mac => "mac",
            Self::Win => "win",
        }
    }

    /// Platform of the running binary, if it is one the catalog knows.
    pub fn current() -> Option<Self> {
        Self::from_os(std::env::consts::OS)
    }

    fn from_os(os: &str) -> Option<Self> {
        match os {
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::Mac),
            "windows" => Some(Self::Win),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "mac" | "darwin" | "macos" => Ok(Self::Mac),
            "win" | "win32" | "windows" => Ok(Self::Win),
            other => Err(format!("unknown platform '{}'", other)),
        }
    }
}

/// CPU architecture, as named in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    X64,
    Ia32,
    Arm64,
}

impl Arch {
    /// Catalog key for this architecture.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Ia32 => "ia32",
            Self::Arm64 => "arm64",
        }
    }

    /// Architecture of the running binary, if it is one the catalog knows.
    pub fn current() -> Option<Self> {
        Self::from_arch(std::env::consts::ARCH)
    }

    fn from_arch(arch: &str) -> Option<Self> {
        match arch {
            "x86_64" => Some(Self::X64),
            "x86" => Some(Self::Ia32),
            "aarch64" => Some(Self::Arm64),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x64" | "x86_64" | "amd64" => Ok(Self::X64),
            "ia32" | "x86" | "i686" => Ok(Self::Ia32),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            other => Err(format!("unknown architecture '{}'", other)),
        }
    }
}

/// A platform/architecture pair used to select a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostTarget {
    pub platform: Platform,
    pub arch: Arch,
}

impl HostTarget {
    pub fn new(platform: Platform, arch: Arch) -> Self {
        Self { platform, arch }
    }

    /// Target of the running binary.
    ///
    /// Returns `None` on hosts the catalog format has no key for.
    pub fn current() -> Option<Self> {
        Some(Self::new(Platform::current()?, Arch::current()?))
    }
}

impl fmt::Display for HostTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.platform, self.arch)
    }
}
