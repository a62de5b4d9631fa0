//! Release metadata as returned by the GitHub releases API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::UpdateError;
use crate::upgrade::version::strip_tag_prefix;

/// A release track.
///
/// `Stable`, `Beta` and `Rc` can be requested; `Prerelease` only appears when
/// classifying a release whose tag matches neither marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Stable,
    Beta,
    Rc,
    Prerelease,
}

impl Channel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Beta => "beta",
            Self::Rc => "rc",
            Self::Prerelease => "prerelease",
        }
    }

    /// Tag fragment that identifies releases on this channel.
    #[must_use]
    pub const fn tag_marker(&self) -> Option<&'static str> {
        match self {
            Self::Beta => Some("-beta"),
            Self::Rc => Some("-rc"),
            Self::Stable | Self::Prerelease => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = UpdateError;

    /// Parse a requestable channel name. `prerelease` is not requestable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stable" => Ok(Self::Stable),
            "beta" => Ok(Self::Beta),
            "rc" => Ok(Self::Rc),
            _ => Err(UpdateError::UnknownChannel {
                channel: s.to_string(),
            }),
        }
    }
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// A remote release descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    #[serde(rename = "tag_name")]
    pub tag: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Changelog in markdown.
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Release {
    /// The tag without its leading `v`.
    #[must_use]
    pub fn version(&self) -> &str {
        strip_tag_prefix(&self.tag)
    }

    /// Classify the release into a channel.
    #[must_use]
    pub fn channel(&self) -> Channel {
        if !self.prerelease {
            Channel::Stable
        } else if self.tag.contains("-beta") {
            Channel::Beta
        } else if self.tag.contains("-rc") {
            Channel::Rc
        } else {
            Channel::Prerelease
        }
    }

    #[must_use]
    pub fn changelog(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}
