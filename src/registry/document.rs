use crate::core::{EsmError, EsmResult};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Registry packument: `GET {registry}/{name}`
///
/// Only the fields the converter reads are modelled. Version records stay
/// raw until one is selected, so a malformed record for some old release
/// cannot break resolution of the others.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageDocument {
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, String>,

    #[serde(default)]
    pub versions: BTreeMap<String, serde_json::Value>,
}

/// The part of a published release needed to fetch it
#[derive(Debug, Clone, Deserialize)]
pub struct VersionRecord {
    pub dist: DistInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistInfo {
    pub tarball: String,

    /// Subresource-integrity string, e.g. `sha512-<base64>`
    #[serde(default)]
    pub integrity: Option<String>,
}

/// A request pinned to a concrete published version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub name: String,
    pub version: String,
    pub tarball_url: String,
    pub integrity: Option<String>,
}

impl PackageDocument {
    /// Turn a version selector into the concrete version it names
    ///
    /// `latest` (and any other dist-tag) goes through `dist-tags`; anything
    /// else is taken as a version key.
    pub fn concrete_version<'a>(&'a self, selector: &'a str) -> Option<&'a str> {
        match self.dist_tags.get(selector) {
            Some(tagged) => Some(tagged.as_str()),
            None if selector == "latest" => None,
            None => Some(selector),
        }
    }

    pub fn resolve(&self, name: &str, selector: &str) -> EsmResult<ResolvedVersion> {
        let not_found = || EsmError::VersionNotFound {
            name: name.to_string(),
            version: selector.to_string(),
        };

        let version = self.concrete_version(selector).ok_or_else(not_found)?;
        let raw = self.versions.get(version).ok_or_else(not_found)?;
        let record = VersionRecord::deserialize(raw).map_err(|e| EsmError::MalformedDocument {
            name: name.to_string(),
            reason: format!("version {}: {}", version, e),
        })?;

        Ok(ResolvedVersion {
            name: name.to_string(),
            version: version.to_string(),
            tarball_url: record.dist.tarball,
            integrity: record.dist.integrity,
        })
    }
}
