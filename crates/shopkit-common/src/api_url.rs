//! Url

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::{ParseError, Url};

use crate::ensure_shopkit;

/// Url Error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Url error
    #[error(transparent)]
    Url(#[from] ParseError),
    /// Invalid URL structure
    #[error("Invalid URL")]
    InvalidUrl,
}

impl From<Error> for crate::error::Error {
    fn from(_: Error) -> Self {
        crate::error::Error::InvalidUrl
    }
}

/// Base URL of the commerce API
///
/// Stored in a normalized form so two spellings of the same base compare
/// equal: lowercased scheme and host, trailing slashes removed, path case
/// preserved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiUrl(String);

impl Serialize for ApiUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ApiUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ApiUrl::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl ApiUrl {
    fn format_url(url: &str) -> Result<String, Error> {
        ensure_shopkit!(!url.is_empty(), Error::InvalidUrl);

        let url = url.trim_end_matches('/');
        // https://API.example.com/Base/PATH -> https://api.example.com/Base/PATH
        let (protocol, rest) = url.split_once("://").ok_or(Error::InvalidUrl)?;
        ensure_shopkit!(!protocol.is_empty(), Error::InvalidUrl);
        let (host, path) = match rest.split_once('/') {
            Some((host, path)) => (host, Some(path)),
            None => (rest, None),
        };
        ensure_shopkit!(!host.is_empty(), Error::InvalidUrl);

        let mut formatted = format!("{}://{}", protocol.to_lowercase(), host.to_lowercase());
        if let Some(path) = path {
            formatted.push('/');
            formatted.push_str(path);
        }
        Ok(formatted)
    }

    /// Join onto url
    pub fn join(&self, path: &str) -> Result<Url, Error> {
        let url = Url::parse(&self.0)?;

        let base_path = url.path();

        // Avoid a double slash when the base already ends with one
        let joined = if base_path.ends_with('/') {
            format!("{base_path}{path}")
        } else {
            format!("{base_path}/{path}")
        };

        let mut result = url.clone();
        result.set_path(&joined);
        Ok(result)
    }

    /// Append path elements onto the URL
    pub fn join_paths(&self, path_elements: &[&str]) -> Result<Url, Error> {
        self.join(&path_elements.join("/"))
    }
}

impl FromStr for ApiUrl {
    type Err = Error;

    fn from_str(url: &str) -> Result<Self, Self::Err> {
        Self::format_url(url).map(Self).map_err(|_| Error::InvalidUrl)
    }
}

impl fmt::Display for ApiUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
