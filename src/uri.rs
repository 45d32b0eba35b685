//! URI-reference helper backing namespace resolution.
//!
//! A [`UriRef`] is a validated base URI normalized to end with `#`, so that
//! appending a fragment always produces `base#fragment` with exactly one
//! hash between the parts.

use std::fmt;

use oxiri::Iri;

use crate::error::{RdfError, Result};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UriRef {
    uri: String,
}

impl UriRef {
    /// Validates `uri` and appends a trailing `#` when absent.
    /// Empty and malformed strings are rejected.
    pub fn parse(uri: &str) -> Result<UriRef> {
        if uri.is_empty() {
            return Err(RdfError::InvalidUri("empty uri".to_string()));
        }
        Iri::parse(uri).map_err(|err| RdfError::InvalidUri(format!("{uri}: {err}")))?;
        let uri = if uri.ends_with('#') {
            uri.to_string()
        } else {
            format!("{uri}#")
        };
        Ok(UriRef { uri })
    }

    /// Appends `fragment` to the reference. A leading `#` on the fragment is
    /// stripped first, so repeated `#` characters never double up.
    pub fn add_fragment(&self, fragment: &str) -> UriRef {
        UriRef {
            uri: format!("{}{}", self.uri, fragment.trim_start_matches('#')),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for UriRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

impl AsRef<str> for UriRef {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

/// Binds a base URI so fragments can be minted off it.
#[derive(Clone, Debug)]
pub struct Namespace {
    base: UriRef,
}

impl Namespace {
    pub fn new(namespace: &str) -> Result<Namespace> {
        Ok(Namespace {
            base: UriRef::parse(namespace)?,
        })
    }

    pub fn get(&self, fragment: &str) -> UriRef {
        self.base.add_fragment(fragment)
    }
}
