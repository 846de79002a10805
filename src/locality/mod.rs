//! Regions, zones and localized identifiers.
//!
//! Scaleway scopes every resource to a region (`fr-par`) or a zone
//! (`fr-par-1`). Identifiers persisted to state carry that locality as a
//! prefix (`fr-par/<uuid>`, `fr-par-1/<uuid>`) and nested resources add an
//! owner segment (`fr-par/<instance>/<name>`). The remote APIs only accept
//! bare identifiers, so every value crossing the boundary goes through this
//! codec.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProviderError;

/// A Scaleway region such as `fr-par`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Region(String);

/// A Scaleway availability zone such as `fr-par-1`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Zone(String);

fn is_alpha_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|ch| ch.is_ascii_lowercase())
}

fn is_digit_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|ch| ch.is_ascii_digit())
}

impl Region {
    /// Parses a region tag.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidId`] when the value is not of the form
    /// `<country>-<city>`.
    pub fn parse(value: &str) -> Result<Self, ProviderError> {
        let parts: Vec<&str> = value.split('-').collect();
        match parts.as_slice() {
            [country, city] if is_alpha_segment(country) && is_alpha_segment(city) => {
                Ok(Self(value.to_owned()))
            }
            _ => Err(ProviderError::InvalidId {
                value: value.to_owned(),
                reason: String::from("not a region"),
            }),
        }
    }

    /// Returns the region tag.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Zone {
    /// Parses a zone tag.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidId`] when the value is not of the form
    /// `<country>-<city>-<n>`.
    pub fn parse(value: &str) -> Result<Self, ProviderError> {
        let parts: Vec<&str> = value.split('-').collect();
        match parts.as_slice() {
            [country, city, index]
                if is_alpha_segment(country)
                    && is_alpha_segment(city)
                    && is_digit_segment(index) =>
            {
                Ok(Self(value.to_owned()))
            }
            _ => Err(ProviderError::InvalidId {
                value: value.to_owned(),
                reason: String::from("not a zone"),
            }),
        }
    }

    /// Returns the zone tag.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the region this zone belongs to.
    #[must_use]
    pub fn region(&self) -> Region {
        let region = self
            .0
            .rsplit_once('-')
            .map_or(self.0.as_str(), |(head, _)| head);
        Region(region.to_owned())
    }
}

macro_rules! locality_conversions {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ProviderError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::parse(value)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ProviderError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }
    };
}

locality_conversions!(Region);
locality_conversions!(Zone);

/// Either a region or a zone.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Locality {
    /// Region-scoped locality.
    Region(Region),
    /// Zone-scoped locality.
    Zone(Zone),
}

impl Locality {
    /// Parses a region or zone tag.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidId`] when the value is neither.
    pub fn parse(value: &str) -> Result<Self, ProviderError> {
        if let Ok(zone) = Zone::parse(value) {
            return Ok(Self::Zone(zone));
        }
        Region::parse(value)
            .map(Self::Region)
            .map_err(|_| ProviderError::InvalidId {
                value: value.to_owned(),
                reason: String::from("not a region or zone"),
            })
    }

    /// Returns the region of this locality.
    #[must_use]
    pub fn region(&self) -> Region {
        match self {
            Self::Region(region) => region.clone(),
            Self::Zone(zone) => zone.region(),
        }
    }
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region(region) => region.fmt(f),
            Self::Zone(zone) => zone.fmt(f),
        }
    }
}

impl From<Region> for Locality {
    fn from(value: Region) -> Self {
        Self::Region(value)
    }
}

impl From<Zone> for Locality {
    fn from(value: Zone) -> Self {
        Self::Zone(value)
    }
}

/// A decoded localized identifier.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocalizedId {
    /// Region or zone prefix.
    pub locality: Locality,
    /// Owner segment for nested identifiers.
    pub outer_id: Option<String>,
    /// Identifier of the resource itself.
    pub inner_id: String,
}

impl LocalizedId {
    /// Builds a flat identifier.
    #[must_use]
    pub fn new(locality: impl Into<Locality>, inner_id: impl Into<String>) -> Self {
        Self {
            locality: locality.into(),
            outer_id: None,
            inner_id: inner_id.into(),
        }
    }

    /// Builds a nested identifier.
    #[must_use]
    pub fn nested(
        locality: impl Into<Locality>,
        outer_id: impl Into<String>,
        inner_id: impl Into<String>,
    ) -> Self {
        Self {
            locality: locality.into(),
            outer_id: Some(outer_id.into()),
            inner_id: inner_id.into(),
        }
    }

    /// Returns the region of the identifier.
    #[must_use]
    pub fn region(&self) -> Region {
        self.locality.region()
    }
}

impl fmt::Display for LocalizedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(outer) = &self.outer_id {
            return write!(f, "{}/{}/{}", self.locality, outer, self.inner_id);
        }
        write!(f, "{}/{}", self.locality, self.inner_id)
    }
}

fn invalid_id(value: &str, reason: &str) -> ProviderError {
    ProviderError::InvalidId {
        value: value.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Splits a localized identifier into its locality and `segments` trailing
/// parts.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidId`] when the number of `/` separators is
/// not exactly `segments`, when a segment is empty, or when the prefix is not
/// a locality.
pub fn split_localized(value: &str, segments: usize) -> Result<(Locality, Vec<&str>), ProviderError> {
    if value.is_empty() {
        return Err(invalid_id(value, "empty identifier"));
    }
    let parts: Vec<&str> = value.split('/').collect();
    if parts.len() != segments + 1 {
        return Err(invalid_id(
            value,
            &format!("expected {segments} '/' separated segment(s) after the locality"),
        ));
    }
    if parts.iter().any(|part| part.is_empty()) {
        return Err(invalid_id(value, "empty segment"));
    }
    let mut iter = parts.into_iter();
    let locality = iter
        .next()
        .map(Locality::parse)
        .ok_or_else(|| invalid_id(value, "missing locality"))??;
    Ok((locality, iter.collect()))
}

/// Parses `<locality>/<id>`.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidId`] when the value does not contain
/// exactly one `/`, is empty, or has an invalid locality.
pub fn parse_localized(value: &str) -> Result<(Locality, String), ProviderError> {
    let (locality, parts) = split_localized(value, 1)?;
    match parts.as_slice() {
        [inner] => Ok((locality, (*inner).to_owned())),
        _ => Err(invalid_id(value, "expected <locality>/<id>")),
    }
}

/// Parses `<locality>/<outer>/<inner>`.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidId`] when the value does not contain
/// exactly two `/` or has an invalid locality.
pub fn parse_localized_nested(value: &str) -> Result<(Locality, String, String), ProviderError> {
    let (locality, parts) = split_localized(value, 2)?;
    match parts.as_slice() {
        [outer, inner] => Ok((locality, (*outer).to_owned(), (*inner).to_owned())),
        _ => Err(invalid_id(value, "expected <locality>/<outer>/<inner>")),
    }
}

/// Formats `<locality>/<id>`.
#[must_use]
pub fn format_localized(locality: &impl fmt::Display, id: &str) -> String {
    format!("{locality}/{id}")
}

/// Strips a locality prefix when present.
///
/// Remote APIs accept bare identifiers while user input may be
/// locality-qualified.
#[must_use]
pub fn expand_id(value: &str) -> &str {
    match value.split_once('/') {
        Some((prefix, id))
            if !id.is_empty() && !id.contains('/') && Locality::parse(prefix).is_ok() =>
        {
            id
        }
        _ => value,
    }
}

/// Returns the locality prefix of `value` when it is a localized identifier
/// of any depth.
#[must_use]
pub fn locality_of(value: &str) -> Option<Locality> {
    let (prefix, rest) = value.split_once('/')?;
    if rest.is_empty() {
        return None;
    }
    Locality::parse(prefix).ok()
}

/// Returns true when both values are localities of the same region.
#[must_use]
pub fn compare_localities(lhs: &str, rhs: &str) -> bool {
    match (Locality::parse(lhs), Locality::parse(rhs)) {
        (Ok(left), Ok(right)) => left.region() == right.region(),
        _ => false,
    }
}

/// Returns true when `value` is a bare UUID.
#[must_use]
pub fn is_bare_uuid(value: &str) -> bool {
    Uuid::parse_str(value).is_ok()
}

/// Decodes a reference that may be localized or a bare UUID.
///
/// Bare UUIDs are assumed to live in `default`.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidId`] when the value is neither, and
/// [`ProviderError::LocalityUnresolved`] for a bare UUID without a default.
pub fn resolve_reference(value: &str, default: Option<&Region>) -> Result<LocalizedId, ProviderError> {
    if is_bare_uuid(value) {
        let region = default.ok_or_else(|| ProviderError::LocalityUnresolved {
            resource: value.to_owned(),
        })?;
        return Ok(LocalizedId::new(region.clone(), value));
    }
    let (locality, inner) = parse_localized(value)?;
    Ok(LocalizedId::new(locality, inner))
}

/// Resolves the region of an operation on `resource_id`.
///
/// The explicit region wins, then the locality prefix of the identifier,
/// then the provider default.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidId`] when the explicit region does not
/// parse and [`ProviderError::LocalityUnresolved`] when nothing names a
/// region.
pub fn resolve_region(
    explicit: Option<&str>,
    resource_id: &str,
    default: Option<&Region>,
) -> Result<Region, ProviderError> {
    if let Some(region) = explicit.filter(|value| !value.trim().is_empty()) {
        return Region::parse(region.trim());
    }
    if let Some(locality) = locality_of(resource_id) {
        return Ok(locality.region());
    }
    default
        .cloned()
        .ok_or_else(|| ProviderError::LocalityUnresolved {
            resource: resource_id.to_owned(),
        })
}

/// Plan-time check that localized references point into the resource's
/// region.
#[derive(Clone, Debug)]
pub struct LocalityCheck {
    region: Region,
    attributes: Vec<(String, String)>,
}

impl LocalityCheck {
    /// Starts a check for a resource living in `region`.
    #[must_use]
    pub const fn new(region: Region) -> Self {
        Self {
            region,
            attributes: Vec::new(),
        }
    }

    /// Adds a scalar attribute.
    #[must_use]
    pub fn attribute(mut self, name: &str, value: Option<&str>) -> Self {
        if let Some(found) = value {
            self.attributes.push((name.to_owned(), found.to_owned()));
        }
        self
    }

    /// Verifies every collected attribute.
    ///
    /// Values that are not localized identifiers are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::LocalityMismatch`] naming the first
    /// attribute whose locality resolves to another region.
    pub fn verify(&self) -> Result<(), ProviderError> {
        for (name, value) in &self.attributes {
            let Some(locality) = locality_of(value) else {
                continue;
            };
            if locality.region() != self.region {
                return Err(ProviderError::LocalityMismatch {
                    attribute: name.clone(),
                    value: value.clone(),
                    expected_region: self.region.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
