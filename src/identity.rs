use std::{fmt, str::FromStr};

use kube::Resource;
use serde::{Deserialize, Serialize};

use crate::error::{DiscoveryError, RequestError};

/// Address of a resource kind on the server: group, version and plural resource name.
///
/// The group is empty for the core group. Nothing is validated at construction;
/// an identity the server does not serve fails when it is listed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentity {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl ResourceIdentity {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// Identity of a statically known kind.
    pub fn of<K>() -> Self
    where
        K: Resource<DynamicType = ()>,
    {
        Self::new(K::group(&()), K::version(&()), K::plural(&()))
    }

    pub fn group_version(&self) -> GroupVersion {
        GroupVersion {
            group: self.group.clone(),
            version: self.version.clone(),
        }
    }

    /// Request path listing this resource, either cluster wide or inside one namespace.
    ///
    /// Core group resources live under `/api`, everything else under `/apis/{group}`.
    /// An empty namespace lists cluster wide. A segment containing `/`, or an empty
    /// version or resource, is rejected so that distinct inputs never share a path.
    pub fn url_path(&self, namespace: Option<&str>) -> Result<String, RequestError> {
        segment("group", &self.group, true)?;
        segment("version", &self.version, false)?;
        segment("resource", &self.resource, false)?;

        let mut path = self.group_version().api_prefix();
        if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
            segment("namespace", ns, false)?;
            path.push_str("/namespaces/");
            path.push_str(ns);
        }
        path.push('/');
        path.push_str(&self.resource);
        Ok(path)
    }
}

fn segment(field: &'static str, value: &str, allow_empty: bool) -> Result<(), RequestError> {
    if value.contains('/') || (value.is_empty() && !allow_empty) {
        return Err(RequestError::InvalidSegment {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.resource)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.resource)
        }
    }
}

/// An API group together with one of its versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersion {
    pub group: String,
    pub version: String,
}

impl GroupVersion {
    /// Parse the combined `group/version` string served by discovery.
    ///
    /// A bare `version` belongs to the core group. Empty input, an empty group or
    /// version, or more than one separator is rejected.
    pub fn parse(value: &str) -> Result<Self, DiscoveryError> {
        let malformed = |reason| DiscoveryError::Malformed {
            value: value.to_string(),
            reason,
        };

        if value.is_empty() {
            return Err(malformed("empty string"));
        }

        match value.split_once('/') {
            None => Ok(Self {
                group: String::new(),
                version: value.to_string(),
            }),
            Some((_, version)) if version.contains('/') => Err(malformed("more than one '/'")),
            Some(("", _)) => Err(malformed("empty group")),
            Some((_, "")) => Err(malformed("empty version")),
            Some((group, version)) => Ok(Self {
                group: group.to_string(),
                version: version.to_string(),
            }),
        }
    }

    pub fn is_core(&self) -> bool {
        self.group.is_empty()
    }

    fn api_prefix(&self) -> String {
        if self.is_core() {
            format!("/api/{}", self.version)
        } else {
            format!("/apis/{}/{}", self.group, self.version)
        }
    }
}

impl FromStr for GroupVersion {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_core() {
            f.write_str(&self.version)
        } else {
            write!(f, "{}/{}", self.group, self.version)
        }
    }
}
