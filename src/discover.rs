use k8s_openapi::apimachinery::pkg::apis::meta::v1::{APIResource, APIResourceList};
use kube::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::{DiscoveryError, RequestError},
    identity::{GroupVersion, ResourceIdentity},
};

/// A resource kind served under one group-version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredResourceKind {
    /// Plural resource name, e.g. `pods` or `pods/log` for a subresource.
    pub name: String,
    pub short_names: Vec<String>,
    pub singular_name: String,
    pub kind: String,
    pub namespaced: bool,
    pub verbs: Vec<String>,
}

impl DiscoveredResourceKind {
    pub fn is_subresource(&self) -> bool {
        self.name.contains('/')
    }

    pub fn supports(&self, verb: &str) -> bool {
        self.verbs.iter().any(|v| v == verb)
    }
}

impl From<APIResource> for DiscoveredResourceKind {
    fn from(resource: APIResource) -> Self {
        Self {
            name: resource.name,
            short_names: resource.short_names.unwrap_or_default(),
            singular_name: resource.singular_name,
            kind: resource.kind,
            namespaced: resource.namespaced,
            verbs: resource.verbs,
        }
    }
}

/// The resource kinds a server serves under one group-version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredGroupVersion {
    pub group: String,
    pub version: String,
    pub resources: Vec<DiscoveredResourceKind>,
}

impl DiscoveredGroupVersion {
    /// Build from one served resource list, parsing its `groupVersion` exactly.
    pub fn from_resource_list(list: APIResourceList) -> Result<Self, DiscoveryError> {
        let GroupVersion { group, version } = GroupVersion::parse(&list.group_version)?;
        Ok(Self {
            group,
            version,
            resources: list.resources.into_iter().map(Into::into).collect(),
        })
    }

    pub fn identity(&self, resource: &DiscoveredResourceKind) -> ResourceIdentity {
        ResourceIdentity::new(&self.group, &self.version, &resource.name)
    }
}

/// Client listing what a server serves.
pub struct DiscoverClient {
    client: Client,
}

impl DiscoverClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// List every served group-version with its resource kinds.
    ///
    /// The core group comes first, then named groups in the order the server
    /// lists them. Nothing is re-sorted and nothing is cached.
    pub async fn list_server_resources(
        &self,
    ) -> Result<Vec<DiscoveredGroupVersion>, DiscoveryError> {
        let mut discovered = Vec::new();

        let core = self
            .client
            .list_core_api_versions()
            .await
            .map_err(|e| request_failed("/api", e))?;
        for version in &core.versions {
            let list = self
                .client
                .list_core_api_resources(version)
                .await
                .map_err(|e| request_failed(&format!("/api/{version}"), e))?;
            discovered.push(DiscoveredGroupVersion::from_resource_list(list)?);
        }

        let groups = self
            .client
            .list_api_groups()
            .await
            .map_err(|e| request_failed("/apis", e))?;
        for group in &groups.groups {
            for served in &group.versions {
                let list = self
                    .client
                    .list_api_group_resources(&served.group_version)
                    .await
                    .map_err(|e| request_failed(&format!("/apis/{}", served.group_version), e))?;
                debug!(
                    group_version = %list.group_version,
                    resources = list.resources.len(),
                    "discovered group version"
                );
                discovered.push(DiscoveredGroupVersion::from_resource_list(list)?);
            }
        }

        info!(group_versions = discovered.len(), "discovery finished");
        Ok(discovered)
    }

    /// Run discovery and wrap the result for lookups.
    pub async fn snapshot(&self) -> Result<DiscoverySnapshot, DiscoveryError> {
        self.list_server_resources().await.map(DiscoverySnapshot::new)
    }
}

fn request_failed(endpoint: &str, error: kube::Error) -> DiscoveryError {
    DiscoveryError::Request {
        endpoint: endpoint.to_string(),
        source: RequestError::from(error),
    }
}

/// One discovery result, used to check or resolve resource identities.
#[derive(Debug, Clone, Default)]
pub struct DiscoverySnapshot {
    group_versions: Vec<DiscoveredGroupVersion>,
}

impl DiscoverySnapshot {
    pub fn new(group_versions: Vec<DiscoveredGroupVersion>) -> Self {
        Self { group_versions }
    }

    pub fn group_versions(&self) -> &[DiscoveredGroupVersion] {
        &self.group_versions
    }

    /// Every served resource with its group-version, in discovery order.
    pub fn resources(&self) -> impl Iterator<Item = (&DiscoveredGroupVersion, &DiscoveredResourceKind)> {
        self.group_versions
            .iter()
            .flat_map(|gv| gv.resources.iter().map(move |r| (gv, r)))
    }

    pub fn identities(&self) -> impl Iterator<Item = ResourceIdentity> + '_ {
        self.resources().map(|(gv, r)| gv.identity(r))
    }

    pub fn contains(&self, identity: &ResourceIdentity) -> bool {
        self.find(identity).is_some()
    }

    pub fn find(&self, identity: &ResourceIdentity) -> Option<&DiscoveredResourceKind> {
        self.resources()
            .find(|(gv, r)| {
                gv.group == identity.group
                    && gv.version == identity.version
                    && r.name == identity.resource
            })
            .map(|(_, r)| r)
    }

    /// Resolve a user-supplied target such as `pods`, `po`, `pod` or
    /// `deployments.apps` to the first matching served resource.
    pub fn resolve(&self, target: &str) -> Option<(ResourceIdentity, &DiscoveredResourceKind)> {
        self.resources()
            .filter(|(_, r)| !r.is_subresource())
            .find(|(gv, r)| resource_matches_target(target, gv, r))
            .map(|(gv, r)| (gv.identity(r), r))
    }
}

/// Checks if the given resource matches the `target` name.
/// Matching is done against the resource's name, singular name, short names, and group-qualified name.
pub fn resource_matches_target(
    target: &str,
    group_version: &DiscoveredGroupVersion,
    resource: &DiscoveredResourceKind,
) -> bool {
    resource.name == target
        || (!resource.singular_name.is_empty() && resource.singular_name == target)
        || resource.short_names.iter().any(|short| short == target)
        || (!group_version.group.is_empty()
            && format!("{}.{}", resource.name, group_version.group) == target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_resource(name: &str, kind: &str, short_names: &[&str]) -> APIResource {
        APIResource {
            name: name.to_string(),
            kind: kind.to_string(),
            singular_name: kind.to_lowercase(),
            namespaced: true,
            short_names: if short_names.is_empty() {
                None
            } else {
                Some(short_names.iter().map(|s| s.to_string()).collect())
            },
            verbs: vec!["get".into(), "list".into()],
            ..Default::default()
        }
    }

    fn list(group_version: &str, resources: Vec<APIResource>) -> APIResourceList {
        APIResourceList {
            group_version: group_version.to_string(),
            resources,
        }
    }

    fn snapshot() -> DiscoverySnapshot {
        DiscoverySnapshot::new(vec![
            DiscoveredGroupVersion::from_resource_list(list(
                "v1",
                vec![
                    api_resource("pods", "Pod", &["po"]),
                    api_resource("pods/log", "Pod", &[]),
                    api_resource("namespaces", "Namespace", &["ns"]),
                ],
            ))
            .unwrap(),
            DiscoveredGroupVersion::from_resource_list(list(
                "apps/v1",
                vec![api_resource("deployments", "Deployment", &["deploy"])],
            ))
            .unwrap(),
        ])
    }

    #[test]
    fn splits_core_and_named_group_versions() {
        let snapshot = snapshot();
        let gvs = snapshot.group_versions();
        assert_eq!((gvs[0].group.as_str(), gvs[0].version.as_str()), ("", "v1"));
        assert_eq!(
            (gvs[1].group.as_str(), gvs[1].version.as_str()),
            ("apps", "v1")
        );
    }

    #[test]
    fn preserves_server_order() {
        let names: Vec<_> = snapshot()
            .resources()
            .map(|(_, r)| r.name.clone())
            .collect();
        assert_eq!(names, ["pods", "pods/log", "namespaces", "deployments"]);
    }

    #[test]
    fn malformed_group_version_fails() {
        let err = DiscoveredGroupVersion::from_resource_list(list("a/b/c", vec![]))
            .expect_err("multiple separators");
        assert!(matches!(err, DiscoveryError::Malformed { .. }));
    }

    #[test]
    fn resolves_targets_by_any_name() {
        let snapshot = snapshot();
        let pods = ResourceIdentity::new("", "v1", "pods");
        for target in ["pods", "pod", "po"] {
            let (identity, resource) = snapshot.resolve(target).expect(target);
            assert_eq!(identity, pods);
            assert_eq!(resource.kind, "Pod");
        }

        let (identity, _) = snapshot.resolve("deployments.apps").unwrap();
        assert_eq!(identity, ResourceIdentity::new("apps", "v1", "deployments"));
        assert!(snapshot.resolve("pods/log").is_none());
        assert!(snapshot.resolve("widgets").is_none());
    }

    #[test]
    fn checks_identities_against_snapshot() {
        let snapshot = snapshot();
        assert!(snapshot.contains(&ResourceIdentity::new("apps", "v1", "deployments")));
        assert!(!snapshot.contains(&ResourceIdentity::new("apps", "v1beta1", "deployments")));
        assert!(!snapshot.contains(&ResourceIdentity::new("", "v1", "deployments")));
        assert_eq!(snapshot.identities().count(), 4);
    }

    #[test]
    fn detects_subresources() {
        let snapshot = snapshot();
        let log = snapshot
            .find(&ResourceIdentity::new("", "v1", "pods/log"))
            .unwrap();
        assert!(log.is_subresource());
        assert!(log.supports("list"));
        assert!(!log.supports("watch"));
    }
}
