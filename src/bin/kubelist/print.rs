use std::io::{self, Write};

use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{Namespace, Pod},
};
use kubelist::{DiscoveredGroupVersion, GenericDocumentList, convert::FieldPath};

const NONE: &str = "-";

fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or(NONE)
}

pub fn pods(out: &mut impl Write, pods: &[Pod]) -> io::Result<()> {
    writeln!(out, "namespace\t status\t\t name")?;
    for pod in pods {
        let phase = pod.status.as_ref().and_then(|s| s.phase.as_deref());
        writeln!(
            out,
            "{}\t\t {}\t {}",
            or_none(pod.metadata.namespace.as_deref()),
            or_none(phase),
            or_none(pod.metadata.name.as_deref()),
        )?;
    }
    Ok(())
}

pub fn deployments(out: &mut impl Write, deployments: &[Deployment]) -> io::Result<()> {
    writeln!(out, "namespace\t Replicas\t name")?;
    for deployment in deployments {
        let replicas = deployment
            .spec
            .as_ref()
            .and_then(|s| s.replicas)
            .map_or_else(|| NONE.to_string(), |r| r.to_string());
        writeln!(
            out,
            "{}\t\t {}\t\t\t {}",
            or_none(deployment.metadata.namespace.as_deref()),
            replicas,
            or_none(deployment.metadata.name.as_deref()),
        )?;
    }
    Ok(())
}

pub fn namespaces(out: &mut impl Write, namespaces: &[Namespace]) -> io::Result<()> {
    writeln!(out, "name\t status")?;
    for namespace in namespaces {
        let phase = namespace.status.as_ref().and_then(|s| s.phase.as_deref());
        writeln!(
            out,
            "{}\t {}",
            or_none(namespace.metadata.name.as_deref()),
            or_none(phase)
        )?;
    }
    Ok(())
}

pub fn resources(out: &mut impl Write, group_versions: &[DiscoveredGroupVersion]) -> io::Result<()> {
    writeln!(out, "name\t group\t version")?;
    for gv in group_versions {
        for resource in &gv.resources {
            writeln!(out, "{}\t {}\t {}", resource.name, gv.group, gv.version)?;
        }
    }
    Ok(())
}

/// Fallback for kinds without a typed shape: namespace and name of each item.
pub fn documents(out: &mut impl Write, list: &GenericDocumentList) -> io::Result<()> {
    let namespace = FieldPath::parse("metadata.namespace");
    let name = FieldPath::parse("metadata.name");

    writeln!(out, "namespace\t name")?;
    for item in &list.items {
        let field = |path: &FieldPath| path.get(item).and_then(|v| v.as_str()).unwrap_or(NONE);
        writeln!(out, "{}\t\t {}", field(&namespace), field(&name))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::apps::v1::DeploymentSpec;
    use kubelist::DiscoveredResourceKind;
    use serde_json::json;

    use super::*;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn prints_pods_with_header() {
        let pod: Pod = serde_json::from_value(json!({
            "metadata": {"name": "web-0", "namespace": "default"},
            "status": {"phase": "Running"}
        }))
        .unwrap();
        let text = render(|out| pods(out, &[pod]));
        assert_eq!(text, "namespace\t status\t\t name\ndefault\t\t Running\t web-0\n");
    }

    #[test]
    fn prints_deployment_replicas() {
        let mut deployment = Deployment::default();
        deployment.metadata.name = Some(String::from("api"));
        deployment.metadata.namespace = Some(String::from("default"));
        deployment.spec = Some(DeploymentSpec {
            replicas: Some(3),
            ..Default::default()
        });
        let text = render(|out| deployments(out, &[deployment, Deployment::default()]));
        assert_eq!(
            text,
            "namespace\t Replicas\t name\ndefault\t\t 3\t\t\t api\n-\t\t -\t\t\t -\n"
        );
    }

    #[test]
    fn prints_discovered_resources() {
        let gv = DiscoveredGroupVersion {
            group: String::from("apps"),
            version: String::from("v1"),
            resources: vec![DiscoveredResourceKind {
                name: String::from("deployments"),
                short_names: vec![String::from("deploy")],
                singular_name: String::from("deployment"),
                kind: String::from("Deployment"),
                namespaced: true,
                verbs: vec![String::from("list")],
            }],
        };
        let text = render(|out| resources(out, &[gv]));
        assert_eq!(text, "name\t group\t version\ndeployments\t apps\t v1\n");
    }

    #[test]
    fn prints_generic_documents() {
        let list: GenericDocumentList = serde_json::from_value(json!({
            "items": [
                {"metadata": {"name": "cm-1", "namespace": "default"}},
                {"metadata": {"name": "cluster-thing"}}
            ]
        }))
        .unwrap();
        let text = render(|out| documents(out, &list));
        assert_eq!(
            text,
            "namespace\t name\ndefault\t\t cm-1\n-\t\t cluster-thing\n"
        );
    }
}
