use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{Namespace, Pod},
};

use super::{Coerce, Convertible, Schema};

impl Convertible for Pod {
    fn schema() -> Schema<Self> {
        Schema::<Self>::builder()
            .required(
                "metadata.name",
                Coerce::string(|p: &Pod| p.metadata.name.clone(), |p, v| {
                    p.metadata.name = Some(v)
                }),
            )
            .required(
                "metadata.namespace",
                Coerce::string(|p: &Pod| p.metadata.namespace.clone(), |p, v| {
                    p.metadata.namespace = Some(v)
                }),
            )
            .optional(
                "metadata.labels",
                Coerce::string_map(|p: &Pod| p.metadata.labels.clone(), |p, v| {
                    p.metadata.labels = Some(v)
                }),
            )
            .optional(
                "spec.nodeName",
                Coerce::string(
                    |p: &Pod| p.spec.as_ref().and_then(|s| s.node_name.clone()),
                    |p, v| p.spec.get_or_insert_with(Default::default).node_name = Some(v),
                ),
            )
            .optional(
                "spec.hostNetwork",
                Coerce::boolean(
                    |p: &Pod| p.spec.as_ref().and_then(|s| s.host_network),
                    |p, v| p.spec.get_or_insert_with(Default::default).host_network = Some(v),
                ),
            )
            .required(
                "status.phase",
                Coerce::string(
                    |p: &Pod| p.status.as_ref().and_then(|s| s.phase.clone()),
                    |p, v| p.status.get_or_insert_with(Default::default).phase = Some(v),
                ),
            )
            .optional(
                "status.podIP",
                Coerce::string(
                    |p: &Pod| p.status.as_ref().and_then(|s| s.pod_ip.clone()),
                    |p, v| p.status.get_or_insert_with(Default::default).pod_ip = Some(v),
                ),
            )
            .build()
    }
}

impl Convertible for Deployment {
    fn schema() -> Schema<Self> {
        Schema::<Self>::builder()
            .required(
                "metadata.name",
                Coerce::string(|d: &Deployment| d.metadata.name.clone(), |d, v| {
                    d.metadata.name = Some(v)
                }),
            )
            .required(
                "metadata.namespace",
                Coerce::string(|d: &Deployment| d.metadata.namespace.clone(), |d, v| {
                    d.metadata.namespace = Some(v)
                }),
            )
            .optional(
                "metadata.labels",
                Coerce::string_map(|d: &Deployment| d.metadata.labels.clone(), |d, v| {
                    d.metadata.labels = Some(v)
                }),
            )
            .required(
                "spec.replicas",
                Coerce::integer(
                    |d: &Deployment| d.spec.as_ref().and_then(|s| s.replicas),
                    |d, v| d.spec.get_or_insert_with(Default::default).replicas = Some(v),
                ),
            )
            .optional(
                "status.replicas",
                Coerce::integer(
                    |d: &Deployment| d.status.as_ref().and_then(|s| s.replicas),
                    |d, v| d.status.get_or_insert_with(Default::default).replicas = Some(v),
                ),
            )
            .optional(
                "status.readyReplicas",
                Coerce::integer(
                    |d: &Deployment| d.status.as_ref().and_then(|s| s.ready_replicas),
                    |d, v| d.status.get_or_insert_with(Default::default).ready_replicas = Some(v),
                ),
            )
            .optional(
                "status.availableReplicas",
                Coerce::integer(
                    |d: &Deployment| d.status.as_ref().and_then(|s| s.available_replicas),
                    |d, v| {
                        d.status.get_or_insert_with(Default::default).available_replicas = Some(v)
                    },
                ),
            )
            .build()
    }
}

impl Convertible for Namespace {
    fn schema() -> Schema<Self> {
        Schema::<Self>::builder()
            .required(
                "metadata.name",
                Coerce::string(|n: &Namespace| n.metadata.name.clone(), |n, v| {
                    n.metadata.name = Some(v)
                }),
            )
            .optional(
                "metadata.labels",
                Coerce::string_map(|n: &Namespace| n.metadata.labels.clone(), |n, v| {
                    n.metadata.labels = Some(v)
                }),
            )
            .optional(
                "spec.finalizers",
                Coerce::strings(
                    |n: &Namespace| n.spec.as_ref().and_then(|s| s.finalizers.clone()),
                    |n, v| n.spec.get_or_insert_with(Default::default).finalizers = Some(v),
                ),
            )
            .optional(
                "status.phase",
                Coerce::string(
                    |n: &Namespace| n.status.as_ref().and_then(|s| s.phase.clone()),
                    |n, v| n.status.get_or_insert_with(Default::default).phase = Some(v),
                ),
            )
            .build()
    }
}
