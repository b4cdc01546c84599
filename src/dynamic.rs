use k8s_openapi::apimachinery::pkg::apis::meta::v1::ListMeta;
use kube::{Client, api::ListParams, core::Request};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::{error::RequestError, identity::ResourceIdentity};

/// One resource instance without a compile-time schema.
///
/// Mapping keys keep the order the server sent them in.
pub type GenericDocument = serde_json::Value;

/// A list response with every item kept as a [`GenericDocument`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericDocumentList {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ListMeta,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<GenericDocument>,
}

impl GenericDocumentList {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items the server still holds beyond this page, when it says so.
    pub fn remaining_item_count(&self) -> Option<i64> {
        self.metadata.remaining_item_count
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Lists arbitrary resource kinds addressed only by their identity.
#[derive(Clone)]
pub struct GenericClient {
    client: Client,
}

impl GenericClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// List `identity` in `namespace`, or across all namespaces when `None`.
    ///
    /// The identity is not checked locally; a kind the server does not serve
    /// comes back as a not-found [`RequestError::Api`].
    pub async fn list(
        &self,
        identity: &ResourceIdentity,
        namespace: Option<&str>,
    ) -> Result<GenericDocumentList, RequestError> {
        let list: GenericDocumentList = list_at(&self.client, identity, namespace).await?;
        debug!(
            identity = %identity,
            ns = ?namespace,
            items = list.len(),
            "listed generic resources"
        );
        Ok(list)
    }
}

/// Issue one list request for `identity` and decode the body as `T`.
pub(crate) async fn list_at<T>(
    client: &Client,
    identity: &ResourceIdentity,
    namespace: Option<&str>,
) -> Result<T, RequestError>
where
    T: serde::de::DeserializeOwned,
{
    let path = identity.url_path(namespace)?;
    let request = Request::new(path.as_str())
        .list(&ListParams::default())
        .map_err(|source| RequestError::Build {
            path: path.clone(),
            source,
        })?;
    debug!(path = %path, "list request");
    Ok(client.request::<T>(request).await?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_list_and_keeps_unknown_fields() {
        let body = json!({
            "apiVersion": "v1",
            "kind": "PodList",
            "metadata": {"resourceVersion": "42", "remainingItemCount": 7},
            "items": [
                {"metadata": {"name": "a"}, "zeta": 1, "alpha": {"nested": [1, 2]}},
                {"metadata": {"name": "b"}}
            ]
        });
        let list: GenericDocumentList = serde_json::from_value(body).unwrap();

        assert_eq!(list.kind, "PodList");
        assert_eq!(list.len(), 2);
        assert_eq!(list.remaining_item_count(), Some(7));
        assert_eq!(list.items[0]["alpha"]["nested"][1], 2);

        let keys: Vec<_> = list.items[0].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["metadata", "zeta", "alpha"]);
    }

    #[test]
    fn null_items_decode_as_empty() {
        let list: GenericDocumentList =
            serde_json::from_value(json!({"kind": "PodList", "items": null})).unwrap();
        assert!(list.is_empty());
        assert_eq!(list.remaining_item_count(), None);
    }
}
