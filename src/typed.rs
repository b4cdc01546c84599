use std::{fmt::Debug, marker::PhantomData};

use kube::{Client, Resource, api::ObjectList};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{dynamic::list_at, error::RequestError, identity::ResourceIdentity};

/// Lists one statically known kind `K`, decoding straight into `K`.
///
/// The request is the same one [`GenericClient`](crate::dynamic::GenericClient)
/// would send for `K`'s identity. A body that does not fit `K` is reported as
/// [`RequestError::Decode`].
pub struct TypedClient<K> {
    client: Client,
    identity: ResourceIdentity,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Clone for TypedClient<K> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            identity: self.identity.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K> TypedClient<K>
where
    K: Resource<DynamicType = ()> + DeserializeOwned + Clone + Debug,
{
    pub fn new(client: Client) -> Self {
        Self {
            client,
            identity: ResourceIdentity::of::<K>(),
            _kind: PhantomData,
        }
    }

    pub fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    /// List `K` in `namespace`, or across all namespaces when `None`.
    pub async fn list(&self, namespace: Option<&str>) -> Result<Vec<K>, RequestError> {
        let list: ObjectList<K> = list_at(&self.client, &self.identity, namespace).await?;
        debug!(
            identity = %self.identity,
            ns = ?namespace,
            items = list.items.len(),
            "listed typed resources"
        );
        Ok(list.items)
    }
}
