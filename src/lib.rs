#![cfg_attr(not(doctest), doc = include_str!("../README.md"))]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use k8s_openapi;
pub use kube;

pub mod claputil;
pub mod connection;
pub mod convert;
pub mod discover;
pub mod dynamic;
pub mod error;
pub mod identity;
pub mod retry;
pub mod typed;

pub use connection::{Connection, ConnectionConfig, ConnectionDescriptor, resolve};
pub use convert::{Coerce, Convertible, Schema, convert};
pub use discover::{DiscoverClient, DiscoveredGroupVersion, DiscoveredResourceKind, DiscoverySnapshot};
pub use dynamic::{GenericClient, GenericDocument, GenericDocumentList};
pub use error::{ConfigError, ConversionError, DiscoveryError, Error, RequestError};
pub use identity::{GroupVersion, ResourceIdentity};
pub use typed::TypedClient;
