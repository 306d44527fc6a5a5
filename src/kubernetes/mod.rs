mod cache;
mod client;
mod error;
mod identity;
mod informer;
mod kinds;
mod kube_cache;
mod object;
mod registry;
mod selectors;
#[cfg(test)]
pub(crate) mod testing;

pub use cache::{ListOptions, WatchCache, read_list, read_object};
pub use client::connect;
pub use error::{CacheError, ResolveError};
pub use identity::{
    HandleKey, ObjectKey, Representation, ResourceIdentity, api_version, gvk_from_api_version,
    gvk_from_type_meta,
};
pub use informer::Informer;
pub use kinds::{ListKind, item_kind};
pub use kube_cache::{DEFAULT_SYNC_TIMEOUT, KubeCache, KubeCacheOptions};
pub use object::{
    CacheObject, ObjectList, PartialObjectMetadata, PartialObjectMetadataList, Structured,
    UnstructuredList, structured_gvk, unstructured,
};
pub use registry::{Disposition, Listener, ListenerRegistry, ListenerToken, WatchEvent};
pub use selectors::{LabelOperator, LabelRequirement, LabelSelector};
