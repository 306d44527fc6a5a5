// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Read destinations for the watch-backed cache.
//!
//! Every watch stores `DynamicObject`s. A destination decides how a cached
//! object is decoded: typed k8s-openapi structs via serde, unstructured
//! objects as-is, or metadata only.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DynamicObject, GroupVersionKind};
use kube::core::TypeMeta;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::error::CacheError;
use super::identity::{HandleKey, ObjectKey, Representation, gvk_from_type_meta};
use super::kinds::ListKind;

/// A value a single object can be read into
pub trait CacheObject: Send {
    /// Representation this value is read through
    fn representation(&self) -> Representation;

    /// Kind of this value, if known before the read
    fn gvk(&self) -> Option<GroupVersionKind>;

    fn metadata(&self) -> &ObjectMeta;

    /// Overwrite this value with a cached object
    fn load(&mut self, cached: &DynamicObject) -> Result<(), CacheError>;

    /// Handle key of the watch serving this value
    fn handle_key(&self) -> Result<HandleKey, CacheError> {
        let gvk = self
            .gvk()
            .ok_or_else(|| CacheError::UnknownKind(self.representation()))?;
        Ok(HandleKey::new(gvk, self.representation()))
    }

    /// Name and namespace after a read
    fn object_key(&self) -> Option<ObjectKey> {
        ObjectKey::from_meta(self.metadata())
    }
}

/// A collection value a list can be read into
pub trait ObjectList: Send {
    fn list_kind(&self) -> ListKind;

    /// Replace the items with cached objects
    fn load(&mut self, items: &[Arc<DynamicObject>]) -> Result<(), CacheError>;
}

/// Kinds with a compiled-in schema from k8s-openapi
pub trait Structured:
    k8s_openapi::Resource
    + k8s_openapi::ListableResource
    + k8s_openapi::Metadata<Ty = ObjectMeta>
    + DeserializeOwned
    + Clone
    + Send
    + Sync
    + 'static
{
}

/// GVK of a structured kind
pub fn structured_gvk<K: k8s_openapi::Resource>() -> GroupVersionKind {
    GroupVersionKind::gvk(K::GROUP, K::VERSION, K::KIND)
}

fn decode<K: DeserializeOwned>(cached: &DynamicObject) -> Result<K, CacheError> {
    let kind = cached
        .types
        .as_ref()
        .map(|t| t.kind.clone())
        .unwrap_or_default();
    serde_json::to_value(cached)
        .and_then(serde_json::from_value)
        .map_err(|source| CacheError::Decode { kind, source })
}

/// Implement the read traits for k8s-openapi types.
///
/// The trait bounds on `Structured` are checked for each listed type.
macro_rules! structured_kinds {
    ($($type:ty),* $(,)?) => {$(
        impl Structured for $type {}

        impl CacheObject for $type {
            fn representation(&self) -> Representation {
                Representation::Structured
            }

            fn gvk(&self) -> Option<GroupVersionKind> {
                Some(structured_gvk::<$type>())
            }

            fn metadata(&self) -> &ObjectMeta {
                k8s_openapi::Metadata::metadata(self)
            }

            fn load(&mut self, cached: &DynamicObject) -> Result<(), CacheError> {
                *self = decode(cached)?;
                Ok(())
            }
        }
    )*};
}

use k8s_openapi::api::{
    apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet},
    batch::v1::{CronJob, Job},
    core::v1::{
        ConfigMap, Event, Namespace, Node, PersistentVolume, PersistentVolumeClaim,
        Pod, Secret, Service, ServiceAccount,
    },
    networking::v1::Ingress,
    rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding},
};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;

structured_kinds!(
    ConfigMap,
    Event,
    Namespace,
    Node,
    PersistentVolume,
    PersistentVolumeClaim,
    Pod,
    Secret,
    Service,
    ServiceAccount,
    DaemonSet,
    Deployment,
    ReplicaSet,
    StatefulSet,
    CronJob,
    Job,
    Ingress,
    ClusterRole,
    ClusterRoleBinding,
    Role,
    RoleBinding,
    CustomResourceDefinition,
);

impl<K: Structured> ObjectList for k8s_openapi::List<K> {
    fn list_kind(&self) -> ListKind {
        ListKind::Structured(GroupVersionKind::gvk(K::GROUP, K::VERSION, K::LIST_KIND))
    }

    fn load(&mut self, items: &[Arc<DynamicObject>]) -> Result<(), CacheError> {
        self.items = items
            .iter()
            .map(|obj| decode(obj))
            .collect::<Result<_, _>>()?;
        Ok(())
    }
}

impl CacheObject for DynamicObject {
    fn representation(&self) -> Representation {
        Representation::Unstructured
    }

    fn gvk(&self) -> Option<GroupVersionKind> {
        gvk_from_type_meta(self.types.as_ref())
    }

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn load(&mut self, cached: &DynamicObject) -> Result<(), CacheError> {
        *self = cached.clone();
        Ok(())
    }
}

/// Empty unstructured object of a kind, ready to be read into
pub fn unstructured(api_version: &str, kind: &str) -> DynamicObject {
    DynamicObject {
        types: Some(TypeMeta {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
        }),
        metadata: ObjectMeta::default(),
        data: serde_json::Value::Null,
    }
}

/// List of unstructured objects
#[derive(Debug, Clone, Default)]
pub struct UnstructuredList {
    /// `apiVersion` and list `kind` (e.g. `WidgetList`)
    pub types: Option<TypeMeta>,
    pub items: Vec<DynamicObject>,
}

impl UnstructuredList {
    pub fn new(api_version: &str, kind: &str) -> Self {
        Self {
            types: Some(TypeMeta {
                api_version: api_version.to_string(),
                kind: kind.to_string(),
            }),
            items: Vec::new(),
        }
    }
}

impl ObjectList for UnstructuredList {
    fn list_kind(&self) -> ListKind {
        ListKind::Unstructured(gvk_from_type_meta(self.types.as_ref()))
    }

    fn load(&mut self, items: &[Arc<DynamicObject>]) -> Result<(), CacheError> {
        self.items = items.iter().map(|obj| DynamicObject::clone(obj)).collect();
        Ok(())
    }
}

/// Type and object metadata of a resource, without spec or status
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialObjectMetadata {
    pub types: Option<TypeMeta>,
    pub metadata: ObjectMeta,
}

impl PartialObjectMetadata {
    pub fn new(api_version: &str, kind: &str) -> Self {
        Self {
            types: Some(TypeMeta {
                api_version: api_version.to_string(),
                kind: kind.to_string(),
            }),
            metadata: ObjectMeta::default(),
        }
    }
}

impl From<&DynamicObject> for PartialObjectMetadata {
    fn from(obj: &DynamicObject) -> Self {
        Self {
            types: obj.types.clone(),
            metadata: obj.metadata.clone(),
        }
    }
}

impl CacheObject for PartialObjectMetadata {
    fn representation(&self) -> Representation {
        Representation::Metadata
    }

    fn gvk(&self) -> Option<GroupVersionKind> {
        gvk_from_type_meta(self.types.as_ref())
    }

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn load(&mut self, cached: &DynamicObject) -> Result<(), CacheError> {
        *self = cached.into();
        Ok(())
    }
}

/// List of metadata-only objects
#[derive(Debug, Clone, Default)]
pub struct PartialObjectMetadataList {
    pub types: Option<TypeMeta>,
    pub items: Vec<PartialObjectMetadata>,
}

impl PartialObjectMetadataList {
    pub fn new(api_version: &str, kind: &str) -> Self {
        Self {
            types: Some(TypeMeta {
                api_version: api_version.to_string(),
                kind: kind.to_string(),
            }),
            items: Vec::new(),
        }
    }
}

impl ObjectList for PartialObjectMetadataList {
    fn list_kind(&self) -> ListKind {
        ListKind::Metadata(gvk_from_type_meta(self.types.as_ref()))
    }

    fn load(&mut self, items: &[Arc<DynamicObject>]) -> Result<(), CacheError> {
        self.items = items.iter().map(|obj| obj.as_ref().into()).collect();
        Ok(())
    }
}
