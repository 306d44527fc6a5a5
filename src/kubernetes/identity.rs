// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Identities for cached objects and the watch handles that serve them.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::GroupVersionKind;
use kube::core::TypeMeta;
use std::fmt;

/// Build a GVK from an `apiVersion` string ("v1" or "group/version") and a kind.
///
/// Returns `None` when either part is empty.
pub fn gvk_from_api_version(api_version: &str, kind: &str) -> Option<GroupVersionKind> {
    if api_version.is_empty() || kind.is_empty() {
        return None;
    }
    let (group, version) = match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    };
    if version.is_empty() {
        return None;
    }
    Some(GroupVersionKind::gvk(group, version, kind))
}

/// Build a GVK from the `apiVersion`/`kind` carried on an object
pub fn gvk_from_type_meta(types: Option<&TypeMeta>) -> Option<GroupVersionKind> {
    types.and_then(|t| gvk_from_api_version(&t.api_version, &t.kind))
}

/// Format the `apiVersion` string of a GVK
pub fn api_version(gvk: &GroupVersionKind) -> String {
    if gvk.group.is_empty() {
        gvk.version.clone()
    } else {
        format!("{}/{}", gvk.group, gvk.version)
    }
}

/// TypeMeta for a GVK
pub fn type_meta(gvk: &GroupVersionKind) -> TypeMeta {
    TypeMeta {
        api_version: api_version(gvk),
        kind: gvk.kind.clone(),
    }
}

/// Name and optional namespace of an object.
///
/// An empty namespace is normalized to `None` so cluster-scoped objects
/// compare equal regardless of how the server spelled them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    /// Key for a cluster-scoped object
    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// Key for a namespaced object
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespace: (!namespace.is_empty()).then_some(namespace),
            name: name.into(),
        }
    }

    /// Key of an object from its metadata, `None` if it has no name
    pub fn from_meta(meta: &ObjectMeta) -> Option<Self> {
        let name = meta.name.as_deref().filter(|n| !n.is_empty())?;
        Some(Self {
            namespace: meta.namespace.clone().filter(|ns| !ns.is_empty()),
            name: name.to_string(),
        })
    }

    /// Whether the metadata names the same object (name + namespace only)
    pub fn matches(&self, meta: &ObjectMeta) -> bool {
        meta.name.as_deref() == Some(self.name.as_str())
            && meta.namespace.as_deref().filter(|ns| !ns.is_empty()) == self.namespace.as_deref()
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// How objects of a kind are decoded and watched.
///
/// Each representation gets its own watch, so a metadata-only read never
/// pulls full objects over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    /// Typed k8s-openapi structs
    Structured,
    /// `DynamicObject` with arbitrary JSON data
    Unstructured,
    /// Type and object metadata only
    Metadata,
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Representation::Structured => "structured",
            Representation::Unstructured => "unstructured",
            Representation::Metadata => "metadata",
        })
    }
}

/// Key of one subscription handle: an item kind in one representation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandleKey {
    pub gvk: GroupVersionKind,
    pub representation: Representation,
}

impl HandleKey {
    pub fn new(gvk: GroupVersionKind, representation: Representation) -> Self {
        Self {
            gvk,
            representation,
        }
    }
}

impl fmt::Display for HandleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({})",
            api_version(&self.gvk),
            self.gvk.kind,
            self.representation
        )
    }
}

/// Identity of a single resource captured from a successful read
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    pub gvk: GroupVersionKind,
    pub key: ObjectKey,
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {}", api_version(&self.gvk), self.gvk.kind, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(ns: Option<&str>, name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: ns.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_gvk_core_group() {
        let gvk = gvk_from_api_version("v1", "Pod").unwrap();
        assert_eq!(gvk.group, "");
        assert_eq!(gvk.version, "v1");
        assert_eq!(gvk.kind, "Pod");
        assert_eq!(api_version(&gvk), "v1");
    }

    #[test]
    fn test_gvk_named_group() {
        let gvk = gvk_from_api_version("example.org/v1alpha1", "Widget").unwrap();
        assert_eq!(gvk.group, "example.org");
        assert_eq!(gvk.version, "v1alpha1");
        assert_eq!(api_version(&gvk), "example.org/v1alpha1");
    }

    #[test]
    fn test_gvk_missing_parts() {
        assert!(gvk_from_api_version("", "Pod").is_none());
        assert!(gvk_from_api_version("v1", "").is_none());
        assert!(gvk_from_api_version("apps/", "Deployment").is_none());
        assert!(gvk_from_type_meta(None).is_none());
    }

    #[test]
    fn test_object_key_matches_name_and_namespace() {
        let key = ObjectKey::namespaced("default", "web");
        assert!(key.matches(&meta(Some("default"), "web")));
        assert!(!key.matches(&meta(Some("other"), "web")));
        assert!(!key.matches(&meta(Some("default"), "api")));
        assert!(!key.matches(&meta(None, "web")));
    }

    #[test]
    fn test_object_key_empty_namespace_is_cluster_scoped() {
        let key = ObjectKey::namespaced("", "node-1");
        assert_eq!(key, ObjectKey::cluster("node-1"));
        assert!(key.matches(&meta(Some(""), "node-1")));
        assert!(key.matches(&meta(None, "node-1")));
    }

    #[test]
    fn test_object_key_from_meta_requires_name() {
        assert!(ObjectKey::from_meta(&ObjectMeta::default()).is_none());
        let key = ObjectKey::from_meta(&meta(Some("kube-system"), "dns")).unwrap();
        assert_eq!(key.to_string(), "kube-system/dns");
    }

    #[test]
    fn test_handle_key_display() {
        let key = HandleKey::new(
            GroupVersionKind::gvk("apps", "v1", "Deployment"),
            Representation::Metadata,
        );
        assert_eq!(key.to_string(), "apps/v1/Deployment (metadata)");
    }
}
