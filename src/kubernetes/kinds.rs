// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Item kind resolution for list reads.
//!
//! A list is read through the watch of its *item* kind. Structured lists know
//! their list kind from the k8s-openapi type; generic lists carry it on the
//! value. Either way the item kind is the list kind minus a trailing `List`.

use kube::api::GroupVersionKind;

use super::error::ResolveError;
use super::identity::{HandleKey, Representation};

const LIST_SUFFIX: &str = "List";

/// Kind of a collection value, computed once per read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListKind {
    /// Registered list kind of a typed collection (e.g. `v1/PodList`)
    Structured(GroupVersionKind),
    /// Kind set on an unstructured list value, if any
    Unstructured(Option<GroupVersionKind>),
    /// Kind set on a metadata-only list value, if any
    Metadata(Option<GroupVersionKind>),
}

impl ListKind {
    /// Resolve the handle key of the item kind this list reads
    pub fn resolve(&self) -> Result<HandleKey, ResolveError> {
        let (list_gvk, representation) = match self {
            ListKind::Structured(gvk) => (gvk, Representation::Structured),
            ListKind::Unstructured(Some(gvk)) => (gvk, Representation::Unstructured),
            ListKind::Metadata(Some(gvk)) => (gvk, Representation::Metadata),
            ListKind::Unstructured(None) => {
                return Err(ResolveError::MissingKind(Representation::Unstructured));
            }
            ListKind::Metadata(None) => {
                return Err(ResolveError::MissingKind(Representation::Metadata));
            }
        };

        let kind = item_kind(&list_gvk.kind);
        if kind.is_empty() {
            return Err(ResolveError::EmptyItemKind(list_gvk.kind.clone()));
        }

        Ok(HandleKey::new(
            GroupVersionKind::gvk(&list_gvk.group, &list_gvk.version, kind),
            representation,
        ))
    }
}

/// Strip one trailing `List` from a kind name
pub fn item_kind(list_kind: &str) -> &str {
    list_kind.strip_suffix(LIST_SUFFIX).unwrap_or(list_kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gvk(group: &str, version: &str, kind: &str) -> GroupVersionKind {
        GroupVersionKind::gvk(group, version, kind)
    }

    #[test]
    fn test_structured_list_resolves_declared_item_kind() {
        let key = ListKind::Structured(gvk("apps", "v1", "DeploymentList"))
            .resolve()
            .unwrap();
        assert_eq!(key.gvk, gvk("apps", "v1", "Deployment"));
        assert_eq!(key.representation, Representation::Structured);
    }

    #[test]
    fn test_generic_list_strips_suffix() {
        let key = ListKind::Unstructured(Some(gvk("example.org", "v1", "WidgetList")))
            .resolve()
            .unwrap();
        assert_eq!(key.gvk.kind, "Widget");
        assert_eq!(key.gvk.group, "example.org");
        assert_eq!(key.representation, Representation::Unstructured);
    }

    #[test]
    fn test_metadata_list_keeps_representation() {
        let key = ListKind::Metadata(Some(gvk("", "v1", "ConfigMapList")))
            .resolve()
            .unwrap();
        assert_eq!(key.gvk.kind, "ConfigMap");
        assert_eq!(key.representation, Representation::Metadata);
    }

    #[test]
    fn test_generic_list_without_kind_fails() {
        assert_eq!(
            ListKind::Unstructured(None).resolve(),
            Err(ResolveError::MissingKind(Representation::Unstructured))
        );
        assert_eq!(
            ListKind::Metadata(None).resolve(),
            Err(ResolveError::MissingKind(Representation::Metadata))
        );
    }

    #[test]
    fn test_bare_list_kind_fails() {
        assert_eq!(
            ListKind::Unstructured(Some(gvk("", "v1", "List"))).resolve(),
            Err(ResolveError::EmptyItemKind("List".to_string()))
        );
    }

    #[test]
    fn test_item_kind_strips_only_one_suffix() {
        assert_eq!(item_kind("WidgetList"), "Widget");
        assert_eq!(item_kind("Widget"), "Widget");
        assert_eq!(item_kind("ListList"), "List");
        assert_eq!(item_kind("Listener"), "Listener");
    }
}
