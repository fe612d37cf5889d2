//! Object metadata shared by every resource the scheduler touches.
//!
//! Mirrors the orchestrator's object model: name/namespace identity, a
//! server-assigned uid, an optimistic-concurrency resource version, and the
//! owner-reference edge used to route child events back to the parent. The
//! owner edge is a one-way parent pointer on the child; the parent never
//! holds pointers back.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespaced name of a resource. This is the work-queue key: reconcile
/// requests are deduplicated by it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Standard object metadata.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    /// Server-assigned unique id. Nil until the resource is persisted.
    #[serde(default)]
    pub uid: Uuid,
    /// Optimistic-concurrency token. Bumped by the orchestrator on every
    /// write; a stale value on update yields a conflict.
    #[serde(default)]
    pub resource_version: u64,
    pub creation_timestamp: DateTime<Utc>,
    /// Set when deletion has been requested but finalization is pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

impl ObjectMeta {
    /// Fresh metadata for a resource that has not been persisted yet.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            uid: Uuid::nil(),
            resource_version: 0,
            creation_timestamp: Utc::now(),
            deletion_timestamp: None,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            owner_references: Vec::new(),
        }
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.namespace.clone(), self.name.clone())
    }

    /// Whether a deletion timestamp has been set.
    pub fn is_being_deleted(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    /// The owner reference flagged as controller, if any.
    pub fn controller_owner(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|r| r.controller)
    }
}

/// A one-way edge from a child resource to its owning parent.
///
/// `controller: true` marks the managing owner; the orchestrator routes the
/// child's events to it and garbage-collects the child when it goes away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
    pub uid: Uuid,
    #[serde(default)]
    pub controller: bool,
}

impl OwnerReference {
    /// Build the controller reference for a child owned by `owner`.
    pub fn controller_of(owner: &ObjectMeta, kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: owner.name.clone(),
            uid: owner.uid,
            controller: true,
        }
    }
}

/// A lightweight pointer to another resource, as stored in status fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub name: String,
    pub namespace: String,
    pub uid: Uuid,
}

impl From<&ObjectMeta> for ObjectReference {
    fn from(meta: &ObjectMeta) -> Self {
        Self {
            name: meta.name.clone(),
            namespace: meta.namespace.clone(),
            uid: meta.uid,
        }
    }
}
