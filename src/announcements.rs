//! Announcement types carried on the pub/sub bus.
//!
//! Subscribers use these tags to tell messages apart. The event bridge never
//! interprets them: a tag is chosen by whoever builds the handlers and copied
//! into every message the handlers publish.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag identifying the meaning of a bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnouncementType {
    // Pods
    PodAdded,
    PodUpdated,
    PodDeleted,

    // Endpoints
    EndpointAdded,
    EndpointUpdated,
    EndpointDeleted,

    // Namespaces
    NamespaceAdded,
    NamespaceUpdated,
    NamespaceDeleted,

    // Services
    ServiceAdded,
    ServiceUpdated,
    ServiceDeleted,

    // Service accounts
    ServiceAccountAdded,
    ServiceAccountUpdated,
    ServiceAccountDeleted,

    // Config maps
    ConfigMapAdded,
    ConfigMapUpdated,
    ConfigMapDeleted,

    // Ingresses
    IngressAdded,
    IngressUpdated,
    IngressDeleted,

    // Mesh configuration
    MeshConfigAdded,
    MeshConfigUpdated,
    MeshConfigDeleted,
}

impl AnnouncementType {
    /// Every known announcement type, in declaration order.
    pub const ALL: [AnnouncementType; 24] = [
        AnnouncementType::PodAdded,
        AnnouncementType::PodUpdated,
        AnnouncementType::PodDeleted,
        AnnouncementType::EndpointAdded,
        AnnouncementType::EndpointUpdated,
        AnnouncementType::EndpointDeleted,
        AnnouncementType::NamespaceAdded,
        AnnouncementType::NamespaceUpdated,
        AnnouncementType::NamespaceDeleted,
        AnnouncementType::ServiceAdded,
        AnnouncementType::ServiceUpdated,
        AnnouncementType::ServiceDeleted,
        AnnouncementType::ServiceAccountAdded,
        AnnouncementType::ServiceAccountUpdated,
        AnnouncementType::ServiceAccountDeleted,
        AnnouncementType::ConfigMapAdded,
        AnnouncementType::ConfigMapUpdated,
        AnnouncementType::ConfigMapDeleted,
        AnnouncementType::IngressAdded,
        AnnouncementType::IngressUpdated,
        AnnouncementType::IngressDeleted,
        AnnouncementType::MeshConfigAdded,
        AnnouncementType::MeshConfigUpdated,
        AnnouncementType::MeshConfigDeleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnnouncementType::PodAdded => "pod-added",
            AnnouncementType::PodUpdated => "pod-updated",
            AnnouncementType::PodDeleted => "pod-deleted",
            AnnouncementType::EndpointAdded => "endpoint-added",
            AnnouncementType::EndpointUpdated => "endpoint-updated",
            AnnouncementType::EndpointDeleted => "endpoint-deleted",
            AnnouncementType::NamespaceAdded => "namespace-added",
            AnnouncementType::NamespaceUpdated => "namespace-updated",
            AnnouncementType::NamespaceDeleted => "namespace-deleted",
            AnnouncementType::ServiceAdded => "service-added",
            AnnouncementType::ServiceUpdated => "service-updated",
            AnnouncementType::ServiceDeleted => "service-deleted",
            AnnouncementType::ServiceAccountAdded => "service-account-added",
            AnnouncementType::ServiceAccountUpdated => "service-account-updated",
            AnnouncementType::ServiceAccountDeleted => "service-account-deleted",
            AnnouncementType::ConfigMapAdded => "config-map-added",
            AnnouncementType::ConfigMapUpdated => "config-map-updated",
            AnnouncementType::ConfigMapDeleted => "config-map-deleted",
            AnnouncementType::IngressAdded => "ingress-added",
            AnnouncementType::IngressUpdated => "ingress-updated",
            AnnouncementType::IngressDeleted => "ingress-deleted",
            AnnouncementType::MeshConfigAdded => "mesh-config-added",
            AnnouncementType::MeshConfigUpdated => "mesh-config-updated",
            AnnouncementType::MeshConfigDeleted => "mesh-config-deleted",
        }
    }
}

impl fmt::Display for AnnouncementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
