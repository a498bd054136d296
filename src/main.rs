//! Kube event bridge - main entry point.
//!
//! Watches namespaces, pods and services, publishes their lifecycle events
//! onto an in-process bus and logs every announcement a subscriber receives.

use k8s_openapi::api::core::v1::{Namespace, Pod, Service};
use kube::runtime::watcher;
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use tokio::task::JoinHandle;

use kube_event_bridge::kubernetes::{filter, get_kubernetes_event_handlers, EventTypes, Informer};
use kube_event_bridge::observability::init_tracing;
use kube_event_bridge::{AnnouncementType, Config, PubSub, PubSubMessage, Publisher, Result};

/// `namespace/name` of the message's current object, for the known kinds.
fn describe(message: &PubSubMessage) -> String {
    let key = |namespace: Option<String>, name: String| match namespace {
        Some(namespace) => format!("{namespace}/{name}"),
        None => name,
    };

    if let Some(pod) = message.current_as::<Pod>() {
        key(pod.namespace(), pod.name_any())
    } else if let Some(service) = message.current_as::<Service>() {
        key(service.namespace(), service.name_any())
    } else if let Some(namespace) = message.current_as::<Namespace>() {
        namespace.name_any()
    } else {
        String::from("<unknown>")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Resolve configuration once for the process
    let config = Config::from_env()?;

    init_tracing(&config.observability);

    let monitored = config.events.monitored_namespace_set();
    let emit_logs = config.events.log_kubernetes_events;
    if monitored.is_empty() {
        tracing::warn!("no monitored namespaces configured; every event will be dropped");
    }

    let client = Client::try_default().await?;
    let bus = Arc::new(PubSub::new());
    let publisher: Arc<dyn Publisher> = bus.clone();

    let (_subscription, mut rx) = bus.subscribe(
        format!("announcement-logger-{}", uuid::Uuid::new_v4()),
        AnnouncementType::ALL.to_vec(),
    );
    let logger = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            tracing::info!(
                announcement = %message.announcement_type,
                object = %describe(&message),
                "announcement received"
            );
        }
    });

    let namespaces = Informer::<Namespace, _>::new(
        "namespaces",
        get_kubernetes_event_handlers(
            "namespaces",
            Some(filter::monitored_namespace_objects(monitored.clone())),
            EventTypes {
                add: AnnouncementType::NamespaceAdded,
                update: AnnouncementType::NamespaceUpdated,
                delete: AnnouncementType::NamespaceDeleted,
            },
            publisher.clone(),
            emit_logs,
        ),
    );

    let pods = Informer::<Pod, _>::new(
        "pods",
        get_kubernetes_event_handlers(
            "pods",
            Some(filter::monitored_namespaces::<Pod, _, _>(monitored.clone())),
            EventTypes {
                add: AnnouncementType::PodAdded,
                update: AnnouncementType::PodUpdated,
                delete: AnnouncementType::PodDeleted,
            },
            publisher.clone(),
            emit_logs,
        ),
    );

    let services = Informer::<Service, _>::new(
        "services",
        get_kubernetes_event_handlers(
            "services",
            Some(filter::monitored_namespaces::<Service, _, _>(monitored)),
            EventTypes {
                add: AnnouncementType::ServiceAdded,
                update: AnnouncementType::ServiceUpdated,
                delete: AnnouncementType::ServiceDeleted,
            },
            publisher,
            emit_logs,
        ),
    );

    let tasks: Vec<JoinHandle<()>> = vec![
        tokio::spawn(namespaces.run(Api::all(client.clone()), watcher::Config::default())),
        tokio::spawn(pods.run(Api::all(client.clone()), watcher::Config::default())),
        tokio::spawn(services.run(Api::all(client), watcher::Config::default())),
        logger,
    ];

    tracing::info!("kube event bridge running");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    for task in tasks {
        task.abort();
    }

    Ok(())
}
