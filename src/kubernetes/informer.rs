//! Watcher adapter: `kube` watch events → resource event handler calls.
//!
//! The `kube` runtime watcher reports `Apply`/`Delete` plus relist markers
//! and handles listing, reconnection and backoff itself. What it does not
//! give is the previous state needed for an update, so the informer keeps the
//! last seen object per key and turns the stream into add/update/delete
//! calls on a [`ResourceEventHandler`].

use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use futures::StreamExt;

use super::event_handlers::ResourceEventHandler;

/// Identity of a watched object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn of<K: Resource>(obj: &K) -> Self {
        Self {
            namespace: obj.namespace(),
            name: obj.name_any(),
        }
    }
}

/// Drives one resource event handler from a watch stream.
#[derive(Debug)]
pub struct Informer<K, H> {
    name: String,
    handler: H,
    known: HashMap<ObjectKey, Arc<K>>,
    /// Keys seen since the last `Init`, while a relist is in progress.
    relisting: Option<HashSet<ObjectKey>>,
}

impl<K, H> Informer<K, H>
where
    K: Resource + Send + Sync + 'static,
    H: ResourceEventHandler<K>,
{
    pub fn new(name: impl Into<String>, handler: H) -> Self {
        Self {
            name: name.into(),
            handler,
            known: HashMap::new(),
            relisting: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of objects currently known to exist.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Apply one watch event, invoking the handler as needed.
    pub fn handle(&mut self, event: watcher::Event<K>) {
        match event {
            watcher::Event::Init => {
                tracing::debug!(informer = %self.name, "relist started");
                self.relisting = Some(HashSet::new());
            }
            watcher::Event::InitApply(obj) => {
                if let Some(seen) = self.relisting.as_mut() {
                    seen.insert(ObjectKey::of(&obj));
                }
                self.apply(obj);
            }
            watcher::Event::InitDone => self.finish_relist(),
            watcher::Event::Apply(obj) => self.apply(obj),
            watcher::Event::Delete(obj) => self.delete(obj),
        }
    }

    fn apply(&mut self, obj: K) {
        let key = ObjectKey::of(&obj);
        let new_obj = Arc::new(obj);

        match self.known.insert(key, new_obj.clone()) {
            Some(old_obj) => self.handler.on_update(old_obj, new_obj),
            None => self.handler.on_add(new_obj),
        }
    }

    fn delete(&mut self, obj: K) {
        self.known.remove(&ObjectKey::of(&obj));
        self.handler.on_delete(Arc::new(obj));
    }

    /// Objects that vanished while the watch was down are deleted with their
    /// last known state.
    fn finish_relist(&mut self) {
        let Some(seen) = self.relisting.take() else {
            return;
        };

        let stale: Vec<ObjectKey> = self
            .known
            .keys()
            .filter(|key| !seen.contains(*key))
            .cloned()
            .collect();

        tracing::debug!(
            informer = %self.name,
            listed = seen.len(),
            stale = stale.len(),
            "relist finished"
        );

        for key in stale {
            if let Some(last_known) = self.known.remove(&key) {
                self.handler.on_delete(last_known);
            }
        }
    }
}

impl<K, H> Informer<K, H>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    H: ResourceEventHandler<K>,
{
    /// Watch `api` until the stream ends.
    ///
    /// Watch errors are logged and retried by the watcher's backoff.
    pub async fn run(mut self, api: Api<K>, config: watcher::Config) {
        tracing::info!(informer = %self.name, "starting informer");

        let mut stream = std::pin::pin!(watcher::watcher(api, config).default_backoff());
        while let Some(event) = stream.next().await {
            match event {
                Ok(event) => self.handle(event),
                Err(err) => {
                    tracing::warn!(informer = %self.name, error = %err, "watch stream error");
                }
            }
        }

        tracing::info!(informer = %self.name, "informer stopped");
    }
}
