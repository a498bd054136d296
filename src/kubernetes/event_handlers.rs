//! Kubernetes event handlers: watch notifications → bus announcements.
//!
//! [`get_kubernetes_event_handlers`] builds the add/update/delete callbacks a
//! watcher invokes. Each callback applies the observation filter to the
//! current object (the new state for updates), then either publishes one
//! [`PubSubMessage`] tagged from [`EventTypes`] or drops the event, emitting a
//! debug line when dropped-event logging is enabled.
//!
//! The handlers hold no mutable state: they can be cloned and invoked from
//! any number of watcher tasks at once.

use kube::Resource;
use std::fmt;
use std::sync::Arc;

use crate::announcements::AnnouncementType;
use crate::events::{Object, PubSubMessage, Publisher};

/// Which lifecycle transition a watcher reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Add,
    Update,
    Delete,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Add => f.write_str("add"),
            EventKind::Update => f.write_str("update"),
            EventKind::Delete => f.write_str("delete"),
        }
    }
}

/// Announcement type to publish for each kind of event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventTypes {
    pub add: AnnouncementType,
    pub update: AnnouncementType,
    pub delete: AnnouncementType,
}

impl EventTypes {
    pub fn for_kind(&self, kind: EventKind) -> AnnouncementType {
        match kind {
            EventKind::Add => self.add,
            EventKind::Update => self.update,
            EventKind::Delete => self.delete,
        }
    }
}

/// Returns true when events for the object should be published.
pub type ObserveFilter<K> = Arc<dyn Fn(&K) -> bool + Send + Sync>;

/// Filter that observes every object.
pub fn observe_all<K: 'static>() -> ObserveFilter<K> {
    Arc::new(|_: &K| true)
}

/// Access to an object's namespace.
///
/// Every Kubernetes resource gets this through its metadata. Other types can
/// opt in with an empty impl, which makes them cluster-scoped.
pub trait HasNamespace {
    fn get_namespace(&self) -> Option<&str> {
        None
    }
}

impl<K: Resource> HasNamespace for K {
    fn get_namespace(&self) -> Option<&str> {
        self.meta().namespace.as_deref()
    }
}

/// Receiver of watch notifications for objects of type `K`.
pub trait ResourceEventHandler<K>: Send + Sync {
    fn on_add(&self, obj: Arc<K>);
    fn on_update(&self, old_obj: Arc<K>, new_obj: Arc<K>);
    fn on_delete(&self, obj: Arc<K>);
}

pub type AddFunc<K> = Arc<dyn Fn(Arc<K>) + Send + Sync>;
pub type UpdateFunc<K> = Arc<dyn Fn(Arc<K>, Arc<K>) + Send + Sync>;
pub type DeleteFunc<K> = Arc<dyn Fn(Arc<K>) + Send + Sync>;

/// Add/update/delete callbacks, each usable on its own.
pub struct ResourceEventHandlerFuncs<K> {
    pub add_func: AddFunc<K>,
    pub update_func: UpdateFunc<K>,
    pub delete_func: DeleteFunc<K>,
}

impl<K> Clone for ResourceEventHandlerFuncs<K> {
    fn clone(&self) -> Self {
        Self {
            add_func: self.add_func.clone(),
            update_func: self.update_func.clone(),
            delete_func: self.delete_func.clone(),
        }
    }
}

impl<K> fmt::Debug for ResourceEventHandlerFuncs<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceEventHandlerFuncs").finish_non_exhaustive()
    }
}

impl<K> ResourceEventHandler<K> for ResourceEventHandlerFuncs<K> {
    fn on_add(&self, obj: Arc<K>) {
        (self.add_func)(obj)
    }

    fn on_update(&self, old_obj: Arc<K>, new_obj: Arc<K>) {
        (self.update_func)(old_obj, new_obj)
    }

    fn on_delete(&self, obj: Arc<K>) {
        (self.delete_func)(obj)
    }
}

/// Build the callbacks that route watch notifications onto the bus.
///
/// `informer_name` only labels log lines. A `None` filter observes
/// everything. `emit_logs` enables the debug line for dropped events; when it
/// is off the dropped object is not inspected at all.
pub fn get_kubernetes_event_handlers<K>(
    informer_name: &str,
    should_observe: Option<ObserveFilter<K>>,
    event_types: EventTypes,
    publisher: Arc<dyn Publisher>,
    emit_logs: bool,
) -> ResourceEventHandlerFuncs<K>
where
    K: HasNamespace + Send + Sync + 'static,
{
    let bridge = Arc::new(EventBridge {
        informer_name: informer_name.to_string(),
        should_observe: should_observe.unwrap_or_else(observe_all),
        event_types,
        publisher,
        emit_logs,
    });

    let on_add = bridge.clone();
    let on_update = bridge.clone();
    let on_delete = bridge;

    ResourceEventHandlerFuncs {
        add_func: Arc::new(move |obj: Arc<K>| on_add.handle(EventKind::Add, None, obj)),
        update_func: Arc::new(move |old_obj: Arc<K>, new_obj: Arc<K>| {
            on_update.handle(EventKind::Update, Some(old_obj), new_obj)
        }),
        delete_func: Arc::new(move |obj: Arc<K>| on_delete.handle(EventKind::Delete, None, obj)),
    }
}

struct EventBridge<K> {
    informer_name: String,
    should_observe: ObserveFilter<K>,
    event_types: EventTypes,
    publisher: Arc<dyn Publisher>,
    emit_logs: bool,
}

impl<K> EventBridge<K>
where
    K: HasNamespace + Send + Sync + 'static,
{
    /// Filter on `current`, then publish or drop.
    fn handle(&self, kind: EventKind, previous: Option<Arc<K>>, current: Arc<K>) {
        let announcement_type = self.event_types.for_kind(kind);

        if !(self.should_observe)(&*current) {
            self.log_not_observed(&current, kind, announcement_type);
            return;
        }

        self.publisher.publish(PubSubMessage::new(
            announcement_type,
            previous.map(|obj| obj as Object),
            Some(current as Object),
        ));
    }

    fn log_not_observed(&self, obj: &K, kind: EventKind, announcement_type: AnnouncementType) {
        if !self.emit_logs {
            return;
        }

        let namespace = obj.get_namespace().unwrap_or_default();
        tracing::debug!(
            informer = %self.informer_name,
            event = %kind,
            namespace,
            announcement = %announcement_type,
            "Namespace {namespace:?} is not observed; ignoring {announcement_type} event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Namespace, Pod};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    const POD_EVENTS: EventTypes = EventTypes {
        add: AnnouncementType::PodAdded,
        update: AnnouncementType::PodUpdated,
        delete: AnnouncementType::PodDeleted,
    };

    #[derive(Debug, Default)]
    struct Recorder {
        messages: Mutex<Vec<PubSubMessage>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<PubSubMessage> {
            std::mem::take(&mut *self.messages.lock())
        }
    }

    impl Publisher for Recorder {
        fn publish(&self, message: PubSubMessage) {
            self.messages.lock().push(message);
        }
    }

    fn pod(namespace: &str, name: &str) -> Arc<Pod> {
        Arc::new(Pod {
            metadata: ObjectMeta {
                namespace: Some(namespace.to_string()),
                name: Some(name.to_string()),
                ..ObjectMeta::default()
            },
            ..Pod::default()
        })
    }

    fn in_namespace(namespace: &'static str) -> ObserveFilter<Pod> {
        Arc::new(move |pod: &Pod| pod.metadata.namespace.as_deref() == Some(namespace))
    }

    fn handlers(
        filter: Option<ObserveFilter<Pod>>,
        emit_logs: bool,
    ) -> (Arc<Recorder>, ResourceEventHandlerFuncs<Pod>) {
        let recorder = Arc::new(Recorder::default());
        let funcs = get_kubernetes_event_handlers(
            "pods",
            filter,
            POD_EVENTS,
            recorder.clone(),
            emit_logs,
        );
        (recorder, funcs)
    }

    fn pod_name(obj: Option<&Pod>) -> Option<&str> {
        obj.and_then(|pod| pod.metadata.name.as_deref())
    }

    #[test]
    fn test_add_publishes_current_only() {
        let (recorder, funcs) = handlers(None, false);
        let obj = pod("bookstore", "a");

        funcs.on_add(obj.clone());

        let messages = recorder.take();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].announcement_type, AnnouncementType::PodAdded);
        assert!(messages[0].previous.is_none());
        assert_eq!(messages[0].current_as::<Pod>(), Some(obj.as_ref()));
    }

    #[test]
    fn test_update_publishes_old_and_new() {
        let (recorder, funcs) = handlers(None, false);
        let old = pod("bookstore", "old");
        let new = pod("bookstore", "new");

        funcs.on_update(old, new);

        let messages = recorder.take();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].announcement_type, AnnouncementType::PodUpdated);
        assert_eq!(pod_name(messages[0].previous_as::<Pod>()), Some("old"));
        assert_eq!(pod_name(messages[0].current_as::<Pod>()), Some("new"));
    }

    #[test]
    fn test_delete_puts_object_in_current() {
        let (recorder, funcs) = handlers(None, false);

        funcs.on_delete(pod("bookstore", "gone"));

        let messages = recorder.take();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].announcement_type, AnnouncementType::PodDeleted);
        assert!(messages[0].previous.is_none());
        assert_eq!(pod_name(messages[0].current_as::<Pod>()), Some("gone"));
    }

    #[test]
    fn test_filtered_events_not_published() {
        let (recorder, funcs) = handlers(Some(in_namespace("bookstore")), false);
        let outside = pod("kube-system", "coredns");

        funcs.on_add(outside.clone());
        funcs.on_update(outside.clone(), outside.clone());
        funcs.on_delete(outside);

        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_update_filters_on_new_object() {
        let (recorder, funcs) = handlers(Some(in_namespace("bookstore")), false);
        let old = pod("elsewhere", "a");
        let new = pod("bookstore", "a");

        funcs.on_update(old.clone(), new.clone());

        let messages = recorder.take();
        assert_eq!(messages.len(), 1);
        assert!(Arc::ptr_eq(
            messages[0].previous.as_ref().unwrap(),
            &(old as Object)
        ));
        assert!(Arc::ptr_eq(
            messages[0].current.as_ref().unwrap(),
            &(new as Object)
        ));
    }

    #[test]
    fn test_update_leaving_scope_is_dropped() {
        let (recorder, funcs) = handlers(Some(in_namespace("bookstore")), false);

        funcs.on_update(pod("bookstore", "a"), pod("elsewhere", "a"));

        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_callbacks_are_independent_handles() {
        let (recorder, funcs) = handlers(None, false);
        let add = funcs.add_func.clone();
        drop(funcs);

        add(pod("bookstore", "a"));

        assert_eq!(recorder.take().len(), 1);
    }

    #[test]
    fn test_event_types_for_kind() {
        assert_eq!(POD_EVENTS.for_kind(EventKind::Add), AnnouncementType::PodAdded);
        assert_eq!(POD_EVENTS.for_kind(EventKind::Update), AnnouncementType::PodUpdated);
        assert_eq!(POD_EVENTS.for_kind(EventKind::Delete), AnnouncementType::PodDeleted);
        assert_eq!(EventKind::Update.to_string(), "update");
    }

    #[test]
    fn test_namespace_from_resource_metadata() {
        assert_eq!(pod("bookstore", "a").get_namespace(), Some("bookstore"));

        let cluster_scoped = Namespace {
            metadata: ObjectMeta {
                name: Some("bookstore".to_string()),
                ..ObjectMeta::default()
            },
            ..Namespace::default()
        };
        assert_eq!(cluster_scoped.get_namespace(), None);
    }

    #[traced_test]
    #[test]
    fn test_logs_dropped_event_when_enabled() {
        let (recorder, funcs) = handlers(Some(in_namespace("bookstore")), true);

        funcs.on_add(pod("kube-system", "coredns"));

        assert!(recorder.take().is_empty());
        assert!(logs_contain(
            "Namespace \"kube-system\" is not observed; ignoring pod-added event"
        ));
    }

    #[traced_test]
    #[test]
    fn test_no_log_when_disabled() {
        let (_recorder, funcs) = handlers(Some(in_namespace("bookstore")), false);

        funcs.on_delete(pod("kube-system", "coredns"));

        assert!(!logs_contain("is not observed"));
    }

    #[traced_test]
    #[test]
    fn test_logs_empty_namespace_for_cluster_scoped_object() {
        let recorder = Arc::new(Recorder::default());
        let never: ObserveFilter<Namespace> = Arc::new(|_: &Namespace| false);
        let funcs = get_kubernetes_event_handlers(
            "namespaces",
            Some(never),
            EventTypes {
                add: AnnouncementType::NamespaceAdded,
                update: AnnouncementType::NamespaceUpdated,
                delete: AnnouncementType::NamespaceDeleted,
            },
            recorder.clone(),
            true,
        );

        funcs.on_update(Arc::new(Namespace::default()), Arc::new(Namespace::default()));

        assert!(recorder.take().is_empty());
        assert!(logs_contain(
            "Namespace \"\" is not observed; ignoring namespace-updated event"
        ));
    }

    /// Counts namespace lookups.
    #[derive(Debug, Default)]
    struct Probe {
        lookups: AtomicUsize,
    }

    impl HasNamespace for Probe {
        fn get_namespace(&self) -> Option<&str> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Some("probe")
        }
    }

    /// Opts in with the default body.
    #[derive(Debug)]
    struct ClusterThing;

    impl HasNamespace for ClusterThing {}

    #[test]
    fn test_namespace_not_read_when_logging_disabled() {
        let recorder = Arc::new(Recorder::default());
        let never: ObserveFilter<Probe> = Arc::new(|_: &Probe| false);
        let funcs =
            get_kubernetes_event_handlers("probes", Some(never), POD_EVENTS, recorder, false);
        let probe = Arc::new(Probe::default());

        funcs.on_add(probe.clone());
        funcs.on_update(probe.clone(), probe.clone());
        funcs.on_delete(probe.clone());

        assert_eq!(probe.lookups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_namespace_read_once_per_dropped_event_when_enabled() {
        let recorder = Arc::new(Recorder::default());
        let never: ObserveFilter<Probe> = Arc::new(|_: &Probe| false);
        let funcs =
            get_kubernetes_event_handlers("probes", Some(never), POD_EVENTS, recorder, true);
        let probe = Arc::new(Probe::default());

        funcs.on_add(probe.clone());
        funcs.on_delete(probe.clone());

        assert_eq!(probe.lookups.load(Ordering::SeqCst), 2);
    }

    #[traced_test]
    #[test]
    fn test_default_has_namespace_is_cluster_scoped() {
        assert_eq!(ClusterThing.get_namespace(), None);

        let recorder = Arc::new(Recorder::default());
        let never: ObserveFilter<ClusterThing> = Arc::new(|_: &ClusterThing| false);
        let funcs =
            get_kubernetes_event_handlers("things", Some(never), POD_EVENTS, recorder, true);

        funcs.on_delete(Arc::new(ClusterThing));

        assert!(logs_contain("Namespace \"\" is not observed; ignoring pod-deleted event"));
    }

    #[test]
    fn test_filter_sees_object_before_publish() {
        let order = Arc::new(Mutex::new(Vec::new()));

        let filter_order = order.clone();
        let filter: ObserveFilter<Pod> = Arc::new(move |_: &Pod| {
            filter_order.lock().push("filter");
            true
        });
        let publish_order = order.clone();
        let publisher = move |_: PubSubMessage| publish_order.lock().push("publish");

        let funcs =
            get_kubernetes_event_handlers("pods", Some(filter), POD_EVENTS, Arc::new(publisher), false);
        funcs.on_add(pod("bookstore", "a"));

        assert_eq!(*order.lock(), vec!["filter", "publish"]);
    }

    #[derive(Debug, Clone)]
    enum Step {
        Add(usize),
        Update(usize, usize),
        Delete(usize),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0..6usize).prop_map(Step::Add),
            (0..6usize, 0..6usize).prop_map(|(a, b)| Step::Update(a, b)),
            (0..6usize).prop_map(Step::Delete),
        ]
    }

    fn replay(funcs: &ResourceEventHandlerFuncs<Pod>, pods: &[Arc<Pod>], steps: &[Step]) {
        for step in steps {
            match *step {
                Step::Add(i) => funcs.on_add(pods[i].clone()),
                Step::Update(a, b) => funcs.on_update(pods[a].clone(), pods[b].clone()),
                Step::Delete(i) => funcs.on_delete(pods[i].clone()),
            }
        }
    }

    fn fixture_pods() -> Vec<Arc<Pod>> {
        // even indices are observed, odd ones are not
        (0..6)
            .map(|i| {
                let namespace = if i % 2 == 0 { "bookstore" } else { "kube-system" };
                pod(namespace, &format!("pod-{i}"))
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_publishes_exactly_observed_events(steps in prop::collection::vec(step(), 0..40)) {
            let pods = fixture_pods();
            let (recorder, funcs) = handlers(Some(in_namespace("bookstore")), false);

            replay(&funcs, &pods, &steps);

            let expected: Vec<(AnnouncementType, Option<usize>, usize)> = steps
                .iter()
                .filter_map(|step| match *step {
                    Step::Add(i) if i % 2 == 0 => Some((AnnouncementType::PodAdded, None, i)),
                    Step::Update(a, b) if b % 2 == 0 => {
                        Some((AnnouncementType::PodUpdated, Some(a), b))
                    }
                    Step::Delete(i) if i % 2 == 0 => Some((AnnouncementType::PodDeleted, None, i)),
                    _ => None,
                })
                .collect();

            let messages = recorder.take();
            prop_assert_eq!(messages.len(), expected.len());
            for (message, (announcement_type, previous, current)) in messages.iter().zip(expected) {
                prop_assert_eq!(message.announcement_type, announcement_type);
                prop_assert_eq!(message.previous_as::<Pod>(), previous.map(|i| pods[i].as_ref()));
                prop_assert_eq!(message.current_as::<Pod>(), Some(pods[current].as_ref()));
            }
        }

        #[test]
        fn prop_no_filter_publishes_every_event(steps in prop::collection::vec(step(), 0..40)) {
            let pods = fixture_pods();
            let (recorder, funcs) = handlers(None, false);

            replay(&funcs, &pods, &steps);

            prop_assert_eq!(recorder.take().len(), steps.len());
        }

        #[test]
        fn prop_identically_built_handlers_agree(steps in prop::collection::vec(step(), 0..40)) {
            let pods = fixture_pods();
            let (first, first_funcs) = handlers(Some(in_namespace("bookstore")), false);
            let (second, second_funcs) = handlers(Some(in_namespace("bookstore")), false);

            replay(&first_funcs, &pods, &steps);
            replay(&second_funcs, &pods, &steps);

            let first = first.take();
            let second = second.take();
            prop_assert_eq!(first.len(), second.len());
            for (a, b) in first.iter().zip(second.iter()) {
                prop_assert!(a.is_same(b));
            }
        }
    }
}
