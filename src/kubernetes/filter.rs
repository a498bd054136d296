//! Observation filters for monitored namespaces.

use k8s_openapi::api::core::v1::Namespace;
use std::collections::HashSet;
use std::sync::Arc;

use super::event_handlers::{HasNamespace, ObserveFilter};

fn name_set<I, S>(names: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

/// Observe objects living in one of `names`.
///
/// Cluster-scoped objects have no namespace and are never observed.
pub fn monitored_namespaces<K, I, S>(names: I) -> ObserveFilter<K>
where
    K: HasNamespace + 'static,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let monitored = name_set(names);
    Arc::new(move |obj: &K| {
        obj.get_namespace()
            .is_some_and(|namespace| monitored.contains(namespace))
    })
}

/// Observe `Namespace` objects whose own name is one of `names`.
pub fn monitored_namespace_objects<I, S>(names: I) -> ObserveFilter<Namespace>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let monitored = name_set(names);
    Arc::new(move |namespace: &Namespace| {
        namespace
            .metadata
            .name
            .as_deref()
            .is_some_and(|name| monitored.contains(name))
    })
}
