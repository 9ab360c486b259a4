//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

//! The authoritative in-memory service registry (§4.1
//! "ServiceInfoCache").
//!
//! Readers and writers share a single [`std::sync::RwLock`]: writers
//! exclude readers for the duration of the mutation itself, and readers
//! see a consistent snapshot for the lifetime of one `find()` call
//! (§5). Listener fan-out always happens after the write lock is
//! released, over state already captured under the lock, so a listener
//! can safely call back into the cache (e.g. `find()`) without
//! deadlocking (§9 "Listener callbacks vs. mutation").

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::RwLock;

use tracing::error;

use crate::attr::{AttrValue, Attributes};
use crate::debug::Debug;
use crate::error::CacheError;
use crate::filter::Filter;
use crate::scope::Scopes;
use crate::service::ServiceInfo;
use crate::url::{ServiceKey, ServiceType};

/// Outcome of a mutating cache call: the entry's value before and after
/// the operation. `current = None` means the entry no longer exists
/// (removal); `previous = None` means there was nothing there before
/// (fresh insertion, or a no-op removal of an absent key).
#[derive(Debug, Clone)]
pub struct MutationResult {
    pub previous: Option<ServiceInfo>,
    pub current: Option<ServiceInfo>,
}

/// Observes registry mutations. Callbacks fire synchronously, after the
/// cache's write lock has been released, in the order documented per
/// operation (§4.1, §5, §9 "Listener callbacks vs. mutation"). A
/// panicking listener is caught and logged; it never corrupts cache
/// state or poisons the lock for other callers.
pub trait ServiceListener: Send + Sync {
    fn service_added(&self, _current: &ServiceInfo) {}
    fn service_removed(&self, _previous: &ServiceInfo) {}
    fn service_updated(&self, _previous: &ServiceInfo, _current: &ServiceInfo) {}
}

#[derive(Default)]
struct Inner {
    // Insertion order of currently-live keys; surviving entries are
    // returned from `match()` in this order (§4.1 "Tie-breaks and
    // policy").
    order: Vec<ServiceKey>,
    entries: HashMap<ServiceKey, ServiceInfo>,
}

#[derive(Default)]
pub struct ServiceInfoCache {
    inner: RwLock<Inner>,
    listeners: RwLock<Vec<Box<dyn ServiceListener>>>,
}

impl ServiceInfoCache {
    pub fn new() -> ServiceInfoCache {
        ServiceInfoCache::default()
    }

    pub fn add_service_listener(&self, listener: Box<dyn ServiceListener>) {
        self.listeners.write().unwrap().push(listener);
    }

    /// Inserts a new entry or fully replaces an existing one with the
    /// same key (§4.1).
    pub fn put(&self, service: ServiceInfo) -> Result<MutationResult, CacheError> {
        if service.scopes.is_empty() {
            return Err(CacheError::InvalidRegistration);
        }

        let key = service.key();
        let mut inner = self.inner.write().unwrap();
        let previous = inner.entries.remove(&key);
        if previous.is_none() {
            inner.order.push(key.clone());
        }
        inner.entries.insert(key.clone(), service.clone());
        drop(inner);

        if let Some(previous) = &previous {
            Debug::ServiceRemoved(&key).log();
            self.notify_removed(previous);
        }
        Debug::ServiceAdded(&key).log();
        self.notify_added(&service);

        Ok(MutationResult {
            previous,
            current: Some(service),
        })
    }

    /// Deletes the entry for `key`. Absence is not an error (§4.1).
    pub fn remove(&self, key: &ServiceKey) -> MutationResult {
        let mut inner = self.inner.write().unwrap();
        let previous = inner.entries.remove(key);
        if previous.is_some() {
            inner.order.retain(|k| k != key);
        }
        drop(inner);

        if let Some(previous) = &previous {
            Debug::ServiceRemoved(key).log();
            self.notify_removed(previous);
        }

        MutationResult {
            previous,
            current: None,
        }
    }

    /// Merges `attrs` into the existing entry (§4.1). Fails with
    /// [`CacheError::InvalidUpdate`] if `key` is absent.
    pub fn add_attributes(
        &self,
        key: &ServiceKey,
        attrs: &Attributes,
    ) -> Result<MutationResult, CacheError> {
        let mut inner = self.inner.write().unwrap();
        let Some(entry) = inner.entries.get_mut(key) else {
            return Err(CacheError::InvalidUpdate(key.clone()));
        };
        let previous = entry.clone();
        entry.attributes.merge(attrs);
        let current = entry.clone();
        drop(inner);

        Debug::ServiceUpdated(key).log();
        self.notify_updated(&previous, &current);

        Ok(MutationResult {
            previous: Some(previous),
            current: Some(current),
        })
    }

    /// Unmerges the named tags/values from the existing entry's
    /// attributes (§4.1). Fails with [`CacheError::InvalidUpdate`] if
    /// `key` is absent.
    pub fn remove_attributes(
        &self,
        key: &ServiceKey,
        tags: &[String],
        values: &[(String, AttrValue)],
    ) -> Result<MutationResult, CacheError> {
        let mut inner = self.inner.write().unwrap();
        let Some(entry) = inner.entries.get_mut(key) else {
            return Err(CacheError::InvalidUpdate(key.clone()));
        };
        let previous = entry.clone();
        entry.attributes.unmerge(tags, values);
        let current = entry.clone();
        drop(inner);

        Debug::ServiceUpdated(key).log();
        self.notify_updated(&previous, &current);

        Ok(MutationResult {
            previous: Some(previous),
            current: Some(current),
        })
    }

    /// Returns every live entry matching the conjunction of the
    /// supplied predicates, in insertion order. A `None` argument
    /// matches anything (§4.1).
    pub fn find(
        &self,
        service_type: Option<&ServiceType>,
        language: Option<&str>,
        scopes: Option<&Scopes>,
        filter: Option<&Filter>,
    ) -> Vec<ServiceInfo> {
        let inner = self.inner.read().unwrap();
        inner
            .order
            .iter()
            .filter_map(|key| inner.entries.get(key))
            .filter(|entry| {
                service_type.is_none_or(|t| *t == entry.service_type)
                    && language.is_none_or(|l| l.eq_ignore_ascii_case(&entry.language))
                    && scopes.is_none_or(|s| entry.scopes.match_strong(s))
                    && filter.is_none_or(|f| f.evaluate(&entry.attributes))
            })
            .cloned()
            .collect()
    }

    /// Removes every entry whose lifetime has elapsed, returning the
    /// removed entries (§4.1, §4.5, §8 "Purge monotonicity").
    pub fn purge(&self) -> Vec<ServiceInfo> {
        let mut inner = self.inner.write().unwrap();
        let expired_keys: Vec<ServiceKey> = inner
            .order
            .iter()
            .filter(|key| inner.entries.get(*key).is_some_and(ServiceInfo::is_expired))
            .cloned()
            .collect();

        let mut removed = Vec::with_capacity(expired_keys.len());
        for key in &expired_keys {
            if let Some(entry) = inner.entries.remove(key) {
                removed.push(entry);
            }
        }
        inner.order.retain(|key| !expired_keys.contains(key));
        drop(inner);

        Debug::PurgeRun(removed.len()).log();
        for entry in &removed {
            Debug::ServiceRemoved(&entry.key()).log();
            self.notify_removed(entry);
        }

        removed
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn notify_added(&self, current: &ServiceInfo) {
        for listener in self.listeners.read().unwrap().iter() {
            guard_listener(|| listener.service_added(current));
        }
    }

    fn notify_removed(&self, previous: &ServiceInfo) {
        for listener in self.listeners.read().unwrap().iter() {
            guard_listener(|| listener.service_removed(previous));
        }
    }

    fn notify_updated(&self, previous: &ServiceInfo, current: &ServiceInfo) {
        for listener in self.listeners.read().unwrap().iter() {
            guard_listener(|| listener.service_updated(previous, current));
        }
    }
}

fn guard_listener<F: FnOnce()>(f: F) {
    if std::panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        error!("service listener panicked; continuing");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::url::{LIFETIME_PERMANENT, ServiceUrl};

    fn service(url: &str, lifetime: u16, scopes: &[&str]) -> ServiceInfo {
        ServiceInfo::new(
            ServiceUrl::new(url, lifetime),
            ServiceType::new("service:printer"),
            Scopes::new(scopes),
            Attributes::new(),
            "en",
        )
    }

    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<String>>,
    }

    impl ServiceListener for RecordingListener {
        fn service_added(&self, current: &ServiceInfo) {
            self.events
                .lock()
                .unwrap()
                .push(format!("added:{}", current.key()));
        }
        fn service_removed(&self, previous: &ServiceInfo) {
            self.events
                .lock()
                .unwrap()
                .push(format!("removed:{}", previous.key()));
        }
        fn service_updated(&self, _previous: &ServiceInfo, current: &ServiceInfo) {
            self.events
                .lock()
                .unwrap()
                .push(format!("updated:{}", current.key()));
        }
    }

    #[test]
    fn put_rejects_empty_scopes() {
        let cache = ServiceInfoCache::new();
        let svc = service("service:printer://p1", 60, &[]);
        assert!(matches!(
            cache.put(svc),
            Err(CacheError::InvalidRegistration)
        ));
    }

    #[test]
    fn put_then_find_round_trips() {
        let cache = ServiceInfoCache::new();
        let svc = service("service:printer://p1", 60, &["DEFAULT"]);
        cache.put(svc).unwrap();

        let results = cache.find(
            Some(&ServiceType::new("service:printer")),
            Some("en"),
            Some(&Scopes::default_scope()),
            None,
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url.as_str(), "service:printer://p1");
    }

    #[test]
    fn find_with_all_none_returns_every_entry_once() {
        let cache = ServiceInfoCache::new();
        cache.put(service("service:printer://p1", 60, &["DEFAULT"])).unwrap();
        cache.put(service("service:printer://p2", 60, &["DEFAULT"])).unwrap();
        assert_eq!(cache.find(None, None, None, None).len(), 2);
    }

    #[test]
    fn put_is_idempotent_and_fires_removed_then_added_on_replace() {
        let cache = ServiceInfoCache::new();
        let listener = std::sync::Arc::new(RecordingListener::default());
        cache.add_service_listener(Box::new(ListenerRef(listener.clone())));

        let svc = service("service:printer://p1", 60, &["DEFAULT"]);
        cache.put(svc.clone()).unwrap();
        cache.put(svc).unwrap();

        assert_eq!(cache.len(), 1);
        let events = listener.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "added:service:printer://p1 [en]",
                "removed:service:printer://p1 [en]",
                "added:service:printer://p1 [en]",
            ]
        );
    }

    struct ListenerRef(std::sync::Arc<RecordingListener>);
    impl ServiceListener for ListenerRef {
        fn service_added(&self, current: &ServiceInfo) {
            self.0.service_added(current);
        }
        fn service_removed(&self, previous: &ServiceInfo) {
            self.0.service_removed(previous);
        }
        fn service_updated(&self, previous: &ServiceInfo, current: &ServiceInfo) {
            self.0.service_updated(previous, current);
        }
    }

    #[test]
    fn remove_of_absent_key_is_not_an_error() {
        let cache = ServiceInfoCache::new();
        let result = cache.remove(&ServiceKey::new("service:printer://ghost", "en"));
        assert!(result.previous.is_none());
        assert!(result.current.is_none());
    }

    #[test]
    fn add_attributes_fails_on_absent_key() {
        let cache = ServiceInfoCache::new();
        let mut attrs = Attributes::new();
        attrs.set_flag("color");
        let result = cache.add_attributes(&ServiceKey::new("service:printer://ghost", "en"), &attrs);
        assert!(matches!(result, Err(CacheError::InvalidUpdate(..))));
    }

    #[test]
    fn add_attributes_does_not_reset_registration_time() {
        let cache = ServiceInfoCache::new();
        let svc = service("service:printer://p1", 60, &["DEFAULT"]);
        let registered_at = svc.registered_at();
        cache.put(svc).unwrap();

        let mut attrs = Attributes::new();
        attrs.set_flag("location-floor2");
        let key = ServiceKey::new("service:printer://p1", "en");
        cache.add_attributes(&key, &attrs).unwrap();

        let results = cache.find(None, None, None, None);
        assert_eq!(results[0].registered_at(), registered_at);
        assert!(results[0].attributes.contains_tag("location-floor2"));
    }

    #[test]
    fn purge_removes_only_expired_entries() {
        let cache = ServiceInfoCache::new();
        cache.put(service("service:printer://p1", 0, &["DEFAULT"])).unwrap();
        cache
            .put(service("service:printer://p2", LIFETIME_PERMANENT, &["DEFAULT"]))
            .unwrap();

        let removed = cache.purge();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].url.as_str(), "service:printer://p1");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn filter_is_applied_against_entry_attributes() {
        let cache = ServiceInfoCache::new();
        let mut attrs = Attributes::new();
        attrs.set_values("ppm", vec![AttrValue::Integer(10)]);
        let mut svc = service("service:printer://p1", 60, &["DEFAULT"]);
        svc.attributes = attrs;
        cache.put(svc).unwrap();

        let filter = crate::filter::parse("(ppm>=5)").unwrap().unwrap();
        assert_eq!(cache.find(None, None, None, Some(&filter)).len(), 1);

        let filter = crate::filter::parse("(ppm>=50)").unwrap().unwrap();
        assert_eq!(cache.find(None, None, None, Some(&filter)).len(), 0);
    }

    #[test]
    fn scope_match_requires_entry_to_carry_requested_scopes() {
        let cache = ServiceInfoCache::new();
        cache
            .put(service("service:printer://p1", 60, &["a", "b"]))
            .unwrap();

        // Entry carries both requested scopes: matches.
        assert_eq!(
            cache.find(None, None, Some(&Scopes::new(["a"])), None).len(),
            1
        );
        // Entry does not carry this scope: no match.
        assert_eq!(
            cache.find(None, None, Some(&Scopes::new(["c"])), None).len(),
            0
        );
    }
}
