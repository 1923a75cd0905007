//! Per-request event scope
//!
//! A [`Scope`] holds the tags, extras, breadcrumbs and user recorded while a
//! request is handled. It is owned by that request's
//! [`RequestScope`](crate::client::RequestScope) and never shared.

use std::collections::{BTreeMap, VecDeque};

use serde_json::Value;

use crate::event::{Breadcrumb, Event, UserContext};

#[derive(Debug, Clone)]
pub struct Scope {
    tags: BTreeMap<String, String>,
    extra: BTreeMap<String, Value>,
    breadcrumbs: VecDeque<Breadcrumb>,
    user: Option<UserContext>,
    max_breadcrumbs: usize,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new(scopebridge_core::settings::DEFAULT_MAX_BREADCRUMBS)
    }
}

impl Scope {
    pub fn new(max_breadcrumbs: usize) -> Self {
        Self {
            tags: BTreeMap::new(),
            extra: BTreeMap::new(),
            breadcrumbs: VecDeque::new(),
            user: None,
            max_breadcrumbs,
        }
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    pub fn remove_tag(&mut self, key: &str) {
        self.tags.remove(key);
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(key.into(), value.into());
    }

    /// Record a breadcrumb, dropping the oldest beyond `max_breadcrumbs`
    pub fn add_breadcrumb(&mut self, breadcrumb: Breadcrumb) {
        if self.max_breadcrumbs == 0 {
            return;
        }
        while self.breadcrumbs.len() >= self.max_breadcrumbs {
            self.breadcrumbs.pop_front();
        }
        self.breadcrumbs.push_back(breadcrumb);
    }

    pub fn set_user(&mut self, user: Option<UserContext>) {
        self.user = user;
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn extras(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    pub fn breadcrumbs(&self) -> impl Iterator<Item = &Breadcrumb> {
        self.breadcrumbs.iter()
    }

    pub fn user(&self) -> Option<&UserContext> {
        self.user.as_ref()
    }

    /// Copy scope data into `event`; values already on the event win
    pub fn apply_to_event(&self, event: &mut Event) {
        for (key, value) in &self.tags {
            event.tags.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for (key, value) in &self.extra {
            event.extra.entry(key.clone()).or_insert_with(|| value.clone());
        }

        let mut breadcrumbs: Vec<Breadcrumb> = self.breadcrumbs.iter().cloned().collect();
        breadcrumbs.append(&mut event.breadcrumbs.values);
        event.breadcrumbs.values = breadcrumbs;

        if event.user.is_none() {
            event.user = self.user.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{BreadcrumbType, Severity};

    fn crumb(message: &str) -> Breadcrumb {
        Breadcrumb::new(BreadcrumbType::Default, Severity::Info).with_message(message)
    }

    #[test]
    fn test_breadcrumbs_capped() {
        let mut scope = Scope::new(2);
        scope.add_breadcrumb(crumb("a"));
        scope.add_breadcrumb(crumb("b"));
        scope.add_breadcrumb(crumb("c"));

        let messages: Vec<_> = scope
            .breadcrumbs()
            .filter_map(|b| b.message.as_deref())
            .collect();
        assert_eq!(messages, vec!["b", "c"]);
    }

    #[test]
    fn test_zero_breadcrumbs_disables_recording() {
        let mut scope = Scope::new(0);
        scope.add_breadcrumb(crumb("a"));
        assert_eq!(scope.breadcrumbs().count(), 0);
    }

    #[test]
    fn test_apply_to_event_keeps_event_values() {
        let mut scope = Scope::default();
        scope.set_tag("route", "site/index");
        scope.set_tag("category", "scope");
        scope.set_extra("logs", "scope");
        scope.set_user(Some(UserContext::with_id("7")));
        scope.add_breadcrumb(crumb("nav"));

        let mut event = Event::new(Severity::Error, "test");
        event.tags.insert("category".to_string(), "event".to_string());
        event.extra.insert("logs".to_string(), Value::from("event"));

        scope.apply_to_event(&mut event);

        assert_eq!(event.tags["route"], "site/index");
        assert_eq!(event.tags["category"], "event");
        assert_eq!(event.extra["logs"], Value::from("event"));
        assert_eq!(event.user.as_ref().unwrap().id.as_deref(), Some("7"));
        assert_eq!(event.breadcrumbs.values.len(), 1);
    }
}
