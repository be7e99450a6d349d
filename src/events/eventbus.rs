//! Script-facing publish/subscribe bus.
//!
//! Subscriptions are `(event type, subscriber component, callback)` triples.
//! Subscribe and unsubscribe requests are queued and applied by
//! [`EventBus::flush`] once per frame, so a callback running inside a publish
//! can (un)subscribe without touching the list being delivered.
//!
//! Delivery itself lives in [`crate::systems::events`]; this module only owns
//! the data.

use mlua::prelude::*;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct Subscription {
    pub event_type: String,
    /// The subscribing component (`self` of the callback owner).
    pub subscriber: LuaValue,
    pub callback: LuaFunction,
}

impl Subscription {
    pub fn new(event_type: impl Into<String>, subscriber: LuaValue, callback: LuaFunction) -> Self {
        Self {
            event_type: event_type.into(),
            subscriber,
            callback,
        }
    }

    /// Same event type, same subscriber and same callback, by identity.
    pub fn matches(&self, other: &Subscription) -> bool {
        self.event_type == other.event_type
            && self.subscriber.to_pointer() == other.subscriber.to_pointer()
            && LuaValue::Function(self.callback.clone()).to_pointer()
                == LuaValue::Function(other.callback.clone()).to_pointer()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubscriptionOp {
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Default)]
pub struct EventBus {
    live: FxHashMap<String, Vec<Subscription>>,
    pending: Vec<(SubscriptionOp, Subscription)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a subscription; it becomes visible after the next flush.
    pub fn subscribe(&mut self, subscription: Subscription) {
        self.pending.push((SubscriptionOp::Subscribe, subscription));
    }

    /// Queue the removal of a live subscription, or cancel every matching
    /// subscription that is only waiting to be applied.
    pub fn unsubscribe(&mut self, subscription: Subscription) {
        let is_live = self
            .live
            .get(&subscription.event_type)
            .is_some_and(|list| list.iter().any(|s| s.matches(&subscription)));
        if is_live {
            self.pending.push((SubscriptionOp::Unsubscribe, subscription));
            return;
        }
        self.pending
            .retain(|(op, s)| *op != SubscriptionOp::Subscribe || !s.matches(&subscription));
    }

    /// Snapshot of the live subscriptions for one event, in subscription order.
    pub fn subscribers(&self, event_type: &str) -> Vec<Subscription> {
        self.live.get(event_type).cloned().unwrap_or_default()
    }

    pub fn live_count(&self, event_type: &str) -> usize {
        self.live.get(event_type).map_or(0, Vec::len)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Apply every queued operation in request order.
    pub fn flush(&mut self) {
        for (op, subscription) in std::mem::take(&mut self.pending) {
            match op {
                SubscriptionOp::Subscribe => {
                    self.live
                        .entry(subscription.event_type.clone())
                        .or_default()
                        .push(subscription);
                }
                SubscriptionOp::Unsubscribe => {
                    if let Some(list) = self.live.get_mut(&subscription.event_type) {
                        if let Some(index) = list.iter().position(|s| s.matches(&subscription)) {
                            list.remove(index);
                        }
                        if list.is_empty() {
                            self.live.remove(&subscription.event_type);
                        }
                    }
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(lua: &Lua, event: &str) -> (Subscription, LuaTable) {
        let subscriber = lua.create_table().unwrap();
        let callback = lua.create_function(|_, ()| Ok(())).unwrap();
        (
            Subscription::new(event, LuaValue::Table(subscriber.clone()), callback),
            subscriber,
        )
    }

    #[test]
    fn subscribe_is_deferred_until_flush() {
        let lua = Lua::new();
        let mut bus = EventBus::new();
        let (sub, _) = subscription(&lua, "hit");
        bus.subscribe(sub);
        assert_eq!(bus.live_count("hit"), 0);
        bus.flush();
        assert_eq!(bus.live_count("hit"), 1);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn unsubscribe_of_live_is_deferred() {
        let lua = Lua::new();
        let mut bus = EventBus::new();
        let (sub, _) = subscription(&lua, "hit");
        bus.subscribe(sub.clone());
        bus.flush();
        bus.unsubscribe(sub);
        assert_eq!(bus.live_count("hit"), 1);
        bus.flush();
        assert_eq!(bus.live_count("hit"), 0);
    }

    #[test]
    fn unsubscribe_of_pending_cancels_it() {
        let lua = Lua::new();
        let mut bus = EventBus::new();
        let (sub, _) = subscription(&lua, "hit");
        bus.subscribe(sub.clone());
        bus.unsubscribe(sub);
        assert_eq!(bus.pending_count(), 0);
        bus.flush();
        assert_eq!(bus.live_count("hit"), 0);
    }

    #[test]
    fn identity_includes_callback() {
        let lua = Lua::new();
        let (a, subscriber) = subscription(&lua, "hit");
        let other_callback = lua.create_function(|_, ()| Ok(())).unwrap();
        let b = Subscription::new("hit", LuaValue::Table(subscriber), other_callback);
        assert!(a.matches(&a.clone()));
        assert!(!a.matches(&b));
        let mut c = a.clone();
        c.event_type = "miss".to_string();
        assert!(!a.matches(&c));
    }

    #[test]
    fn subscription_order_is_kept() {
        let lua = Lua::new();
        let mut bus = EventBus::new();
        let (first, first_table) = subscription(&lua, "tick");
        let (second, _) = subscription(&lua, "tick");
        bus.subscribe(first);
        bus.subscribe(second);
        bus.flush();
        let subs = bus.subscribers("tick");
        assert_eq!(subs.len(), 2);
        assert_eq!(
            subs[0].subscriber.to_pointer(),
            LuaValue::Table(first_table).to_pointer()
        );
        assert!(bus.subscribers("other").is_empty());
    }

    #[test]
    fn unsubscribe_cancels_every_pending_duplicate() {
        let lua = Lua::new();
        let (sub, _subscriber) = subscription(&lua, "hit");
        let mut bus = EventBus::new();
        bus.subscribe(sub.clone());
        bus.subscribe(sub.clone());
        bus.unsubscribe(sub);
        assert_eq!(bus.pending_count(), 0);
        bus.flush();
        assert_eq!(bus.live_count("hit"), 0);
    }
}
