//! Event delivery for `Event.Publish`.
//!
//! Delivery walks a snapshot of the live subscriptions, so (un)subscribing
//! from inside a callback never changes who receives the event being
//! published. Whether a subscriber is enabled is read right before its call;
//! disabled subscribers are skipped and then unsubscribed once the loop is
//! done.

use mlua::prelude::*;

use crate::events::eventbus::Subscription;
use crate::resources::context::RuntimeContext;
use crate::resources::lua_runtime::{owner_name, report_script_error, value_enabled};

pub fn publish(ctx: &RuntimeContext, event_type: &str, payload: Option<LuaValue>) {
    let subscribers = ctx.bus.borrow().subscribers(event_type);
    let mut orphans: Vec<Subscription> = Vec::new();

    for subscription in subscribers {
        if !value_enabled(&subscription.subscriber) {
            orphans.push(subscription);
            continue;
        }
        let mut args = vec![subscription.subscriber.clone()];
        args.extend(payload.clone());
        if let Err(err) = subscription
            .callback
            .call::<()>(args.into_iter().collect::<LuaMultiValue>())
        {
            report_script_error(&owner_name(ctx, &subscription.subscriber), &err);
        }
    }

    if orphans.is_empty() {
        return;
    }
    let mut bus = ctx.bus.borrow_mut();
    for subscription in orphans {
        bus.unsubscribe(subscription);
    }
}
