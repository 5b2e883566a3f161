use std::sync::{Arc, Mutex};

use anyhow::bail;
use serde_json::json;

use termdock_bus::EventBus;
use termdock_types::{PushEvent, DATA_SYNC_EVENT};

fn data_sync_event() -> PushEvent {
    PushEvent::new(DATA_SYNC_EVENT, json!({"scope": "settings"}))
}

#[test]
fn delivers_in_registration_order() {
    let bus = EventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for label in ["first", "second", "third"] {
        let seen = seen.clone();
        bus.register(DATA_SYNC_EVENT, move |_event| {
            seen.lock().unwrap().push(label);
            Ok(())
        });
    }

    bus.deliver(&data_sync_event());
    assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn two_handlers_each_invoked_exactly_once() {
    let bus = EventBus::new();
    let counts = Arc::new(Mutex::new((0u32, 0u32)));

    let c = counts.clone();
    bus.register(DATA_SYNC_EVENT, move |_| {
        c.lock().unwrap().0 += 1;
        Ok(())
    });
    let c = counts.clone();
    bus.register(DATA_SYNC_EVENT, move |_| {
        c.lock().unwrap().1 += 1;
        Ok(())
    });

    bus.deliver(&data_sync_event());
    assert_eq!(*counts.lock().unwrap(), (1, 1));
}

#[test]
fn registration_is_idempotent_per_identity() {
    let bus = EventBus::new();
    let count = Arc::new(Mutex::new(0u32));
    let id = bus.handler_id();

    let c = count.clone();
    assert!(bus.register_with_id(DATA_SYNC_EVENT, id, move |_| {
        *c.lock().unwrap() += 1;
        Ok(())
    }));
    let c = count.clone();
    assert!(!bus.register_with_id(DATA_SYNC_EVENT, id, move |_| {
        *c.lock().unwrap() += 1;
        Ok(())
    }));

    bus.deliver(&data_sync_event());
    assert_eq!(*count.lock().unwrap(), 1);
}

#[test]
fn failing_handler_does_not_block_later_handlers() {
    let bus = EventBus::new();
    let reached = Arc::new(Mutex::new(false));

    bus.register(DATA_SYNC_EVENT, |_| bail!("handler blew up"));
    let r = reached.clone();
    bus.register(DATA_SYNC_EVENT, move |_| {
        *r.lock().unwrap() = true;
        Ok(())
    });

    bus.deliver(&data_sync_event());
    assert!(*reached.lock().unwrap());
}

#[test]
fn handler_unregistered_mid_dispatch_is_skipped() {
    let bus = Arc::new(EventBus::new());
    let second = bus.handler_id();
    let second_calls = Arc::new(Mutex::new(0u32));

    let bus_ref = bus.clone();
    bus.register(DATA_SYNC_EVENT, move |_| {
        // removes the later handler while this dispatch cycle is running
        bus_ref.unregister(DATA_SYNC_EVENT, second);
        Ok(())
    });
    let c = second_calls.clone();
    bus.register_with_id(DATA_SYNC_EVENT, second, move |_| {
        *c.lock().unwrap() += 1;
        Ok(())
    });

    bus.deliver(&data_sync_event());
    bus.deliver(&data_sync_event());
    assert_eq!(*second_calls.lock().unwrap(), 0);
}

#[test]
fn handler_may_register_another_mid_dispatch() {
    let bus = Arc::new(EventBus::new());
    let added_calls = Arc::new(Mutex::new(0u32));

    let bus_ref = bus.clone();
    let c = added_calls.clone();
    bus.register(DATA_SYNC_EVENT, move |_| {
        let c = c.clone();
        bus_ref.register("plugin_installed", move |_| {
            *c.lock().unwrap() += 1;
            Ok(())
        });
        Ok(())
    });

    bus.deliver(&data_sync_event());
    bus.deliver(&PushEvent::new("plugin_installed", json!({})));
    assert_eq!(*added_calls.lock().unwrap(), 1);
}

#[test]
fn events_are_filtered_by_event_type() {
    let bus = EventBus::new();
    let calls = Arc::new(Mutex::new(0u32));

    let c = calls.clone();
    bus.register(DATA_SYNC_EVENT, move |_| {
        *c.lock().unwrap() += 1;
        Ok(())
    });

    bus.deliver(&PushEvent::new("plugin_installed", json!({})));
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[test]
fn unregister_all_and_clear_silence_delivery() {
    let bus = EventBus::new();
    let calls = Arc::new(Mutex::new(0u32));

    for _ in 0..2 {
        let c = calls.clone();
        bus.register(DATA_SYNC_EVENT, move |_| {
            *c.lock().unwrap() += 1;
            Ok(())
        });
    }
    let c = calls.clone();
    bus.register("plugin_installed", move |_| {
        *c.lock().unwrap() += 1;
        Ok(())
    });

    bus.unregister_all(DATA_SYNC_EVENT);
    bus.deliver(&data_sync_event());
    assert_eq!(*calls.lock().unwrap(), 0);

    bus.clear();
    bus.deliver(&PushEvent::new("plugin_installed", json!({})));
    assert_eq!(*calls.lock().unwrap(), 0);
}
