mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use redux_store::{BindingPhase, StoreBinding, StoreRegistry};
use support::{change_variable_1, root_reducer};

#[test]
fn a_binding_activated_before_creation_eventually_attaches() {
    let registry = StoreRegistry::new();

    let consumer = StoreBinding::new(&registry);
    consumer.declare_store_name("SHARED").unwrap();
    assert_eq!(consumer.on_activate().unwrap(), BindingPhase::Pending);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    consumer
        .on_state_change(move |change| sink.lock().unwrap().push(change.clone()))
        .unwrap();

    // A different caller creates the container; the consumer is woken and
    // attaches without any further calls on it.
    let producer = StoreBinding::new(&registry);
    producer.declare_store_name("SHARED").unwrap();
    producer.declare_reducer(root_reducer()).unwrap();

    assert_eq!(consumer.phase().unwrap(), BindingPhase::Attached);

    producer.dispatch_action(&change_variable_1(3)).unwrap();
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].store_name, "SHARED");
    assert_eq!(events[0].state["variable1"], 3);
}

#[test]
fn late_creation_from_another_thread_attaches_the_waiting_binding() {
    let registry = StoreRegistry::new();

    let consumer = StoreBinding::new(&registry);
    consumer.declare_store_name("THREADED").unwrap();
    assert_eq!(consumer.on_activate().unwrap(), BindingPhase::Pending);

    let worker = {
        let registry = registry.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            registry.ensure_container("THREADED", root_reducer()).unwrap();
        })
    };
    worker.join().unwrap();

    assert_eq!(consumer.phase().unwrap(), BindingPhase::Attached);
    assert_eq!(consumer.current_state().unwrap()["variable1"], 5);
}

#[test]
fn every_attached_binding_sees_each_dispatch_once() {
    let registry = StoreRegistry::new();
    registry.ensure_container("SHARED", root_reducer()).unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    let bindings: Vec<StoreBinding> = ["first", "second", "third"]
        .into_iter()
        .map(|tag| {
            let binding = StoreBinding::new(&registry);
            binding.declare_store_name("SHARED").unwrap();
            binding.on_activate().unwrap();
            let sink = Arc::clone(&order);
            binding
                .on_state_change(move |_| sink.lock().unwrap().push(tag))
                .unwrap();
            binding
        })
        .collect();

    registry.dispatch("SHARED", &change_variable_1(1)).unwrap();

    // One notification per binding, delivered in subscription order.
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    drop(bindings);
}

#[test]
fn a_detached_binding_hears_nothing_more() {
    let registry = StoreRegistry::new();
    registry.ensure_container("SHARED", root_reducer()).unwrap();

    let listening = StoreBinding::new(&registry);
    listening.declare_store_name("SHARED").unwrap();
    listening.on_activate().unwrap();

    let leaving = StoreBinding::new(&registry);
    leaving.declare_store_name("SHARED").unwrap();
    leaving.on_activate().unwrap();

    let still_heard = Arc::new(AtomicUsize::new(0));
    let gone_quiet = Arc::new(AtomicUsize::new(0));

    let count = Arc::clone(&still_heard);
    listening
        .on_state_change(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    let count = Arc::clone(&gone_quiet);
    leaving
        .on_state_change(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    registry.dispatch("SHARED", &change_variable_1(1)).unwrap();
    leaving.on_deactivate().unwrap();
    registry.dispatch("SHARED", &change_variable_1(2)).unwrap();

    assert_eq!(still_heard.load(Ordering::SeqCst), 2);
    assert_eq!(gone_quiet.load(Ordering::SeqCst), 1);
}

#[test]
fn dispatch_does_not_require_attachment() {
    let registry = StoreRegistry::new();
    registry.ensure_container("SHARED", root_reducer()).unwrap();

    // Never activated: dispatch and reads still route by name.
    let driver = StoreBinding::new(&registry);
    driver.declare_store_name("SHARED").unwrap();
    driver.dispatch_action(&change_variable_1(11)).unwrap();

    assert_eq!(driver.phase().unwrap(), BindingPhase::Unbound);
    assert_eq!(registry.state("SHARED").unwrap()["variable1"], 11);
}

#[test]
fn teardown_while_pending_cancels_the_wait() {
    let registry = StoreRegistry::new();

    let binding = StoreBinding::new(&registry);
    binding.declare_store_name("NEVER_READY").unwrap();
    assert_eq!(binding.on_activate().unwrap(), BindingPhase::Pending);

    binding.on_deactivate().unwrap();
    registry
        .ensure_container("NEVER_READY", root_reducer())
        .unwrap();

    assert_eq!(binding.phase().unwrap(), BindingPhase::Detached);
}

#[test]
fn a_full_detach_attach_cycle_leaves_no_residue() {
    let registry = StoreRegistry::new();

    let binding = StoreBinding::new(&registry);
    binding.declare_store_name("SHARED").unwrap();
    binding.declare_reducer(root_reducer()).unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let count = Arc::clone(&fired);
    binding
        .on_state_change(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    for _ in 0..3 {
        binding.on_activate().unwrap();
        binding.on_deactivate().unwrap();
    }
    binding.on_activate().unwrap();

    binding.dispatch_action(&change_variable_1(1)).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}
