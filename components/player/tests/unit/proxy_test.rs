//! Unit tests for JsObjectWrapper

use async_runtime::{MainThread, TaskPriority};
use core_types::{CanonicalValue, ErrorKind, ToCanonical};
use js_engine::{JsValue, Realm};
use player::{JsManager, JsManagerConfig, JsObjectWrapper};
use std::sync::mpsc;

/// Installs `demo.Counter`, a constructor whose instances count calls.
fn install_counter(realm: &Realm) -> core_types::Result<()> {
    let demo = realm.new_object();
    let counter = realm.new_function("Counter", |realm, this, args| {
        let Some(object) = this.as_object() else {
            return Err(realm.new_type_error("Counter called without an object"));
        };
        let start = args.first().and_then(JsValue::as_number).unwrap_or(0.0);
        object.set("count", JsValue::Number(start));
        object.set(
            "increment",
            realm.new_function("increment", |_, this, args| {
                let Some(object) = this.as_object() else {
                    return Ok(JsValue::Undefined);
                };
                let by = args.first().and_then(JsValue::as_number).unwrap_or(1.0);
                let count = object.get("count").as_number().unwrap_or(0.0) + by;
                object.set("count", JsValue::Number(count));
                Ok(JsValue::Number(count))
            }),
        );
        object.set(
            "later",
            realm.new_function("later", |realm, _, args| {
                Ok(realm.resolved_promise(args.first().cloned().unwrap_or(JsValue::Undefined)))
            }),
        );
        object.set(
            "fail",
            realm.new_function("fail", |realm, _, _| {
                let error = realm.new_error("counter overflow");
                if let Some(object) = error.as_object() {
                    object.set("category", JsValue::Number(1.0));
                    object.set("code", JsValue::Number(1001.0));
                    object.set("severity", JsValue::Number(2.0));
                }
                Err(error)
            }),
        );
        object.set(
            "getConfiguration",
            realm.new_function("getConfiguration", |realm, this, _| {
                let streaming = realm.new_object();
                streaming.set("bufferingGoal", JsValue::Number(10.0));
                let config = realm.new_object();
                config.set("streaming", JsValue::Object(streaming));
                if let Some(object) = this.as_object() {
                    config.set("count", object.get("count"));
                }
                Ok(JsValue::Object(config))
            }),
        );
        object.set(
            "destroy",
            realm.new_function("destroy", |realm, _, _| {
                realm.global().set("destroyed", JsValue::Boolean(true));
                Ok(JsValue::Undefined)
            }),
        );
        Ok(JsValue::Undefined)
    });
    demo.set("Counter", counter);
    demo.set("label", JsValue::string("counters"));
    realm.global().set("demo", JsValue::Object(demo));
    Ok(())
}

fn manager() -> JsManager {
    JsManager::with_bootstrap(JsManagerConfig::default(), install_counter).unwrap()
}

fn constructed(manager: &JsManager, start: f64) -> JsObjectWrapper {
    let wrapper = JsObjectWrapper::new(manager.main_thread().clone());
    wrapper
        .construct("demo.Counter", vec![start.to_canonical()], |_, _| Ok(()))
        .get()
        .unwrap();
    wrapper
}

fn live_handles(main: &MainThread) -> usize {
    main.add_internal_task("count handles", || Ok(Realm::current().live_handles()))
        .get()
        .unwrap()
}

#[test]
fn construct_runs_setup_with_the_instance() {
    let manager = manager();
    let wrapper = JsObjectWrapper::new(manager.main_thread().clone());
    wrapper
        .construct("demo.Counter", vec![CanonicalValue::number(5.0)], |realm, instance| {
            assert_eq!(realm.get_member(instance, "count").as_number(), Some(5.0));
            Ok(())
        })
        .get()
        .unwrap();
    assert!(wrapper.handle().is_some());
}

#[test]
fn missing_constructor_is_a_construction_error() {
    let manager = manager();
    let wrapper = JsObjectWrapper::new(manager.main_thread().clone());
    let err = wrapper
        .construct("demo.Missing", Vec::new(), |_, _| Ok(()))
        .get()
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Construction);
    assert_eq!(err.message, "The constructor 'demo.Missing' is not found.");
    assert!(wrapper.handle().is_none());
}

#[test]
fn calls_queued_before_construction_run_after_it() {
    let manager = manager();
    let wrapper = JsObjectWrapper::new(manager.main_thread().clone());
    let ready = wrapper.construct("demo.Counter", vec![CanonicalValue::number(1.0)], |_, _| Ok(()));
    let count = wrapper.call_method::<f64>("increment", vec![CanonicalValue::number(2.0)]);
    ready.get().unwrap();
    assert_eq!(count.get().unwrap(), 3.0);
}

/// Keeps the main thread busy until the returned sender fires.
fn hold_main_thread(main: &MainThread) -> mpsc::Sender<()> {
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (started_tx, started_rx) = mpsc::channel::<()>();
    assert!(main.post(TaskPriority::Immediate, "hold", move || {
        let _ = started_tx.send(());
        let _ = release_rx.recv();
    }));
    started_rx.recv().unwrap();
    release_tx
}

#[test]
fn reads_and_calls_before_construction_keep_issuance_order() {
    let manager = manager();
    let main = manager.main_thread().clone();
    let wrapper = JsObjectWrapper::new(main.clone());
    let hold = hold_main_thread(&main);

    let ready = wrapper.construct("demo.Counter", vec![CanonicalValue::number(0.0)], |_, _| Ok(()));
    let member_before = wrapper.get_member::<f64>("count");
    let config_before = wrapper.get_config_value::<f64>("count");
    let increment = wrapper.call_method::<f64>("increment", vec![CanonicalValue::number(1.0)]);
    let member_after = wrapper.get_member::<f64>("count");
    let config_after = wrapper.get_config_value::<f64>("count");
    hold.send(()).unwrap();

    ready.get().unwrap();
    assert_eq!(member_before.get().unwrap(), 0.0);
    assert_eq!(config_before.get().unwrap(), 0.0);
    assert_eq!(increment.get().unwrap(), 1.0);
    assert_eq!(member_after.get().unwrap(), 1.0);
    assert_eq!(config_after.get().unwrap(), 1.0);
}

#[test]
fn reads_after_construction_keep_issuance_order() {
    let manager = manager();
    let main = manager.main_thread().clone();
    let wrapper = constructed(&manager, 5.0);
    let hold = hold_main_thread(&main);

    let config_before = wrapper.get_config_value::<f64>("count");
    let increment = wrapper.call_method::<f64>("increment", vec![CanonicalValue::number(2.0)]);
    let member_after = wrapper.get_member::<f64>("count");
    hold.send(()).unwrap();

    assert_eq!(config_before.get().unwrap(), 5.0);
    assert_eq!(increment.get().unwrap(), 7.0);
    assert_eq!(member_after.get().unwrap(), 7.0);
}

#[test]
fn call_method_converts_result() {
    let manager = manager();
    let wrapper = constructed(&manager, 0.0);
    assert_eq!(wrapper.call_method::<f64>("increment", Vec::new()).get().unwrap(), 1.0);
    assert_eq!(wrapper.get_member::<f64>("count").get().unwrap(), 1.0);
}

#[test]
fn runtime_promise_results_are_followed() {
    let manager = manager();
    let wrapper = constructed(&manager, 0.0);
    let value = wrapper.call_method::<String>("later", vec!["done".to_canonical()]);
    assert_eq!(value.get().unwrap(), "done");
}

#[test]
fn thrown_errors_keep_script_details() {
    let manager = manager();
    let wrapper = constructed(&manager, 0.0);
    let err = wrapper.call_method::<()>("fail", Vec::new()).get().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Invocation);
    assert_eq!(err.message, "counter overflow");
    let details = err.details.unwrap();
    assert_eq!((details.category, details.code, details.severity), (1, 1001, 2));
}

#[test]
fn wrong_result_type_names_the_method() {
    let manager = manager();
    let wrapper = constructed(&manager, 0.0);
    let err = wrapper.call_method::<String>("increment", Vec::new()).get().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conversion);
    assert!(err.message.contains("increment"), "{}", err.message);
}

#[test]
fn calling_a_missing_method_is_an_invocation_error() {
    let manager = manager();
    let wrapper = constructed(&manager, 0.0);
    let err = wrapper.call_method::<()>("rewind", Vec::new()).get().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Invocation);
    assert!(err.message.contains("rewind"));
}

#[test]
fn config_value_reads_nested_path() {
    let manager = manager();
    let wrapper = constructed(&manager, 0.0);
    let goal = wrapper.get_config_value::<f64>("streaming.bufferingGoal");
    assert_eq!(goal.get().unwrap(), 10.0);
}

#[test]
fn config_value_errors_name_the_path() {
    let manager = manager();
    let wrapper = constructed(&manager, 0.0);

    let missing = wrapper.get_config_value::<f64>("streaming.missing").get().unwrap_err();
    assert_eq!(missing.kind, ErrorKind::Conversion);
    assert!(missing.message.contains("streaming.missing"), "{}", missing.message);

    let too_deep = wrapper.get_config_value::<f64>("streaming.missing.deeper").get().unwrap_err();
    assert_eq!(too_deep.kind, ErrorKind::Conversion);
    assert!(too_deep.message.contains("streaming.missing.deeper"));
}

#[test]
fn global_fields_and_methods() {
    let manager = manager();
    let main = manager.main_thread();
    let label: String = JsObjectWrapper::get_global_field(main, "demo.label").get().unwrap();
    assert_eq!(label, "counters");

    let err = JsObjectWrapper::call_global_method::<()>(main, "demo.label", Vec::new())
        .get()
        .unwrap_err();
    assert!(err.message.contains("demo.label"));
}

#[test]
fn call_global_method_binds_parent_as_this() {
    let manager = JsManager::with_bootstrap(JsManagerConfig::default(), |realm| {
        let log = realm.new_object();
        log.set("level", JsValue::Number(0.0));
        log.set(
            "setLevel",
            realm.new_function("setLevel", |_, this, args| {
                if let (Some(object), Some(level)) = (this.as_object(), args.first()) {
                    object.set("level", level.clone());
                }
                Ok(JsValue::Undefined)
            }),
        );
        realm.global().set("log", JsValue::Object(log));
        Ok(())
    })
    .unwrap();
    let main = manager.main_thread();
    JsObjectWrapper::call_global_method::<()>(main, "log.setLevel", vec![CanonicalValue::number(4.0)])
        .get()
        .unwrap();
    let level: f64 = JsObjectWrapper::get_global_field(main, "log.level").get().unwrap();
    assert_eq!(level, 4.0);
}

#[test]
fn destroy_blocking_waits_for_destroy() {
    let manager = manager();
    let wrapper = constructed(&manager, 0.0);
    wrapper.destroy_blocking();
    let destroyed: bool = JsObjectWrapper::get_global_field(manager.main_thread(), "destroyed")
        .get()
        .unwrap();
    assert!(destroyed);
}

#[test]
fn dropping_the_wrapper_releases_its_handle() {
    let manager = manager();
    let main = manager.main_thread().clone();
    let before = live_handles(&main);
    let wrapper = constructed(&manager, 0.0);
    assert_eq!(live_handles(&main), before + 1);
    drop(wrapper);
    assert_eq!(live_handles(&main), before);
}

#[test]
fn calls_after_stop_fail_with_shutdown() {
    let manager = manager();
    let wrapper = constructed(&manager, 0.0);
    manager.stop();
    let err = wrapper.call_method::<f64>("increment", Vec::new()).get().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Shutdown);
    wrapper.destroy_blocking();
}
