//! Scenario tests for the override tree and live properties on top of it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use live_config::cascade::{CascadingLoader, ConcatCascadeStrategy, ConfigLoader, LoadError};
use live_config::config::{CompositeConfig, Config, MapConfig, SettableConfig, TreeDump};
use live_config::interpolation::{ConfigLookup, Interpolator};
use live_config::property::{PropertyError, PropertyListener, PropertyRegistry};
use live_config::settings::{NotificationMode, RegistrySettings};

mod common;

const RECV: Duration = Duration::from_secs(5);

#[test]
fn test_layers_resolve_by_priority() {
    let layers = common::layered_tree(&[("db.host", "app-db"), ("db.port", "5432")]);
    layers.remote.set_property("db.host", "remote-db");

    assert_eq!(layers.root.get_raw("db.host").as_deref(), Some("remote-db"));
    assert_eq!(layers.root.get_raw("db.port").as_deref(), Some("5432"));

    layers.overrides.set_property("db.host", "override-db");
    assert_eq!(layers.root.get_raw("db.host").as_deref(), Some("override-db"));

    let winners: Vec<_> = layers
        .root
        .explain("db.host")
        .into_iter()
        .map(|r| (r.source, r.value))
        .collect();
    assert_eq!(
        winners,
        vec![
            ("override".to_string(), "override-db".to_string()),
            ("remote".to_string(), "remote-db".to_string()),
            ("application".to_string(), "app-db".to_string()),
        ]
    );

    let dump = TreeDump::of(&*layers.root);
    assert_eq!(dump["override"]["db.host"], "override-db");
    assert_eq!(dump["application"]["db.port"], "5432");
}

#[test]
fn test_property_follows_override_then_falls_back() {
    let layers = common::layered_tree(&[("pool.size", "10")]);
    let registry = PropertyRegistry::with_defaults(layers.root.clone()).unwrap();
    let size = registry.get_property("pool.size").as_integer(1);
    assert_eq!(size.get(), 10);

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    size.on_change(move |v| {
        let _ = tx.lock().unwrap().send(*v);
    });

    layers.overrides.set_property("pool.size", "25");
    assert_eq!(rx.recv_timeout(RECV).unwrap(), 25);

    // Removing the layer reverts to the application value
    layers.root.remove("override");
    assert_eq!(rx.recv_timeout(RECV).unwrap(), 10);
    assert_eq!(size.get(), 10);
}

#[test]
fn test_interpolated_value_tracks_referenced_keys() {
    let layers = common::layered_tree(&[
        ("host", "localhost"),
        ("port", "8080"),
        ("url", "http://${host}:${port}/${path:api}"),
    ]);
    let registry = PropertyRegistry::with_defaults(layers.root.clone()).unwrap();
    let url = registry.get_property("url").as_string("");
    assert_eq!(url.get(), "http://localhost:8080/api");

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    url.on_change(move |v: &String| {
        let _ = tx.lock().unwrap().send(v.clone());
    });

    layers.remote.set_property("host", "edge.internal");
    assert_eq!(rx.recv_timeout(RECV).unwrap(), "http://edge.internal:8080/api");
}

struct Recorder {
    errors: Mutex<Vec<String>>,
    changes: Mutex<Vec<u16>>,
}

impl PropertyListener<u16> for Recorder {
    fn on_change(&self, value: &u16) {
        self.changes.lock().unwrap().push(*value);
    }

    fn on_parse_error(&self, error: &PropertyError) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}

#[test]
fn test_circular_reference_reported_to_listener() {
    let layers = common::layered_tree(&[("port", "9000")]);
    let registry = PropertyRegistry::with_defaults(layers.root.clone()).unwrap();
    let port = registry.get_property("port").as_type::<u16>(1);
    assert_eq!(port.get(), 9000);

    let recorder = Arc::new(Recorder {
        errors: Mutex::new(Vec::new()),
        changes: Mutex::new(Vec::new()),
    });
    port.add_listener(recorder.clone());

    layers.overrides.set_properties([("port", "${a}"), ("a", "${port}")]);
    assert!(common::wait_until_blocking(RECV, || !recorder.errors.lock().unwrap().is_empty()));
    assert!(recorder.errors.lock().unwrap()[0].contains("circular reference"));
    assert_eq!(port.get(), 9000);

    layers.overrides.set_property("port", "9100");
    assert!(common::wait_until_blocking(RECV, || !recorder.changes.lock().unwrap().is_empty()));
    assert_eq!(*recorder.changes.lock().unwrap(), vec![9100]);
    assert_eq!(port.get(), 9100);
}

#[test]
fn test_listener_may_mutate_configuration() {
    let layers = common::layered_tree(&[]);
    let registry = PropertyRegistry::with_defaults(layers.root.clone()).unwrap();
    let primary = registry.get_property("primary").as_string("none");
    let mirror = registry.get_property("mirror").as_string("none");

    let overrides = layers.overrides.clone();
    primary.on_change(move |v: &String| {
        overrides.set_property("mirror", format!("copy of {v}"));
    });
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    mirror.on_change(move |v: &String| {
        let _ = tx.lock().unwrap().send(v.clone());
    });

    layers.overrides.set_property("primary", "x");
    assert_eq!(rx.recv_timeout(RECV).unwrap(), "copy of x");
}

#[test]
fn test_concurrent_readers_never_see_torn_values() {
    let layers = common::layered_tree(&[("pair", "0:0")]);
    let registry = Arc::new(
        PropertyRegistry::new(
            layers.root.clone(),
            &RegistrySettings {
                notification: NotificationMode::Lazy,
                ..RegistrySettings::default()
            },
            Interpolator::default(),
        )
        .unwrap(),
    );
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = registry.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                let pair = registry.get_property("pair").as_string("");
                while !stop.load(Ordering::Relaxed) {
                    let value = pair.get();
                    let (a, b) = value.split_once(':').unwrap();
                    assert_eq!(a, b);
                }
            })
        })
        .collect();

    for i in 1..=500 {
        layers.remote.set_property("pair", format!("{i}:{i}"));
        if i % 50 == 0 {
            let side = Arc::new(MapConfig::from_pairs("side", [("unrelated", "x")]));
            layers.root.add_first("side", side);
            layers.root.remove("side");
        }
    }
    stop.store(true, Ordering::Relaxed);

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(registry.get_property("pair").as_string("").get(), "500:500");
}

struct Resources(HashMap<String, Arc<dyn Config>>);

impl ConfigLoader for Resources {
    fn load(&self, resource: &str) -> Result<Option<Arc<dyn Config>>, LoadError> {
        Ok(self.0.get(resource).cloned())
    }
}

#[test]
fn test_cascade_feeds_properties() {
    let mut resources: HashMap<String, Arc<dyn Config>> = HashMap::new();
    resources.insert(
        "service".to_string(),
        Arc::new(MapConfig::from_pairs("service", [("timeout", "1000"), ("retries", "3")])),
    );
    resources.insert(
        "service-prod".to_string(),
        Arc::new(MapConfig::from_pairs("service-prod", [("timeout", "250")])),
    );

    let env = SettableConfig::new("env");
    env.set_property("env", "prod");
    env.set_property("region", "eu-west");

    let cascade = CascadingLoader::new(Arc::new(Resources(resources)))
        .with_strategy(Arc::new(ConcatCascadeStrategy::new(["${env}", "${region}"])))
        .load("service", &ConfigLookup(&env))
        .unwrap();
    assert_eq!(cascade.child_names(), vec!["service-prod", "service"]);

    let root = Arc::new(CompositeConfig::new("root"));
    root.add_last("service", Arc::new(cascade));
    let registry = PropertyRegistry::with_defaults(root).unwrap();

    assert_eq!(registry.get_property("timeout").as_long(0).get(), 250);
    assert_eq!(registry.get_property("retries").as_integer(0).get(), 3);
    assert_eq!(
        registry.get_property("timeout").as_duration_millis(Duration::ZERO).get(),
        Duration::from_millis(250)
    );
}

#[test]
fn test_dropping_registry_detaches_from_tree() {
    let layers = common::layered_tree(&[]);
    let registry = PropertyRegistry::with_defaults(layers.root.clone()).unwrap();
    let flag = registry.get_property("flag").as_boolean(false);
    drop(registry);

    layers.overrides.set_property("flag", "yes");
    assert!(flag.get());
}
