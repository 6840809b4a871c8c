//! Scenario tests for pollers feeding a live tree.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use live_config::config::{Config, SettableConfig};
use live_config::interpolation::Interpolator;
use live_config::lifecycle::Shutdown;
use live_config::polling::{
    parse_key_values, Checkpoint, Delta, FileWatchSource, FixedRatePollingStrategy,
    ManualPollingStrategy, PollError, PollOutcome, PollResponse, SourcePoller, WatchSource,
};
use live_config::property::PropertyRegistry;
use live_config::settings::parse_settings;
use live_config::ConcatCascadeStrategy;

mod common;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test(flavor = "multi_thread")]
async fn test_first_poll_populates_before_execute_returns() {
    let layers = common::layered_tree(&[("feature.enabled", "false")]);
    let registry = PropertyRegistry::with_defaults(layers.root.clone()).unwrap();
    let enabled = registry.get_property("feature.enabled").as_boolean(false);

    let source = Arc::new(common::ScriptedSource::new("flags"));
    source.push(Err(PollError::Source("connection refused".to_string())));
    source.push(Err(PollError::Source("connection refused".to_string())));
    source.push(Ok(PollResponse::snapshot(common::entries(&[("feature.enabled", "true")]))
        .with_checkpoint(Checkpoint::new("c1"))));
    source.push(Ok(PollResponse::delta(Delta::new().upsert("feature.enabled", "off"))));

    let poller = Arc::new(SourcePoller::new(source.clone(), layers.remote.clone()));
    let shutdown = Arc::new(Shutdown::new());
    let strategy = FixedRatePollingStrategy::with_period(
        Duration::from_millis(100),
        Duration::from_millis(5),
        shutdown.clone(),
    );

    let handle = strategy.execute(poller.callback()).await;
    assert!(!handle.is_failed());
    assert_eq!(layers.remote.get_raw("feature.enabled").as_deref(), Some("true"));
    assert!(enabled.get());

    // The scheduled delta follows
    assert!(common::wait_until(WAIT, || !enabled.get()).await);

    let seen = source.seen();
    assert_eq!(seen[0], (true, None));
    assert_eq!(seen[2], (true, None));
    assert_eq!(seen[3], (false, Some(Checkpoint::new("c1"))));

    shutdown.trigger();
    handle.wait().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scheduled_failures_keep_last_values() {
    let leaf = Arc::new(SettableConfig::new("remote"));
    let source = Arc::new(common::ScriptedSource::new("kv"));
    source.push(Ok(PollResponse::snapshot(common::entries(&[("limit", "5")]))));
    for _ in 0..3 {
        source.push(Err(PollError::Source("timeout".to_string())));
    }
    source.push(Ok(PollResponse::delta(Delta::new().upsert("limit", "6"))));

    let poller = Arc::new(SourcePoller::new(source, leaf.clone()));
    let strategy = FixedRatePollingStrategy::with_period(
        Duration::from_millis(10),
        Duration::from_millis(5),
        Arc::new(Shutdown::new()),
    );
    let handle = strategy.execute(poller.callback()).await;
    assert_eq!(leaf.get_raw("limit").as_deref(), Some("5"));

    assert!(common::wait_until(WAIT, || leaf.get_raw("limit").as_deref() == Some("6")).await);
    assert!(
        common::wait_until(WAIT, || {
            let state = handle.state();
            state.attempts >= 5 && state.last_outcome == Some(PollOutcome::Success)
        })
        .await
    );
    let state = handle.state();
    assert_eq!(state.consecutive_failures, 0);
    assert_eq!(state.last_error.as_deref(), Some("source error: timeout"));

    strategy.shutdown();
    handle.wait().await.unwrap();
}

#[tokio::test]
async fn test_manual_fire_applies_one_poll_at_a_time() {
    let layers = common::layered_tree(&[]);
    let registry = PropertyRegistry::with_defaults(layers.root.clone()).unwrap();
    let level = registry.get_property("log.level").as_string("info");

    let source = Arc::new(common::ScriptedSource::new("manual"));
    source.push(Ok(PollResponse::snapshot(common::entries(&[("log.level", "debug")]))));
    source.push(Err(PollError::Source("bad gateway".to_string())));
    source.push(Ok(PollResponse::delta(Delta::new().remove("log.level"))));

    let poller = Arc::new(SourcePoller::new(source.clone(), layers.remote.clone()));
    let strategy = ManualPollingStrategy::new();
    let handle = strategy.execute(poller.callback());
    assert!(source.seen().is_empty());
    assert_eq!(level.get(), "info");

    strategy.fire().await.unwrap();
    assert_eq!(level.get(), "debug");

    let err = strategy.fire().await.unwrap_err();
    assert!(matches!(err, PollError::Source(ref msg) if msg == "bad gateway"));
    assert_eq!(level.get(), "debug");

    strategy.fire().await.unwrap();
    assert_eq!(level.get(), "info");
    assert_eq!(source.seen().len(), 3);
    assert_eq!(handle.state().attempts, 3);
}

#[tokio::test]
async fn test_file_source_polled_manually() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "threads=4").unwrap();

    let leaf = Arc::new(SettableConfig::new("file"));
    let poller = Arc::new(SourcePoller::new(
        Arc::new(FileWatchSource::new(file.path(), parse_key_values)),
        leaf.clone(),
    ));
    let strategy = ManualPollingStrategy::new();
    let _handle = strategy.execute(poller.callback());

    strategy.fire().await.unwrap();
    assert_eq!(leaf.get_raw("threads").as_deref(), Some("4"));

    std::fs::write(file.path(), "threads=8\nqueue=64\n").unwrap();
    strategy.fire().await.unwrap();
    assert_eq!(leaf.get_raw("threads").as_deref(), Some("8"));
    assert_eq!(leaf.get_raw("queue").as_deref(), Some("64"));

    std::fs::write(file.path(), "not a property line").unwrap();
    assert!(matches!(strategy.fire().await, Err(PollError::Source(_))));
    assert_eq!(leaf.get_raw("threads").as_deref(), Some("8"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_watch_pushes_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.properties");
    std::fs::write(&path, "mode=blue\n").unwrap();

    let leaf = Arc::new(SettableConfig::new("watched"));
    let source = FileWatchSource::new(&path, parse_key_values)
        .with_poll_interval(Duration::from_millis(50));
    let _guard = source.watch(leaf.clone()).unwrap();
    assert_eq!(leaf.get_raw("mode").as_deref(), Some("blue"));

    std::fs::write(&path, "mode=green\n").unwrap();
    assert!(
        common::wait_until(Duration::from_secs(10), || {
            leaf.get_raw("mode").as_deref() == Some("green")
        })
        .await
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_engine_wired_from_settings() {
    let settings = parse_settings(
        r#"
[interpolation]
missing = "passthrough"

[registry]
notification = "lazy"
list_delimiter = "|"

[polling]
period_ms = 15
retry_delay_ms = 5
max_retry_delay_ms = 40

[cascade]
parameters = ["${env}"]
"#,
    )
    .unwrap();

    let layers = common::layered_tree(&[("env", "staging"), ("greeting", "hello ${name}")]);
    let interpolator = Interpolator::from_settings(&settings.interpolation);
    let registry =
        PropertyRegistry::new(layers.root.clone(), &settings.registry, interpolator).unwrap();

    assert_eq!(registry.get_property("greeting").as_string("").get(), "hello ${name}");

    let names = live_config::cascade::CascadeStrategy::generate(
        &ConcatCascadeStrategy::from_settings(&settings.cascade),
        "db",
        &interpolator,
        &live_config::interpolation::ConfigLookup(&*layers.root),
    )
    .unwrap();
    assert_eq!(names, vec!["db", "db-staging"]);

    let source = Arc::new(common::ScriptedSource::new("hosts"));
    source.push(Err(PollError::Source("warming up".to_string())));
    source.push(Ok(PollResponse::snapshot(common::entries(&[("hosts", "a|b|c")]))));
    let poller = Arc::new(SourcePoller::new(source, layers.remote.clone()));
    let shutdown = Arc::new(Shutdown::new());
    let strategy = FixedRatePollingStrategy::new(settings.polling.clone(), shutdown.clone());

    let handle = strategy.execute(poller.callback()).await;
    let hosts = registry.get_property("hosts").as_list(Vec::new());
    assert_eq!(hosts.get(), vec!["a", "b", "c"]);
    assert!(handle.state().attempts >= 2);

    shutdown.trigger();
    handle.wait().await.unwrap();
    assert_eq!(shutdown.receiver_count(), 0);
}
