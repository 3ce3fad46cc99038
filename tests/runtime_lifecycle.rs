use std::sync::Arc;
use std::time::Duration;

use nodevisor::{
    BusError, ErrorPayload, EventBus, EventEnvelope, HEALTH_SHUTDOWN, HEALTH_SNAPSHOT,
    HealthSnapshot, NodeError, NodeFn, NodeRef, ResponsePayload, RuntimeError, ServiceRuntime,
    ServiceState, ShutdownReport, ShutdownSignal,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;

type Seen = Arc<Mutex<Vec<EventEnvelope>>>;

fn collect(bus: &EventBus, pattern: &str) -> Seen {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.subscribe_fn(pattern, move |ev| {
        sink.lock().push(ev.clone());
        Ok(())
    })
    .unwrap();
    seen
}

fn echo() -> NodeRef {
    NodeFn::arc("echo", |input: Value| async move { Ok::<_, NodeError>(input) })
}

fn sleeper(delay: Duration) -> NodeRef {
    NodeFn::arc("sleeper", move |input: Value| async move {
        tokio::time::sleep(delay).await;
        Ok::<_, NodeError>(input)
    })
}

fn service(bus: &EventBus, node: NodeRef) -> ServiceRuntime {
    ServiceRuntime::builder(bus.clone(), node)
        .with_health_interval(Duration::ZERO)
        .build()
}

fn invoke(bus: &EventBus, payload: Value) -> uuid::Uuid {
    let req = EventEnvelope::new("TOOL.INVOCATION", payload);
    let id = req.correlation_id();
    bus.publish(req).unwrap();
    id
}

fn shutdown_reports(bus: &EventBus) -> Vec<ShutdownReport> {
    bus.history()
        .iter()
        .filter(|ev| ev.event_type() == HEALTH_SHUTDOWN)
        .map(|ev| serde_json::from_value(ev.payload().clone()).unwrap())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn invocation_gets_correlated_response() {
    let bus = EventBus::default();
    let responses = collect(&bus, "TOOL.RESPONSE");
    let svc = service(&bus, echo());
    svc.start().unwrap();
    assert_eq!(svc.state(), ServiceState::Running);

    let id = invoke(&bus, json!({"msg": "hi"}));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let responses = responses.lock();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].correlation_id(), id);
    let body: ResponsePayload = serde_json::from_value(responses[0].payload().clone()).unwrap();
    assert_eq!(body.correlation_id, id);
    assert_eq!(body.result, json!({"msg": "hi"}));
}

#[tokio::test(start_paused = true)]
async fn stop_waits_for_in_flight_invocation() {
    let bus = EventBus::default();
    let responses = collect(&bus, "TOOL.RESPONSE");
    let svc = service(&bus, sleeper(Duration::from_secs(2)));
    svc.start().unwrap();

    let id = invoke(&bus, json!("x"));
    assert_eq!(svc.active_count(), 1);

    let report = svc.stop(Duration::from_secs(10)).await.unwrap();
    assert!(report.drained);
    assert_eq!(report.abandoned, 0);
    assert_eq!((report.total, report.succeeded, report.failed), (1, 1, 0));
    assert_eq!(svc.state(), ServiceState::Terminated);

    let responses = responses.lock();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].correlation_id(), id);
    let published = shutdown_reports(&bus);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].succeeded, 1);
    assert!(published[0].drained);
}

#[tokio::test(start_paused = true)]
async fn drain_timeout_abandons_stuck_invocation() {
    let bus = EventBus::default();
    let node = NodeFn::arc("stuck", |_: Value| async move {
        std::future::pending::<()>().await;
        Ok::<_, NodeError>(Value::Null)
    });
    let svc = service(&bus, node);
    svc.start().unwrap();
    invoke(&bus, json!(null));

    let report = svc.stop(Duration::from_secs(1)).await.unwrap();
    assert!(!report.drained);
    assert_eq!(report.abandoned, 1);
    assert_eq!(svc.state(), ServiceState::Terminated);

    let published = shutdown_reports(&bus);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].abandoned, 1);
}

#[tokio::test(start_paused = true)]
async fn late_result_of_abandoned_invocation_is_discarded() {
    let bus = EventBus::default();
    let replies = collect(&bus, "TOOL.*");
    let svc = service(&bus, sleeper(Duration::from_secs(5)));
    svc.start().unwrap();
    invoke(&bus, json!(1));

    let report = svc.stop(Duration::from_secs(1)).await.unwrap();
    assert_eq!(report.abandoned, 1);

    tokio::time::sleep(Duration::from_secs(10)).await;

    let replies = replies.lock();
    assert!(
        replies
            .iter()
            .all(|ev| ev.event_type() == "TOOL.INVOCATION"),
        "no response or error after abandonment"
    );
    assert_eq!(svc.snapshot().succeeded, 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_stops_publish_one_report() {
    let bus = EventBus::default();
    let svc = service(&bus, sleeper(Duration::from_millis(500)));
    svc.start().unwrap();
    invoke(&bus, json!(1));

    let other = svc.clone();
    let (a, b) = tokio::join!(
        svc.stop(Duration::from_secs(5)),
        other.stop(Duration::from_secs(5))
    );
    assert_eq!(a.is_some() as u8 + b.is_some() as u8, 1);
    assert!(svc.stop(Duration::from_secs(5)).await.is_none());

    assert_eq!(shutdown_reports(&bus).len(), 1);
    assert_eq!(svc.last_report(), a.or(b));
}

#[tokio::test(start_paused = true)]
async fn invocation_after_stop_is_ignored() {
    let bus = EventBus::default();
    let replies = collect(&bus, "TOOL.RESPONSE");
    let svc = service(&bus, echo());
    svc.start().unwrap();
    svc.stop(Duration::from_secs(1)).await.unwrap();

    invoke(&bus, json!("late"));
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(replies.lock().is_empty());
    assert_eq!(svc.snapshot().total, 0);
    assert!(!bus.is_closed());
}

#[tokio::test(start_paused = true)]
async fn node_failure_becomes_error_event() {
    let bus = EventBus::default();
    let errors = collect(&bus, "*.ERROR");
    let node = NodeFn::arc("lookup", |_: Value| async move {
        Err::<Value, _>(NodeError::with_kind("not_found", "no such key"))
    });
    let svc = service(&bus, node);
    svc.start().unwrap();

    let id = invoke(&bus, json!({"key": "k"}));
    let report = svc.stop(Duration::from_secs(1)).await.unwrap();
    assert_eq!((report.total, report.succeeded, report.failed), (1, 0, 1));

    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].event_type(), "TOOL.ERROR");
    let body: ErrorPayload = serde_json::from_value(errors[0].payload().clone()).unwrap();
    assert_eq!(body.correlation_id, id);
    assert_eq!(body.error.kind, "not_found");
    assert_eq!(body.error.message, "no such key");
}

#[tokio::test(start_paused = true)]
async fn node_timeout_and_panic_are_reported() {
    let bus = EventBus::default();
    let errors = collect(&bus, "TOOL.ERROR");
    let node = NodeFn::arc("moody", |input: Value| async move {
        if input == json!("panic") {
            panic!("kaboom");
        }
        if input == json!("slow") {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok::<_, NodeError>(input)
    });
    let svc = ServiceRuntime::builder(bus.clone(), node)
        .with_health_interval(Duration::ZERO)
        .with_invocation_timeout(Duration::from_secs(1))
        .build();
    svc.start().unwrap();

    let slow = invoke(&bus, json!("slow"));
    let boom = invoke(&bus, json!("panic"));
    let report = svc.stop(Duration::from_secs(5)).await.unwrap();
    assert!(report.drained);
    assert_eq!(report.failed, 2);

    let errors = errors.lock();
    let kind_of = |id: uuid::Uuid| {
        errors
            .iter()
            .find(|ev| ev.correlation_id() == id)
            .map(|ev| serde_json::from_value::<ErrorPayload>(ev.payload().clone()).unwrap())
            .unwrap()
            .error
    };
    assert_eq!(kind_of(slow).kind, "timeout");
    let panicked = kind_of(boom);
    assert_eq!(panicked.kind, "panicked");
    assert!(panicked.message.contains("kaboom"));
}

#[tokio::test(start_paused = true)]
async fn duplicate_correlation_ids_are_tracked_separately() {
    let bus = EventBus::default();
    let responses = collect(&bus, "TOOL.RESPONSE");
    let svc = service(&bus, sleeper(Duration::from_millis(100)));
    svc.start().unwrap();

    let id = uuid::Uuid::new_v4();
    for n in 0..2 {
        bus.publish(EventEnvelope::new("TOOL.INVOCATION", json!(n)).with_correlation_id(id))
            .unwrap();
    }
    assert_eq!(svc.active_count(), 2);

    let report = svc.stop(Duration::from_secs(1)).await.unwrap();
    assert_eq!(report.succeeded, 2);
    assert_eq!(responses.lock().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn health_snapshots_follow_interval() {
    let bus = EventBus::default();
    let svc = ServiceRuntime::builder(bus.clone(), echo())
        .with_health_interval(Duration::from_secs(10))
        .build();
    svc.start().unwrap();
    invoke(&bus, json!(1));

    tokio::time::sleep(Duration::from_secs(25)).await;
    svc.stop(Duration::from_secs(1)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    let snapshots: Vec<HealthSnapshot> = bus
        .history()
        .iter()
        .filter(|ev| ev.event_type() == HEALTH_SNAPSHOT)
        .map(|ev| serde_json::from_value(ev.payload().clone()).unwrap())
        .collect();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[1].total, 1);
    assert_eq!(snapshots[1].succeeded, 1);
    assert_eq!(snapshots[1].active_count, 0);
}

#[tokio::test(start_paused = true)]
async fn repeated_triggers_shut_down_once() {
    let bus = EventBus::default();
    let svc = service(&bus, echo());
    svc.start().unwrap();

    let (tx, rx) = mpsc::channel(4);
    let watcher = svc.stop_on(rx);
    tx.send(ShutdownSignal::Interrupt).await.unwrap();
    tx.send(ShutdownSignal::Terminate).await.unwrap();

    svc.wait_terminated().await;
    watcher.await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(svc.state(), ServiceState::Terminated);
    assert_eq!(shutdown_reports(&bus).len(), 1);
}

#[tokio::test]
async fn start_on_closed_bus_fails_and_stays_stopped() {
    let bus = EventBus::default();
    bus.close();
    let svc = service(&bus, echo());

    let err = svc.start().unwrap_err();
    assert!(matches!(err, RuntimeError::Subscribe(BusError::Closed)));
    assert_eq!(svc.state(), ServiceState::Stopped);
}

#[tokio::test]
async fn start_is_only_valid_once() {
    let bus = EventBus::default();
    let svc = service(&bus, echo());
    svc.start().unwrap();

    let err = svc.start().unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::InvalidState {
            state: ServiceState::Running
        }
    ));
    assert_eq!(bus.subscription_count(), 1);

    svc.stop(Duration::from_secs(1)).await.unwrap();
    assert_eq!(bus.subscription_count(), 0);
    assert!(svc.start().is_err());
}

#[tokio::test]
async fn stop_before_start_is_a_no_op() {
    let bus = EventBus::default();
    let svc = service(&bus, echo());

    assert!(svc.stop(Duration::from_secs(1)).await.is_none());
    assert!(svc.stop(Duration::from_secs(1)).await.is_none());
    assert_eq!(svc.state(), ServiceState::Stopped);
    assert!(shutdown_reports(&bus).is_empty());

    svc.start().unwrap();
    assert_eq!(svc.state(), ServiceState::Running);
    assert!(svc.stop(Duration::from_secs(1)).await.is_some());
    assert_eq!(shutdown_reports(&bus).len(), 1);
}

#[test]
fn start_outside_tokio_is_rejected() {
    let bus = EventBus::default();
    let svc = service(&bus, echo());
    assert!(matches!(svc.start(), Err(RuntimeError::NoExecutor)));
    assert_eq!(svc.state(), ServiceState::Stopped);
}

#[tokio::test]
async fn custom_namespace_routes_its_own_topics() {
    let bus = EventBus::default();
    let responses = collect(&bus, "AGENT.RESPONSE");
    let svc = ServiceRuntime::builder(bus.clone(), echo())
        .with_namespace("AGENT")
        .with_health_interval(Duration::ZERO)
        .build();
    assert_eq!(svc.topics().invocation, "AGENT.INVOCATION");
    svc.start().unwrap();

    invoke(&bus, json!("ignored"));
    bus.publish(EventEnvelope::new("AGENT.INVOCATION", json!("handled")))
        .unwrap();
    svc.stop(Duration::from_secs(1)).await.unwrap();

    let responses = responses.lock();
    assert_eq!(responses.len(), 1);
    let body: ResponsePayload = serde_json::from_value(responses[0].payload().clone()).unwrap();
    assert_eq!(body.result, json!("handled"));
}

#[tokio::test(start_paused = true)]
async fn drain_waits_for_explicit_release() {
    let bus = EventBus::default();
    let responses = collect(&bus, "TOOL.RESPONSE");
    let gate = Arc::new(tokio::sync::Notify::new());
    let g = Arc::clone(&gate);
    let node = NodeFn::arc("gated", move |input: Value| {
        let g = Arc::clone(&g);
        async move {
            g.notified().await;
            Ok::<_, NodeError>(input)
        }
    });
    let svc = service(&bus, node);
    svc.start().unwrap();
    invoke(&bus, json!("held"));
    tokio::task::yield_now().await;

    let release = Arc::clone(&gate);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        release.notify_one();
    });

    let report = svc.stop(Duration::from_secs(2)).await.unwrap();
    assert!(report.drained);
    assert_eq!(report.abandoned, 0);
    assert_eq!(responses.lock().len(), 1);
    assert_eq!(svc.state(), ServiceState::Terminated);
}

#[tokio::test(start_paused = true)]
async fn invocation_published_while_draining_is_never_handled() {
    let bus = EventBus::default();
    let replies = collect(&bus, "TOOL.RESPONSE");
    let svc = service(&bus, sleeper(Duration::from_secs(1)));
    svc.start().unwrap();
    let first = invoke(&bus, json!("first"));

    let stopper = svc.clone();
    let stopping = tokio::spawn(async move { stopper.stop(Duration::from_secs(5)).await });
    let mut states = svc.state_changes();
    states
        .wait_for(|s| *s == ServiceState::Draining)
        .await
        .unwrap();

    invoke(&bus, json!("second"));
    let report = stopping.await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(report.total, 1);
    let replies = replies.lock();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].correlation_id(), first);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn result_being_published_at_drain_timeout_is_counted() {
    let bus = EventBus::default();
    let responses = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let r = Arc::clone(&responses);
    bus.subscribe_fn("TOOL.RESPONSE", move |_| {
        std::thread::sleep(Duration::from_millis(300));
        r.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    })
    .unwrap();
    let svc = service(&bus, sleeper(Duration::from_millis(20)));
    svc.start().unwrap();
    invoke(&bus, json!("slow consumer"));

    let report = svc.stop(Duration::from_millis(100)).await.unwrap();

    assert_eq!(responses.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(report.abandoned, 0);
    assert!(report.drained);
    assert_eq!((report.total, report.succeeded), (1, 1));
    assert_eq!(svc.snapshot().succeeded, 1);
    assert_eq!(svc.state(), ServiceState::Terminated);
}

#[tokio::test(start_paused = true)]
async fn failed_health_publish_keeps_service_running() {
    let bus = EventBus::default();
    let svc = ServiceRuntime::builder(bus.clone(), echo())
        .with_health_interval(Duration::from_secs(10))
        .build();
    svc.start().unwrap();
    bus.close();

    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(svc.state(), ServiceState::Running);
    assert!(
        bus.history()
            .iter()
            .all(|ev| ev.event_type() != HEALTH_SNAPSHOT)
    );

    let report = svc.stop(Duration::from_secs(1)).await.unwrap();
    assert!(report.drained);
    assert_eq!(svc.state(), ServiceState::Terminated);
    assert!(shutdown_reports(&bus).is_empty());
}
