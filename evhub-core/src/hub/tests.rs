use super::*;
use crate::event::RoutableEvent;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

struct RoutableTestEvent {
    owner: AggregateId,
    data: String,
}

impl RoutableTestEvent {
    fn new(owner: AggregateId, data: &str) -> Self {
        Self {
            owner,
            data: data.to_string(),
        }
    }
}

impl Event for RoutableTestEvent {
    fn as_routable(&self) -> Option<&dyn RoutableEvent> {
        Some(self)
    }
}

impl RoutableEvent for RoutableTestEvent {
    fn aggregate_id(&self) -> AggregateId {
        self.owner
    }
}

struct GlobalTestEvent(u32);
impl Event for GlobalTestEvent {}

fn recorder() -> (
    Arc<StdMutex<Vec<String>>>,
    impl Fn(&RoutableTestEvent) -> anyhow::Result<()> + Send + Sync + 'static,
) {
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let s = seen.clone();
    (seen, move |e: &RoutableTestEvent| {
        s.lock().unwrap().push(e.data.clone());
        Ok(())
    })
}

async fn wait_until(cond: impl Fn() -> bool) {
    let _ = tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
}

#[test]
fn non_routable_event_is_queued_never_buffered() {
    let hub = EventHub::default();
    hub.send(GlobalTestEvent(1));
    assert_eq!(hub.total_buffered(), 0);
    assert_eq!(hub.queue_len(), 1);
}

#[test]
fn routed_event_without_handler_is_buffered_one_per_send() {
    let hub = EventHub::default();
    let a = AggregateId::new();

    for n in 1..=3 {
        hub.send(RoutableTestEvent::new(a, &n.to_string()));
        assert_eq!(hub.buffered_count(a), n);
    }
    assert_eq!(hub.queue_len(), 0);
    assert!(hub.has_buffered(a));
    assert_eq!(hub.buffered_aggregates(), vec![a]);
}

#[test]
fn routed_event_with_matching_handler_goes_straight_to_queue() {
    let hub = EventHub::default();
    let a = AggregateId::new();
    hub.register_aggregate_handler(a, |_: &RoutableTestEvent| Ok(()))
        .unwrap();

    hub.send(RoutableTestEvent::new(a, "x"));
    assert_eq!(hub.buffered_count(a), 0);
    assert_eq!(hub.queue_len(), 1);
}

#[test]
fn global_handler_does_not_count_as_aggregate_ready() {
    let hub = EventHub::default();
    let a = AggregateId::new();
    hub.register_handler(|_: &RoutableTestEvent| Ok(()));

    hub.send(RoutableTestEvent::new(a, "x"));
    assert_eq!(hub.buffered_count(a), 1);
    assert_eq!(hub.queue_len(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn buffered_events_drain_in_order_after_ready() {
    let hub = EventHub::default();
    hub.start().unwrap();
    let a = AggregateId::new();

    for data in ["1", "2", "3"] {
        hub.send(RoutableTestEvent::new(a, data));
    }
    assert_eq!(hub.buffered_count(a), 3);

    let (seen, handler) = recorder();
    hub.register_aggregate_handler(a, handler).unwrap();
    assert_eq!(hub.aggregate_ready(a).unwrap(), 3);
    assert_eq!(hub.buffered_count(a), 0);

    wait_until(|| seen.lock().unwrap().len() == 3).await;
    assert_eq!(*seen.lock().unwrap(), vec!["1", "2", "3"]);
    hub.stop().await;
}

#[test]
fn aggregate_ready_with_nothing_buffered_is_a_no_op() {
    let hub = EventHub::default();
    assert_eq!(hub.aggregate_ready(AggregateId::new()).unwrap(), 0);
    assert_eq!(hub.queue_len(), 0);
}

#[test]
fn aggregates_are_isolated_from_each_other() {
    let hub = EventHub::default();
    let a = AggregateId::new();
    let b = AggregateId::new();
    hub.send(RoutableTestEvent::new(a, "a1"));
    hub.send(RoutableTestEvent::new(a, "a2"));
    hub.send(RoutableTestEvent::new(b, "b1"));

    assert_eq!(hub.aggregate_ready(b).unwrap(), 1);
    assert_eq!(hub.buffered_count(a), 2);

    hub.register_aggregate_handler(b, |_: &RoutableTestEvent| Ok(()))
        .unwrap();
    hub.send(RoutableTestEvent::new(b, "b2"));
    assert_eq!(hub.reset_aggregate(b).unwrap(), 1);
    assert_eq!(hub.buffered_count(a), 2);
    assert_eq!(hub.queue_len(), 0);
}

#[test]
fn send_and_wait_routes_global_and_scoped_handlers() {
    let hub = EventHub::default();
    let x = AggregateId::new();
    let y = AggregateId::new();

    let global_hits = Arc::new(AtomicUsize::new(0));
    let scoped_hits = Arc::new(AtomicUsize::new(0));
    let g = global_hits.clone();
    hub.register_handler(move |_: &RoutableTestEvent| {
        g.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let s = scoped_hits.clone();
    hub.register_aggregate_handler(x, move |_: &RoutableTestEvent| {
        s.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .unwrap();

    let report = hub.send_and_wait(RoutableTestEvent::new(x, "to-x"));
    assert_eq!(report.matched, 2);
    assert_eq!(report.succeeded(), 2);

    let report = hub.send_and_wait(RoutableTestEvent::new(y, "to-y"));
    assert_eq!(report.matched, 1);

    assert_eq!(global_hits.load(Ordering::SeqCst), 2);
    assert_eq!(scoped_hits.load(Ordering::SeqCst), 1);
    assert_eq!(hub.total_buffered(), 0);
}

#[test]
fn send_and_wait_without_handlers_does_not_buffer() {
    let hub = EventHub::default();
    let a = AggregateId::new();
    let report = hub.send_and_wait(RoutableTestEvent::new(a, "lost"));
    assert_eq!(report, DeliveryReport::default());
    assert_eq!(hub.buffered_count(a), 0);
    assert_eq!(hub.queue_len(), 0);
}

#[tokio::test]
async fn send_and_wait_async_reports_failures() {
    let hub = EventHub::default();
    hub.register_handler(|_: &GlobalTestEvent| anyhow::bail!("nope"));
    hub.register_handler(|_: &GlobalTestEvent| Ok(()));

    let report = hub.send_and_wait_async(GlobalTestEvent(1)).await;
    assert_eq!(report, DeliveryReport { matched: 2, failed: 1 });
    assert_eq!(hub.stats().failed, 1);
    assert_eq!(hub.stats().delivered, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_handler_does_not_stop_siblings_or_consumer() {
    let hub = EventHub::default();
    hub.start().unwrap();

    let hits = Arc::new(AtomicUsize::new(0));
    hub.register_handler(|e: &GlobalTestEvent| {
        if e.0 == 1 {
            panic!("first event explodes");
        }
        anyhow::bail!("later events fail politely")
    });
    let h = hits.clone();
    hub.register_handler(move |_: &GlobalTestEvent| {
        h.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    hub.send(GlobalTestEvent(1));
    hub.send(GlobalTestEvent(2));
    wait_until(|| hits.load(Ordering::SeqCst) == 2).await;

    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(hub.is_running());
    assert_eq!(hub.stats().failed, 2);
    hub.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn unhandled_events_are_counted_at_dequeue() {
    let hub = EventHub::default();
    hub.start().unwrap();
    hub.send(GlobalTestEvent(7));

    wait_until(|| hub.stats().unhandled == 1).await;
    assert_eq!(hub.stats().unhandled, 1);
    assert_eq!(hub.queue_len(), 0);
    hub.stop().await;
}

#[test]
fn empty_aggregate_is_rejected_for_scoped_operations() {
    let hub = EventHub::default();
    assert!(matches!(
        hub.aggregate_ready(AggregateId::EMPTY),
        Err(HubError::EmptyAggregateId {
            operation: "aggregate_ready"
        })
    ));
    assert!(matches!(
        hub.register_aggregate_handler(AggregateId::EMPTY, |_: &RoutableTestEvent| Ok(())),
        Err(HubError::EmptyAggregateId { .. })
    ));
    assert!(hub.clear_events_for_aggregate(AggregateId::EMPTY).is_err());
    assert!(hub.reset_aggregate(AggregateId::EMPTY).is_err());
    assert_eq!(hub.total_handlers(), 0);
}

#[test]
fn disposing_last_aggregate_handler_clears_its_events() {
    let hub = EventHub::default();
    let a = AggregateId::new();
    let first = hub
        .register_aggregate_handler(a, |_: &RoutableTestEvent| Ok(()))
        .unwrap();
    let second = hub
        .register_aggregate_handler(a, |_: &GlobalTestEvent| Ok(()))
        .unwrap();

    hub.send(RoutableTestEvent::new(a, "queued"));
    assert_eq!(hub.queue_len(), 1);

    // 仍有其他处理器：保留事件
    assert!(hub.dispose_handler_from_aggregate::<RoutableTestEvent>(first, a));
    assert_eq!(hub.queue_len(), 1);
    assert!(!hub.dispose_handler_from_aggregate::<RoutableTestEvent>(first, a));

    hub.send(RoutableTestEvent::new(a, "buffered"));
    assert_eq!(hub.buffered_count(a), 1);

    // 最后一个处理器：同时清理排队与缓冲事件
    assert!(hub.dispose_handler_from_aggregate::<GlobalTestEvent>(second, a));
    assert_eq!(hub.queue_len(), 0);
    assert_eq!(hub.buffered_count(a), 0);
    assert_eq!(hub.aggregate_handler_count(a), 0);
}

#[test]
fn dispose_by_type_keeps_events() {
    let hub = EventHub::default();
    let a = AggregateId::new();
    hub.register_aggregate_handler(a, |_: &RoutableTestEvent| Ok(()))
        .unwrap();
    hub.register_handler(|_: &GlobalTestEvent| Ok(()));
    hub.send(RoutableTestEvent::new(a, "kept"));

    assert_eq!(hub.dispose_handlers::<RoutableTestEvent>(), 1);
    assert!(!hub.has_handlers::<RoutableTestEvent>());
    assert_eq!(hub.queue_len(), 1);

    assert_eq!(hub.dispose_handlers_for_aggregate::<GlobalTestEvent>(a), 0);
    assert_eq!(hub.dispose_all_handlers(), 1);
    assert_eq!(hub.queue_len(), 1);
}

#[test]
fn clear_events_keeps_handlers() {
    let hub = EventHub::default();
    let a = AggregateId::new();
    let b = AggregateId::new();
    hub.register_aggregate_handler(a, |_: &RoutableTestEvent| Ok(()))
        .unwrap();
    hub.send(RoutableTestEvent::new(a, "q"));
    hub.send(RoutableTestEvent::new(b, "buf"));

    assert_eq!(hub.clear_events_for_aggregate(a).unwrap(), 1);
    assert_eq!(hub.handler_count::<RoutableTestEvent>(), 1);
    assert_eq!(hub.buffered_count(b), 1);
}

#[test]
fn start_requires_a_runtime() {
    let hub = EventHub::default();
    assert!(matches!(hub.start(), Err(HubError::NoRuntime { .. })));
    assert!(!hub.is_running());
}

#[tokio::test(flavor = "multi_thread")]
async fn lifecycle_start_shutdown_restart() {
    let hub = EventHub::builder()
        .config(HubConfig {
            name: "lifecycle".into(),
            ..Default::default()
        })
        .build();
    assert_eq!(hub.name(), "lifecycle");

    hub.start().unwrap();
    assert!(matches!(hub.start(), Err(HubError::AlreadyRunning { .. })));
    assert!(hub.shutdown());
    assert!(!hub.is_running());
    assert!(!hub.shutdown());

    // 停止后事件留在队列中，重新启动后继续投递
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    hub.register_handler(move |_: &GlobalTestEvent| {
        h.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    hub.send(GlobalTestEvent(1));
    assert_eq!(hub.queue_len(), 1);

    hub.start().unwrap();
    wait_until(|| hits.load(Ordering::SeqCst) == 1).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    hub.stop().await;
    assert!(!hub.is_running());
}

#[tokio::test(flavor = "multi_thread")]
async fn clear_all_resets_state_and_restarts_consumer() {
    let hub = EventHub::default();
    hub.start().unwrap();
    let a = AggregateId::new();
    hub.send(RoutableTestEvent::new(a, "gone"));
    hub.register_handler(|_: &GlobalTestEvent| Ok(()));

    hub.clear_all().unwrap();
    assert_eq!(hub.total_buffered(), 0);
    assert_eq!(hub.total_handlers(), 0);
    assert_eq!(hub.stats(), HubStats::default());
    assert!(hub.is_running());

    let (seen, handler) = recorder();
    hub.register_handler(handler);
    hub.send(RoutableTestEvent::new(AggregateId::EMPTY, "after-reset"));
    wait_until(|| seen.lock().unwrap().len() == 1).await;
    assert_eq!(*seen.lock().unwrap(), vec!["after-reset"]);
    hub.stop().await;
}

#[test]
fn cleanup_with_teardown_clears_everything() {
    let hub = EventHub::default();
    hub.register_handler(|_: &GlobalTestEvent| Ok(()));
    hub.send(GlobalTestEvent(1));
    hub.send(RoutableTestEvent::new(AggregateId::new(), "b"));

    hub.cleanup(false);
    assert_eq!(hub.queue_len(), 1);

    hub.cleanup(true);
    assert_eq!(hub.stats(), HubStats::default());
}
