use evhub_core::{AggregateId, EventHub};
use evhub_macros::event;
use std::sync::{Arc, Mutex};

#[event(aggregate = owner)]
struct Scored {
    owner: AggregateId,
    points: u32,
}

#[event]
struct RoundOver;

#[test]
fn macro_events_route_through_hub() {
    let hub = EventHub::default();
    let player = AggregateId::new();

    hub.send(Scored { owner: player, points: 10 });
    assert_eq!(hub.buffered_count(player), 1);

    hub.send(RoundOver);
    assert_eq!(hub.total_buffered(), 1);
    assert_eq!(hub.queue_len(), 1);

    let total = Arc::new(Mutex::new(0u32));
    let t = total.clone();
    hub.register_aggregate_handler(player, move |e: &Scored| {
        *t.lock().unwrap() += e.points;
        Ok(())
    })
    .unwrap();

    let report = hub.send_and_wait(Scored { owner: player, points: 5 });
    assert_eq!(report.matched, 1);
    assert_eq!(*total.lock().unwrap(), 5);
}
