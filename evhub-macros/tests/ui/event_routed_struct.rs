use evhub_core::{AggregateId, Event, RoutableEvent};
use evhub_macros::event;
use uuid::Uuid;

#[event(aggregate = owner)]
struct Damaged {
    owner: AggregateId,
    amount: u32,
}

#[event(aggregate = entity)]
#[derive(Debug)]
struct Moved<T: Send + Sync + 'static> {
    entity: Uuid,
    to: T,
}

fn main() {
    let owner = AggregateId::new();
    let ev = Damaged { owner, amount: 3 };
    assert_eq!(ev.aggregate_id(), owner);
    assert_eq!(ev.as_routable().map(|r| r.aggregate_id()), Some(owner));
    assert_eq!(ev.amount, 3);

    let raw = Uuid::new_v4();
    let moved = Moved { entity: raw, to: (1, 2) };
    assert_eq!(moved.aggregate_id(), AggregateId::from(raw));
    assert_eq!(moved.to, (1, 2));
}
