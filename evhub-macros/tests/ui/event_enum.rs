use evhub_core::{AggregateId, Event, RoutableEvent};
use evhub_macros::event;

#[event(aggregate = owner)]
enum Health {
    #[event(name = "health.healed")]
    Healed { owner: AggregateId, amount: u32 },
    Died { owner: AggregateId },
}

#[event]
enum Lifecycle {
    Booted,
    Stopped(u8),
}

fn main() {
    let owner = AggregateId::new();
    let healed = Health::Healed { owner, amount: 5 };
    assert_eq!(healed.event_name(), "health.healed");
    assert_eq!(healed.aggregate_id(), owner);

    let died = Health::Died { owner };
    assert_eq!(died.event_name(), "Health.Died");
    assert!(died.as_routable().is_some());

    assert_eq!(Lifecycle::Booted.event_name(), "Lifecycle.Booted");
    assert_eq!(Lifecycle::Stopped(1).event_name(), "Lifecycle.Stopped");
    assert!(Lifecycle::Booted.as_routable().is_none());
}
