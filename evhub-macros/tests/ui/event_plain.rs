use evhub_core::Event;
use evhub_macros::event;

#[event]
struct Tick {
    frame: u64,
}

#[event(name = "clock.reset")]
#[derive(Clone)]
struct Reset;

fn main() {
    let tick = Tick { frame: 1 };
    assert_eq!(tick.event_name(), "Tick");
    assert!(tick.as_routable().is_none());
    assert_eq!(tick.frame, 1);

    let reset = Reset.clone();
    assert_eq!(reset.event_name(), "clock.reset");
    let _ = format!("{reset:?}");
}
