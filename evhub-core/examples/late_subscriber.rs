//! 迟到订阅者：聚合在处理器注册前收到的事件会被缓冲，
//! `aggregate_ready` 之后按原顺序补投。
//!
//! 运行：`RUST_LOG=evhub_core=debug cargo run -p evhub-core --example late_subscriber`
use evhub_core::{AggregateId, EventHub, HubConfig};
use evhub_macros::event;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[event(aggregate = actor, name = "actor.said")]
struct Said {
    actor: AggregateId,
    line: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let hub = EventHub::builder()
        .config(HubConfig {
            name: "late-subscriber".into(),
            ..Default::default()
        })
        .build();
    hub.start()?;

    let actor = AggregateId::new();
    for line in ["hello", "is anyone there?", "..."] {
        hub.send(Said {
            actor,
            line: line.to_string(),
        });
    }
    println!("buffered before subscribe: {}", hub.buffered_count(actor));

    hub.register_aggregate_handler(actor, move |e: &Said| {
        println!("[{}] {}", e.actor, e.line);
        Ok(())
    })?;
    let drained = hub.aggregate_ready(actor)?;
    println!("drained {drained} buffered events");

    hub.send(Said {
        actor,
        line: "live again".to_string(),
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("stats: {:?}", hub.stats());
    hub.stop().await;
    Ok(())
}
