use evhub_core::{AggregateId, Dispatcher, EventHub, HubConfig};
use evhub_dispatch::{MainLoopDispatcher, ThreadPoolDispatcher};
use evhub_macros::event;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const FRAMES: u64 = 5;

#[event(aggregate = target)]
enum Combat {
    #[event(name = "combat.damaged")]
    Damaged { target: AggregateId, amount: i32 },
    #[event(name = "combat.healed")]
    Healed { target: AggregateId, amount: i32 },
}

#[event(name = "physics.collision")]
struct Collision {
    a: AggregateId,
    b: AggregateId,
}

#[event(name = "loop.frame")]
struct FrameStarted(u64);

/// 一个在场景加载后才完成初始化的游戏对象
struct Enemy {
    id: AggregateId,
    health: Arc<AtomicI32>,
}

impl Enemy {
    fn spawn() -> Self {
        Self {
            id: AggregateId::new(),
            health: Arc::new(AtomicI32::new(100)),
        }
    }

    /// 组件就绪：注册处理器后再标记聚合就绪，补投加载期间的事件
    fn initialize(&self, hub: &EventHub) -> anyhow::Result<()> {
        let health = self.health.clone();
        let id = self.id;
        hub.register_aggregate_handler(self.id, move |e: &Combat| {
            let delta = match e {
                Combat::Damaged { amount, .. } => -amount,
                Combat::Healed { amount, .. } => *amount,
            };
            let now = health.fetch_add(delta, Ordering::SeqCst) + delta;
            info!(enemy = %id, delta, health = now, "Enemy health changed");
            Ok(())
        })?;

        let drained = hub.aggregate_ready(self.id)?;
        info!(enemy = %self.id, drained, "Enemy ready");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,evhub_core=debug")),
        )
        .init();

    // 当前线程即游戏主循环
    let main_loop = Arc::new(MainLoopDispatcher::new("main-loop"));
    let physics: Arc<dyn Dispatcher> = Arc::new(ThreadPoolDispatcher::new("physics", 2)?);

    let hub = EventHub::builder()
        .config(HubConfig {
            name: "scene".into(),
            ..Default::default()
        })
        .default_dispatcher(main_loop.clone() as Arc<dyn Dispatcher>)
        .build();
    hub.start()?;

    hub.register_handler_on(physics, |e: &Collision| {
        info!(a = %e.a, b = %e.b, "Resolving collision on physics pool");
        Ok(())
    });
    hub.register_handler(|e: &FrameStarted| {
        info!(frame = e.0, "Frame started");
        Ok(())
    });

    // 场景加载期间敌人尚未初始化，事件先被缓冲
    let enemy = Enemy::spawn();
    let player = AggregateId::new();
    hub.send(Combat::Damaged { target: enemy.id, amount: 30 });
    hub.send(Combat::Healed { target: enemy.id, amount: 5 });
    info!(buffered = hub.buffered_count(enemy.id), "Scene loading");

    enemy.initialize(&hub)?;

    for frame in 1..=FRAMES {
        hub.send_and_wait(FrameStarted(frame));
        if frame == 2 {
            hub.send(Collision { a: player, b: enemy.id });
            hub.send(Combat::Damaged { target: enemy.id, amount: 50 });
        }

        tokio::time::sleep(Duration::from_millis(16)).await;
        main_loop.pump()?;
    }

    info!(health = enemy.health.load(Ordering::SeqCst), "Enemy final health");
    let removed = hub.reset_aggregate(enemy.id)?;
    info!(removed, stats = ?hub.stats(), "Enemy despawned");

    hub.stop().await;
    hub.cleanup(true);
    Ok(())
}
