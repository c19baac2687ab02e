use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use geiko::{Actor, ActorContext, ActorNodeBuilder, PoisonPill, Result};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
struct Counters {
    activations: Arc<AtomicUsize>,
    deactivations: Arc<AtomicUsize>,
}

impl Counters {
    fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    fn deactivations(&self) -> usize {
        self.deactivations.load(Ordering::SeqCst)
    }
}

struct Idler {
    counters: Counters,
}

impl Actor for Idler {
    async fn on_activated(&mut self, _ctx: &ActorContext) -> Result<()> {
        self.counters.activations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_deactivated(&mut self, _ctx: &ActorContext) -> Result<()> {
        self.counters.deactivations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Idler {
    async fn nope(&mut self) -> Result<()> {
        Ok(())
    }
}

fn idler_node(counters: &Counters, timeout: Duration) -> geiko::LocalActorNode {
    ActorNodeBuilder::new()
        .with_actor_deactivation_timeout(timeout)
        .register_actor::<Idler, _>({
            let counters = counters.clone();
            move |_| Idler {
                counters: counters.clone(),
            }
        })
        .build()
}

#[tokio::test]
async fn idle_instance_deactivates_and_reactivates() {
    let counters = Counters::default();
    let node = idler_node(&counters, Duration::from_millis(500));
    let actor = node.get_actor::<Idler>("key");

    assert_eq!(counters.activations(), 0);
    assert_eq!(counters.deactivations(), 0);

    // Traffic under the idle timeout keeps one instance alive.
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(150)).await;
        actor.invoke("Nope", |a, _| Box::pin(a.nope())).await.unwrap();
    }
    assert_eq!(counters.activations(), 1);
    assert_eq!(counters.deactivations(), 0);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(counters.activations(), 1);
    assert_eq!(counters.deactivations(), 1);

    actor.invoke("Nope", |a, _| Box::pin(a.nope())).await.unwrap();
    assert_eq!(counters.activations(), 2);
    assert_eq!(counters.deactivations(), 1);
}

struct LongLived {
    counters: Counters,
}

impl Actor for LongLived {
    async fn on_activated(&mut self, ctx: &ActorContext) -> Result<()> {
        self.counters.activations.fetch_add(1, Ordering::SeqCst);
        ctx.delay_deactivation(Duration::from_secs(2 * 3600));
        Ok(())
    }

    async fn on_deactivated(&mut self, _ctx: &ActorContext) -> Result<()> {
        self.counters.deactivations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl LongLived {
    async fn nope(&mut self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn delayed_deactivation_outlives_the_default_timeout() {
    let counters = Counters::default();
    let node = ActorNodeBuilder::new()
        .with_actor_deactivation_timeout(Duration::from_millis(300))
        .register_actor::<LongLived, _>({
            let counters = counters.clone();
            move |_| LongLived {
                counters: counters.clone(),
            }
        })
        .build();

    let actor = node.get_actor::<LongLived>("key");
    actor.invoke("Nope", |a, _| Box::pin(a.nope())).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(counters.activations(), 1);
    assert_eq!(counters.deactivations(), 0);
}

struct KeptAlive {
    counters: Counters,
    token: CancellationToken,
}

impl Actor for KeptAlive {
    async fn on_activated(&mut self, ctx: &ActorContext) -> Result<()> {
        self.counters.activations.fetch_add(1, Ordering::SeqCst);
        ctx.enable_deactivation_delay(self.token.clone());
        Ok(())
    }

    async fn on_deactivated(&mut self, _ctx: &ActorContext) -> Result<()> {
        self.counters.deactivations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl KeptAlive {
    async fn nope(&mut self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn keep_alive_extends_life_until_cancelled() {
    let counters = Counters::default();
    let token = CancellationToken::new();
    let node = ActorNodeBuilder::new()
        .with_actor_deactivation_timeout(Duration::from_millis(400))
        .register_actor::<KeptAlive, _>({
            let counters = counters.clone();
            let token = token.clone();
            move |_| KeptAlive {
                counters: counters.clone(),
                token: token.clone(),
            }
        })
        .build();

    let actor = node.get_actor::<KeptAlive>("key");
    actor.invoke("Nope", |a, _| Box::pin(a.nope())).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(counters.deactivations(), 0);

    token.cancel();
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(counters.activations(), 1);
    assert_eq!(counters.deactivations(), 1);
}

#[tokio::test]
async fn poison_pills_deactivate_in_arrival_order() {
    let counters = Counters::default();
    let node = idler_node(&counters, Duration::from_secs(60));
    let actor = node.get_actor::<Idler>("key");

    actor.invoke("Nope", |a, _| Box::pin(a.nope())).await.unwrap();
    assert_eq!(counters.activations(), 1);

    actor.send(PoisonPill).await.unwrap();
    actor.invoke("Nope", |a, _| Box::pin(a.nope())).await.unwrap();
    assert_eq!(counters.activations(), 2);
    assert_eq!(counters.deactivations(), 1);

    actor.send(PoisonPill).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(counters.activations(), 2);
    assert_eq!(counters.deactivations(), 2);
}

#[tokio::test]
async fn node_shutdown_deactivates_live_instances() {
    let counters = Counters::default();
    let node = idler_node(&counters, Duration::from_secs(60));
    let actor = node.get_actor::<Idler>("key");

    actor.invoke("Nope", |a, _| Box::pin(a.nope())).await.unwrap();
    assert_eq!(counters.activations(), 1);

    node.shutdown();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(counters.deactivations(), 1);

    // The mailbox is gone once the dispatcher has stopped.
    let result = actor.invoke("Nope", |a, _| Box::pin(a.nope())).await;
    assert!(result.is_err());
}
