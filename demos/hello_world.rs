//! Minimal walkthrough: one virtual actor, lazy activation, a couple of
//! asks, an explicit poison pill.

use std::time::Duration;

use geiko::{Actor, ActorContext, ActorNodeBuilder, PoisonPill, Result};

#[derive(Default)]
struct Greeter {
    greeted: usize,
}

impl Actor for Greeter {
    async fn on_activated(&mut self, ctx: &ActorContext) -> Result<()> {
        println!("greeter '{}' activated", ctx.key());
        Ok(())
    }

    async fn on_deactivated(&mut self, ctx: &ActorContext) -> Result<()> {
        println!(
            "greeter '{}' deactivated after {} greeting(s)",
            ctx.key(),
            self.greeted
        );
        Ok(())
    }
}

impl Greeter {
    async fn greet(&mut self, name: &str) -> Result<String> {
        self.greeted += 1;
        Ok(format!("Hello, {name}! ({} so far)", self.greeted))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let node = ActorNodeBuilder::new()
        .with_actor_deactivation_timeout(Duration::from_secs(60))
        .register_actor::<Greeter, _>(|_key| Greeter::default())
        .build();

    // No instance exists yet; the first ask activates it.
    let greeter = node.get_actor::<Greeter>("lobby");

    let hello = greeter
        .invoke("Greet", |a, _ctx| Box::pin(a.greet("world")))
        .await?;
    println!("{hello}");

    let hello = greeter
        .invoke("Greet", |a, _ctx| Box::pin(a.greet("again")))
        .await?;
    println!("{hello}");

    // Force deactivation instead of waiting out the idle timeout.
    greeter.send(PoisonPill).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    Ok(())
}
