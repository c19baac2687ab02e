use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use geiko::{Actor, ActorContext, ActorNodeBuilder, ExecutionContext, LocalActorNode, Result};

struct ScopeEcho {
    activation: usize,
    activations: Arc<AtomicUsize>,
}

impl Actor for ScopeEcho {
    async fn on_activated(&mut self, _ctx: &ActorContext) -> Result<()> {
        self.activation = self.activations.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(())
    }
}

impl ScopeEcho {
    async fn job(&mut self, ctx: &ActorContext) -> Result<String> {
        let value = ctx
            .execution_context()
            .get("key")
            .unwrap_or("default")
            .to_owned();
        Ok(format!("{} {value}", self.activation))
    }
}

struct Facade;

impl Actor for Facade {}

impl Facade {
    async fn facade_job(&mut self, ctx: &ActorContext) -> Result<String> {
        let target = ctx.system()?.get_actor::<ScopeEcho>("key");
        target.invoke("Job", |a, ctx| Box::pin(a.job(ctx))).await
    }
}

struct DoubleFacade;

impl Actor for DoubleFacade {}

impl DoubleFacade {
    async fn double_facade_job(&mut self, ctx: &ActorContext) -> Result<String> {
        let target = ctx.system()?.get_actor::<Facade>("key");
        target
            .invoke("FacadeJob", |a, ctx| Box::pin(a.facade_job(ctx)))
            .await
    }
}

fn propagation_node() -> LocalActorNode {
    let activations = Arc::new(AtomicUsize::new(0));
    ActorNodeBuilder::new()
        .register_actor::<ScopeEcho, _>(move |_| ScopeEcho {
            activation: 0,
            activations: activations.clone(),
        })
        .register_actor::<Facade, _>(|_| Facade)
        .register_actor::<DoubleFacade, _>(|_| DoubleFacade)
        .build()
}

fn scope(label: &str) -> ExecutionContext {
    ExecutionContext::scoped([("key", format!("{label}-context"))])
}

#[tokio::test]
async fn scoped_context_reaches_direct_calls() {
    let node = propagation_node();

    for label in ["noreq", "req1", "req2"] {
        let system = node.scoped(scope(label));
        let actor = system.get_actor::<ScopeEcho>("key");
        let result = actor
            .invoke("Job", |a, ctx| Box::pin(a.job(ctx)))
            .await
            .unwrap();
        assert_eq!(result, format!("1 {label}-context"));
    }
}

#[tokio::test]
async fn scoped_context_crosses_actor_chains_without_crosstalk() {
    let node = propagation_node();

    // Three concurrently active scopes, all funneled through the same
    // facade and target keys.
    let call = |label: &'static str| {
        let system = node.scoped(scope(label));
        async move {
            let actor = system.get_actor::<DoubleFacade>("key");
            actor
                .invoke("DoubleFacadeJob", |a, ctx| Box::pin(a.double_facade_job(ctx)))
                .await
                .unwrap()
        }
    };

    let (a, b, c) = tokio::join!(call("noreq"), call("req1"), call("req2"));
    assert_eq!(a, "1 noreq-context");
    assert_eq!(b, "1 req1-context");
    assert_eq!(c, "1 req2-context");
}

#[tokio::test]
async fn empty_context_detaches_a_scoped_call() {
    let node = propagation_node();

    let system = node.scoped(scope("req"));
    let actor = system.get_actor::<ScopeEcho>("key");

    let attached = actor
        .invoke("Job", |a, ctx| Box::pin(a.job(ctx)))
        .await
        .unwrap();
    assert_eq!(attached, "1 req-context");

    let detached = actor
        .invoke_with_context("Job", |a, ctx| Box::pin(a.job(ctx)), ExecutionContext::Empty)
        .await
        .unwrap();
    assert_eq!(detached, "1 default");
}

#[tokio::test]
async fn unscoped_calls_see_an_empty_context() {
    let node = propagation_node();

    let actor = node.get_actor::<ScopeEcho>("key");
    let result = actor
        .invoke("Job", |a, ctx| Box::pin(a.job(ctx)))
        .await
        .unwrap();
    assert_eq!(result, "1 default");
}
