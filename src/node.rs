use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    Actor, ActorContext, ActorRef, ExecutionContext, ScopedActorSystem, TracingHook,
    internal::{ActorFactoryFn, Dispatcher, DispatcherHandle, WatchdogHandle},
};

/// The registry: maps `(actor type, key)` to a lazily created dispatcher and
/// owns every dispatcher it creates.
///
/// [`get_actor`](LocalActorNode::get_actor) never blocks on the instance
/// being active. It only resolves (creating if necessary) the per-identity
/// dispatcher; the instance itself is activated by the first message.
/// Cloning is cheap and all clones share one registry. Dropping the last
/// clone cancels every dispatcher task, which deactivates live instances
/// best-effort without awaiting completion.
#[derive(Clone)]
pub struct LocalActorNode {
    shared: Arc<NodeShared>,
}

pub(crate) struct NodeShared {
    dispatchers: Mutex<HashMap<Arc<str>, Box<dyn Any + Send + Sync>>>,
    factories: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    deactivation_timeout: Duration,
    mailbox_capacity: usize,
    tracing_hook: Option<TracingHook>,
    cancel: CancellationToken,
}

impl LocalActorNode {
    pub(crate) fn new(
        factories: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
        deactivation_timeout: Duration,
        mailbox_capacity: usize,
        tracing_hook: Option<TracingHook>,
    ) -> Self {
        Self {
            shared: Arc::new(NodeShared {
                dispatchers: Mutex::new(HashMap::new()),
                factories,
                deactivation_timeout,
                mailbox_capacity,
                tracing_hook,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<NodeShared>) -> Self {
        Self { shared }
    }

    /// Resolve a reference to the actor identified by `(A, key)`, creating
    /// its dispatcher on first access. Creation is exactly-once even under
    /// concurrent first access from multiple callers; the dispatcher is then
    /// reused across every activation cycle of its actor.
    ///
    /// Must be called from within a Tokio runtime (the dispatcher's consumer
    /// task is spawned here).
    pub fn get_actor<A: Actor>(&self, key: &str) -> ActorRef<A> {
        self.shared.get_or_spawn::<A>(key)
    }

    /// A system view that attaches a fork of `scope` to every call made
    /// through it. Typically created once per incoming request.
    pub fn scoped(&self, scope: ExecutionContext) -> ScopedActorSystem {
        ScopedActorSystem::new(self.clone(), scope)
    }

    /// Ask every dispatcher to deactivate and stop. Handlers already in
    /// flight finish first; completion is not awaited. Dropping the last
    /// node clone does the same.
    pub fn shutdown(&self) {
        self.shared.cancel.cancel();
    }
}

impl NodeShared {
    fn get_or_spawn<A: Actor>(self: &Arc<Self>, key: &str) -> ActorRef<A> {
        let path: Arc<str> = actor_path::<A>(key).into();
        let mut dispatchers = self
            .dispatchers
            .lock()
            .expect("dispatcher registry lock poisoned");

        if let Some(handle) = dispatchers
            .get(&path)
            .and_then(|existing| existing.downcast_ref::<DispatcherHandle<A>>())
        {
            return ActorRef {
                port: Arc::new(handle.clone()),
            };
        }

        let (sender, receiver) = mpsc::channel(self.mailbox_capacity);
        let watchdog = WatchdogHandle::new(self.deactivation_timeout);
        let ctx = ActorContext::new(Arc::from(key), Arc::downgrade(self), watchdog.clone());
        let factory = self
            .factories
            .get(&TypeId::of::<A>())
            .and_then(|factory| factory.downcast_ref::<ActorFactoryFn<A>>())
            .cloned();
        let dispatcher = Dispatcher::new(
            path.clone(),
            receiver,
            sender.clone(),
            ctx,
            factory,
            self.tracing_hook.clone(),
            watchdog,
            self.cancel.child_token(),
        );
        tokio::spawn(dispatcher.run());

        let handle = DispatcherHandle { sender };
        dispatchers.insert(path, Box::new(handle.clone()));
        ActorRef {
            port: Arc::new(handle),
        }
    }
}

impl Drop for NodeShared {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Stable identity string for one logical actor: `"{type name}-{key}"`.
/// Never reused across different logical entities.
fn actor_path<A: Actor>(key: &str) -> String {
    format!("{}-{}", std::any::type_name::<A>(), key)
}
