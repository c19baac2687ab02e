use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
    time::Duration,
};

use crate::{Actor, LocalActorNode, TracingHook, internal::ActorFactoryFn};

/// Idle-deactivation timeout applied when the builder doesn't override it.
pub const DEFAULT_DEACTIVATION_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Per-dispatcher mailbox capacity applied when the builder doesn't
/// override it.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 128;

/// Builder for a [`LocalActorNode`].
///
/// # Examples
///
/// ```ignore
/// let node = ActorNodeBuilder::new()
///     .with_actor_deactivation_timeout(Duration::from_secs(30))
///     .register_actor::<Greeter, _>(|_key| Greeter::default())
///     .build();
/// ```
pub struct ActorNodeBuilder {
    deactivation_timeout: Duration,
    mailbox_capacity: usize,
    tracing_hook: Option<TracingHook>,
    factories: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ActorNodeBuilder {
    pub fn new() -> Self {
        Self {
            deactivation_timeout: DEFAULT_DEACTIVATION_TIMEOUT,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            tracing_hook: None,
            factories: HashMap::new(),
        }
    }

    /// How long an instance may sit idle before the watchdog deactivates it.
    /// An actor can override its own timeout at runtime with
    /// [`ActorContext::delay_deactivation`](crate::ActorContext::delay_deactivation).
    pub fn with_actor_deactivation_timeout(mut self, timeout: Duration) -> Self {
        self.deactivation_timeout = timeout;
        self
    }

    /// Buffered capacity of each dispatcher mailbox. Senders await free
    /// capacity (backpressure) rather than dropping messages.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    /// Install a per-message tracing hook. Without one, messages dispatch
    /// untraced. See [`span_tracing_hook`](crate::span_tracing_hook) for a
    /// ready-made implementation.
    pub fn add_generic_tracing(mut self, hook: TracingHook) -> Self {
        self.tracing_hook = Some(hook);
        self
    }

    /// Register the constructor for actor type `A`. The factory receives the
    /// actor's key. Construction must not fail; fallible setup belongs in
    /// [`Actor::on_activated`]. Addressing an unregistered type surfaces
    /// [`Error::FactoryMissing`](crate::Error::FactoryMissing) on first use.
    pub fn register_actor<A, F>(mut self, factory: F) -> Self
    where
        A: Actor,
        F: Fn(&str) -> A + Send + Sync + 'static,
    {
        let factory: ActorFactoryFn<A> = Arc::new(factory);
        self.factories.insert(TypeId::of::<A>(), Box::new(factory));
        self
    }

    pub fn build(self) -> LocalActorNode {
        LocalActorNode::new(
            self.factories,
            self.deactivation_timeout,
            self.mailbox_capacity,
            self.tracing_hook,
        )
    }
}

impl Default for ActorNodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
