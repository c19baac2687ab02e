use futures_util::future::BoxFuture;

use crate::{Actor, ActorContext, ActorRef, ExecutionContext, LocalActorNode, Result};

/// Actor-system view that attaches a fork of one scope to every call made
/// through it.
///
/// Obtained from [`LocalActorNode::scoped`] at a request boundary, or from
/// [`ActorContext::system`](crate::ActorContext::system) inside a handler.
/// This is how tracing ids and caller metadata cross arbitrarily deep
/// actor-to-actor call chains without each layer threading them by hand.
#[derive(Clone)]
pub struct ScopedActorSystem {
    node: LocalActorNode,
    scope: ExecutionContext,
}

impl ScopedActorSystem {
    pub(crate) fn new(node: LocalActorNode, scope: ExecutionContext) -> Self {
        Self { node, scope }
    }

    /// Resolve an actor reference that propagates this system's scope.
    pub fn get_actor<A: Actor>(&self, key: &str) -> ScopedActorRef<A> {
        ScopedActorRef {
            actor_ref: self.node.get_actor::<A>(key),
            scope: self.scope.clone(),
        }
    }

    /// The underlying unscoped node.
    pub fn node(&self) -> &LocalActorNode {
        &self.node
    }
}

/// Decorates an [`ActorRef`] so every call carries a fork of the scope it
/// was created with. An explicit [`ExecutionContext::Empty`] still detaches
/// a single call.
pub struct ScopedActorRef<B: ?Sized + 'static> {
    actor_ref: ActorRef<B>,
    scope: ExecutionContext,
}

impl<B: ?Sized + 'static> Clone for ScopedActorRef<B> {
    fn clone(&self) -> Self {
        Self {
            actor_ref: self.actor_ref.clone(),
            scope: self.scope.clone(),
        }
    }
}

impl<B: ?Sized + 'static> ScopedActorRef<B> {
    pub async fn send<M: Send + 'static>(&self, message: M) -> Result<()> {
        self.actor_ref
            .send_with_context(message, self.scope.fork())
            .await
    }

    /// [`ExecutionContext::Empty`] detaches this call from the scope; any
    /// other explicit context is superseded by a fork of the scope.
    pub async fn send_with_context<M: Send + 'static>(
        &self,
        message: M,
        context: ExecutionContext,
    ) -> Result<()> {
        self.actor_ref
            .send_with_context(message, self.effective(context))
            .await
    }

    pub async fn invoke<R, F>(&self, call_name: &str, call: F) -> Result<R>
    where
        R: Send + 'static,
        F: for<'a> FnOnce(&'a mut B, &'a ActorContext) -> BoxFuture<'a, Result<R>> + Send + 'static,
    {
        self.actor_ref
            .invoke_with_context(call_name, call, self.scope.fork())
            .await
    }

    /// [`ExecutionContext::Empty`] detaches this call from the scope; any
    /// other explicit context is superseded by a fork of the scope.
    pub async fn invoke_with_context<R, F>(
        &self,
        call_name: &str,
        call: F,
        context: ExecutionContext,
    ) -> Result<R>
    where
        R: Send + 'static,
        F: for<'a> FnOnce(&'a mut B, &'a ActorContext) -> BoxFuture<'a, Result<R>> + Send + 'static,
    {
        self.actor_ref
            .invoke_with_context(call_name, call, self.effective(context))
            .await
    }

    /// Scope-preserving counterpart of [`ActorRef::to_base_ref`].
    pub fn to_base_ref<C: ?Sized + 'static>(&self, project: fn(&mut B) -> &mut C) -> ScopedActorRef<C> {
        ScopedActorRef {
            actor_ref: self.actor_ref.to_base_ref(project),
            scope: self.scope.clone(),
        }
    }

    /// The plain reference without scope attachment.
    pub fn unscoped(&self) -> ActorRef<B> {
        self.actor_ref.clone()
    }

    fn effective(&self, context: ExecutionContext) -> ExecutionContext {
        if context.is_empty() {
            ExecutionContext::Empty
        } else {
            self.scope.fork()
        }
    }
}
