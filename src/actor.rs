use std::{any::Any, future::Future};

use crate::{ActorContext, Result};

/// Core trait implemented by user-defined actors.
///
/// A virtual actor is a named unit of state addressed by key through
/// [`LocalActorNode::get_actor`](crate::LocalActorNode::get_actor). The
/// runtime creates an instance lazily on first use, serializes every call
/// against it, and drops it again once idle; callers never manage instance
/// lifetime. Implementors hold whatever state they need, and the runtime passes
/// an [`ActorContext`] into every hook and bound call for access to the key,
/// the current execution context and the owning system.
///
/// Ergonomics:
/// - Although the trait methods return futures, you can implement them as
///   `async fn` with a simple `Result<()>` return. The compiler will produce
///   the appropriate future type automatically.
/// - No `#[async_trait]` is required.
///
/// See also: [`ActorContext`], [`crate::ActorRef`], [`crate::LocalActorNode`].
pub trait Actor: Send + Sized + 'static {
    /// Set to `false` to skip the tracing hook for every message addressed
    /// to this actor type.
    const TRACING: bool = true;

    /// Lifecycle hook called once per activation, before the message that
    /// triggered it is handled.
    ///
    /// Equivalent to:
    ///
    /// ```ignore
    /// async fn on_activated(&mut self, ctx: &ActorContext) -> Result<()>;
    /// ```
    ///
    /// Returning an error leaves the dispatcher inactive: an ask caller
    /// receives [`Error::ActivationFailed`](crate::Error::ActivationFailed)
    /// and the next message starts a fresh activation attempt.
    fn on_activated(&mut self, ctx: &ActorContext) -> impl Future<Output = Result<()>> + Send {
        let _ctx = ctx;
        async { Ok(()) }
    }

    /// Lifecycle hook called when the instance is dropped: after an idle
    /// timeout, a poison pill, a failed handler or node shutdown.
    ///
    /// Equivalent to:
    ///
    /// ```ignore
    /// async fn on_deactivated(&mut self, ctx: &ActorContext) -> Result<()>;
    /// ```
    ///
    /// The instance is discarded whether or not this returns an error.
    fn on_deactivated(&mut self, ctx: &ActorContext) -> impl Future<Output = Result<()>> + Send {
        let _ctx = ctx;
        async { Ok(()) }
    }

    /// Handler for untyped one-way messages delivered with
    /// [`ActorRef::send`](crate::ActorRef::send).
    ///
    /// Equivalent to:
    ///
    /// ```ignore
    /// async fn on_message(&mut self, ctx: &ActorContext, message: Box<dyn Any + Send>) -> Result<()>;
    /// ```
    ///
    /// An error deactivates the instance; the sender never learns of it,
    /// as one-way delivery is fire-and-forget.
    fn on_message(
        &mut self,
        ctx: &ActorContext,
        message: Box<dyn Any + Send>,
    ) -> impl Future<Output = Result<()>> + Send {
        let _ctx = ctx;
        let _message = message;
        async { Ok(()) }
    }
}
