use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use tokio_util::sync::CancellationToken;

use crate::{
    Error, ExecutionContext, Result, ScopedActorSystem,
    internal::WatchdogHandle,
    node::{LocalActorNode, NodeShared},
};

/// Runtime-provided context passed into every lifecycle hook and bound call.
///
/// Use it to:
/// - `key()`: the key this actor instance was addressed with
/// - `execution_context()`: the scope attached to the message being handled
/// - `system()`: address other actors, propagating the current scope
/// - `delay_deactivation(duration)`: override this instance's idle timeout
/// - `enable_deactivation_delay(token)`: keep the instance alive until the
///   token is cancelled
///
/// The context is valid for the duration of the invocation it was passed
/// into; the execution context it exposes changes from message to message.
pub struct ActorContext {
    pub(crate) key: Arc<str>,
    pub(crate) node: Weak<NodeShared>,
    pub(crate) watchdog: WatchdogHandle,
    pub(crate) execution_context: ExecutionContext,
}

impl ActorContext {
    pub(crate) fn new(key: Arc<str>, node: Weak<NodeShared>, watchdog: WatchdogHandle) -> Self {
        Self {
            key,
            node,
            watchdog,
            execution_context: ExecutionContext::Empty,
        }
    }

    /// The key this actor was addressed with. Assigned once, never changes.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Scope metadata of the message currently being handled.
    /// [`ExecutionContext::Empty`] outside of a scoped call.
    #[inline]
    pub fn execution_context(&self) -> &ExecutionContext {
        &self.execution_context
    }

    /// The owning actor system, scoped to the current execution context.
    ///
    /// Calls made through the returned system carry a fork of the current
    /// scope, which is how tracing ids and caller metadata cross nested
    /// actor-to-actor calls without explicit plumbing. When the current
    /// context is [`ExecutionContext::Empty`], nested calls stay detached.
    pub fn system(&self) -> Result<ScopedActorSystem> {
        let shared = self.node.upgrade().ok_or(Error::SystemUnavailable)?;
        Ok(ScopedActorSystem::new(
            LocalActorNode::from_shared(shared),
            self.execution_context.fork(),
        ))
    }

    /// Postpone idle deactivation. The new timeout replaces the configured
    /// default for the rest of this instance's life.
    pub fn delay_deactivation(&self, timeout: Duration) {
        self.watchdog.delay(timeout);
    }

    /// Keep this instance alive until `token` is cancelled, by periodically
    /// extending the idle deadline in the background. Useful while a
    /// subscription or long-running side task is still feeding the actor.
    pub fn enable_deactivation_delay(&self, token: CancellationToken) {
        let watchdog = self.watchdog.clone();
        tokio::spawn(async move {
            let timeout = watchdog.default_timeout();
            let period = timeout / 2;
            loop {
                watchdog.extend(timeout);
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(period) => {}
                }
            }
        });
    }
}
