use std::{any::Any, sync::Arc};

use futures_util::future::BoxFuture;
use tokio::sync::oneshot;

use crate::{Actor, ActorContext, ExecutionContext, Result};

/// Sentinel message that forces deactivation of the receiving actor.
///
/// Processed in FIFO order like any other message: everything enqueued ahead
/// of the pill still runs against the current instance, everything behind it
/// triggers a fresh activation. Sending one to an inactive actor is a no-op.
/// The idle watchdog uses the same mechanism, so timed-out instances are
/// never torn down out-of-band.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoisonPill;

/// Type-erased ask response, downcast back to the concrete type by the
/// caller that enqueued the ask.
pub(crate) type AskResponse = Box<dyn Any + Send>;

/// A bound call: exclusive access to the actor (through whatever view `B`
/// the caller addressed it with) plus the per-invocation context.
pub(crate) type AskInvoke<B> = Box<
    dyn for<'a> FnOnce(&'a mut B, &'a ActorContext) -> BoxFuture<'a, Result<AskResponse>> + Send,
>;

pub(crate) type AskReply = oneshot::Sender<Result<AskResponse>>;

/// Request/response envelope. `reply` is single-assignment: the dispatcher
/// fulfils it exactly once, with the handler's result or its failure.
pub(crate) struct AskMessage<A: Actor> {
    pub invoke: AskInvoke<A>,
    pub reply: AskReply,
    pub call_name: Arc<str>,
    pub context: Option<ExecutionContext>,
}

/// Everything that can land in a dispatcher's mailbox. Immutable once
/// enqueued.
pub(crate) enum Ingress<A: Actor> {
    Oneway {
        payload: Box<dyn Any + Send>,
        context: Option<ExecutionContext>,
    },
    Ask(AskMessage<A>),
    PoisonPill,
}
