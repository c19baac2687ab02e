use std::{any::Any, sync::Arc};

use futures_util::future::BoxFuture;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::WatchdogHandle;
use crate::{
    Actor, ActorContext, Error, ExecutionContext, PoisonPill, Result, TracingActivity, TracingHook,
    actor_ref::MessagePort,
    envelope::{AskInvoke, AskMessage, AskReply, Ingress},
};

pub(crate) type ActorFactoryFn<A> = Arc<dyn Fn(&str) -> A + Send + Sync>;

/// Cheap, cloneable mailbox handle. Stored type-erased in the node's
/// registry and held by every reference to this identity.
pub(crate) struct DispatcherHandle<A: Actor> {
    pub(crate) sender: Sender<Ingress<A>>,
}

impl<A: Actor> Clone for DispatcherHandle<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<A: Actor> MessagePort<A> for DispatcherHandle<A> {
    fn send_oneway(
        &self,
        payload: Box<dyn Any + Send>,
        context: Option<ExecutionContext>,
    ) -> BoxFuture<'static, Result<()>> {
        let sender = self.sender.clone();
        Box::pin(async move {
            sender.send(Ingress::Oneway { payload, context }).await?;
            Ok(())
        })
    }

    fn ask(
        &self,
        call_name: Arc<str>,
        invoke: AskInvoke<A>,
        context: Option<ExecutionContext>,
        reply: AskReply,
    ) -> BoxFuture<'static, Result<()>> {
        let sender = self.sender.clone();
        Box::pin(async move {
            sender
                .send(Ingress::Ask(AskMessage {
                    invoke,
                    reply,
                    call_name,
                    context,
                }))
                .await?;
            Ok(())
        })
    }
}

/// Per-identity mailbox consumer: owns the actor instance (or its absence),
/// the idle watchdog and the activation/deactivation state machine.
///
/// One dispatcher exists per `(actor type, key)` for the life of the node
/// and oscillates between inactive and active indefinitely. Its single
/// consumer loop yields FIFO-per-key ordering and the at-most-one-handler
/// guarantee; dispatchers for different keys run fully in parallel.
pub(crate) struct Dispatcher<A: Actor> {
    full_name: Arc<str>,
    receiver: Receiver<Ingress<A>>,
    sender: Sender<Ingress<A>>,
    actor: Option<A>,
    ctx: ActorContext,
    factory: Option<ActorFactoryFn<A>>,
    tracing_hook: Option<TracingHook>,
    watchdog: WatchdogHandle,
    cancel: CancellationToken,
}

impl<A: Actor> Dispatcher<A> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        full_name: Arc<str>,
        receiver: Receiver<Ingress<A>>,
        sender: Sender<Ingress<A>>,
        ctx: ActorContext,
        factory: Option<ActorFactoryFn<A>>,
        tracing_hook: Option<TracingHook>,
        watchdog: WatchdogHandle,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            full_name,
            receiver,
            sender,
            actor: None,
            ctx,
            factory,
            tracing_hook,
            watchdog,
            cancel,
        }
    }

    /// Single-consumer loop. Watchdog expiry feeds back into the same
    /// mailbox as a poison pill, so deactivation is always ordered with
    /// in-flight messages and a message that arrives just before expiry
    /// still runs first.
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = self.watchdog.expired(), if self.actor.is_some() => {
                    debug!(actor = %self.full_name, "idle timeout reached");
                    let _ = self.sender.try_send(Ingress::PoisonPill);
                }
                message = self.receiver.recv() => match message {
                    Some(message) => self.handle_ingress(message).await,
                    None => break,
                },
            }
        }
        self.deactivate().await;
    }

    async fn handle_ingress(&mut self, message: Ingress<A>) {
        match message {
            Ingress::PoisonPill => self.deactivate().await,
            Ingress::Oneway { payload, context } => {
                if payload.downcast_ref::<PoisonPill>().is_some() {
                    self.deactivate().await;
                } else {
                    self.process_oneway(payload, context).await;
                }
            }
            Ingress::Ask(message) => self.process_ask(message).await,
        }
    }

    async fn process_oneway(
        &mut self,
        payload: Box<dyn Any + Send>,
        context: Option<ExecutionContext>,
    ) {
        let activity = self.begin_activity(context, "Oneway");
        match self.ensure_active().await {
            Err(error) => {
                warn!(
                    actor = %self.full_name,
                    error = %error,
                    "dropping oneway message, activation failed"
                );
            }
            Ok(()) => {
                if let Some(actor) = self.actor.as_mut() {
                    if let Err(error) = actor.on_message(&self.ctx, payload).await {
                        warn!(
                            actor = %self.full_name,
                            error = %error,
                            "oneway handler failed, deactivating"
                        );
                        self.deactivate().await;
                    }
                }
            }
        }
        self.finish_activity(activity);
    }

    async fn process_ask(&mut self, message: AskMessage<A>) {
        let AskMessage {
            invoke,
            reply,
            call_name,
            context,
        } = message;
        let mut activity = self.begin_activity(context, &call_name);
        match self.ensure_active().await {
            Err(error) => {
                if let Some(activity) = activity.as_deref_mut() {
                    activity.set_error(&error, "activation failed");
                }
                let _ = reply.send(Err(error));
            }
            Ok(()) => {
                let result = match self.actor.as_mut() {
                    Some(actor) => invoke(actor, &self.ctx).await,
                    None => Err(Error::ActivationFailed("instance missing".into())),
                };
                match result {
                    Ok(response) => {
                        let _ = reply.send(Ok(response));
                    }
                    Err(error) => {
                        self.deactivate().await;
                        if let Some(activity) = activity.as_deref_mut() {
                            activity.set_error(&error, "handler failed");
                        }
                        let _ = reply.send(Err(error));
                    }
                }
            }
        }
        self.finish_activity(activity);
    }

    async fn ensure_active(&mut self) -> Result<()> {
        if self.actor.is_some() {
            return Ok(());
        }
        let factory = self
            .factory
            .clone()
            .ok_or(Error::FactoryMissing(std::any::type_name::<A>()))?;
        let mut actor = factory(&self.ctx.key);
        self.watchdog.arm_default();
        match actor.on_activated(&self.ctx).await {
            Ok(()) => {
                debug!(actor = %self.full_name, "activated");
                self.actor = Some(actor);
                Ok(())
            }
            Err(error) => {
                self.watchdog.disarm();
                Err(Error::ActivationFailed(error.to_string().into()))
            }
        }
    }

    /// Runs the user hook, then drops the instance and cancels the watchdog
    /// regardless of the hook's outcome. No-op while inactive.
    async fn deactivate(&mut self) {
        if let Some(mut actor) = self.actor.take() {
            if let Err(error) = actor.on_deactivated(&self.ctx).await {
                warn!(
                    actor = %self.full_name,
                    error = %error,
                    "deactivation hook failed"
                );
            }
            self.watchdog.disarm();
            debug!(actor = %self.full_name, "deactivated");
        }
    }

    /// Invokes the tracing hook and installs the (possibly rewritten)
    /// execution context as current; this is what nested calls made from
    /// inside the handler observe and propagate.
    fn begin_activity(
        &mut self,
        context: Option<ExecutionContext>,
        call_name: &str,
    ) -> Option<Box<dyn TracingActivity>> {
        let incoming = context.unwrap_or_default();
        if !A::TRACING {
            self.ctx.execution_context = incoming;
            return None;
        }
        match self.tracing_hook.as_ref() {
            Some(hook) => {
                let activity_name = format!("{}: {}", self.full_name, call_name);
                let (rewritten, activity) = hook(&incoming, &activity_name);
                self.ctx.execution_context = rewritten;
                Some(activity)
            }
            None => {
                self.ctx.execution_context = incoming;
                None
            }
        }
    }

    /// Re-arms the watchdog to cover the message just processed and closes
    /// the tracing activity exactly once.
    fn finish_activity(&mut self, activity: Option<Box<dyn TracingActivity>>) {
        if self.actor.is_some() {
            self.watchdog.reset();
        }
        self.ctx.execution_context = ExecutionContext::Empty;
        drop(activity);
    }
}
