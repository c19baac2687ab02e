use std::{any::Any, sync::Arc};

use futures_util::future::BoxFuture;
use tokio::sync::oneshot;

use crate::{
    ActorContext, Error, ExecutionContext, Result,
    envelope::{AskInvoke, AskReply, AskResponse},
};

/// Client-facing handle to a single actor identity.
///
/// References are cheap to clone and never block on the instance being
/// active: sending resolves the dispatcher, which activates the actor on its
/// own task when the message is dequeued. `B` is usually the concrete actor
/// type; [`to_base_ref`](ActorRef::to_base_ref) produces a reference typed
/// against a trait view of the same actor.
pub struct ActorRef<B: ?Sized + 'static> {
    pub(crate) port: Arc<dyn MessagePort<B>>,
}

impl<B: ?Sized + 'static> Clone for ActorRef<B> {
    fn clone(&self) -> Self {
        Self {
            port: self.port.clone(),
        }
    }
}

impl<B: ?Sized + 'static> ActorRef<B> {
    /// Fire-and-forget delivery to [`Actor::on_message`](crate::Actor::on_message).
    /// Completes once the message is enqueued, not when it is handled.
    pub async fn send<M: Send + 'static>(&self, message: M) -> Result<()> {
        self.port.send_oneway(Box::new(message), None).await
    }

    /// Fire-and-forget delivery with an explicit execution context.
    /// Pass [`ExecutionContext::Empty`] to detach deliberately.
    pub async fn send_with_context<M: Send + 'static>(
        &self,
        message: M,
        context: ExecutionContext,
    ) -> Result<()> {
        self.port.send_oneway(Box::new(message), Some(context)).await
    }

    /// Request/response call. `call` receives exclusive access to the actor
    /// and runs on its dispatcher, serialized with every other message for
    /// this key; `call_name` labels the call for tracing.
    ///
    /// ```ignore
    /// let total = counter.invoke("Add", |a, ctx| Box::pin(a.add(ctx, 2))).await?;
    /// ```
    pub async fn invoke<R, F>(&self, call_name: &str, call: F) -> Result<R>
    where
        R: Send + 'static,
        F: for<'a> FnOnce(&'a mut B, &'a ActorContext) -> BoxFuture<'a, Result<R>> + Send + 'static,
    {
        self.invoke_inner(call_name, call, None).await
    }

    /// Like [`invoke`](Self::invoke), with an explicit execution context.
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
        self.invoke_inner(call_name, call, Some(context)).await
    }

    async fn invoke_inner<R, F>(
        &self,
        call_name: &str,
        call: F,
        context: Option<ExecutionContext>,
    ) -> Result<R>
    where
        R: Send + 'static,
        F: for<'a> FnOnce(&'a mut B, &'a ActorContext) -> BoxFuture<'a, Result<R>> + Send + 'static,
    {
        let invoke: AskInvoke<B> = Box::new(move |actor, ctx| {
            let call = call(actor, ctx);
            Box::pin(async move { call.await.map(|response| Box::new(response) as AskResponse) })
        });
        let (reply, response) = oneshot::channel();
        self.port
            .ask(Arc::from(call_name), invoke, context, reply)
            .await?;
        let response = response.await.map_err(|_| Error::AskDropped)??;
        Ok(*response
            .downcast::<R>()
            .expect("ask response matches the invoked call's return type"))
    }

    /// A reference to the same underlying dispatcher, typed against a base
    /// or capability view of the actor. No identity re-resolution happens:
    /// calls through the result are serialized with calls through `self`.
    ///
    /// ```ignore
    /// let watchable = device.to_base_ref::<dyn Watchable>(|a| a);
    /// ```
    pub fn to_base_ref<C: ?Sized + 'static>(&self, project: fn(&mut B) -> &mut C) -> ActorRef<C> {
        ActorRef {
            port: Arc::new(ProjectedPort {
                parent: self.port.clone(),
                project,
            }),
        }
    }
}

/// Object-safe transport into a dispatcher's mailbox, generic over the view
/// type callers address the actor through.
pub(crate) trait MessagePort<B: ?Sized>: Send + Sync {
    fn send_oneway(
        &self,
        payload: Box<dyn Any + Send>,
        context: Option<ExecutionContext>,
    ) -> BoxFuture<'static, Result<()>>;

    fn ask(
        &self,
        call_name: Arc<str>,
        invoke: AskInvoke<B>,
        context: Option<ExecutionContext>,
        reply: AskReply,
    ) -> BoxFuture<'static, Result<()>>;
}

/// Adapts calls against a base view `C` onto the parent port's view `B`.
struct ProjectedPort<B: ?Sized, C: ?Sized> {
    parent: Arc<dyn MessagePort<B>>,
    project: fn(&mut B) -> &mut C,
}

impl<B: ?Sized + 'static, C: ?Sized + 'static> MessagePort<C> for ProjectedPort<B, C> {
    fn send_oneway(
        &self,
        payload: Box<dyn Any + Send>,
        context: Option<ExecutionContext>,
    ) -> BoxFuture<'static, Result<()>> {
        self.parent.send_oneway(payload, context)
    }

    fn ask(
        &self,
        call_name: Arc<str>,
        invoke: AskInvoke<C>,
        context: Option<ExecutionContext>,
        reply: AskReply,
    ) -> BoxFuture<'static, Result<()>> {
        let project = self.project;
        let invoke: AskInvoke<B> = Box::new(move |actor, ctx| invoke(project(actor), ctx));
        self.parent.ask(call_name, invoke, context, reply)
    }
}
