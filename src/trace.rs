use std::sync::Arc;

use uuid::Uuid;

use crate::{Error, ExecutionContext};

/// Handle returned by a [`TracingHook`] for one dispatched message.
///
/// The dispatcher drops it exactly once per message, after the handler's
/// async chain fully completes (success or failure); dropping ends the
/// span. `set_error` is invoked when an ask fails, before the error is
/// delivered to the caller.
pub trait TracingActivity: Send {
    fn set_error(&mut self, error: &Error, message: &str);
}

/// Per-message tracing hook.
///
/// Invoked with the envelope's execution context and a human-readable
/// activity name (`"{actor type}-{key}: {call name}"`). May rewrite the
/// context; the rewritten value is what the handler observes and what
/// nested calls propagate. Returns the activity to close once the message
/// is done.
pub type TracingHook = Arc<
    dyn Fn(&ExecutionContext, &str) -> (ExecutionContext, Box<dyn TracingActivity>) + Send + Sync,
>;

const TRACE_ID_KEY: &str = "x-b3-traceid";
const SPAN_ID_KEY: &str = "x-b3-spanid";
const PARENT_SPAN_ID_KEY: &str = "x-b3-parentspanid";
const REQUEST_ID_KEY: &str = "x-request-id";

/// A [`TracingHook`] backed by [`tracing`] spans.
///
/// Continues a B3 trace found in the incoming scope, or starts a new one
/// with a fresh request id. The current trace/span ids are merged into the
/// forwarded context so the next hop parents correctly.
pub fn span_tracing_hook() -> TracingHook {
    Arc::new(|context, activity_name| {
        let parent_span_id = context.get(SPAN_ID_KEY).map(str::to_owned);
        let trace_id = context
            .get(TRACE_ID_KEY)
            .map(str::to_owned)
            .unwrap_or_else(new_trace_id);
        let span_id = new_span_id();

        let span = tracing::info_span!(
            "actor_message",
            activity = %activity_name,
            trace_id = %trace_id,
            span_id = %span_id,
        );

        let mut entries = vec![
            (TRACE_ID_KEY.to_owned(), trace_id),
            (SPAN_ID_KEY.to_owned(), span_id),
        ];
        match parent_span_id {
            Some(parent) => entries.push((PARENT_SPAN_ID_KEY.to_owned(), parent)),
            None => entries.push((REQUEST_ID_KEY.to_owned(), Uuid::new_v4().to_string())),
        }

        let forwarded = context.with_values(entries);
        let activity: Box<dyn TracingActivity> = Box::new(SpanActivity { span });
        (forwarded, activity)
    })
}

fn new_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn new_span_id() -> String {
    // B3 span ids are 64-bit; half a v4 uuid is enough entropy.
    Uuid::new_v4().simple().to_string()[..16].to_owned()
}

struct SpanActivity {
    span: tracing::Span,
}

impl TracingActivity for SpanActivity {
    fn set_error(&mut self, error: &Error, message: &str) {
        let _entered = self.span.enter();
        tracing::error!(error = %error, detail = message, "message handling failed");
    }
}
