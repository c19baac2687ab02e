//! Geiko - virtual-actor runtime for Tokio
//!
//! Callers address a named, typed unit of state through
//! [`LocalActorNode::get_actor`] and get a location-transparent handle whose
//! calls execute one-at-a-time, in arrival order, per key. Instances are
//! created lazily on first use and torn down by an idle watchdog; an
//! execution context carries tracing ids and caller metadata transparently
//! through nested actor-to-actor calls.
//!
//! See `demos/hello_world.rs`.

mod actor;
mod actor_ref;
mod builder;
mod context;
mod envelope;
mod error;
mod execution_context;
mod node;
mod persistence;
mod scoped;
mod trace;

mod internal;

pub use actor::Actor;
pub use actor_ref::ActorRef;
pub use builder::{ActorNodeBuilder, DEFAULT_DEACTIVATION_TIMEOUT, DEFAULT_MAILBOX_CAPACITY};
pub use context::ActorContext;
pub use envelope::PoisonPill;
pub use error::Error;
pub use execution_context::{ExecutionContext, Scope};
pub use node::LocalActorNode;
pub use persistence::{EventData, EventSourcePersistence, InMemoryEventStore, PersistedEvent};
pub use scoped::{ScopedActorRef, ScopedActorSystem};
pub use trace::{TracingActivity, TracingHook, span_tracing_hook};

pub type Result<T = ()> = std::result::Result<T, Error>;
