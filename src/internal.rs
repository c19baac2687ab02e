mod dispatcher;
mod watchdog;

pub(crate) use dispatcher::{ActorFactoryFn, Dispatcher, DispatcherHandle};
pub(crate) use watchdog::WatchdogHandle;
