//! Watcher Binding
//!
//! Turns the `watchers` table of a component's meta into live subscriptions.
//!
//! # Keys
//!
//! A watch key either names a path in the component's own reactive data, or
//! has the custom form `[!|?]<path>:<event>` and names an event on an
//! external object (see [`WatchKey`]). The prefix selects the hook the
//! binding activates at:
//!
//! | Key            | Binds at       | Subscribes to                     |
//! |----------------|----------------|-----------------------------------|
//! | `value`        | `created`      | own field `value`                 |
//! | `!remote:load` | `beforeCreate` | event `load` on external `remote` |
//! | `remote:load`  | `created`      | event `load` on external `remote` |
//! | `?:closeAll`   | `mounted`      | event `close-all` on the component |
//!
//! # Lifetime
//!
//! Every subscription is registered in the component's
//! [`AsyncGroup`](crate::reactive::AsyncGroup); clearing the group at
//! teardown unsubscribes all of them.

mod bind;
mod key;
mod registry;

pub use bind::bind_watchers;
pub use key::{WatchKey, WatchTarget};
pub use registry::{External, GlobalRegistry};
