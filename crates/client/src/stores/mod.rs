//! In-memory observable stores.

pub mod connectivity;
pub mod listeners;

pub use connectivity::{
    ApiStatus, ConnectivityPatch, ConnectivityState, ConnectivityStore, STILL_WAKING_MESSAGE,
    UNAVAILABLE_MESSAGE, WAKING_MESSAGE,
};
pub use listeners::{Listeners, Subscription};
