pub mod controller;
pub mod events;

pub use controller::{HealthCoordinator, Listener, Subscription};
pub use events::{ChangeEvent, ChangeReason};
