//! Event distribution for the storefront engines.
//!
//! The engines publish every applied state change through an [`EventBus`] so
//! UI layers subscribe explicitly instead of reading ambient shared state.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::Envelope;
pub use event::Event;
pub use in_memory_bus::InMemoryEventBus;
