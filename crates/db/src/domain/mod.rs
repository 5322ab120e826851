//! Domain aggregates and the events they emit.
//!
//! Aggregates are plain values that accumulate [`events::DomainEvent`]s;
//! the repositories apply each event's side-effect inside the same
//! database transaction as the aggregate update, and publish the events
//! to the in-process bus strictly after commit.

pub mod account;
pub mod events;
pub mod post;

pub use account::AccountAggregate;
pub use events::{DomainEvent, EventSink, NoOpEventSink};
pub use post::{PostAggregate, PostChanges};
