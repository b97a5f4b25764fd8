// Messaging - Editor -> UI notifications over a lock-free ring buffer

pub mod channels;
pub mod event;

pub use channels::{EventConsumer, EventProducer, create_event_channel, drain_events, push_event};
pub use event::UiEvent;
