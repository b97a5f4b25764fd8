// Communication channels lock-free

use crate::messaging::event::UiEvent;
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Producer, Split};

pub type EventProducer = ringbuf::HeapProd<UiEvent>;
pub type EventConsumer = ringbuf::HeapCons<UiEvent>;

pub fn create_event_channel(capacity: usize) -> (EventProducer, EventConsumer) {
    let rb = HeapRb::<UiEvent>::new(capacity.max(1));
    rb.split()
}

/// Push without blocking; a full buffer drops the event
pub fn push_event(producer: &mut EventProducer, event: UiEvent) -> bool {
    match producer.try_push(event) {
        Ok(()) => true,
        Err(dropped) => {
            log::trace!("UI event buffer full, dropping {:?}", dropped);
            false
        }
    }
}

/// Take every queued event, oldest first
pub fn drain_events(consumer: &mut EventConsumer) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Some(event) = consumer.try_pop() {
        events.push(event);
    }
    events
}
