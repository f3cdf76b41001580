use sluice::{
    BoundedQueueReceiver, CounterSet, InMemorySource, ReadConfig, ReadError, ReadOperation,
    Receiver, ReceiverError, Source, StateSampler,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn string_source(count: usize) -> Arc<dyn Source<String>> {
    let records: Vec<String> = (0..count).map(|i| format!("r{i}")).collect();
    Arc::new(InMemorySource::new(records, |record: &String| {
        record.len() as u64
    }))
}

fn operation(
    source: Arc<dyn Source<String>>,
    receivers: Vec<Box<dyn Receiver<String>>>,
) -> ReadOperation<String> {
    let counters = CounterSet::new();
    let sampler = Arc::new(StateSampler::new("bounded-test"));
    ReadOperation::new(
        "bounded-test",
        source,
        receivers,
        ReadConfig::default(),
        &counters,
        sampler,
    )
    .unwrap()
}

#[test]
fn delivers_in_order_through_a_live_consumer() {
    let receiver = BoundedQueueReceiver::new(4, Duration::from_millis(500));
    let queue = receiver.queue();

    let consumer = thread::spawn(move || {
        let mut drained = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while drained.len() < 50 && Instant::now() < deadline {
            match queue.pop() {
                Some(value) => drained.push(value),
                None => thread::sleep(Duration::from_millis(1)),
            }
        }
        drained
    });

    let op = operation(string_source(50), vec![Box::new(receiver)]);
    op.start().unwrap();

    let drained = consumer.join().unwrap();
    let expected: Vec<String> = (0..50).map(|i| format!("r{i}")).collect();
    assert_eq!(drained, expected);
}

#[test]
fn stalled_consumer_surfaces_as_a_forwarding_failure() {
    // Capacity 2 and nobody draining: the third element exhausts patience.
    let receiver = BoundedQueueReceiver::new(2, Duration::from_millis(30));
    let op = operation(string_source(10), vec![Box::new(receiver)]);

    let err = op.start().unwrap_err();

    assert!(matches!(
        err,
        ReadError::Forward {
            source: ReceiverError::Full { capacity: 2, .. },
        }
    ));
    assert_eq!(op.state(), sluice::LifecycleState::Closed);
}
