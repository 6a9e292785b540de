use mvu_store::{filtering_handler, BoxError, ConcurrencyPolicy, Filtering, FilteringStream};

use super::{given_a_probe_store, CommandLog, GatedFetch, ProbeCommand, ProbeEvent, StreamingFetch};

fn sorted(mut values: Vec<u32>) -> Vec<u32> {
    values.sort_unstable();
    values
}

#[test]
fn given_switch_latest_handler_when_newer_command_arrives_should_cancel_previous_work() {
    let mut test = given_a_probe_store(|builder, gates| {
        builder.handler(Filtering::new(GatedFetch {
            gates: gates.clone(),
            policy: ConcurrencyPolicy::SwitchLatest,
        }))
    });
    let first = test.gates.close(1);
    let second = test.gates.close(2);

    test.store.dispatch(ProbeEvent::Start(1)).unwrap();
    test.executor.run_until_stalled();
    test.store.dispatch(ProbeEvent::Start(2)).unwrap();
    test.executor.run_until_stalled();

    // The first unit of work was dropped along with its gate.
    assert!(first.send(()).is_err());

    second.send(()).unwrap();
    test.executor.run_until_stalled();

    assert_eq!(test.store.state().received, vec![2]);
    assert!(test.scope.fault().is_none());
}

#[test]
fn given_switch_latest_handler_when_previous_work_finished_should_keep_both_results() {
    let mut test = given_a_probe_store(|builder, gates| {
        builder.handler(Filtering::new(GatedFetch {
            gates: gates.clone(),
            policy: ConcurrencyPolicy::SwitchLatest,
        }))
    });

    test.store.dispatch(ProbeEvent::Start(1)).unwrap();
    test.executor.run_until_stalled();
    test.store.dispatch(ProbeEvent::Start(2)).unwrap();
    test.executor.run_until_stalled();

    assert_eq!(test.store.state().received, vec![1, 2]);
}

#[test]
fn given_merge_handler_when_second_command_arrives_should_complete_both() {
    let mut test = given_a_probe_store(|builder, gates| {
        builder.handler(Filtering::new(GatedFetch {
            gates: gates.clone(),
            policy: ConcurrencyPolicy::Merge,
        }))
    });
    let first = test.gates.close(1);
    let second = test.gates.close(2);

    test.store.dispatch(ProbeEvent::Start(1)).unwrap();
    test.store.dispatch(ProbeEvent::Start(2)).unwrap();
    test.executor.run_until_stalled();
    assert!(test.store.state().received.is_empty());

    // Completion order is independent of command order.
    second.send(()).unwrap();
    test.executor.run_until_stalled();
    assert_eq!(test.store.state().received, vec![2]);

    first.send(()).unwrap();
    test.executor.run_until_stalled();
    assert_eq!(test.store.state().received, vec![2, 1]);
}

#[test]
fn given_filtering_handler_when_command_does_not_match_should_ignore_it() {
    let log = CommandLog::default();
    let seen = log.seen.clone();
    let mut test = given_a_probe_store(|builder, gates| {
        builder
            .handler(Filtering::new(GatedFetch {
                gates: gates.clone(),
                policy: ConcurrencyPolicy::Merge,
            }))
            .handler(log)
    });

    test.store.dispatch(ProbeEvent::Ping).unwrap();
    test.executor.run_until_stalled();

    assert_eq!(*seen.lock(), vec![ProbeCommand::Ping]);
    assert!(test.store.state().received.is_empty());
    assert_eq!(test.store.state().transitions, 1);
}

#[test]
fn given_merge_stream_handler_should_interleave_every_sequence() {
    let mut test = given_a_probe_store(|builder, gates| {
        builder.handler(FilteringStream::new(StreamingFetch {
            gates: gates.clone(),
            policy: ConcurrencyPolicy::Merge,
        }))
    });
    let first = test.gates.close(1);
    let second = test.gates.close(2);

    test.store.dispatch(ProbeEvent::StartMany(vec![1, 2])).unwrap();
    test.executor.run_until_stalled();

    first.send(()).unwrap();
    second.send(()).unwrap();
    first.send(()).unwrap();
    test.executor.run_until_stalled();

    assert_eq!(sorted(test.store.state().received), vec![1, 1, 2]);
}

#[test]
fn given_switch_latest_stream_handler_should_stop_the_cancelled_sequence() {
    let mut test = given_a_probe_store(|builder, gates| {
        builder.handler(FilteringStream::new(StreamingFetch {
            gates: gates.clone(),
            policy: ConcurrencyPolicy::SwitchLatest,
        }))
    });
    let first = test.gates.close(1);
    let second = test.gates.close(2);

    test.store.dispatch(ProbeEvent::Start(1)).unwrap();
    test.executor.run_until_stalled();
    first.send(()).unwrap();
    test.executor.run_until_stalled();
    assert_eq!(test.store.state().received, vec![1]);

    test.store.dispatch(ProbeEvent::Start(2)).unwrap();
    test.executor.run_until_stalled();

    assert!(first.send(()).is_err());
    second.send(()).unwrap();
    second.send(()).unwrap();
    test.executor.run_until_stalled();

    assert_eq!(test.store.state().received, vec![1, 2, 2]);
}

#[test]
fn given_stream_handler_with_no_events_should_produce_nothing() {
    let mut test = given_a_probe_store(|builder, gates| {
        builder.handler(FilteringStream::new(StreamingFetch {
            gates: gates.clone(),
            policy: ConcurrencyPolicy::Merge,
        }))
    });

    // No gate registered for 5, so its sequence is empty.
    test.store.dispatch(ProbeEvent::Start(5)).unwrap();
    test.executor.run_until_stalled();

    assert!(test.store.state().received.is_empty());
    assert!(test.scope.fault().is_none());
}

#[test]
fn given_closure_handler_should_answer_matching_commands() {
    let mut test = given_a_probe_store(|builder, _| {
        builder.handler(filtering_handler(
            "times-ten",
            ConcurrencyPolicy::Merge,
            |command: ProbeCommand| match command {
                ProbeCommand::Fetch(id) => Some(id),
                ProbeCommand::Ping => None,
            },
            |id: u32| async move { Ok::<_, BoxError>(ProbeEvent::Received(id * 10)) },
        ))
    });

    test.store.dispatch(ProbeEvent::StartMany(vec![1, 2])).unwrap();
    test.store.dispatch(ProbeEvent::Ping).unwrap();
    test.executor.run_until_stalled();

    assert_eq!(sorted(test.store.state().received), vec![10, 20]);
}
