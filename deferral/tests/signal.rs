use deferral::TaskSource;
use deferral::{Awaitable, CompletionSignal, ProtocolError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

#[test]
fn second_registration_is_rejected() {
    let signal = CompletionSignal::<i32>::new();
    let fired = Arc::new(AtomicUsize::new(0));

    let counter = fired.clone();
    signal
        .on_complete(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let counter = fired.clone();
    let second = signal.on_complete(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(second, Err(ProtocolError::ContinuationAlreadyRegistered));

    signal.complete(1).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn completion_from_another_thread_resumes_once() {
    for _ in 0..20 {
        let (signal, awaitable) = Awaitable::<usize>::pending();
        let (source, handle) = TaskSource::new();

        let completers: Vec<_> = (0..4)
            .map(|i| {
                let signal = signal.clone();
                thread::spawn(move || signal.complete(i).is_ok())
            })
            .collect();

        awaitable
            .register_continuation(move || source.set_result(()))
            .unwrap();

        let winners = completers
            .into_iter()
            .map(|t| t.join().unwrap())
            .filter(|won| *won)
            .count();

        handle.result().unwrap();
        assert_eq!(winners, 1);
        assert!(awaitable.get_result().unwrap() < 4);
    }
}
