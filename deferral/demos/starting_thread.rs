//! Runs blocking work on a background thread and polls for it.

use deferral::{TaskError, TaskSource};
use std::thread;
use std::time::Duration;

#[deferral::main(worker_threads = 1)]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let work = deferral::task::run_in_background(|| {
        println!("background: working");
        thread::sleep(Duration::from_millis(1000));
        println!("background: done");
        Ok::<_, TaskError>(42)
    });

    let (source, handle) = TaskSource::new();
    if let Err(err) = work.register_continuation(move || source.set_result(())) {
        eprintln!("could not observe background work: {err}");
        return;
    }

    while !handle.is_completed() {
        println!("main: still waiting");
        thread::sleep(Duration::from_millis(200));
    }

    match work.get_result() {
        Ok(value) => println!("main: background produced {value}"),
        Err(err) => eprintln!("main: background failed: {err}"),
    }
}
