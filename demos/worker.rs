use std::{thread, time::Duration};

use plinth::{LogRegistry, SharedMutex, Sink, Stopwatch, ThreadIdent, Worker};

fn main() {
    let registry = LogRegistry::new();
    let logger = registry.get_or_create("worker", &Sink::console()).unwrap();

    // A task on its own thread, reporting its identity.
    logger.warning(format!("main thread: {}", ThreadIdent::current()));
    let task_logger = logger.clone();
    let mut worker = Worker::new();
    worker
        .run(move || {
            task_logger.warning(format!("running in: {}", ThreadIdent::current()));
            Ok(())
        })
        .unwrap();
    worker.join().unwrap().unwrap();

    // Mutex interleaving: the worker's critical section waits until the
    // main thread releases the shared lock.
    let gate: SharedMutex = Default::default();
    let mut watch = Stopwatch::new();
    let mut guarded = Worker::new();
    let section_logger = logger.clone();

    watch.start();
    let guard = gate.lock().unwrap();
    guarded
        .run_guarded(&gate, move || {
            thread::sleep(Duration::from_millis(1000));
            section_logger.warning("critical section done");
            Ok(())
        })
        .unwrap();

    thread::sleep(Duration::from_millis(1000));
    drop(guard);

    guarded.join().unwrap().unwrap();
    watch.stop();
    logger.warning(format!("elapsed: {} microseconds", watch.elapsed_micros()));

    registry.shutdown();
}
