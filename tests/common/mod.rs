#![allow(dead_code)]

use std::time::Duration;

use taskdag::engine::{
    Runtime, RuntimeEvent, SchedulerHandle, SchedulerOptions, TaskScheduler,
};
use taskdag::errors::Result;
use taskdag::exec::ExecutorBackend;
use taskdag::registry::TaskView;
use taskdag::store::DurableStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use taskdag_test_utils::{init_tracing, with_timeout, with_timeout_of};

/// Options tuned for tests: fast polling and immediate `Once` runs.
pub fn fast_options() -> SchedulerOptions {
    SchedulerOptions {
        poll_interval: Duration::from_millis(10),
        command_timeout: Duration::from_secs(5),
        once_delay: Duration::ZERO,
        max_retries: 3,
    }
}

/// Start `scheduler` on a background runtime driven by the executor built by
/// `make_executor` (which receives the event sender and shutdown token).
pub fn spawn_runtime<S, E, F>(
    scheduler: TaskScheduler<S>,
    make_executor: F,
) -> (SchedulerHandle, JoinHandle<Result<TaskScheduler<S>>>)
where
    S: DurableStore + 'static,
    E: ExecutorBackend + 'static,
    F: FnOnce(mpsc::Sender<RuntimeEvent>, &SchedulerHandle) -> E,
{
    let (handle, rx) = SchedulerHandle::channel(64);
    let executor = make_executor(handle.event_sender(), &handle);
    let runtime = Runtime::new(scheduler, rx, executor, handle.clone());
    (handle, tokio::spawn(runtime.run()))
}

/// Poll `get_task` until `pred` holds.
pub async fn wait_for_task(
    handle: &SchedulerHandle,
    name: &str,
    pred: impl Fn(&TaskView) -> bool,
) -> TaskView {
    loop {
        let view = handle.get_task(name).await.expect("task exists");
        if pred(&view) {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
