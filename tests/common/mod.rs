#![allow(dead_code)]

use cpf::task::{BoxedTask, boxed};
use std::{sync::Once, thread, time::Duration};
use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber writing through the test harness. Honors
/// `RUST_LOG`; defaults to `warn`.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A task that sleeps for `millis` and then returns `value`.
pub fn sleeping<T: Send + 'static>(millis: u64, value: T) -> BoxedTask<T> {
    boxed(move || {
        thread::sleep(Duration::from_millis(millis));
        value
    })
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
