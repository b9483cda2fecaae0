use std::thread;
use std::time::Duration;

/// Sleep for exact milliseconds.
pub fn sleep_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}
