use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Acquire `lock`, recovering the guard when a previous holder panicked.
pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    source: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                source_module = source,
                lock_kind = "mutex.lock",
                result = "poisoned_recovered",
                "Recovered poisoned lock"
            );
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn recovers_after_holder_panicked() {
        let lock = Arc::new(Mutex::new(1_u32));
        let shared = Arc::clone(&lock);
        let _ = std::thread::spawn(move || {
            let _guard = shared.lock().expect("lock");
            panic!("poison the lock");
        })
        .join();

        assert!(lock.is_poisoned());
        *mutex_lock(&lock, "test", "write") += 1;
        assert_eq!(*mutex_lock(&lock, "test", "read"), 2);
    }
}
