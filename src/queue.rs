//! Ordered asynchronous step execution
//!
//! The transition pipeline is a flat queue of steps run strictly one at a
//! time: a step only starts after the previous one finished, and ordering
//! within the queue is the sole sequencing mechanism. The runner knows
//! nothing about guards or routes; it just advances, skips empty entries,
//! and stops at the first interruption.

use std::future::Future;

/// Run `queue` front to back, invoking `step` for each present entry.
///
/// `None` entries are skipped. The first `Err` a step returns stops the run
/// and is surfaced unchanged; `Ok(())` means every step completed.
pub async fn run_queue<T, S, Fut, E>(queue: Vec<Option<T>>, mut step: S) -> Result<(), E>
where
    S: FnMut(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    for entry in queue.into_iter().flatten() {
        step(entry).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_runs_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let queue = vec![Some(1), Some(2), Some(3)];

        let result: Result<(), ()> = pollster::block_on(run_queue(queue, |n| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(n);
                Ok(())
            }
        }));

        assert!(result.is_ok());
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_skips_empty_entries() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let queue = vec![None, Some("a"), None, Some("b")];

        let result: Result<(), ()> = pollster::block_on(run_queue(queue, |s| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(s);
                Ok(())
            }
        }));

        assert!(result.is_ok());
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_stops_at_first_error() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let queue = vec![Some(1), Some(2), Some(3)];

        let result = pollster::block_on(run_queue(queue, |n| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(n);
                if n == 2 {
                    Err("stopped")
                } else {
                    Ok(())
                }
            }
        }));

        assert_eq!(result, Err("stopped"));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_empty_queue_completes() {
        let queue: Vec<Option<u8>> = Vec::new();
        let result: Result<(), ()> =
            pollster::block_on(run_queue(queue, |_| async { Ok(()) }));
        assert!(result.is_ok());
    }
}
