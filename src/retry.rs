/// outcome of a bounded retry loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// every attempt failed with a retryable error
    Exhausted { attempts: u32, last: E },
    /// a non-retryable error; returned immediately
    Fatal(E),
}

/// run `op` up to `max_attempts` times, retrying only while `is_retryable`
/// accepts the error; `op` receives the 1-based attempt number
pub fn retry<T, E>(
    max_attempts: u32,
    mut is_retryable: impl FnMut(&E) -> bool,
    mut op: impl FnMut(u32) -> Result<T, E>,
) -> Result<T, RetryError<E>> {
    debug_assert!(max_attempts > 0);

    let mut last = None;
    for attempt in 1..=max_attempts {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if is_retryable(&e) => last = Some(e),
            Err(e) => return Err(RetryError::Fatal(e)),
        }
    }

    Err(RetryError::Exhausted {
        attempts: max_attempts,
        last: last.expect("at least one attempt ran"),
    })
}
