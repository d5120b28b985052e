/// Pluggable pause schedule for retries other than rate-limited ones.
///
/// `attempt` is the number of attempts already executed, starting at 1.
/// A single method so suites can freeze delays to zero with a closure.
pub trait BackoffStrategy: Send + Sync {
    fn delay_millis(&self, attempt: u32) -> u64;
}

impl<F> BackoffStrategy for F
where
    F: Fn(u32) -> u64 + Send + Sync,
{
    fn delay_millis(&self, attempt: u32) -> u64 {
        self(attempt)
    }
}
