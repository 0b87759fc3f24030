pub mod async_task;
pub mod backoff;

pub use backoff::ExponentialBackoff;

#[cfg(test)]
mod async_task_test;
