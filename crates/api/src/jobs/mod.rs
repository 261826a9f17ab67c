//! Background job scheduler and job implementations.

mod pool_metrics;
mod scheduler;
mod token_sweep;

pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
pub use token_sweep::TokenSweepJob;
