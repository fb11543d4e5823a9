pub mod semaphore;
pub mod spinlock;
