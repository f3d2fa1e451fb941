//! Bounded object pool with configurable reinitialization timing
//!
//! The logger keeps its hot path allocation-free by recycling event records and
//! job states through an [`ObjectPool`]. Values leave the pool with
//! [`ObjectPool::take`] (or as a [`PooledHandle`] via [`ObjectPool::acquire`])
//! and come back with [`ObjectPool::put`] or by dropping the handle.
//!
//! # Reinitialization timing
//!
//! | Timing | Reinitializer runs | Cost paid by |
//! |--------|--------------------|--------------|
//! | [`ReinitTiming::OnTake`] | when a cached value is taken | the taker |
//! | [`ReinitTiming::OnReturn`] | when a value is put back | the returner |
//! | [`ReinitTiming::Deferred`] | on the pool's background worker | nobody on the hot path |
//!
//! Under `Deferred` a returned value is invisible to `take` until its
//! reinitializer has finished.
//!
//! # Example
//!
//! ```
//! use rust_event_logger::core::pool::{ObjectPool, ReinitTiming};
//!
//! let pool = ObjectPool::builder(|| Vec::<u8>::with_capacity(1024))
//!     .max_size(8)
//!     .timing(ReinitTiming::OnReturn)
//!     .reinitializer(|buf: &mut Vec<u8>| buf.clear())
//!     .build()
//!     .unwrap();
//!
//! {
//!     let mut buf = pool.acquire().unwrap();
//!     buf.extend_from_slice(b"payload");
//! } // returned (and cleared) here
//!
//! assert_eq!(pool.idle_count(), 1);
//! assert!(pool.take().unwrap().is_empty());
//! ```

use super::error::{LoggerError, Result};
use super::metrics::PoolMetrics;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Default maximum number of idle instances kept by a pool
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Capability required of pooled values.
///
/// Every method has a default, so plain data types only need an empty impl.
pub trait Recyclable: Send + 'static {
    /// Set for types whose clones alias one instance (such as `Arc<T>`), so the
    /// pool checks identity before caching a returned value.
    const SHARED: bool = false;

    /// Whether this value is the type's "missing" value, which cannot be pooled
    fn is_sentinel(&self) -> bool {
        false
    }

    /// Whether `self` and `other` are the same underlying instance
    fn same_instance(&self, _other: &Self) -> bool {
        false
    }

    /// Release resources held by a value the pool is discarding
    fn release(self)
    where
        Self: Sized,
    {
    }
}

impl<T: Send + Sync + 'static> Recyclable for Arc<T> {
    const SHARED: bool = true;

    fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: Recyclable> Recyclable for Option<T> {
    const SHARED: bool = T::SHARED;

    fn is_sentinel(&self) -> bool {
        self.is_none()
    }

    fn same_instance(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_instance(b),
            _ => false,
        }
    }

    fn release(self) {
        if let Some(value) = self {
            value.release();
        }
    }
}

impl<T: Send + 'static> Recyclable for Vec<T> {}

impl Recyclable for String {}

/// When a pool runs its reinitializer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReinitTiming {
    /// Reinitialize a cached value as it is taken
    #[default]
    OnTake,
    /// Reinitialize synchronously as a value is returned
    OnReturn,
    /// Reinitialize returned values on a background worker
    Deferred,
}

impl fmt::Display for ReinitTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReinitTiming::OnTake => write!(f, "OnTake"),
            ReinitTiming::OnReturn => write!(f, "OnReturn"),
            ReinitTiming::Deferred => write!(f, "Deferred"),
        }
    }
}

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;
type Reinitializer<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// State shared between the pool owner, its handles and its deferred worker
struct PoolCore<T: Recyclable> {
    name: String,
    idle: Mutex<Vec<T>>,
    max_size: usize,
    timing: ReinitTiming,
    factory: Factory<T>,
    reinit: Option<Reinitializer<T>>,
    closed: AtomicBool,
    deferred_tx: Option<Sender<T>>,
    deferred_rx: Option<Receiver<T>>,
    metrics: PoolMetrics,
}

impl<T: Recyclable> PoolCore<T> {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn take(&self) -> Result<T> {
        if self.is_closed() {
            return Err(LoggerError::unavailable(self.name.as_str()));
        }

        let cached = self.idle.lock().pop();
        let value = match cached {
            Some(mut value) => {
                if self.timing == ReinitTiming::OnTake {
                    self.reinitialize(&mut value);
                }
                self.metrics.record_take(false);
                value
            }
            None => {
                self.metrics.record_take(true);
                (self.factory)()
            }
        };
        Ok(value)
    }

    fn put(&self, mut value: T) -> Result<()> {
        if value.is_sentinel() {
            return Err(LoggerError::invalid_argument(format!(
                "cannot return a sentinel value to {}",
                self.name
            )));
        }

        if self.is_closed() {
            self.discard(value);
            return Err(LoggerError::unavailable(self.name.as_str()));
        }

        if !self.has_room_for(&value) {
            self.discard(value);
            return Ok(());
        }

        match (self.timing, &self.deferred_tx) {
            (ReinitTiming::Deferred, Some(tx)) => {
                if let Err(rejected) = tx.send(value) {
                    self.discard(rejected.into_inner());
                } else if self.is_closed() {
                    // Shutdown may have drained the queue before this send landed
                    self.drain_deferred();
                }
            }
            (ReinitTiming::OnReturn, _) => {
                self.reinitialize(&mut value);
                self.cache(value);
            }
            _ => self.cache(value),
        }
        Ok(())
    }

    fn has_room_for(&self, value: &T) -> bool {
        let idle = self.idle.lock();
        idle.len() < self.max_size && !Self::contains(&idle, value)
    }

    fn contains(idle: &[T], value: &T) -> bool {
        T::SHARED && idle.iter().any(|cached| cached.same_instance(value))
    }

    /// Place a value in the idle cache, re-checking capacity under the lock
    fn cache(&self, value: T) {
        let mut idle = self.idle.lock();
        if self.is_closed() || idle.len() >= self.max_size || Self::contains(&idle, &value) {
            drop(idle);
            self.discard(value);
            return;
        }
        idle.push(value);
        self.metrics.record_recycled();
    }

    fn reinitialize(&self, value: &mut T) {
        if let Some(reinit) = &self.reinit {
            reinit(value);
        }
    }

    /// Release everything still waiting for the deferred worker
    fn drain_deferred(&self) {
        if let Some(rx) = &self.deferred_rx {
            while let Ok(value) = rx.try_recv() {
                self.discard(value);
            }
        }
    }

    fn discard(&self, value: T) {
        self.metrics.record_discarded();
        value.release();
    }

    /// Body of the deferred reinitialization worker
    fn run_deferred(self: Arc<Self>, items: Receiver<T>, stop: Receiver<()>) {
        loop {
            crossbeam_channel::select! {
                recv(items) -> msg => match msg {
                    Ok(value) => self.reinitialize_deferred(value),
                    Err(_) => break,
                },
                recv(stop) -> _ => break,
            }
        }

        // Pool is closing: queued values are released instead of cached
        while let Ok(value) = items.try_recv() {
            self.discard(value);
        }
    }

    fn reinitialize_deferred(&self, mut value: T) {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.reinitialize(&mut value)
        }));

        match result {
            Ok(()) => self.cache(value),
            Err(panic_info) => {
                let err = LoggerError::panicked(format!("{} reinitializer", self.name), panic_info);
                eprintln!(
                    "[LOGGER CRITICAL] {}. The value was discarded; the pool continues to function.",
                    err
                );
                self.discard(value);
            }
        }
    }
}

/// A bounded cache of reusable instances.
///
/// Safe for concurrent `take`/`put` from any number of threads. Dropping the
/// pool shuts it down.
pub struct ObjectPool<T: Recyclable> {
    core: Arc<PoolCore<T>>,
    stop_tx: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl<T: Recyclable> ObjectPool<T> {
    /// Create a builder around the factory used to construct new instances
    pub fn builder<F>(factory: F) -> ObjectPoolBuilder<T>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        ObjectPoolBuilder::new(factory)
    }

    /// Take an instance, building a new one if the cache is empty
    ///
    /// Fails only with [`LoggerError::ResourceUnavailable`] after shutdown.
    pub fn take(&self) -> Result<T> {
        self.core.take()
    }

    /// Return an instance to the pool
    ///
    /// Values beyond the pool's capacity are released and discarded.
    pub fn put(&self, value: T) -> Result<()> {
        self.core.put(value)
    }

    /// Take an instance wrapped in a handle that returns it on drop
    pub fn acquire(&self) -> Result<PooledHandle<T>> {
        let value = self.core.take()?;
        Ok(PooledHandle {
            value: Some(value),
            pool: Arc::clone(&self.core),
        })
    }

    /// Number of idle instances currently cached
    pub fn idle_count(&self) -> usize {
        self.core.idle.lock().len()
    }

    pub fn max_size(&self) -> usize {
        self.core.max_size
    }

    pub fn timing(&self) -> ReinitTiming {
        self.core.timing
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    pub fn metrics(&self) -> &PoolMetrics {
        &self.core.metrics
    }

    /// Close the pool.
    ///
    /// Stops the deferred worker, releases anything still queued for
    /// reinitialization and releases every idle instance. Later `take`/`put`
    /// calls fail with [`LoggerError::ResourceUnavailable`]. Idempotent.
    pub fn shutdown(&self) {
        if self.core.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        drop(self.stop_tx.lock().take());
        if let Some(handle) = self.worker.lock().take() {
            if let Err(e) = handle.join() {
                eprintln!(
                    "[LOGGER ERROR] {} reinitialization worker panicked during shutdown: {:?}",
                    self.core.name, e
                );
            }
        }

        self.core.drain_deferred();

        let idle = std::mem::take(&mut *self.core.idle.lock());
        for value in idle {
            value.release();
        }
    }
}

impl<T: Recyclable> Drop for ObjectPool<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<T: Recyclable> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("name", &self.core.name)
            .field("max_size", &self.core.max_size)
            .field("timing", &self.core.timing)
            .field("idle", &self.idle_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Builder for [`ObjectPool`]
pub struct ObjectPoolBuilder<T: Recyclable> {
    name: String,
    factory: Factory<T>,
    reinit: Option<Reinitializer<T>>,
    max_size: usize,
    timing: ReinitTiming,
}

impl<T: Recyclable> ObjectPoolBuilder<T> {
    fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            name: "object pool".to_string(),
            factory: Box::new(factory),
            reinit: None,
            max_size: DEFAULT_POOL_SIZE,
            timing: ReinitTiming::default(),
        }
    }

    /// Name used in errors and worker thread names
    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn timing(mut self, timing: ReinitTiming) -> Self {
        self.timing = timing;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn reinitializer<F>(mut self, reinit: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.reinit = Some(Box::new(reinit));
        self
    }

    /// Build the pool, spawning the reinitialization worker for `Deferred` timing
    pub fn build(self) -> Result<ObjectPool<T>> {
        if self.max_size == 0 {
            return Err(LoggerError::config(
                self.name,
                "maximum pool size must be greater than zero",
            ));
        }

        let deferred = self.timing == ReinitTiming::Deferred;
        let (deferred_tx, deferred_rx) = if deferred {
            let (tx, rx) = unbounded();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let core = Arc::new(PoolCore {
            name: self.name,
            idle: Mutex::new(Vec::with_capacity(self.max_size)),
            max_size: self.max_size,
            timing: self.timing,
            factory: self.factory,
            reinit: self.reinit,
            closed: AtomicBool::new(false),
            deferred_tx,
            deferred_rx: deferred_rx.clone(),
            metrics: PoolMetrics::new(),
        });

        let mut stop_tx = None;
        let mut worker = None;
        if let Some(items) = deferred_rx {
            let (tx, stop) = crossbeam_channel::bounded::<()>(0);
            let worker_core = Arc::clone(&core);
            let handle = thread::Builder::new()
                .name(format!("{}-reinit", core.name.replace(' ', "-")))
                .spawn(move || worker_core.run_deferred(items, stop))?;
            stop_tx = Some(tx);
            worker = Some(handle);
        }

        Ok(ObjectPool {
            core,
            stop_tx: Mutex::new(stop_tx),
            worker: Mutex::new(worker),
        })
    }
}

/// A pooled value that goes back to its pool when dropped.
///
/// If the pool has been shut down in the meantime, the value is released
/// directly instead.
pub struct PooledHandle<T: Recyclable> {
    value: Option<T>,
    pool: Arc<PoolCore<T>>,
}

impl<T: Recyclable> PooledHandle<T> {
    /// Explicitly return the value to its pool
    pub fn release(mut self) -> Result<()> {
        match self.value.take() {
            Some(value) => self.return_value(value),
            None => Ok(()),
        }
    }

    /// Detach the value from the pool; it will not be returned
    pub fn into_inner(mut self) -> Option<T> {
        self.value.take()
    }

    fn return_value(&self, value: T) -> Result<()> {
        if self.pool.is_closed() {
            value.release();
            return Ok(());
        }
        self.pool.put(value)
    }
}

impl<T: Recyclable> Deref for PooledHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value.as_ref().expect("pooled value present until released")
    }
}

impl<T: Recyclable> DerefMut for PooledHandle<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("pooled value present until released")
    }
}

impl<T: Recyclable> Drop for PooledHandle<T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            let _ = self.return_value(value);
        }
    }
}

impl<T: Recyclable + fmt::Debug> fmt::Debug for PooledHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PooledHandle").field(&self.value).finish()
    }
}
