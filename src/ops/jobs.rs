//! Background jobs and the busy flags that keep them single-flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

/// The kinds of long-running request the editor can have in flight. Each
/// kind has its own busy flag, so a design request does not block a
/// tagline suggestion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobKind {
    MagicFill,
    Design,
    Tagline,
    ImageTool,
    Header,
    Export,
    Autosave,
}

impl JobKind {
    pub const ALL: [JobKind; 7] = [
        JobKind::MagicFill,
        JobKind::Design,
        JobKind::Tagline,
        JobKind::ImageTool,
        JobKind::Header,
        JobKind::Export,
        JobKind::Autosave,
    ];

    fn slot(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            JobKind::MagicFill => "magic fill",
            JobKind::Design => "design proposal",
            JobKind::Tagline => "tagline",
            JobKind::ImageTool => "image tool",
            JobKind::Header => "header background",
            JobKind::Export => "export",
            JobKind::Autosave => "autosave",
        }
    }
}

/// A busy bit. Set while a [`BusyGuard`] for it is alive.
#[derive(Clone, Debug, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Claim the flag. `None` if someone already holds it.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(Arc::clone(&self.0)))
    }
}

/// Clears its flag when dropped, on every exit path.
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One flag per [`JobKind`].
#[derive(Clone, Debug, Default)]
pub struct BusyFlags {
    flags: [BusyFlag; 7],
}

impl BusyFlags {
    pub fn flag(&self, kind: JobKind) -> &BusyFlag {
        &self.flags[kind.slot()]
    }

    pub fn is_busy(&self, kind: JobKind) -> bool {
        self.flag(kind).is_busy()
    }

    pub fn any_busy(&self) -> bool {
        self.flags.iter().any(BusyFlag::is_busy)
    }
}

/// A finished job. The guard rides along so the busy flag stays set until
/// the editor has actually merged (or dropped) the result.
pub struct Completed<M> {
    pub kind: JobKind,
    pub message: M,
    _guard: BusyGuard,
}

/// Worker threads for editor jobs.
///
/// Jobs block their thread until the service answers, so the pool holds one
/// thread per kind plus one for the second half of a magic fill's
/// `rayon::join`. Every kind can be in flight at once without waiting on
/// another.
pub struct JobPool {
    pool: Option<rayon::ThreadPool>,
}

impl JobPool {
    pub const THREADS: usize = JobKind::ALL.len() + 1;

    pub fn new() -> Self {
        let built = rayon::ThreadPoolBuilder::new()
            .num_threads(Self::THREADS)
            .thread_name(|i| format!("flyerfe-job-{}", i))
            .build();
        match built {
            Ok(pool) => Self { pool: Some(pool) },
            Err(e) => {
                log_warn!("Job pool could not start, using the shared pool: {}", e);
                Self { pool: None }
            }
        }
    }

    /// Threads available to jobs. 0 when running on the shared pool.
    pub fn threads(&self) -> usize {
        self.pool.as_ref().map_or(0, rayon::ThreadPool::current_num_threads)
    }

    /// Run `work` on the pool and post its output to `sender`.
    ///
    /// A panic inside `work` is caught and turned into a message by
    /// `on_panic`, so the receiver always hears back.
    pub fn spawn<M, W, P>(&self, kind: JobKind, guard: BusyGuard, sender: Sender<Completed<M>>, work: W, on_panic: P)
    where
        M: Send + 'static,
        W: FnOnce() -> M + Send + 'static,
        P: FnOnce(String) -> M + Send + 'static,
    {
        let job = move || {
            let message = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(work)) {
                Ok(message) => message,
                Err(payload) => on_panic(panic_message(payload.as_ref())),
            };
            // Receiver gone means the editor was dropped; the guard still clears.
            let _ = sender.send(Completed { kind, message, _guard: guard });
        };
        match &self.pool {
            Some(pool) => pool.spawn(job),
            None => rayon::spawn(job),
        }
    }
}

impl Default for JobPool {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn flag_is_single_flight() {
        let flag = BusyFlag::default();
        let guard = flag.try_acquire().unwrap();
        assert!(flag.is_busy());
        assert!(flag.try_acquire().is_none());
        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn kinds_are_independent() {
        let flags = BusyFlags::default();
        let _design = flags.flag(JobKind::Design).try_acquire().unwrap();
        assert!(flags.is_busy(JobKind::Design));
        assert!(!flags.is_busy(JobKind::Tagline));
        assert!(flags.any_busy());
    }

    #[test]
    fn completed_message_holds_the_flag() {
        let flags = BusyFlags::default();
        let guard = flags.flag(JobKind::Tagline).try_acquire().unwrap();
        let (tx, rx) = mpsc::channel();
        JobPool::new().spawn(JobKind::Tagline, guard, tx, || 7, |_| -1);
        let done = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(done.message, 7);
        assert!(flags.is_busy(JobKind::Tagline));
        drop(done);
        assert!(!flags.is_busy(JobKind::Tagline));
    }

    #[test]
    fn panics_become_messages() {
        let flags = BusyFlags::default();
        let guard = flags.flag(JobKind::Header).try_acquire().unwrap();
        let (tx, rx) = mpsc::channel::<Completed<Result<i32, String>>>();
        JobPool::new().spawn(JobKind::Header, guard, tx, || panic!("boom"), Err);
        let done = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(done.message, Err("boom".to_string()));
        drop(done);
        assert!(!flags.is_busy(JobKind::Header));
    }

    #[test]
    fn pool_has_a_thread_per_kind() {
        let pool = JobPool::new();
        assert_eq!(pool.threads(), JobKind::ALL.len() + 1);
    }

    #[test]
    fn blocked_job_does_not_starve_the_next() {
        let pool = JobPool::new();
        let flags = BusyFlags::default();
        let (tx, rx) = mpsc::channel();
        let (go_tx, go_rx) = mpsc::channel::<()>();

        // The tagline job parks its thread until the design job has run.
        let tagline = flags.flag(JobKind::Tagline).try_acquire().unwrap();
        pool.spawn(
            JobKind::Tagline,
            tagline,
            tx.clone(),
            move || go_rx.recv_timeout(Duration::from_secs(5)).is_ok(),
            |_| false,
        );
        let design = flags.flag(JobKind::Design).try_acquire().unwrap();
        pool.spawn(
            JobKind::Design,
            design,
            tx,
            move || go_tx.send(()).is_ok(),
            |_| false,
        );

        let mut finished = Vec::new();
        for _ in 0..2 {
            let done = rx.recv_timeout(Duration::from_secs(10)).unwrap();
            assert!(done.message, "{} did not complete", done.kind.name());
            finished.push(done.kind);
        }
        assert!(finished.contains(&JobKind::Design));
        assert!(finished.contains(&JobKind::Tagline));
    }
}
