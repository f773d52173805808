//! Event Watcher: a single background thread that multiplexes every
//! exported line's event fd with `poll(2)`, waking blocked FUSE pollers
//! as edges land (spec §4.4 "Event Watcher").

use std::collections::HashMap;
use std::os::unix::io::RawFd;
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use nix::poll::{poll, PollFd, PollFlags};
use nix::unistd::{close, pipe, read, write};

use crate::domain::gpio_entry::{GpioLineEntry, PollNotifier};
use crate::domain::LineWatcher;

/// Re-checked whenever `poll(2)` times out, so a watcher with nothing to
/// watch still notices `stop()` within a bounded time (spec §4.4 "wakes
/// at least every 60s even if idle").
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);
const IDLE_TIMEOUT_MS: i32 = IDLE_TIMEOUT.as_millis() as i32;

struct Watched {
    fd: RawFd,
    entry: Weak<GpioLineEntry>,
}

struct Shared {
    watched: Mutex<HashMap<u32, Watched>>,
    wake_read: RawFd,
    wake_write: RawFd,
    stopping: std::sync::atomic::AtomicBool,
}

/// Owns the self-pipe and the watched-line set; the actual multiplexing
/// loop runs on a dedicated thread started by [`EventWatcher::spawn`]
/// (spec §4.4 "self-pipe trick to interrupt a blocked poll(2)").
pub struct EventWatcher {
    shared: Arc<Shared>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl EventWatcher {
    pub fn spawn(notifier: Arc<dyn PollNotifier>) -> Arc<Self> {
        let (wake_read, wake_write) = pipe().expect("self-pipe creation");
        let shared = Arc::new(Shared {
            watched: Mutex::new(HashMap::new()),
            wake_read,
            wake_write,
            stopping: std::sync::atomic::AtomicBool::new(false),
        });

        let loop_shared = shared.clone();
        let join = std::thread::Builder::new()
            .name("gpio-event-watcher".into())
            .spawn(move || run_loop(loop_shared, notifier))
            .expect("spawn event watcher thread");

        Arc::new(Self {
            shared,
            join: Mutex::new(Some(join)),
        })
    }

    /// Wakes the poll loop (via the self-pipe) and joins the thread
    /// (spec §4.4 "shutdown drains the self-pipe and exits cleanly").
    pub fn stop(&self) {
        self.shared
            .stopping
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let _ = write(self.shared.wake_write, &[0u8]);
        if let Some(join) = self.join.lock().unwrap().take() {
            let _ = join.join();
        }
    }
}

impl Drop for EventWatcher {
    fn drop(&mut self) {
        let _ = close(self.shared.wake_read);
        let _ = close(self.shared.wake_write);
    }
}

impl LineWatcher for EventWatcher {
    fn watch(&self, entry: Arc<GpioLineEntry>) {
        let fd = entry.event_fd();
        let global_n = entry.global_n;
        self.shared.watched.lock().unwrap().insert(
            global_n,
            Watched {
                fd,
                entry: Arc::downgrade(&entry),
            },
        );
        let _ = write(self.shared.wake_write, &[0u8]);
    }

    fn unwatch(&self, global_n: u32) {
        self.shared.watched.lock().unwrap().remove(&global_n);
        let _ = write(self.shared.wake_write, &[0u8]);
    }
}

fn run_loop(shared: Arc<Shared>, notifier: Arc<dyn PollNotifier>) {
    loop {
        if shared.stopping.load(std::sync::atomic::Ordering::SeqCst) {
            break;
        }

        let entries: Vec<(u32, RawFd, Weak<GpioLineEntry>)> = shared
            .watched
            .lock()
            .unwrap()
            .iter()
            .map(|(&n, w)| (n, w.fd, w.entry.clone()))
            .collect();

        let mut fds: Vec<PollFd> = Vec::with_capacity(entries.len() + 1);
        fds.push(PollFd::new(shared.wake_read, PollFlags::POLLIN));
        for (_, fd, _) in &entries {
            fds.push(PollFd::new(*fd, PollFlags::POLLIN));
        }

        match poll(&mut fds, IDLE_TIMEOUT_MS) {
            Ok(0) => continue,
            Ok(_) => {}
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => {
                log::error!("event watcher poll failed: {e}");
                continue;
            }
        }

        if fds[0].revents().map_or(false, |r| r.contains(PollFlags::POLLIN)) {
            let mut drain = [0u8; 1024];
            let _ = read(shared.wake_read, &mut drain);
        }

        for (i, (n, _, weak_entry)) in entries.iter().enumerate() {
            let revents = match fds[i + 1].revents() {
                Some(r) => r,
                None => continue,
            };
            if !revents.contains(PollFlags::POLLIN) {
                continue;
            }
            match weak_entry.upgrade() {
                Some(entry) => entry.notify_poll(notifier.as_ref()),
                None => {
                    log::debug!("event fd for gpio{n} fired after its entry was dropped");
                }
            }
        }
    }
}
