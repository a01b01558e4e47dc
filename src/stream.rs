//! ## Stream
//!
//! Continuous acquisition on a worker thread, for live displays. Frames are
//! handed over through a bounded channel so a slow consumer throttles the scope.
//!

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::error::Error;
use crate::transport::Transport;
use crate::types::CalibratedFrame;
use crate::HantekScope;

/// ### Frame Stream
///
/// Owns a scope while its worker thread captures frames.
///
pub struct FrameStream<T: Transport + Send + 'static> {
    frames: Option<Receiver<Result<CalibratedFrame>>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<HantekScope<T>>>,
}

/// ### Spawn
///
/// Start capturing with the configuration last pushed to `scope`.
///
/// #### Arguments
/// - `scope` -> the configured scope, handed back by `FrameStream::stop`
/// - `depth` -> how many frames may wait in the channel
/// - `interval` -> pause between two captures
///
pub fn spawn<T: Transport + Send + 'static>(
    scope: HantekScope<T>,
    depth: usize,
    interval: Duration,
) -> FrameStream<T> {
    let (sender, frames) = mpsc::sync_channel(depth);
    let stop = Arc::new(AtomicBool::new(false));

    let worker = {
        let stop = stop.clone();
        thread::spawn(move || run(scope, sender, stop, interval))
    };

    FrameStream {
        frames: Some(frames),
        stop,
        worker: Some(worker),
    }
}

fn run<T: Transport>(
    mut scope: HantekScope<T>,
    sender: SyncSender<Result<CalibratedFrame>>,
    stop: Arc<AtomicBool>,
    interval: Duration,
) -> HantekScope<T> {
    while !stop.load(Ordering::Relaxed) {
        let frame = scope.get_data();

        // a timed out capture leaves the scope ready for the next one
        let fatal = match &frame {
            Ok(_) => false,
            Err(e) => !matches!(e.downcast_ref::<Error>(), Some(Error::Timeout)),
        };

        if sender.send(frame).is_err() || fatal {
            break;
        }

        thread::sleep(interval);
    }

    log::debug!("acquisition worker stopped");
    scope
}

impl<T: Transport + Send + 'static> FrameStream<T> {
    /// Wait for the next frame. `None` once the worker has stopped.
    pub fn recv(&self) -> Option<Result<CalibratedFrame>> {
        self.frames.as_ref()?.recv().ok()
    }

    /// Wait at most `timeout` for the next frame.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Result<CalibratedFrame>> {
        match self.frames.as_ref()?.recv_timeout(timeout) {
            Ok(frame) => Some(frame),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Next frame if one is waiting.
    pub fn try_recv(&self) -> Option<Result<CalibratedFrame>> {
        match self.frames.as_ref()?.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn shutdown(&mut self) -> Option<thread::Result<HantekScope<T>>> {
        self.stop.store(true, Ordering::Relaxed);
        // unblocks a worker waiting on a full channel
        self.frames.take();

        self.worker.take().map(JoinHandle::join)
    }

    /// ### Stop
    ///
    /// Stop capturing and take the scope back. Frames not yet received are dropped.
    ///
    pub fn stop(mut self) -> Result<HantekScope<T>> {
        match self.shutdown() {
            Some(Ok(scope)) => Ok(scope),
            Some(Err(_)) => Err(anyhow!("acquisition worker panicked")),
            None => Err(anyhow!("acquisition worker already stopped")),
        }
    }
}

impl<T: Transport + Send + 'static> Drop for FrameStream<T> {
    fn drop(&mut self) {
        // the scope is closed when the returned session drops
        self.shutdown();
    }
}
