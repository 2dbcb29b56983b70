use crossbeam::channel::{Receiver, TryRecvError, bounded};
use log::{debug, info};
use std::fmt;

use crate::source::{Producer, Readiness, SourceError, SourceKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    PermissionDenied,
    DeviceUnavailable(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "microphone access was denied"),
            Self::DeviceUnavailable(reason) => write!(f, "microphone unavailable: {reason}"),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Backend that can open and release the default audio input.
pub trait CaptureDevice {
    /// Ask for the input. The answer arrives on the returned channel.
    fn request(&mut self) -> Receiver<Result<(), CaptureError>>;

    /// Release the input. Releasing an idle device does nothing.
    fn release(&mut self);
}

/// Stand-in when no capture backend could be opened. Every request fails.
pub struct NoCapture {
    reason: String,
}

impl NoCapture {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl CaptureDevice for NoCapture {
    fn request(&mut self) -> Receiver<Result<(), CaptureError>> {
        let (tx, rx) = bounded(1);
        let _ = tx.send(Err(CaptureError::DeviceUnavailable(self.reason.clone())));
        rx
    }

    fn release(&mut self) {}
}

/// Result of polling a pending capture request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturePoll {
    Idle,
    Waiting,
    Granted,
    Failed(CaptureError),
}

/// Microphone input. Acquisition is asynchronous and polled.
pub struct MicSource {
    device: Box<dyn CaptureDevice>,
    pending: Option<Receiver<Result<(), CaptureError>>>,
    open: bool,
}

impl MicSource {
    pub fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device,
            pending: None,
            open: false,
        }
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Check the in-flight request without blocking.
    pub fn poll(&mut self) -> CapturePoll {
        let Some(rx) = self.pending.as_ref() else {
            return CapturePoll::Idle;
        };

        let outcome = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return CapturePoll::Waiting,
            Err(TryRecvError::Disconnected) => Err(CaptureError::DeviceUnavailable(
                "capture request was dropped".to_string(),
            )),
        };
        self.pending = None;

        match outcome {
            Ok(()) => {
                info!("Microphone opened");
                self.open = true;
                CapturePoll::Granted
            }
            Err(e) => CapturePoll::Failed(e),
        }
    }
}

impl Producer for MicSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Mic
    }

    fn start(&mut self) -> Result<Readiness, SourceError> {
        if self.open {
            return Ok(Readiness::Ready);
        }
        if self.pending.is_none() {
            debug!("Requesting microphone");
            self.pending = Some(self.device.request());
        }
        Ok(Readiness::Pending)
    }

    fn stop(&mut self) {
        if self.open || self.pending.is_some() {
            debug!("Releasing microphone");
            self.device.release();
        }
        self.pending = None;
        self.open = false;
    }

    fn is_live(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::Sender;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Calls {
        requests: usize,
        releases: usize,
        responders: Vec<Sender<Result<(), CaptureError>>>,
    }

    struct FakeDevice(Rc<RefCell<Calls>>);

    impl CaptureDevice for FakeDevice {
        fn request(&mut self) -> Receiver<Result<(), CaptureError>> {
            let (tx, rx) = bounded(1);
            let mut calls = self.0.borrow_mut();
            calls.requests += 1;
            calls.responders.push(tx);
            rx
        }

        fn release(&mut self) {
            self.0.borrow_mut().releases += 1;
        }
    }

    fn mic() -> (MicSource, Rc<RefCell<Calls>>) {
        let calls = Rc::new(RefCell::new(Calls::default()));
        (MicSource::new(Box::new(FakeDevice(Rc::clone(&calls)))), calls)
    }

    #[test]
    fn second_start_while_pending_is_ignored() {
        let (mut mic, calls) = mic();
        assert_eq!(mic.start(), Ok(Readiness::Pending));
        assert_eq!(mic.start(), Ok(Readiness::Pending));
        assert_eq!(calls.borrow().requests, 1);
        assert_eq!(mic.poll(), CapturePoll::Waiting);
    }

    #[test]
    fn grant_opens_the_device() {
        let (mut mic, calls) = mic();
        mic.start().unwrap();
        calls.borrow().responders[0].send(Ok(())).unwrap();

        assert_eq!(mic.poll(), CapturePoll::Granted);
        assert!(mic.is_live());
        assert_eq!(mic.start(), Ok(Readiness::Ready));
        assert_eq!(mic.poll(), CapturePoll::Idle);
    }

    #[test]
    fn denial_is_reported_once() {
        let (mut mic, calls) = mic();
        mic.start().unwrap();
        calls.borrow().responders[0]
            .send(Err(CaptureError::PermissionDenied))
            .unwrap();

        assert_eq!(
            mic.poll(),
            CapturePoll::Failed(CaptureError::PermissionDenied)
        );
        assert!(!mic.is_live());
        assert_eq!(mic.poll(), CapturePoll::Idle);
    }

    #[test]
    fn dropped_request_counts_as_unavailable() {
        let (mut mic, calls) = mic();
        mic.start().unwrap();
        calls.borrow_mut().responders.clear();

        assert!(matches!(
            mic.poll(),
            CapturePoll::Failed(CaptureError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn stop_releases_only_when_acquired() {
        let (mut mic, calls) = mic();
        mic.stop();
        assert_eq!(calls.borrow().releases, 0);

        mic.start().unwrap();
        calls.borrow().responders[0].send(Ok(())).unwrap();
        mic.poll();
        mic.stop();
        assert_eq!(calls.borrow().releases, 1);
        assert!(!mic.is_live());
    }

    #[test]
    fn no_capture_fails_every_request() {
        let mut mic = MicSource::new(Box::new(NoCapture::new("no backend")));
        mic.start().unwrap();

        assert_eq!(
            mic.poll(),
            CapturePoll::Failed(CaptureError::DeviceUnavailable("no backend".to_string()))
        );
    }
}
