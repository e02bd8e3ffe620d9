//! Handshake between the display and the compute group's collector.
//!
//! The display asks for a frame and blocks until it arrives. The collector
//! only ever probes for a pending signal after each gather, so the
//! simulation never waits on the display and every frame served is the most
//! recent completed generation.

use crate::comm::{BRIDGE_TAGS, Endpoint, Fabric, Rank, Tag};
use crate::error::CommError;
use crate::grid::{GlobalGrid, GridDims};
use tracing::{debug, trace};

pub const DISPLAY_RANK: Rank = 0;
pub const COLLECTOR_RANK: Rank = 1;

/// Control token sent by the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    RequestFrame,
    Terminate,
}

impl Signal {
    pub fn code(self) -> i32 {
        match self {
            Signal::RequestFrame => 1,
            Signal::Terminate => -1,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, CommError> {
        match code {
            1 => Ok(Signal::RequestFrame),
            -1 => Ok(Signal::Terminate),
            other => Err(CommError::UnknownSignal(other)),
        }
    }

    fn encode(self) -> Vec<u8> {
        self.code().to_le_bytes().to_vec()
    }

    fn decode(payload: &[u8]) -> Result<Self, CommError> {
        let bytes: [u8; 4] = payload.try_into().map_err(|_| CommError::Malformed {
            rank: DISPLAY_RANK,
            tag: Tag::Control,
            expected: 4,
            got: payload.len(),
        })?;
        Self::from_code(i32::from_le_bytes(bytes))
    }
}

/// Collector side of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    AwaitingSignal,
    Serving,
    Terminated,
}

/// Result of one non-blocking poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// No signal was pending.
    NoSignal,
    /// A frame request was pending and the snapshot was sent.
    Served,
    /// The display asked the group to stop.
    Terminated,
}

/// Build the connected display and collector ends.
pub fn connect(dims: GridDims) -> (DisplayLink, CollectorLink) {
    let mut endpoints = Fabric::connect(2, BRIDGE_TAGS);
    let collector = endpoints.remove(COLLECTOR_RANK);
    let display = endpoints.remove(DISPLAY_RANK);
    (
        DisplayLink {
            link: display,
            dims,
            terminated: false,
            frames: 0,
        },
        CollectorLink {
            link: collector,
            state: BridgeState::Idle,
            served: 0,
        },
    )
}

#[derive(Debug)]
pub struct CollectorLink {
    link: Endpoint,
    state: BridgeState,
    served: u64,
}

impl CollectorLink {
    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn frames_served(&self) -> u64 {
        self.served
    }

    /// Check for a pending signal without waiting and answer it with
    /// `snapshot`.
    pub fn poll(&mut self, snapshot: &GlobalGrid) -> Result<PollOutcome, CommError> {
        if self.state == BridgeState::Terminated {
            return Ok(PollOutcome::Terminated);
        }

        self.state = BridgeState::AwaitingSignal;
        let Some(payload) = self.link.try_recv(DISPLAY_RANK, Tag::Control)? else {
            self.state = BridgeState::Idle;
            return Ok(PollOutcome::NoSignal);
        };
        self.answer(&payload, snapshot)
    }

    /// Wait for the display's next signal and answer it with `snapshot`.
    ///
    /// Called once the group has stopped on its own, so a display that has
    /// not asked yet still gets the last generation instead of a lost peer.
    pub async fn serve_last(&mut self, snapshot: &GlobalGrid) -> Result<PollOutcome, CommError> {
        if self.state == BridgeState::Terminated {
            return Ok(PollOutcome::Terminated);
        }

        self.state = BridgeState::AwaitingSignal;
        match self.link.recv(DISPLAY_RANK, Tag::Control).await {
            Ok(payload) => self.answer(&payload, snapshot),
            Err(CommError::PeerGone { .. }) => {
                debug!("Display left before the last frame");
                self.state = BridgeState::Terminated;
                Ok(PollOutcome::Terminated)
            }
            Err(err) => Err(err),
        }
    }

    fn answer(&mut self, payload: &[u8], snapshot: &GlobalGrid) -> Result<PollOutcome, CommError> {
        match Signal::decode(payload)? {
            Signal::RequestFrame => {
                self.state = BridgeState::Serving;
                self.link
                    .send(DISPLAY_RANK, Tag::Snapshot, snapshot.cells().to_vec())?;
                self.served += 1;
                trace!(frame = self.served, "Served snapshot to display");
                self.state = BridgeState::Idle;
                Ok(PollOutcome::Served)
            }
            Signal::Terminate => {
                debug!("Display requested termination");
                self.state = BridgeState::Terminated;
                Ok(PollOutcome::Terminated)
            }
        }
    }
}

/// Display side of the handshake.
///
/// Sends `Terminate` when dropped, so every exit path of the display
/// releases the compute group.
#[derive(Debug)]
pub struct DisplayLink {
    link: Endpoint,
    dims: GridDims,
    terminated: bool,
    frames: u64,
}

impl DisplayLink {
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn frames_received(&self) -> u64 {
        self.frames
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Ask for the latest generation and block until it arrives.
    ///
    /// Must not be called from inside the async runtime.
    pub fn request_frame(&mut self) -> Result<GlobalGrid, CommError> {
        if self.terminated {
            return Err(CommError::BridgeClosed);
        }
        self.link
            .send(COLLECTOR_RANK, Tag::Control, Signal::RequestFrame.encode())?;

        let cells = self.link.blocking_recv(COLLECTOR_RANK, Tag::Snapshot)?;
        let got = cells.len();
        let grid = GlobalGrid::from_cells(self.dims, cells).ok_or(CommError::Malformed {
            rank: COLLECTOR_RANK,
            tag: Tag::Snapshot,
            expected: self.dims.cell_count(),
            got,
        })?;
        self.frames += 1;
        Ok(grid)
    }

    /// Tell the group to stop. Later calls do nothing.
    pub fn terminate(&mut self) -> Result<(), CommError> {
        if self.terminated {
            return Ok(());
        }
        self.terminated = true;
        self.link
            .send(COLLECTOR_RANK, Tag::Control, Signal::Terminate.encode())
    }
}

impl Drop for DisplayLink {
    fn drop(&mut self) {
        // The group may already have stopped on its own.
        let _ = self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(dims: GridDims, fill: u8) -> GlobalGrid {
        GlobalGrid::from_cells(dims, vec![fill; dims.cell_count()]).unwrap()
    }

    #[test]
    fn test_signal_codes() {
        assert_eq!(Signal::RequestFrame.code(), 1);
        assert_eq!(Signal::Terminate.code(), -1);
        assert_eq!(Signal::from_code(-1).unwrap(), Signal::Terminate);
        assert_eq!(Signal::from_code(0), Err(CommError::UnknownSignal(0)));
        assert!(Signal::decode(&[1, 0]).is_err());
    }

    #[test]
    fn test_poll_without_signal_does_not_block() {
        let dims = GridDims::new(2, 2).unwrap();
        let (_display, mut collector) = connect(dims);

        assert_eq!(collector.poll(&grid(dims, 0)).unwrap(), PollOutcome::NoSignal);
        assert_eq!(collector.state(), BridgeState::Idle);
        assert_eq!(collector.frames_served(), 0);
    }

    #[test]
    fn test_request_is_answered_once() {
        let dims = GridDims::new(2, 2).unwrap();
        let (mut display, mut collector) = connect(dims);

        let handle = std::thread::spawn(move || {
            let frame = display.request_frame().unwrap();
            (display, frame)
        });

        // Keep advancing "generations" until the request shows up.
        let mut generation = 0u8;
        loop {
            generation = generation.wrapping_add(1);
            if collector.poll(&grid(dims, generation % 2)).unwrap() == PollOutcome::Served {
                break;
            }
            std::thread::yield_now();
        }
        let (display, frame) = handle.join().unwrap();

        assert_eq!(frame.cells(), vec![generation % 2; 4].as_slice());
        assert_eq!(display.frames_received(), 1);
        assert_eq!(collector.poll(&grid(dims, 0)).unwrap(), PollOutcome::NoSignal);
        assert_eq!(collector.frames_served(), 1);
    }

    #[test]
    fn test_drop_sends_terminate() {
        let dims = GridDims::new(2, 2).unwrap();
        let (display, mut collector) = connect(dims);
        drop(display);

        assert_eq!(collector.poll(&grid(dims, 0)).unwrap(), PollOutcome::Terminated);
        assert_eq!(collector.state(), BridgeState::Terminated);
        // Sticky, even though the display endpoint is gone.
        assert_eq!(collector.poll(&grid(dims, 0)).unwrap(), PollOutcome::Terminated);
    }

    #[tokio::test]
    async fn test_serve_last_waits_for_a_late_request() {
        let dims = GridDims::new(2, 2).unwrap();
        let (display, mut collector) = connect(dims);

        let handle = tokio::task::spawn_blocking(move || {
            let mut display = display;
            std::thread::sleep(std::time::Duration::from_millis(20));
            display.request_frame()
        });

        let outcome = collector.serve_last(&grid(dims, 1)).await.unwrap();
        assert_eq!(outcome, PollOutcome::Served);
        assert_eq!(handle.await.unwrap().unwrap().population(), 4);
        assert_eq!(collector.frames_served(), 1);
    }

    #[tokio::test]
    async fn test_serve_last_ends_when_display_leaves() {
        let dims = GridDims::new(2, 2).unwrap();
        let (display, mut collector) = connect(dims);
        drop(display);

        assert_eq!(collector.serve_last(&grid(dims, 1)).await.unwrap(), PollOutcome::Terminated);
        assert_eq!(collector.frames_served(), 0);
    }

    #[test]
    fn test_requests_after_terminate_fail() {
        let dims = GridDims::new(2, 2).unwrap();
        let (mut display, _collector) = connect(dims);
        display.terminate().unwrap();
        display.terminate().unwrap();
        assert_eq!(display.request_frame().unwrap_err(), CommError::BridgeClosed);
    }

    #[test]
    fn test_display_sees_vanished_collector() {
        let dims = GridDims::new(2, 2).unwrap();
        let (mut display, collector) = connect(dims);
        drop(collector);
        assert!(matches!(
            display.request_frame(),
            Err(CommError::PeerGone { rank: COLLECTOR_RANK, .. })
        ));
    }
}
