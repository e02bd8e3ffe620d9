//! In-process message transport between ranks.
//!
//! Every rank owns an [`Endpoint`]. A [`Fabric`] wires one unbounded channel
//! per `(source, destination, tag)` triple, so messages on different tags or
//! from different peers never interleave, and a rank may send to itself
//! (the one-worker ring is its own predecessor and successor).
//!
//! Nothing is shared between endpoints: payloads are moved across channels
//! as owned byte vectors.

use crate::error::CommError;
use std::collections::HashMap;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub type Rank = usize;

/// Logical sub-channel of a communicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// A partition's first real row, travelling to its predecessor.
    HaloUp,
    /// A partition's last real row, travelling to its successor.
    HaloDown,
    /// Contribution length, sent once to the collector.
    GatherCount,
    /// Live rows of one partition for the current generation.
    GatherData,
    /// Continue/halt decision broadcast by the collector.
    Verdict,
    /// Display to collector control token.
    Control,
    /// Collector to display grid snapshot.
    Snapshot,
}

/// Channels used inside the worker group.
pub const GROUP_TAGS: &[Tag] = &[
    Tag::HaloUp,
    Tag::HaloDown,
    Tag::GatherCount,
    Tag::GatherData,
    Tag::Verdict,
];

/// Channels used between the display and the collector.
pub const BRIDGE_TAGS: &[Tag] = &[Tag::Control, Tag::Snapshot];

pub struct Fabric;

impl Fabric {
    /// Build fully connected endpoints for `size` ranks over `tags`.
    pub fn connect(size: usize, tags: &[Tag]) -> Vec<Endpoint> {
        let mut endpoints: Vec<Endpoint> = (0..size)
            .map(|rank| Endpoint {
                rank,
                size,
                outboxes: HashMap::new(),
                inboxes: HashMap::new(),
            })
            .collect();

        for src in 0..size {
            for dest in 0..size {
                for &tag in tags {
                    let (tx, rx) = mpsc::unbounded_channel();
                    endpoints[src].outboxes.insert((dest, tag), tx);
                    endpoints[dest].inboxes.insert((src, tag), rx);
                }
            }
        }
        endpoints
    }
}

/// One rank's view of a communicator.
pub struct Endpoint {
    rank: Rank,
    size: usize,
    outboxes: HashMap<(Rank, Tag), UnboundedSender<Vec<u8>>>,
    inboxes: HashMap<(Rank, Tag), UnboundedReceiver<Vec<u8>>>,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .field("channels", &self.inboxes.len())
            .finish()
    }
}

impl Endpoint {
    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Ring neighbour above this rank.
    pub fn predecessor(&self) -> Rank {
        (self.rank + self.size - 1) % self.size
    }

    /// Ring neighbour below this rank.
    pub fn successor(&self) -> Rank {
        (self.rank + 1) % self.size
    }

    /// Hand `payload` to the transport. Never waits for the receiver.
    pub fn send(&self, dest: Rank, tag: Tag, payload: Vec<u8>) -> Result<(), CommError> {
        let outbox = self.outboxes.get(&(dest, tag)).ok_or(CommError::NoRoute {
            from: self.rank,
            to: dest,
            tag,
        })?;
        outbox
            .send(payload)
            .map_err(|_| CommError::PeerGone { rank: dest, tag })
    }

    /// Wait for the next message from `src` on `tag`.
    pub async fn recv(&mut self, src: Rank, tag: Tag) -> Result<Vec<u8>, CommError> {
        self.inbox(src, tag)?
            .recv()
            .await
            .ok_or(CommError::PeerGone { rank: src, tag })
    }

    /// Consume a pending message if there is one; `Ok(None)` when nothing is
    /// waiting.
    pub fn try_recv(&mut self, src: Rank, tag: Tag) -> Result<Option<Vec<u8>>, CommError> {
        match self.inbox(src, tag)?.try_recv() {
            Ok(payload) => Ok(Some(payload)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(CommError::PeerGone { rank: src, tag }),
        }
    }

    /// Blocking receive for callers outside the async runtime.
    ///
    /// Panics if called from within an async context, like
    /// [`UnboundedReceiver::blocking_recv`].
    pub fn blocking_recv(&mut self, src: Rank, tag: Tag) -> Result<Vec<u8>, CommError> {
        self.inbox(src, tag)?
            .blocking_recv()
            .ok_or(CommError::PeerGone { rank: src, tag })
    }

    /// Root sends `payload` to every other rank; everyone returns the root's
    /// payload.
    pub async fn broadcast(
        &mut self,
        root: Rank,
        tag: Tag,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, CommError> {
        if self.rank == root {
            for dest in (0..self.size).filter(|&dest| dest != root) {
                self.send(dest, tag, payload.clone())?;
            }
            Ok(payload)
        } else {
            self.recv(root, tag).await
        }
    }

    fn inbox(&mut self, src: Rank, tag: Tag) -> Result<&mut UnboundedReceiver<Vec<u8>>, CommError> {
        let to = self.rank;
        self.inboxes.get_mut(&(src, tag)).ok_or(CommError::NoRoute {
            from: src,
            to,
            tag,
        })
    }
}

/// Encode a length as a fixed-width little-endian word.
pub fn encode_len(len: usize) -> Vec<u8> {
    (len as u64).to_le_bytes().to_vec()
}

pub fn decode_len(src: Rank, tag: Tag, payload: &[u8]) -> Result<usize, CommError> {
    let bytes: [u8; 8] = payload.try_into().map_err(|_| CommError::Malformed {
        rank: src,
        tag,
        expected: 8,
        got: payload.len(),
    })?;
    Ok(u64::from_le_bytes(bytes) as usize)
}
