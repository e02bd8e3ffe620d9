//! Game of Life on a torus, split row-wise across a ring of workers.
//!
//! Each worker owns a band of rows plus one ghost row on each side. Every
//! generation it steps its band, refreshes its ghost rows from its ring
//! neighbours, and contributes its rows to a gather at the collector (group
//! rank 0). The collector answers frame requests from a display at its own
//! pace and relays the display's request to stop to the whole group.
//!
//! Workers run as tokio tasks that share nothing: all coordination is by
//! message over [`comm::Endpoint`]s.
//!
//! ```text
//!   display ──RequestFrame/Terminate──▶ collector (rank 0)
//!      ◀──────────── snapshot ─────────────┘
//!
//!   rank 0 ◀──halo──▶ rank 1 ◀──halo──▶ ... ◀──halo──▶ rank P-1
//!     ▲                                                    │
//!     └──────────────────────halo──────────────────────────┘
//! ```

pub mod bridge;
pub mod comm;
pub mod error;
pub mod gather;
pub mod grid;
pub mod halo;
pub mod pattern;
pub mod rule;
pub mod sim;

pub use bridge::{BridgeState, CollectorLink, DisplayLink, PollOutcome, Signal};
pub use error::{CommError, ConfigError, LifeError, Stage};
pub use gather::GatherPlan;
pub use grid::{GlobalGrid, GridDims, GridPartition, RowBand};
pub use pattern::Pattern;
pub use sim::{ComputeGroup, GroupReport, SimConfig, run_detached};
