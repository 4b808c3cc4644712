//! Command/response transport over a serial link.
//!
//! A [`Transport`] owns the link. A background thread decodes every incoming
//! byte, completes any caller waiting on that command and hands the frame to
//! a [`CommandRouter`] so unsolicited telemetry is processed too.

pub mod config;
pub mod error;
pub mod pending;
pub mod router;
pub mod stats;
pub mod transport;

pub use config::TransportConfig;
pub use error::{Result, TransportError};
pub use pending::{PendingRequest, PendingTable, Ticket};
pub use router::{CommandRouter, Handler};
pub use stats::{StatsSnapshot, TransportStats};
pub use transport::Transport;
