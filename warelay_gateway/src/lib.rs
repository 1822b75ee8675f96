//! Inbound message handling: validation, gating, and the reply pipeline.

pub mod console;
pub mod error;
pub mod message;
pub mod pipeline;
pub mod schedule;
pub mod status;
pub mod transport;

pub use error::{Error, Result};
pub use message::{InboundMessage, MessageContent};
pub use pipeline::{Outcome, PipelineConfig, ReplyPipeline};
pub use schedule::ScheduleGate;
pub use status::{DeliveryTracker, STATUS_READ};
pub use transport::{ConnectionEvent, TransportEvent, run_events};
