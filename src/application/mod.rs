//! Application layer - Services that drive the ports.

pub mod invoker;
pub mod transcoder;

pub use invoker::{EncodeHandle, EncodeInvoker};
pub use transcoder::{JobReceipt, JobTicket, TranscodeService};
