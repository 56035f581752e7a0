//! YD Envelope - red envelope lottery
//!
//! A sender deposits an amount split into a fixed number of shares. Each account may
//! claim one share per round, either an equal slice or a random one. The final claim
//! always takes whatever is left, so a fully claimed round pays out exactly its deposit.

pub mod error;
pub mod envelope;

pub use error::{EnvelopeError, EnvelopeResult};
pub use envelope::{EnvelopeEvent, GrabInfo, RedEnvelope};
