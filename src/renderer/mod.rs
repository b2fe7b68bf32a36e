//! Render-pass plumbing and the outline passes built on it.
//!
//! Passes record backend-agnostic commands ([`command`]) against the host
//! contract in [`pass`] and [`frame`]; backends in [`crate::software`] and
//! [`crate::gpu`] turn those commands into pixels.

pub mod command;
pub mod filter;
pub mod frame;
pub mod material;
pub mod outline;
pub mod pass;
pub mod target;
pub mod temporary;
