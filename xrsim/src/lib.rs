//! The XR/AR access-network testbed.
//!
//! A [`Testbed`] wires the traffic sources of `xrsim-core` to one access
//! point and one downstream sink, and runs the discrete-event loop that
//! owns the simulated clock. Testbeds are described in YAML, see
//! [`config`].

pub mod config;
mod report;
mod testbed;

pub use self::{
    config::{AccessPointConfig, Config},
    report::{ClassReport, Report, SourceReport},
    testbed::Testbed,
};
