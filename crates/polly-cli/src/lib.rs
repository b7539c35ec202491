//! Terminal front end for Polly: console output, input, the agent seam, the
//! per-phase driver and the session orchestrator.

pub mod agent;
pub mod console;
pub mod driver;
pub mod input;
pub mod orchestrator;
pub mod root;

#[cfg(test)]
mod testing;
