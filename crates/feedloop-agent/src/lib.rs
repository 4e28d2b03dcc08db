//! Edge-side capture agent for Feedloop.
//!
//! A single sequential loop: acquire a frame, publish a request, wait a
//! bounded time for the decision, actuate on a positive answer, sleep,
//! repeat. At most one request is in flight at any time.

pub mod actuator;
pub mod agent;
pub mod capture;

pub use actuator::{Actuator, HttpActuator};
pub use agent::{AgentState, CaptureAgent, CycleOutcome};
pub use capture::{FrameSource, HttpFrameSource, ImageRef};
