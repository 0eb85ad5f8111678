//! Interactive session loop and its transports.
//!
//! The loop is strictly sequential: read one framed request, update the
//! handler, write one framed response. The only suspension points are the
//! blocking read and the blocking write on the [`Link`].

mod driver;
mod link;
pub mod loopback;
mod serial;

pub use driver::{run_session, SessionEnd, SessionOutcome};
pub use link::{Link, LinkError, LinkRead};
pub use serial::SerialLink;
