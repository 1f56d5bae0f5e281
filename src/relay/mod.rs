pub mod dialect;
pub mod router;

pub use router::{relay_app, run_relay, RelayState};
