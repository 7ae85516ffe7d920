//! Runtime state tracked while a crawl is in progress.
//!
//! [`HostState`] holds everything scoped to a single host (politeness
//! delay, robots cache, domain-distress UTEMA, per-URL error/redirect
//! bookkeeping); [`Utema`] is the shared averaging primitive it and the
//! scorer both build on.

mod host_state;
mod utema;

pub use host_state::{HostState, UrlErrorState};
pub use utema::Utema;
