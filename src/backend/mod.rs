//! Backend abstraction for executing workload commands.
//!
//! A trial talks to exactly one `BackendHandle`:
//! - `DirectHandle` runs routines in the current process (the "host" baseline).
//! - `IsolatedRuntimeHandle` forwards commands across an isolation boundary to a
//!   runtime produced by an injected `RuntimeLoader`.
//!
//! `ProcessLoader` is the production loader (one worker process per image);
//! `MockLoader` records lifecycle events for tests.

pub mod direct;
pub mod isolated;
pub mod mock;
pub mod process;
pub mod traits;

// Re-export key types
pub use direct::DirectHandle;
pub use isolated::IsolatedRuntimeHandle;
pub use mock::{MockConfig, MockEvent, MockLoader};
pub use process::ProcessLoader;
pub use traits::{BackendHandle, HandleState, LoadedRuntime, RuntimeLoader};
