//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger → server stops accepting
//!         → in-flight responses finish → tasks.rs drains cache writes → exit
//!
//! Background work (tasks.rs):
//!     pipeline spawns cache population → BackgroundTask handle
//!         → BackgroundTasks registry (server) or awaited directly (tests)
//! ```
//!
//! # Design Decisions
//! - Background tasks are spawned immediately; tracking them is optional
//! - Draining has a deadline: forced exit after it

pub mod shutdown;
pub mod tasks;

pub use shutdown::{wait_for_signal, Shutdown};
pub use tasks::{BackgroundTask, BackgroundTasks};
