//! Field-service portal core.
//!
//! Engineers see their assigned service calls split into three queues, move
//! calls through `assigned → in_progress → closed`, and review expense
//! submissions with exact per-month totals. Persistence sits behind the
//! [`store::FieldStore`] trait; [`db::Database`] is the SQLite implementation.

pub mod config;
pub mod db;
pub mod expenses;
pub mod lifecycle;
pub mod models;
pub mod portal;
pub mod queue;
pub mod snapshot;
pub mod store;
pub mod watch;
