//! Purpose: Bridge a host message channel to an AR object-placement engine.
//! Exports: `core` (commands, events, placement state, errors), `bridge`, `channel`,
//! `engine`, `catalog`, `observer`.
//! Role: Library behind the `arbridge` stdio host; hosts embed `bridge` directly.
//! Invariants: All bridge state lives in one actor per AR view; nothing is process-global.
pub mod bridge;
pub mod catalog;
pub mod channel;
pub mod core;
pub mod engine;
pub mod observer;
