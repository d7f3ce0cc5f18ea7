//! # Core Conversation Logic
//!
//! This module contains wikichat's controller: the message store, the
//! progress overlay, the scroll-follow machine and the reducer that ties
//! them together. It knows nothing about any specific UI technology.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • State (App)          │
//!                    │  • Action (events)      │
//!                    │  • update() (reducer)   │
//!                    │                         │
//!                    │  No I/O. No UI. Pure.   │
//!                    └───────────┬─────────────┘
//!                                │
//!              ┌─────────────────┴─────────────────┐
//!              ▼                                   ▼
//!       ┌────────────┐                      ┌────────────┐
//!       │    TUI     │                      │   stream   │
//!       │  Adapter   │◀──── Actions ────────│   pump     │
//!       │ (ratatui)  │                      │  (tokio)   │
//!       └────────────┘                      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`messages`]: turns and the message store
//! - [`progress`]: named progress sections shown while generating
//! - [`scroll`]: the scroll-follow state machine
//! - [`navigation`]: previous/next question pointer
//! - [`timers`]: delayed tasks scoped to a conversation
//! - [`state`]: the `App` struct, all controller state in one place
//! - [`action`]: the `Action` enum and `update()`
//! - [`config`]: layered configuration

pub mod action;
pub mod config;
pub mod messages;
pub mod navigation;
pub mod progress;
pub mod scroll;
pub mod state;
pub mod timers;
