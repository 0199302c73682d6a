//! # royale-hub-core
//!
//! Session state, command dispatch and fan-out for the Royale live event hub.
//!
//! This crate provides the event pipeline:
//!
//! - **Lookup** - Read-only game tables (maps, classes, commands, gifts)
//! - **State** - Players, join queue and rolling event log
//! - **Dispatcher** - Turns inbound events into state changes and notifications
//! - **Broadcast** - Subscriber registry with ordered, non-blocking fan-out
//! - **Hub** - Ties the above into one serialized mutation stream
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Inbound   │────▶│ Dispatcher  │────▶│ Broadcaster │────▶ subscribers
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                       │         │
//!                       ▼         ▼
//!               ┌─────────────┐ ┌─────────────┐
//!               │   Lookup    │ │    State    │
//!               └─────────────┘ └─────────────┘
//! ```

pub mod broadcast;
pub mod command;
pub mod dispatcher;
pub mod hub;
pub mod lookup;
pub mod state;

pub use broadcast::{BroadcastError, Broadcaster, PublishReport, Subscription, SubscriptionId};
pub use command::{CommandKind, CommandTable, ParsedCommand};
pub use dispatcher::Dispatcher;
pub use hub::{Hub, HubConfig, HubStats, IngestReport};
pub use lookup::{gift_award, GameConfig, GiftEffect, LookupError};
pub use state::{Player, SessionStore};
