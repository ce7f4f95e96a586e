//! Followup service library.
//!
//! Tracks shopping-cart state for abandoned-cart follow-up emails and
//! purchase-conversion recording. The service keeps a durable snapshot of
//! every identified visitor's cart, classifies snapshots as active or
//! abandoned, gates duplicate follow-up emails per cart state, and
//! attributes completed orders back to previously sent emails.
//!
//! The heavy lifting around it is deliberately external: the commerce
//! platform owns sessions, orders, and authentication; a separate scheduler
//! service owns email definitions and the send queue. This crate reacts to
//! lifecycle events relayed by the platform and talks to collaborators
//! through the trait seams in [`snapshot`], [`dedup`], [`scheduler`],
//! [`orders`], [`platform`], and [`sessions`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod abandonment;
pub mod attribution;
pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod models;
pub mod orders;
pub mod platform;
pub mod routes;
pub mod scheduler;
pub mod services;
pub mod sessions;
pub mod snapshot;
pub mod state;
