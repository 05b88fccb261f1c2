//! Data types for the outreach controller.
//!
//! This crate contains the serde-serializable types exchanged between the
//! session controller, its persistence adapter, and the page-extraction layer.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization and small conveniences
//! * Collaborator-neutral: Nothing here knows about a browser or a database
//! * Stable: Record shapes change only when the persisted format changes
//!
//! Behavior (quota windows, pacing, the crawl loop) lives in `outreach-rs`.

pub mod candidate;
pub mod cookie;
pub mod criteria;
pub mod records;

pub use candidate::*;
pub use cookie::*;
pub use criteria::*;
pub use records::*;
