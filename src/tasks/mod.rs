//! Background Tasks Module
//!
//! Contains background tasks that run alongside a cache.
//!
//! # Tasks
//! - Expiration sweeper: removes expired entries when their deadline arrives

mod sweeper;

pub(crate) use sweeper::{spawn_sweeper, Sweeper};
