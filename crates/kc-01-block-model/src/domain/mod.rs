//! Domain layer for the block model

pub mod block;
pub mod body;
pub mod genesis;
pub mod header;
pub mod interlink;
pub mod merkle;
pub mod retarget;
pub mod target;
pub mod transaction;
