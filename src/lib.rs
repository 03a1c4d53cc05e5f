#![allow(clippy::arithmetic_side_effects)]
#![warn(missing_docs)]
#![cfg_attr(not(test), no_std)]

//! A stable-curve anchor pool fused with a collateralized synthetic-asset
//! engine for the casper blockchain.

pub mod curve;
pub mod error;
pub mod events;
pub mod guard;
pub mod interest;
pub mod interfaces;
pub mod liquidation;
pub mod math;
pub mod oracle;
pub mod processor;
pub mod state;
pub mod token;

extern crate alloc;
