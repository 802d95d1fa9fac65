//! Emporium Storefront engine.
//!
//! The stateful core of the storefront: a stock-aware, identity-scoped
//! shopping cart and the delivery pricing rules that turn a cart into a
//! payable total.
//!
//! # Architecture
//!
//! - [`pricing`] - Delivery zones, time slots, express policy and tier discounts
//! - [`delivery`] - Pure fee / free-delivery-progress computation plus a
//!   service that prefers the remote API and falls back to local rules
//! - [`cart`] - The cart state machine, persistence backends and events
//! - [`checkout`] - Final stock re-validation and order totals
//! - [`api`] - `reqwest` clients for the delivery and product endpoints
//!
//! Everything is passed in explicitly: the active [`Identity`], the
//! persistence backend and the remote collaborators are constructor
//! arguments, never ambient globals.
//!
//! [`Identity`]: emporium_core::Identity

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
#[cfg(feature = "postgres")]
pub mod db;
pub mod delivery;
pub mod error;
pub mod models;
pub mod pricing;
pub mod telemetry;

pub use error::{Error, Result};
