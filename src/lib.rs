//! Cellar POS - terminal core for a wine & spirits point of sale.
//!
//! Every durable data operation is an HTTP call to the shop backend
//! ([`api`]); the terminal holds only ephemeral state (the active [`cart`],
//! the operator [`session`]) plus denormalized copies of server data the
//! host fetches and feeds to the pure computation modules ([`pricing`],
//! [`reports`], [`catalog`]). Terminal-local persistence is limited to
//! settings ([`db`], [`config`]) and secrets ([`storage`]).
//!
//! The host shell owns rendering and navigation. It fetches collections
//! through [`api::ApiClient`] (several fetches may run concurrently), then
//! invokes the computation modules on the materialized snapshots; those
//! never block, retry, or read clocks of their own.

pub mod access;
pub mod api;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod db;
pub mod models;
pub mod pricing;
pub mod reports;
pub mod session;
pub mod storage;
pub mod telemetry;

pub use access::{can_access, Feature, Role};
pub use cart::Cart;
pub use config::PosConfig;
pub use pricing::{price_cart, Discount, DiscountKind, PricingResult};
pub use reports::{aggregate_report, ReportSummary, TimeRange};
pub use session::SessionState;
