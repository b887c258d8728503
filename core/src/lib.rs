//! Core library for Inkpost, a markdown blog client that talks directly to
//! cloud storage with federated credentials.
//!
//! The crate is organized around a handful of seams:
//!
//! *   [`article`]: the domain model (articles, slugs, timestamps).
//! *   [`store`]: async traits for the remote article table and asset
//!     bucket, plus in-process implementations for tests and dry runs.
//! *   [`auth`]: the identity-broker seam and the shared credentials slot
//!     the write clients consult.
//! *   [`cache`], [`render`], [`markdown`]: the article cache, the typed
//!     HTML renderer, and the sanitizing markdown converter.
//! *   [`session`], [`state`]: the editor state machine and the reducer
//!     that owns every state transition.
//! *   [`client`]: [`client::BlogClient`], which wires all of the above
//!     into the load/publish/delete/upload flows.
//!
//! Concrete HTTP implementations of the store and broker traits live in the
//! `inkpost_remote` crate.

pub mod article;
pub mod auth;
pub mod cache;
pub mod client;
pub mod markdown;
pub mod render;
pub mod session;
pub mod state;
pub mod store;

pub use article::{Article, Slug, Timestamp};
pub use client::{BlogClient, ClientError};
