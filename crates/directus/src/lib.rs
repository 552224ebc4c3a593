//! `storsync-directus` — Directus items API client for the storage
//! collection.
//!
//! Blocking reqwest client (no Tokio runtime required). Covers the full
//! reconciliation surface: chunked existence queries, a paginated
//! identifier scan, and batched create / update / delete with 503 retry.

pub mod client;

pub use client::{DirectusClient, DirectusConfig, DirectusError};
