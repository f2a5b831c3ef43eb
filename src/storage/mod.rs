//! Chirp Storage Module
//!
//! Implements the in-memory post store shared by every worker.
//!
//! ## Core Concepts
//! - **Single Lock**: All operations go through one mutex, so "allocate the next ID and
//!   insert" can never interleave with another writer.
//! - **ID Allocation**: The next ID is the current maximum plus one (or `0` for an empty
//!   store). Deleting the highest post frees its ID again; gaps are never back-filled.
//! - **Seeding**: A `chirps.json` file in the document root is loaded once at startup.
//!   Nothing is written back to disk.

pub mod memory;
pub mod types;
