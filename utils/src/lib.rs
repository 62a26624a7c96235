//! Shared infrastructure utilities for Iadess.
//!
//! - **`atomic_write`**: crash-safe file persistence (temp + rename), used by
//!   the artifact repository.

pub mod atomic_write;

pub use atomic_write::{
    Durability, WriteOptions, atomic_write, atomic_write_with, ensure_parent_dir, recover_backup,
};
