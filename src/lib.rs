//! Roster Identity
//!
//! Person ID resolution across a family of roster spreadsheets:
//! - Configured scan locations read from a settings table
//! - A master index of normalized names to canonical IDs
//! - Contiguous allocation above the highest ID seen anywhere
//! - Minimal delta writes back to the directory
//! - New member intake and community-prefixed IDs

pub mod config;
pub mod error;
pub mod identity;
pub mod services;
pub mod sheets;
pub mod utils;

// Re-exports for convenience
pub use config::{RuntimeConfig, SystemConfig};
pub use error::{IdentityError, Result};
pub use identity::{CanonicalId, IdAllocator, MasterIndex, NormalizedKey};
pub use services::IdentityService;
