//! Identity Module
//!
//! Person identity resolution: normalized name keys, canonical IDs, the
//! master index built from every source, ID allocation, and synchronization
//! of a target tab against the index.

pub mod allocator;
pub mod canonical;
pub mod community;
pub mod index;
pub mod key;
pub mod sequence;
pub mod sync;

pub use allocator::IdAllocator;
pub use canonical::{CanonicalId, IdScheme, DEFAULT_ID_WIDTH};
pub use community::CommunityAssigner;
pub use index::{IdentityIndexBuilder, MasterIndex, RowOutcome, ScanReport};
pub use key::{KeyPolicy, NormalizedKey};
pub use sequence::{SequenceStore, SqliteSequence};
pub use sync::{DirectorySynchronizer, IdChange, SyncPlan};
