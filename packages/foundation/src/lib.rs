//! SCL foundation: element identities, identity-to-locator inversion,
//! canonical child ordering and subscriber/publisher resolution.

pub mod control_block;
pub mod error;
pub mod identity;
pub mod reference;
pub mod schema;
pub mod selector;

pub use control_block::{
    compare_names, control_block_tags, control_blocks_by_ied, find_control_blocks, find_fcdas,
    ControlBlockIndex, Publisher,
};
pub use error::{SchemaError, SchemaResult};
pub use identity::{identity, is_public, is_same, Identity};
pub use reference::get_reference;
pub use schema::{IdentityPolicy, SpecialRule, TagEntry, TagSchema};
pub use selector::{build_selector, locate, selector};
