//! # SCL Editor
//!
//! Reversible editing of SCL documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: SCL text → Document arena           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ foundation: identities, locators, ordering  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: actions + history + session         │
//! │  - Build actions that capture positions     │
//! │  - Apply with validation                    │
//! │  - Undo through exact inverses              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scl_editor::{Delete, EditSession};
//!
//! let mut session = EditSession::new(scl_parser::parse(source)?);
//! let bay = session.document().query_selector("Bay")?.unwrap();
//!
//! let action = Delete::capture(session.document(), bay)?;
//! session.apply(action.into())?;
//! session.undo()?;
//! ```

mod action;
mod errors;
mod history;
mod session;

pub use action::{
    invert, invert_value, AttributeMap, Complex, Create, Delete, EditorAction, Move, Update,
};
pub use errors::{ActionError, ActionResult};
pub use history::{History, DEFAULT_MAX_LEVELS};
pub use session::{EditSession, PublisherSelection};
