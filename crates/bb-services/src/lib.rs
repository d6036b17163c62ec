//! # bb-services
//!
//! The business rules of the bill-board: the authorization/visibility
//! engine, the moderation workflow, the image lifecycle manager, the
//! listing presets and the small administrative collaborators. Everything
//! here is framework-free; adapters are injected through the `bb-core`
//! ports.

pub mod authz;
pub mod categories;
pub mod entries;
pub mod images;
pub mod listing;
pub mod moderation;
pub mod rules;

pub use categories::{CategoryDraft, CategoryService};
pub use entries::{EntryDraft, EntryService};
pub use images::{ImageService, MigrationReport, NewImageUpload};
pub use listing::EntryFilter;
pub use moderation::{
    BatchVisibilityAction, FlashMessage, MessageBag, MessageKind, ModerationService, NewComment,
};
pub use rules::{RulesStore, DEFAULT_RULES};
