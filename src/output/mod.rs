//! Saved-entity collection persistence

mod collection;

pub use collection::SavedCollection;
