//! Data model for recording sessions and the navigation map.

pub mod event;
pub mod ids;
pub mod records;
