//! Shared constants for integration tests
//!
//! When the sample catalog changes, update only this file.

// ============================================================================
// Sample Items
// ============================================================================

/// Tagged rock and live
pub const ITEM_1: &str = "01 - Opening.flac";

/// Tagged jazz and chill
pub const ITEM_2: &str = "blue in green.mp3";

/// Tagged rock
pub const ITEM_3: &str = "closing.ogg";

// ============================================================================
// Sample Tags and Tag Types
// ============================================================================

pub const TAG_ROCK: &str = "rock";
pub const TAG_JAZZ: &str = "jazz";
pub const TAG_CHILL: &str = "chill";

/// Created untyped through an item
pub const TAG_LIVE: &str = "live";

pub const TYPE_GENRE: &str = "genre";
pub const TYPE_MOOD: &str = "mood";

pub const GENRE_COLOR: i32 = 0xff0000;
pub const MOOD_COLOR: i32 = 0x0000ff;
