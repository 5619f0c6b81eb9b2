//! Value types stored in the catalog maps.
//!
//! None of these types carry their own key: the catalog maps them by key, so
//! identity is always the map key and two values with different fields under
//! the same key are the same entity. `PartialEq` compares fields only and is
//! meant for checking persisted state, not for locating entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// Media item
// =============================================================================

/// A playable media file, keyed by its file name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_number: Option<u32>,
    pub year: Option<i32>,
    pub duration_ms: u64,
    pub last_modified: DateTime<Utc>,
    pub play_count: u64,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl MediaItem {
    /// Creates an item titled after its key, with no tags and zero plays.
    pub fn new(key: &str, duration_ms: u64) -> Self {
        Self {
            title: key.to_string(),
            artist: None,
            album: None,
            track_number: None,
            year: None,
            duration_ms,
            last_modified: Utc::now(),
            play_count: 0,
            tags: BTreeSet::new(),
        }
    }

    /// Returns a copy with the changes applied and `last_modified` set to now.
    pub fn mutate(&self, change: MediaItemChange) -> Self {
        self.mutate_with_timestamp(change, true)
    }

    /// Returns a copy with the changes applied. When `update_timestamp` is
    /// false the original `last_modified` is kept.
    pub fn mutate_with_timestamp(&self, change: MediaItemChange, update_timestamp: bool) -> Self {
        let mut out = self.clone();
        if let Some(title) = change.title {
            out.title = title;
        }
        if let Some(artist) = change.artist {
            out.artist = artist;
        }
        if let Some(album) = change.album {
            out.album = album;
        }
        if let Some(track_number) = change.track_number {
            out.track_number = track_number;
        }
        if let Some(year) = change.year {
            out.year = year;
        }
        if let Some(duration_ms) = change.duration_ms {
            out.duration_ms = duration_ms;
        }
        if let Some(play_count) = change.play_count {
            out.play_count = play_count;
        }
        if let Some(tags) = change.tags {
            out.tags = tags;
        }
        if update_timestamp {
            out.last_modified = Utc::now();
        }
        out
    }

    /// Returns a copy with the play count incremented.
    pub fn record_play(&self) -> Self {
        self.mutate(MediaItemChange::default().play_count(self.play_count.saturating_add(1)))
    }

    pub fn has_tag(&self, tag_name: &str) -> bool {
        self.tags.contains(tag_name)
    }
}

/// The set of fields to replace in a [`MediaItem::mutate`] call.
///
/// Unset fields are left untouched. Optional fields take an `Option` so they
/// can be cleared.
#[derive(Clone, Debug, Default)]
pub struct MediaItemChange {
    title: Option<String>,
    artist: Option<Option<String>>,
    album: Option<Option<String>>,
    track_number: Option<Option<u32>>,
    year: Option<Option<i32>>,
    duration_ms: Option<u64>,
    play_count: Option<u64>,
    tags: Option<BTreeSet<String>>,
}

impl MediaItemChange {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn artist(mut self, artist: Option<String>) -> Self {
        self.artist = Some(artist);
        self
    }

    pub fn album(mut self, album: Option<String>) -> Self {
        self.album = Some(album);
        self
    }

    pub fn track_number(mut self, track_number: Option<u32>) -> Self {
        self.track_number = Some(track_number);
        self
    }

    pub fn year(mut self, year: Option<i32>) -> Self {
        self.year = Some(year);
        self
    }

    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn play_count(mut self, play_count: u64) -> Self {
        self.play_count = Some(play_count);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}

// =============================================================================
// Tag
// =============================================================================

/// A label that can be attached to media items, keyed by its name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Name of the [`TagType`] this tag belongs to, if any.
    pub tag_type: Option<String>,
    pub description: Option<String>,
}

impl Tag {
    /// Creates an untyped tag without description.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(tag_type: impl Into<String>) -> Self {
        Self {
            tag_type: Some(tag_type.into()),
            description: None,
        }
    }

    pub fn mutate(&self, change: TagChange) -> Self {
        let mut out = self.clone();
        if let Some(tag_type) = change.tag_type {
            out.tag_type = tag_type;
        }
        if let Some(description) = change.description {
            out.description = description;
        }
        out
    }
}

#[derive(Clone, Debug, Default)]
pub struct TagChange {
    tag_type: Option<Option<String>>,
    description: Option<Option<String>>,
}

impl TagChange {
    pub fn tag_type(mut self, tag_type: Option<String>) -> Self {
        self.tag_type = Some(tag_type);
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }
}

// =============================================================================
// Tag type
// =============================================================================

/// A category of tags, keyed by its name. The color is opaque to the catalog,
/// usually a packed RGB value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagType {
    pub color: i32,
}

impl TagType {
    pub fn new(color: i32) -> Self {
        Self { color }
    }

    pub fn mutate(&self, color: i32) -> Self {
        Self { color }
    }
}
