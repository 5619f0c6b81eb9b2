//! Whole-catalog state held in memory, and the cascade rules applied to it.
//!
//! `CatalogState` is shared by the write-back cache and by the stores that
//! keep their data as a single document, so that both sides of a commit
//! apply exactly the same rules to the same operation.

use super::events::CatalogEvent;
use super::is_blank;
use super::models::{MediaItem, Tag, TagType};
use crate::store::UpdateOp;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogState {
    pub version: String,
    pub default_tag_type: TagType,
    #[serde(default)]
    pub items: BTreeMap<String, MediaItem>,
    #[serde(default)]
    pub tags: BTreeMap<String, Tag>,
    #[serde(default)]
    pub tag_types: BTreeMap<String, TagType>,
    #[serde(default)]
    pub extra_data: BTreeMap<String, String>,
}

impl CatalogState {
    /// Creates an empty catalog state.
    pub fn new(version: impl Into<String>, default_tag_type: TagType) -> Self {
        Self {
            version: version.into(),
            default_tag_type,
            items: BTreeMap::new(),
            tags: BTreeMap::new(),
            tag_types: BTreeMap::new(),
            extra_data: BTreeMap::new(),
        }
    }

    /// Applies one operation with its cascades and returns the resulting
    /// events. Operations with a blank key and removals of missing keys
    /// change nothing and return no events.
    pub fn apply(&mut self, op: &UpdateOp) -> Vec<CatalogEvent> {
        let mut events = Vec::new();
        match op {
            UpdateOp::SetDefaultTagType(tag_type) => {
                self.default_tag_type = *tag_type;
                events.push(CatalogEvent::DefaultTagTypeChanged(*tag_type));
            }
            UpdateOp::PutItem { key, item } => {
                if is_blank(key) {
                    return events;
                }
                let item = normalize_item(item.clone());
                for tag_name in item.tags.iter() {
                    if !self.tags.contains_key(tag_name) {
                        self.tags.insert(tag_name.clone(), Tag::new());
                        events.push(CatalogEvent::TagPut {
                            name: tag_name.clone(),
                        });
                    }
                }
                self.items.insert(key.clone(), item);
                events.push(CatalogEvent::ItemPut { key: key.clone() });
            }
            UpdateOp::RemoveItem { key } => {
                if self.items.remove(key).is_some() {
                    events.push(CatalogEvent::ItemRemoved { key: key.clone() });
                }
            }
            UpdateOp::PutTag { name, tag } => {
                if is_blank(name) {
                    return events;
                }
                let tag = normalize_tag(tag.clone());
                if let Some(type_name) = &tag.tag_type {
                    if !self.tag_types.contains_key(type_name) {
                        self.tag_types
                            .insert(type_name.clone(), self.default_tag_type);
                        events.push(CatalogEvent::TagTypePut {
                            name: type_name.clone(),
                        });
                    }
                }
                self.tags.insert(name.clone(), tag);
                events.push(CatalogEvent::TagPut { name: name.clone() });
            }
            UpdateOp::RemoveTag { name } => {
                if self.tags.remove(name).is_none() {
                    return events;
                }
                for (key, item) in self.items.iter_mut() {
                    if item.tags.remove(name) {
                        events.push(CatalogEvent::ItemTagDetached {
                            key: key.clone(),
                            tag: name.clone(),
                        });
                    }
                }
                // primary event last, after its cascades
                events.push(CatalogEvent::TagRemoved { name: name.clone() });
            }
            UpdateOp::PutTagType { name, tag_type } => {
                if is_blank(name) {
                    return events;
                }
                self.tag_types.insert(name.clone(), *tag_type);
                events.push(CatalogEvent::TagTypePut { name: name.clone() });
            }
            UpdateOp::RemoveTagType { name } => {
                if self.tag_types.remove(name).is_none() {
                    return events;
                }
                for (tag_name, tag) in self.tags.iter_mut() {
                    if tag.tag_type.as_deref() == Some(name.as_str()) {
                        tag.tag_type = None;
                        events.push(CatalogEvent::TagDetyped {
                            name: tag_name.clone(),
                            tag_type: name.clone(),
                        });
                    }
                }
                events.push(CatalogEvent::TagTypeRemoved { name: name.clone() });
            }
            UpdateOp::PutExtra { key, value } => {
                if is_blank(key) {
                    return events;
                }
                self.extra_data.insert(key.clone(), value.clone());
                events.push(CatalogEvent::ExtraPut { key: key.clone() });
            }
            UpdateOp::RemoveExtra { key } => {
                if self.extra_data.remove(key).is_some() {
                    events.push(CatalogEvent::ExtraRemoved { key: key.clone() });
                }
            }
        }
        events
    }

    /// Applies every operation of a batch in order.
    pub fn apply_all<'a, I>(&mut self, ops: I) -> Vec<CatalogEvent>
    where
        I: IntoIterator<Item = &'a UpdateOp>,
    {
        ops.into_iter().flat_map(|op| self.apply(op)).collect()
    }

    /// Lists referential-integrity violations, an empty list means the state
    /// is consistent.
    pub fn integrity_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (key, item) in self.items.iter() {
            for tag_name in item.tags.iter() {
                if !self.tags.contains_key(tag_name) {
                    problems.push(format!("item '{}' references missing tag '{}'", key, tag_name));
                }
            }
        }
        for (name, tag) in self.tags.iter() {
            if let Some(type_name) = &tag.tag_type {
                if !self.tag_types.contains_key(type_name) {
                    problems.push(format!(
                        "tag '{}' references missing tag type '{}'",
                        name, type_name
                    ));
                }
            }
        }
        problems
    }
}

/// Drops blank tag names from an item's tag set.
pub(crate) fn normalize_item(mut item: MediaItem) -> MediaItem {
    item.tags.retain(|name| !is_blank(name));
    item
}

/// Turns a blank tag type into no tag type.
pub(crate) fn normalize_tag(mut tag: Tag) -> Tag {
    if tag.tag_type.as_deref().is_some_and(is_blank) {
        tag.tag_type = None;
    }
    tag
}

/// Items whose tags contain all of `include` and none of `exclude`.
pub fn filter_items_by_tags<'a, I>(
    items: I,
    include: &BTreeSet<String>,
    exclude: &BTreeSet<String>,
) -> BTreeMap<String, MediaItem>
where
    I: IntoIterator<Item = (&'a String, &'a MediaItem)>,
{
    items
        .into_iter()
        .filter(|(_, item)| item.tags.is_superset(include) && item.tags.is_disjoint(exclude))
        .map(|(key, item)| (key.clone(), item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MediaItemChange;

    fn tagged_item(key: &str, tags: &[&str]) -> UpdateOp {
        UpdateOp::PutItem {
            key: key.to_string(),
            item: MediaItem::new(key, 1000).mutate(MediaItemChange::default().tags(tags.iter().copied())),
        }
    }

    fn make_state() -> CatalogState {
        CatalogState::new("1", TagType::new(0x112233))
    }

    #[test]
    fn test_put_tag_creates_missing_tag_type_from_default() {
        let mut state = make_state();
        let events = state.apply(&UpdateOp::PutTag {
            name: "rock".to_string(),
            tag: Tag::with_type("genre"),
        });

        assert_eq!(state.tag_types.get("genre"), Some(&TagType::new(0x112233)));
        assert_eq!(
            events,
            vec![
                CatalogEvent::TagTypePut {
                    name: "genre".to_string()
                },
                CatalogEvent::TagPut {
                    name: "rock".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_put_tag_keeps_existing_tag_type() {
        let mut state = make_state();
        state.apply(&UpdateOp::PutTagType {
            name: "genre".to_string(),
            tag_type: TagType::new(7),
        });
        state.apply(&UpdateOp::PutTag {
            name: "rock".to_string(),
            tag: Tag::with_type("genre"),
        });
        assert_eq!(state.tag_types.get("genre"), Some(&TagType::new(7)));
    }

    #[test]
    fn test_put_item_creates_missing_tags() {
        let mut state = make_state();
        state.apply(&tagged_item("a.mp3", &["rock", " "]));

        assert_eq!(state.tags.get("rock"), Some(&Tag::new()));
        let item = state.items.get("a.mp3").unwrap();
        assert_eq!(item.tags.len(), 1);
        assert!(state.integrity_problems().is_empty());
    }

    #[test]
    fn test_remove_tag_detaches_from_items_without_touching_timestamp() {
        let mut state = make_state();
        state.apply(&tagged_item("a.mp3", &["rock", "live"]));
        state.apply(&tagged_item("b.mp3", &["rock"]));
        state.apply(&tagged_item("c.mp3", &["jazz"]));
        let before = state.items.get("a.mp3").unwrap().last_modified;

        let events = state.apply(&UpdateOp::RemoveTag {
            name: "rock".to_string(),
        });

        assert!(!state.tags.contains_key("rock"));
        assert_eq!(state.items.len(), 3);
        let a = state.items.get("a.mp3").unwrap();
        assert!(!a.has_tag("rock"));
        assert!(a.has_tag("live"));
        assert_eq!(a.last_modified, before);
        assert!(!state.items.get("b.mp3").unwrap().has_tag("rock"));
        assert!(state.items.get("c.mp3").unwrap().has_tag("jazz"));
        assert_eq!(events.len(), 3);
        assert_eq!(
            events.last(),
            Some(&CatalogEvent::TagRemoved {
                name: "rock".to_string()
            })
        );
    }

    #[test]
    fn test_remove_tag_type_detypes_tags() {
        let mut state = make_state();
        state.apply(&UpdateOp::PutTag {
            name: "rock".to_string(),
            tag: Tag::with_type("genre"),
        });
        state.apply(&UpdateOp::PutTag {
            name: "2020".to_string(),
            tag: Tag::with_type("year"),
        });

        state.apply(&UpdateOp::RemoveTagType {
            name: "genre".to_string(),
        });

        assert!(!state.tag_types.contains_key("genre"));
        assert_eq!(state.tags.get("rock"), Some(&Tag::new()));
        assert_eq!(
            state.tags.get("2020").unwrap().tag_type.as_deref(),
            Some("year")
        );
    }

    #[test]
    fn test_removals_of_missing_keys_are_silent() {
        let mut state = make_state();
        let snapshot = state.clone();
        assert!(state
            .apply(&UpdateOp::RemoveItem {
                key: "missing".to_string()
            })
            .is_empty());
        assert!(state
            .apply(&UpdateOp::RemoveTag {
                name: "missing".to_string()
            })
            .is_empty());
        assert!(state
            .apply(&UpdateOp::RemoveTagType {
                name: "missing".to_string()
            })
            .is_empty());
        assert_eq!(state, snapshot);
    }

    #[test]
    fn test_blank_keys_are_ignored() {
        let mut state = make_state();
        state.apply(&tagged_item("  ", &["rock"]));
        state.apply(&UpdateOp::PutTagType {
            name: "".to_string(),
            tag_type: TagType::new(1),
        });
        assert!(state.items.is_empty());
        assert!(state.tags.is_empty());
        assert!(state.tag_types.is_empty());
    }

    #[test]
    fn test_default_tag_type_change_does_not_touch_existing_types() {
        let mut state = make_state();
        state.apply(&UpdateOp::PutTag {
            name: "rock".to_string(),
            tag: Tag::with_type("genre"),
        });
        state.apply(&UpdateOp::SetDefaultTagType(TagType::new(99)));
        state.apply(&UpdateOp::PutTag {
            name: "sad".to_string(),
            tag: Tag::with_type("mood"),
        });

        assert_eq!(state.tag_types.get("genre"), Some(&TagType::new(0x112233)));
        assert_eq!(state.tag_types.get("mood"), Some(&TagType::new(99)));
    }

    #[test]
    fn test_filter_items_by_tags() {
        let mut state = make_state();
        state.apply(&tagged_item("a", &["rock", "live"]));
        state.apply(&tagged_item("b", &["rock"]));
        state.apply(&tagged_item("c", &[]));

        let set = |tags: &[&str]| tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>();

        let all = filter_items_by_tags(&state.items, &set(&[]), &set(&[]));
        assert_eq!(all.len(), 3);

        let rock = filter_items_by_tags(&state.items, &set(&["rock"]), &set(&[]));
        assert_eq!(rock.keys().collect::<Vec<_>>(), vec!["a", "b"]);

        let studio_rock = filter_items_by_tags(&state.items, &set(&["rock"]), &set(&["live"]));
        assert_eq!(studio_rock.keys().collect::<Vec<_>>(), vec!["b"]);

        let none = filter_items_by_tags(&state.items, &set(&["polka"]), &set(&[]));
        assert!(none.is_empty());
    }
}
