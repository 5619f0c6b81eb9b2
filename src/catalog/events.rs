use super::models::TagType;
use std::fmt;

/// A change applied to a catalog, emitted after the cascade rules ran.
///
/// Cascaded changes get their own event, so a tag removal touching three
/// items emits one `TagRemoved` and three `ItemTagDetached`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogEvent {
    DefaultTagTypeChanged(TagType),
    ItemPut { key: String },
    ItemRemoved { key: String },
    /// A removed tag was taken off an item. The item's timestamp is unchanged.
    ItemTagDetached { key: String, tag: String },
    TagPut { name: String },
    TagRemoved { name: String },
    /// A removed tag type was cleared from a tag, the tag itself is kept.
    TagDetyped { name: String, tag_type: String },
    TagTypePut { name: String },
    TagTypeRemoved { name: String },
    ExtraPut { key: String },
    ExtraRemoved { key: String },
}

pub type CatalogListener = Box<dyn FnMut(&CatalogEvent) + Send>;

/// Fan-out of catalog events to the registered listeners, in registration order.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<CatalogListener>,
}

impl EventBus {
    pub fn subscribe(&mut self, listener: CatalogListener) {
        self.listeners.push(listener);
    }

    pub fn has_listeners(&self) -> bool {
        !self.listeners.is_empty()
    }

    pub fn emit(&mut self, events: &[CatalogEvent]) {
        for event in events {
            for listener in self.listeners.iter_mut() {
                listener(event);
            }
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
