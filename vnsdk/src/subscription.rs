use crate::queue::BoundedQueue;

/// How a subscription's filter is matched against an inbound frame's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    StartsWith,
    ExactMatch,
    Contains,
}

/// A binary-FA filter: subscribe to frames carrying any of these group bits,
/// optionally narrowed by a field mask per group.
#[derive(Debug, Clone, Default)]
pub struct BinaryFilter {
    pub group_mask: u8,
    pub field_masks: Vec<u16>,
}

#[derive(Debug, Clone)]
pub enum Filter {
    AsciiHeader(String),
    Binary(BinaryFilter),
    Any,
}

/// A standing request to have matching frames copied into a user-owned
/// queue. Subscriptions are owned by the sensor façade; the queue itself is
/// owned by the application. Frames are delivered by value.
pub struct Subscription<T> {
    pub(crate) id: u64,
    pub queue: BoundedQueue<T>,
    pub filter: Filter,
    pub filter_mode: FilterMode,
}

impl<T> Subscription<T> {
    pub fn matches_ascii_header(&self, header: &str) -> bool {
        let Filter::AsciiHeader(want) = &self.filter else {
            return matches!(self.filter, Filter::Any);
        };
        match self.filter_mode {
            FilterMode::StartsWith => header.starts_with(want.as_str()),
            FilterMode::ExactMatch => header == want,
            FilterMode::Contains => header.contains(want.as_str()),
        }
    }

    pub fn matches_binary(&self, group_mask: u8) -> bool {
        match &self.filter {
            Filter::Binary(bf) => bf.group_mask & group_mask != 0,
            Filter::Any => true,
            Filter::AsciiHeader(_) => false,
        }
    }
}
