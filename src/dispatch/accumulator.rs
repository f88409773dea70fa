//! Keyed scratch space for replies that span several lines.

use std::collections::HashMap;

use crate::event::{BanEntry, ChannelListEntry, ChannelUser, ServerLink, WhoUser, WhoisInfo};

/// Partial results keyed by a case-folded name.
#[derive(Debug, Clone)]
pub struct Accumulator<T> {
    entries: HashMap<String, T>,
}

impl<T> Default for Accumulator<T> {
    fn default() -> Self {
        Accumulator {
            entries: HashMap::new(),
        }
    }
}

impl<T: Default> Accumulator<T> {
    /// The partial result for `key`, created on first use.
    pub fn entry(&mut self, key: &str) -> &mut T {
        self.entries.entry(key.to_string()).or_default()
    }
}

impl<T> Accumulator<T> {
    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.entries.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove and return the result for `key`.
    pub fn finalize(&mut self, key: &str) -> Option<T> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All in-flight multi-line replies for one connection.
#[derive(Debug, Default)]
pub struct Pending {
    pub names: Accumulator<Vec<ChannelUser>>,
    pub who: Accumulator<Vec<WhoUser>>,
    pub whois: Accumulator<WhoisInfo>,
    pub bans: Accumulator<Vec<BanEntry>>,
    pub links: Accumulator<Vec<ServerLink>>,
    pub motd: Accumulator<String>,
    pub list: Accumulator<Vec<ChannelListEntry>>,
}
