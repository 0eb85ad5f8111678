//! Hierarchical defaults.
//!
//! A preference key is an ordered tuple whose prefixes denote generality:
//! `[kind, channel]` is more specific than `[kind]`, which is more specific
//! than the empty key. Lookup strips the rightmost atom until a hit is
//! found, so the empty-key entry acts as the universal fallback.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;

use crate::kinds::{Channel, SignalKind};

/// One element of a preference key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrefAtom {
    Kind(SignalKind),
    Channel(Channel),
}

/// Key type: short, so it lives inline.
pub type PrefKey = SmallVec<[PrefAtom; 2]>;

/// Builds the standard `[kind, channel?]` key.
pub fn pref_key(kind: impl Into<SignalKind>, channel: Option<Channel>) -> PrefKey {
    let mut key = PrefKey::new();
    key.push(PrefAtom::Kind(kind.into()));
    if let Some(channel) = channel {
        key.push(PrefAtom::Channel(channel));
    }
    key
}

/// Prefix-fallback preference table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Preferences<V> {
    table: BTreeMap<Vec<PrefAtom>, V>,
}

impl<V> Default for Preferences<V> {
    fn default() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }
}

impl<V> Preferences<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table seeded with a universal fallback.
    pub fn with_fallback(value: V) -> Self {
        let mut prefs = Self::new();
        prefs.set(&[], value);
        prefs
    }

    /// Deepest-prefix match for `key`, or `None` when not even a universal
    /// fallback exists.
    pub fn get(&self, key: &[PrefAtom]) -> Option<&V> {
        let mut key = key;
        loop {
            if let Some(value) = self.table.get(key) {
                return Some(value);
            }
            match key.split_last() {
                Some((_, rest)) => key = rest,
                None => return None,
            }
        }
    }

    /// Sets the preference for exactly `key`.
    pub fn set(&mut self, key: &[PrefAtom], value: V) {
        self.table.insert(key.to_vec(), value);
    }

    /// Sets the preference for `key` and deletes every entry `key` is a
    /// proper prefix of, so the new value also governs more specific keys.
    pub fn set_overriding(&mut self, key: &[PrefAtom], value: V) {
        self.table
            .retain(|existing, _| !(existing.len() > key.len() && existing.starts_with(key)));
        self.set(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::{Axis, InputKind};
    use pretty_assertions::assert_eq;

    fn key(kind: InputKind, channel: Option<Channel>) -> PrefKey {
        pref_key(kind, channel)
    }

    #[test]
    fn lookup_strips_rightmost_atom() {
        let mut prefs = Preferences::new();
        prefs.set(&key(InputKind::DigitalRead, None), 0i64);
        prefs.set(&key(InputKind::DigitalRead, Some(Channel::Pin(0))), 1);

        assert_eq!(
            prefs.get(&key(InputKind::DigitalRead, Some(Channel::Pin(0)))),
            Some(&1)
        );
        assert_eq!(
            prefs.get(&key(InputKind::DigitalRead, Some(Channel::Pin(1)))),
            Some(&0)
        );
        assert_eq!(prefs.get(&key(InputKind::DigitalRead, None)), Some(&0));
        assert_eq!(prefs.get(&key(InputKind::AnalogRead, None)), None);
    }

    #[test]
    fn empty_key_is_universal_fallback() {
        let mut prefs = Preferences::with_fallback("baz");
        prefs.set(&key(InputKind::AnalogRead, None), "foo");

        assert_eq!(prefs.get(&key(InputKind::AnalogRead, None)), Some(&"foo"));
        assert_eq!(prefs.get(&key(InputKind::DigitalRead, None)), Some(&"baz"));
        assert_eq!(prefs.get(&[]), Some(&"baz"));
    }

    #[test]
    fn set_overriding_deletes_subpreferences() {
        let mut prefs = Preferences::new();
        let general = key(InputKind::Accelerometer, None);
        let specific = key(InputKind::Accelerometer, Some(Channel::Axis(Axis::Z)));
        prefs.set(&general, 0i64);
        prefs.set(&specific, 1);

        prefs.set(&general, 2);
        assert_eq!(prefs.get(&specific), Some(&1));

        prefs.set_overriding(&general, 3);
        assert_eq!(prefs.get(&specific), Some(&3));
        assert_eq!(prefs.get(&general), Some(&3));
    }
}
