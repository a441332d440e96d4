//! Per-tick change tracking for input sources.

use crate::mapping::{InputValue, MapSource};
use std::collections::{HashMap, HashSet};

/// Latest value per source, plus the set of sources that changed since the
/// last tick and a "preserved" set re-emitted every tick regardless.
///
/// Preserved sources serve targets that need continuous re-evaluation (an
/// aim stick held outside its deadzone, an active touch gesture). The
/// changed set is reset to the preserved set at the end of each tick.
#[derive(Debug, Clone, Default)]
pub struct InputStore {
    values: HashMap<MapSource, InputValue>,
    changed: HashSet<MapSource>,
    preserved: HashSet<MapSource>,
}

impl InputStore {
    /// Record a new sample and mark its source changed.
    pub fn set(&mut self, source: MapSource, value: InputValue) {
        self.values.insert(source, value);
        self.changed.insert(source);
    }

    pub fn get(&self, source: &MapSource) -> Option<&InputValue> {
        self.values.get(source)
    }

    pub fn is_changed(&self, source: &MapSource) -> bool {
        self.changed.contains(source)
    }

    /// Add or remove a source from the preserved set. Removing does not
    /// clear the source from the current tick's changed set.
    pub fn set_preserved(&mut self, source: MapSource, preserved: bool) {
        if preserved {
            self.preserved.insert(source);
        } else {
            self.preserved.remove(&source);
        }
    }

    /// Sources to resolve this tick, with their latest values. Preserved
    /// sources appear even without a fresh sample (provided they have ever
    /// held one).
    pub fn frame(&self) -> impl Iterator<Item = (MapSource, &InputValue)> {
        self.changed
            .iter()
            .filter_map(|source| self.values.get(source).map(|value| (*source, value)))
    }

    /// Reset the changed set to the preserved set after resolution.
    pub fn end_frame(&mut self) {
        self.changed = self.preserved.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::PadButton;

    const SOUTH: MapSource = MapSource::Button(PadButton::S);
    const NORTH: MapSource = MapSource::Button(PadButton::N);

    #[test]
    fn set_marks_changed_and_end_frame_clears() {
        let mut store = InputStore::default();
        store.set(SOUTH, InputValue::Bool(true));
        assert!(store.is_changed(&SOUTH));
        assert_eq!(store.frame().count(), 1);

        store.end_frame();
        assert!(!store.is_changed(&SOUTH));
        assert_eq!(store.frame().count(), 0);
        // The value itself survives the frame boundary.
        assert_eq!(store.get(&SOUTH), Some(&InputValue::Bool(true)));
    }

    #[test]
    fn preserved_sources_reappear_every_frame() {
        let mut store = InputStore::default();
        store.set(MapSource::Gyro, InputValue::Bool(true));
        store.set_preserved(MapSource::Gyro, true);

        store.end_frame();
        assert!(store.is_changed(&MapSource::Gyro));

        store.set_preserved(MapSource::Gyro, false);
        // Still changed this tick; gone after the next boundary.
        assert!(store.is_changed(&MapSource::Gyro));
        store.end_frame();
        assert!(!store.is_changed(&MapSource::Gyro));
    }

    #[test]
    fn preserved_source_without_value_is_skipped() {
        let mut store = InputStore::default();
        store.set_preserved(NORTH, true);
        store.end_frame();
        assert!(store.is_changed(&NORTH));
        assert_eq!(store.frame().count(), 0);
    }
}
