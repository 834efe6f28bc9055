//! Receiver for finished cell meshes.
//!
//! The terrain core never renders. It hands buffers, triangle selections and
//! visibility toggles to a [`MeshSink`] keyed by an opaque [`MeshKey`].

use rustc_hash::FxHashMap;

use crate::{GridBuffers, SurfaceVertex};

/// Stable identifier of a cell's mesh for the lifetime of that cell.
pub type MeshKey = u64;

/// Consumer of per-cell meshes, usually a renderer.
pub trait MeshSink {
    /// Upload vertex data for a cell. Replaces any previous data for `key`.
    fn assign(&mut self, key: MeshKey, mesh: &GridBuffers);

    /// Select the index buffer the cell is drawn with.
    fn set_triangles(&mut self, key: MeshKey, mask: u8, indices: &[u32]);

    fn set_visible(&mut self, key: MeshKey, visible: bool);

    /// Drop everything held for `key`.
    fn release(&mut self, key: MeshKey);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MeshSink for NullSink {
    fn assign(&mut self, _key: MeshKey, _mesh: &GridBuffers) {}
    fn set_triangles(&mut self, _key: MeshKey, _mask: u8, _indices: &[u32]) {}
    fn set_visible(&mut self, _key: MeshKey, _visible: bool) {}
    fn release(&mut self, _key: MeshKey) {}
}

/// What a [`RecordingSink`] holds for one cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkMesh {
    pub vertices: Vec<SurfaceVertex>,
    pub mask: Option<u8>,
    pub triangle_count: usize,
    pub visible: bool,
}

/// One call received by a [`RecordingSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    Assign(MeshKey),
    Triangles(MeshKey, u8),
    Visible(MeshKey, bool),
    Release(MeshKey),
}

/// In-memory sink for tests and headless runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    meshes: FxHashMap<MeshKey, SinkMesh>,
    events: Vec<SinkEvent>,
    record_events: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also keep a log of every call.
    pub fn with_event_log() -> Self {
        Self {
            record_events: true,
            ..Self::default()
        }
    }

    pub fn mesh(&self, key: MeshKey) -> Option<&SinkMesh> {
        self.meshes.get(&key)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Keys currently shown, sorted.
    pub fn visible_keys(&self) -> Vec<MeshKey> {
        let mut keys: Vec<MeshKey> = self
            .meshes
            .iter()
            .filter(|(_, m)| m.visible)
            .map(|(&k, _)| k)
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Total triangles across visible meshes.
    pub fn visible_triangles(&self) -> usize {
        self.meshes
            .values()
            .filter(|m| m.visible)
            .map(|m| m.triangle_count)
            .sum()
    }

    pub fn events(&self) -> &[SinkEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    fn log(&mut self, event: SinkEvent) {
        if self.record_events {
            self.events.push(event);
        }
    }
}

impl MeshSink for RecordingSink {
    fn assign(&mut self, key: MeshKey, mesh: &GridBuffers) {
        self.meshes.entry(key).or_default().vertices = mesh.vertices();
        self.log(SinkEvent::Assign(key));
    }

    fn set_triangles(&mut self, key: MeshKey, mask: u8, indices: &[u32]) {
        let entry = self.meshes.entry(key).or_default();
        entry.mask = Some(mask);
        entry.triangle_count = indices.len() / 3;
        self.log(SinkEvent::Triangles(key, mask));
    }

    fn set_visible(&mut self, key: MeshKey, visible: bool) {
        if let Some(entry) = self.meshes.get_mut(&key) {
            entry.visible = visible;
        } else if visible {
            self.meshes.entry(key).or_default().visible = true;
        }
        self.log(SinkEvent::Visible(key, visible));
    }

    fn release(&mut self, key: MeshKey) {
        self.meshes.remove(&key);
        self.log(SinkEvent::Release(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;
    use sqt_cubesphere::Face;

    #[test]
    fn test_recording_sink_tracks_visibility() {
        let grid = GridBuffers::generate(Face::Up, DVec2::ZERO, 1.0, 3);
        let mut sink = RecordingSink::with_event_log();

        sink.assign(7, &grid);
        sink.set_triangles(7, 0, &[0, 4, 3, 0, 1, 4]);
        sink.set_visible(7, true);

        assert_eq!(sink.visible_keys(), vec![7]);
        assert_eq!(sink.visible_triangles(), 2);
        assert_eq!(sink.mesh(7).unwrap().vertices.len(), 9);

        sink.release(7);
        assert!(sink.is_empty());
        assert_eq!(
            sink.events(),
            &[
                SinkEvent::Assign(7),
                SinkEvent::Triangles(7, 0),
                SinkEvent::Visible(7, true),
                SinkEvent::Release(7),
            ]
        );
    }

    #[test]
    fn test_hiding_unknown_key_creates_nothing() {
        let mut sink = RecordingSink::new();
        sink.set_visible(3, false);
        assert!(sink.is_empty());
        assert!(sink.events().is_empty(), "events are only logged when enabled");
    }
}
