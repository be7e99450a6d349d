//! Scene data: the actors of the current level and their name index.
//!
//! `actors` is the live list iterated by the update passes, in registration
//! order. Newly instantiated actors wait in `pending_add` until the next
//! update starts them. Destruction is queued as indices into `actors` and
//! applied in reverse index order so earlier indices stay valid.
//!
//! The name index is updated eagerly: an actor is findable from the moment it
//! is instantiated and stops being findable the moment it is destroyed.

use rustc_hash::FxHashMap;

use super::actor::ActorId;

#[derive(Debug, Default)]
pub struct Scene {
    pub name: String,
    actors: Vec<ActorId>,
    pending_add: Vec<ActorId>,
    pending_destroy: Vec<usize>,
    by_name: FxHashMap<String, Vec<ActorId>>,
}

/// Where an actor currently sits in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residence {
    Live(usize),
    Pending(usize),
    Absent,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn actors(&self) -> &[ActorId] {
        &self.actors
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> &[ActorId] {
        &self.pending_add
    }

    /// Queue a new actor and make it findable by name.
    pub fn register(&mut self, id: ActorId, name: &str) {
        self.pending_add.push(id);
        self.by_name.entry(name.to_string()).or_default().push(id);
    }

    /// Move the whole pending batch to the end of the live list.
    pub fn promote_pending(&mut self) -> Vec<ActorId> {
        let batch = std::mem::take(&mut self.pending_add);
        self.actors.extend_from_slice(&batch);
        batch
    }

    pub fn residence(&self, id: ActorId) -> Residence {
        if let Some(index) = self.actors.iter().position(|&a| a == id) {
            return Residence::Live(index);
        }
        if let Some(index) = self.pending_add.iter().position(|&a| a == id) {
            return Residence::Pending(index);
        }
        Residence::Absent
    }

    pub fn unindex(&mut self, id: ActorId, name: &str) {
        if let Some(list) = self.by_name.get_mut(name) {
            list.retain(|&a| a != id);
            if list.is_empty() {
                self.by_name.remove(name);
            }
        }
    }

    pub fn queue_destroy(&mut self, index: usize) {
        if !self.pending_destroy.contains(&index) {
            self.pending_destroy.push(index);
        }
    }

    pub fn remove_pending(&mut self, index: usize) -> ActorId {
        self.pending_add.remove(index)
    }

    /// Remove every queued actor from the live list, highest index first.
    pub fn drain_destroyed(&mut self) -> Vec<ActorId> {
        let mut indices = std::mem::take(&mut self.pending_destroy);
        indices.sort_unstable_by(|a, b| b.cmp(a));
        let mut removed = Vec::with_capacity(indices.len());
        for index in indices {
            if index < self.actors.len() {
                removed.push(self.actors.remove(index));
            }
        }
        removed
    }

    pub fn find(&self, name: &str) -> Option<ActorId> {
        self.by_name.get(name).and_then(|list| list.first().copied())
    }

    pub fn find_all(&self, name: &str) -> Vec<ActorId> {
        self.by_name.get(name).cloned().unwrap_or_default()
    }

    /// Adopt an actor carried over from the previous scene. It goes in front
    /// of everything already here, both in its list and in the index, so
    /// callers adopt a batch last-to-first to keep its order.
    pub fn adopt_front(&mut self, id: ActorId, name: &str, started: bool) {
        if started {
            self.actors.insert(0, id);
        } else {
            self.pending_add.insert(0, id);
        }
        self.by_name.entry(name.to_string()).or_default().insert(0, id);
    }

    /// Hand over every actor, live first, leaving the scene empty.
    pub fn take_all(&mut self) -> Vec<ActorId> {
        self.by_name.clear();
        self.pending_destroy.clear();
        let mut all = std::mem::take(&mut self.actors);
        all.append(&mut self.pending_add);
        all
    }
}
