//! Forward references: asking for a symbol before it exists.
//!
//! While a batch is being built, or while batches are being merged, a
//! record may refer to an identity nobody has produced yet. [`UnresolvedSet`]
//! hands out a [`SlotId`] for such a request and fills the slot in as soon
//! as the identity is emplaced, so the requester never has to ask again.
//!
//! # Layout
//!
//! Slots live in one arena. Every identity still waiting has a list head
//! in the pending table; each pending slot links to the next slot waiting
//! for the same identity:
//!
//! ```text
//! pending[X] ─► slot 7 ─► slot 3 ─► slot 0 ─┤
//! ```
//!
//! Emplacing `X` walks that list once, overwrites every slot with
//! `Resolved(X)`, and drops the head. Appending a request is O(1).

use rustc_hash::FxHashMap;

use super::info::{Info, InfoKind, NamespaceInfo};
use super::merge::merge;
use crate::base::SymbolId;
use crate::error::MergeError;

// ============================================================================
// SLOTS
// ============================================================================

/// Handle to one forward-reference slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u32);

impl SlotId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    fn offset(self, by: u32) -> SlotId {
        SlotId(self.0 + by)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    /// The identity this slot was requested for is now present.
    Resolved(SymbolId),
    /// Still waiting; links to the next slot waiting for the same identity.
    Pending(Option<SlotId>),
}

/// Result of [`UnresolvedSet::request`].
#[derive(Debug)]
pub enum Lookup<'a> {
    /// The record is already in the working set.
    Found(&'a Info),
    /// Not yet; the slot is filled once it is emplaced.
    Pending(SlotId),
}

/// Outcome of [`UnresolvedSet::absorb`].
#[derive(Debug, Default)]
pub struct Absorbed {
    slot_offset: u32,
    /// Records that could not be merged; the existing record was kept.
    pub errors: Vec<MergeError>,
}

impl Absorbed {
    /// Translate a slot handed out by the absorbed set into this one.
    pub fn remap(&self, slot: SlotId) -> SlotId {
        slot.offset(self.slot_offset)
    }
}

// ============================================================================
// UNRESOLVED SET
// ============================================================================

/// A working set of records plus the forward references still open
/// against it.
#[derive(Clone, Debug, Default)]
pub struct UnresolvedSet {
    infos: FxHashMap<SymbolId, Info>,
    slots: Vec<Slot>,
    /// Head of the pending list for every identity still waiting.
    pending: FxHashMap<SymbolId, SlotId>,
}

impl UnresolvedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding only an empty global namespace.
    pub fn with_global_namespace() -> Self {
        let mut set = Self::new();
        set.infos
            .insert(SymbolId::GLOBAL, NamespaceInfo::new(SymbolId::GLOBAL).into());
        set
    }

    pub fn find(&self, id: SymbolId) -> Option<&Info> {
        self.infos.get(&id)
    }

    pub fn find_mut(&mut self, id: SymbolId) -> Option<&mut Info> {
        self.infos.get_mut(&id)
    }

    pub fn contains(&self, id: SymbolId) -> bool {
        self.infos.contains_key(&id)
    }

    /// Ask for the record with identity `id`.
    ///
    /// Returns it if present; otherwise links a new pending slot onto
    /// `id`'s list.
    pub fn request(&mut self, id: SymbolId) -> Lookup<'_> {
        if self.infos.contains_key(&id) {
            return Lookup::Found(&self.infos[&id]);
        }
        Lookup::Pending(self.reference(id))
    }

    /// Hand out a slot for `id`, already resolved if the record is present.
    pub fn reference(&mut self, id: SymbolId) -> SlotId {
        let slot = SlotId(self.slots.len() as u32);
        if self.infos.contains_key(&id) {
            self.slots.push(Slot::Resolved(id));
        } else {
            let next = self.pending.insert(id, slot);
            self.slots.push(Slot::Pending(next));
        }
        slot
    }

    /// The identity a slot resolved to, or `None` while it is pending.
    pub fn slot(&self, slot: SlotId) -> Option<SymbolId> {
        match self.slots.get(slot.index()) {
            Some(Slot::Resolved(id)) => Some(*id),
            _ => None,
        }
    }

    /// Get the record for `id`, creating an empty one of `kind` if absent.
    ///
    /// Creating a record resolves every slot waiting for it. An existing
    /// record of a different kind is a [`MergeError::KindMismatch`].
    pub fn get_or_create(&mut self, id: SymbolId, kind: InfoKind) -> Result<&mut Info, MergeError> {
        if !self.infos.contains_key(&id) {
            self.patch(id);
        }
        let info = self
            .infos
            .entry(id)
            .or_insert_with(|| Info::new(id, kind));
        if info.kind() != kind {
            return Err(MergeError::KindMismatch {
                id,
                left: info.kind(),
                right: kind,
            });
        }
        Ok(info)
    }

    /// Insert a record, or merge it into the one already present, then
    /// resolve every slot waiting for its identity.
    pub fn emplace(&mut self, info: Info) -> Result<(), MergeError> {
        let id = info.id();
        match self.infos.get_mut(&id) {
            Some(existing) => merge(existing, info)?,
            None => {
                self.infos.insert(id, info);
            }
        }
        self.patch(id);
        Ok(())
    }

    /// Resolve pending slots against the records present in `other`.
    ///
    /// Identities `other` does not have stay pending so a later attempt
    /// can retry. Returns how many identities were resolved.
    pub fn resolve_against(&mut self, other: &UnresolvedSet) -> usize {
        let ready: Vec<SymbolId> = self
            .pending
            .keys()
            .copied()
            .filter(|id| other.contains(*id))
            .collect();
        for id in &ready {
            self.patch(*id);
        }
        ready.len()
    }

    /// Move every record, slot and pending list of `other` into `self`.
    ///
    /// Pending lists for the same identity are concatenated; anything
    /// `self` can already satisfy is resolved on the way.
    pub fn absorb(&mut self, other: UnresolvedSet) -> Absorbed {
        let slot_offset = self.slots.len() as u32;
        let mut absorbed = Absorbed {
            slot_offset,
            errors: Vec::new(),
        };

        self.slots.extend(other.slots.into_iter().map(|slot| match slot {
            Slot::Pending(next) => Slot::Pending(next.map(|s| s.offset(slot_offset))),
            resolved => resolved,
        }));

        for (id, head) in other.pending {
            let head = head.offset(slot_offset);
            if let Some(existing) = self.pending.get(&id).copied() {
                let tail = self.tail(head);
                self.slots[tail.index()] = Slot::Pending(Some(existing));
            }
            self.pending.insert(id, head);
            if self.infos.contains_key(&id) {
                self.patch(id);
            }
        }

        for info in other.infos.into_values() {
            if let Err(err) = self.emplace(info) {
                absorbed.errors.push(err);
            }
        }
        absorbed
    }

    /// Open a slot for every identity some record refers to but the
    /// set does not contain. Returns the number of slots opened.
    pub fn link_references(&mut self) -> usize {
        let missing: Vec<SymbolId> = self
            .infos
            .values()
            .flat_map(Info::references)
            .filter(|id| !self.infos.contains_key(id))
            .collect();
        for id in &missing {
            self.request(*id);
        }
        missing.len()
    }

    /// Identities still waiting, in no particular order.
    pub fn unresolved(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.pending.keys().copied()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Info> {
        self.infos.values()
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Give up the records and the sorted list of identities still pending.
    pub fn release(self) -> (FxHashMap<SymbolId, Info>, Vec<SymbolId>) {
        let mut unresolved: Vec<SymbolId> = self.pending.into_keys().collect();
        unresolved.sort_unstable();
        (self.infos, unresolved)
    }

    /// Walk `id`'s pending list, resolving every slot on it.
    fn patch(&mut self, id: SymbolId) {
        let Some(head) = self.pending.remove(&id) else {
            return;
        };
        let mut cursor = Some(head);
        let mut patched = 0usize;
        while let Some(slot) = cursor {
            cursor = match self.slots[slot.index()] {
                Slot::Pending(next) => next,
                Slot::Resolved(_) => None,
            };
            self.slots[slot.index()] = Slot::Resolved(id);
            patched += 1;
        }
        tracing::trace!(symbol = %id, slots = patched, "resolved forward references");
    }

    fn tail(&self, head: SlotId) -> SlotId {
        let mut slot = head;
        while let Slot::Pending(Some(next)) = self.slots[slot.index()] {
            slot = next;
        }
        slot
    }
}
