//! Keyed list reconciliation.
//!
//! Both lists are walked with one cursor each. Where the keys under the cursors differ, one step of lookahead
//! on either side recognizes a swap, a single insert, a single removal, or a replacement, in that order of
//! priority. Anything else ends the walk, and the remainders become trailing removals and appends.
//!
//! Inserted and removed keys are tracked in a per-call map. When a key is both removed and inserted, the
//! live node is moved instead of being destroyed and re-rendered.

use crate::{
	diff::diff_help,
	node::Node,
	patch::{Insert, InsertSource, Move, Patch, PatchOp, Reorder},
};
use hashbrown::HashMap;
use tracing::{instrument, trace};

/// Repeated keys in the same role are told apart by how many earlier occurrences are already tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LookupKey<'a> {
	key: &'a str,
	duplicate: u32,
}

/// An absent entry means the key has not been seen yet.
enum Change<'a, N, M> {
	PendingInsert {
		node: &'a Node<N, M>,
		/// Into `Reconciler::inserts`.
		entry: usize,
	},
	PendingRemove {
		node: &'a Node<N, M>,
		index: usize,
		/// Into `Reconciler::local`.
		patch: usize,
	},
	Matched,
}

impl<'a, N, M> Clone for Change<'a, N, M> {
	fn clone(&self) -> Self {
		*self
	}
}
impl<'a, N, M> Copy for Change<'a, N, M> {}

struct Reconciler<'a, N, M> {
	changes: HashMap<LookupKey<'a>, Change<'a, N, M>>,
	local: Vec<Patch<N, M>>,
	/// New-list position, or `None` for an append.
	inserts: Vec<(Option<usize>, InsertSource<N, M>)>,
	slots: usize,
	removals: usize,
}

impl<'a, N, M> Reconciler<'a, N, M> {
	fn new() -> Self {
		Self {
			changes: HashMap::new(),
			local: Vec::new(),
			inserts: Vec::new(),
			slots: 0,
			removals: 0,
		}
	}

	fn next_slot(&mut self) -> usize {
		self.slots += 1;
		self.slots - 1
	}

	fn insert(&mut self, key: &'a str, node: &'a Node<N, M>, position: Option<usize>) {
		let mut lookup = LookupKey { key, duplicate: 0 };
		loop {
			match self.changes.get(&lookup).copied() {
				None => {
					self.changes.insert(lookup, Change::PendingInsert { node, entry: self.inserts.len() });
					self.inserts.push((position, InsertSource::Render(node.clone())));
					return;
				}
				Some(Change::PendingRemove { node: removed, index, patch }) => {
					trace!(key, "Matched an insert to an earlier removal.");
					self.changes.insert(lookup, Change::Matched);

					let mut patches = Vec::new();
					diff_help(removed, node, &mut patches, index);
					let slot = self.next_slot();
					self.local[patch].op = PatchOp::RemoveOrMatch(Some(Move { slot, patches }));
					self.inserts.push((position, InsertSource::Moved(slot)));
					return;
				}
				Some(Change::PendingInsert { .. } | Change::Matched) => lookup.duplicate += 1,
			}
		}
	}

	fn remove(&mut self, key: &'a str, node: &'a Node<N, M>, index: usize) {
		self.removals += 1;
		let mut lookup = LookupKey { key, duplicate: 0 };
		loop {
			match self.changes.get(&lookup).copied() {
				None => {
					self.changes.insert(lookup, Change::PendingRemove { node, index, patch: self.local.len() });
					self.local.push(Patch {
						index,
						op: PatchOp::RemoveOrMatch(None),
					});
					return;
				}
				Some(Change::PendingInsert { node: inserted, entry }) => {
					trace!(key, "Matched a removal to an earlier insert.");
					self.changes.insert(lookup, Change::Matched);

					let mut patches = Vec::new();
					diff_help(node, inserted, &mut patches, index);
					let slot = self.next_slot();
					self.local.push(Patch {
						index,
						op: PatchOp::RemoveOrMatch(Some(Move { slot, patches })),
					});
					self.inserts[entry].1 = InsertSource::Moved(slot);
					return;
				}
				Some(Change::PendingRemove { .. } | Change::Matched) => lookup.duplicate += 1,
			}
		}
	}

	fn finish(self, patches: &mut Vec<Patch<N, M>>, root_index: usize) {
		if self.inserts.is_empty() && self.removals == 0 {
			debug_assert_eq!(self.slots, 0);
			return patches.extend(self.local);
		}

		let mut inserts = Vec::new();
		let mut end_inserts = Vec::new();
		for (position, source) in self.inserts {
			match position {
				Some(position) => inserts.push(Insert { position, source }),
				None => end_inserts.push(source),
			}
		}
		trace!(
			removals = self.removals,
			inserts = inserts.len(),
			end_inserts = end_inserts.len(),
			moves = self.slots,
			"Reordering."
		);

		patches.push(Patch {
			index: root_index,
			op: PatchOp::Reorder(Reorder {
				patches: self.local,
				inserts,
				end_inserts,
				slots: self.slots,
			}),
		});
	}
}

/// Reconciles the keyed children of the element at `root_index`.
///
/// If nothing was inserted or removed, the children's own patches are pushed as they are.
/// Otherwise exactly one [`PatchOp::Reorder`] is pushed at `root_index`, carrying them.
#[instrument(skip(old, new, patches))]
pub(crate) fn diff_keyed<N, M>(old: &[(String, Node<N, M>)], new: &[(String, Node<N, M>)], patches: &mut Vec<Patch<N, M>>, root_index: usize) {
	let mut reconciler = Reconciler::new();
	let mut index = root_index;
	let (mut i, mut j) = (0, 0);

	while i < old.len() && j < new.len() {
		let (old_key, old_node) = (&old[i].0, &old[i].1);
		let (new_key, new_node) = (&new[j].0, &new[j].1);

		if old_key == new_key {
			index += 1;
			diff_help(old_node, new_node, &mut reconciler.local, index);
			index += old_node.subtree_size();
			i += 1;
			j += 1;
			continue;
		}

		let old_next = old.get(i + 1);
		let new_next = new.get(j + 1);
		// `old[i]` reappears one step later in `new`.
		let new_match = new_next.map_or(false, |(key, _)| key == old_key);
		// `new[j]` was one step later in `old`.
		let old_match = old_next.map_or(false, |(key, _)| key == new_key);

		match (old_next, new_next) {
			(Some((_, old_next_node)), Some((_, new_next_node))) if new_match && old_match => {
				index += 1;
				diff_help(old_node, new_next_node, &mut reconciler.local, index);
				reconciler.insert(new_key, new_node, Some(j));
				index += old_node.subtree_size();

				index += 1;
				reconciler.remove(new_key, old_next_node, index);
				index += old_next_node.subtree_size();

				i += 2;
				j += 2;
			}
			(_, Some((_, new_next_node))) if new_match => {
				index += 1;
				reconciler.insert(new_key, new_node, Some(j));
				diff_help(old_node, new_next_node, &mut reconciler.local, index);
				index += old_node.subtree_size();

				i += 1;
				j += 2;
			}
			(Some((_, old_next_node)), _) if old_match => {
				index += 1;
				reconciler.remove(old_key, old_node, index);
				index += old_node.subtree_size();

				index += 1;
				diff_help(old_next_node, new_node, &mut reconciler.local, index);
				index += old_next_node.subtree_size();

				i += 2;
				j += 1;
			}
			(Some((old_next_key, old_next_node)), Some((new_next_key, new_next_node))) if old_next_key == new_next_key => {
				index += 1;
				reconciler.remove(old_key, old_node, index);
				reconciler.insert(new_key, new_node, Some(j));
				index += old_node.subtree_size();

				index += 1;
				diff_help(old_next_node, new_next_node, &mut reconciler.local, index);
				index += old_next_node.subtree_size();

				i += 2;
				j += 2;
			}
			_ => {
				trace!(i, j, "No lookahead case applies. Falling back to removals and appends.");
				break;
			}
		}
	}

	for (key, node) in &old[i..] {
		index += 1;
		reconciler.remove(key, node, index);
		index += node.subtree_size();
	}
	for (key, node) in &new[j..] {
		reconciler.insert(key, node, None);
	}

	reconciler.finish(patches, root_index);
}
