//! Patches: data-only descriptions of edits to the live tree.
//!
//! [`Patch::index`] is the depth-first position of the patched node within the *old* snapshot.
//! A patch list as returned by [`diff`](`crate::diff::diff`) is sorted by that index.

use crate::{
	event::Transform,
	facts::{Facts, FactsDiff},
	node::{Node, WidgetUpdate},
};
use core::fmt::{self, Debug, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchKind {
	FullReplace,
	SubtreePatch,
	RetagPatch,
	TextPatch,
	FactPatch,
	WidgetPatch,
	RemoveRange,
	InsertRange,
	Reorder,
	RemoveOrMatch,
}

pub struct Patch<N, M> {
	pub index: usize,
	pub op: PatchOp<N, M>,
}

impl<N, M> Patch<N, M> {
	#[must_use]
	pub fn kind(&self) -> PatchKind {
		self.op.kind()
	}
}

pub enum PatchOp<N, M> {
	/// Render this node and swap it in for the live one.
	FullReplace(Node<N, M>),
	/// Patches to a lazy node's produced subtree, numbered from that subtree's root.
	Subtree(Vec<Patch<N, M>>),
	/// The new transform chain of a tagged node, outermost first.
	Retag(Vec<Transform<M>>),
	Text(String),
	Facts(FactsDiff<M>),
	/// Run a widget's own update. Should it return a new live node, that node is given the widget's `facts` afresh.
	Widget { update: WidgetUpdate<N>, facts: Facts<M> },
	/// Remove `count` children starting at child `offset`.
	RemoveRange { offset: usize, count: usize },
	/// Insert freshly rendered `nodes` as a contiguous run before child `offset` (or at the end).
	InsertRange { offset: usize, nodes: Vec<Node<N, M>> },
	Reorder(Reorder<N, M>),
	/// Only found within [`Reorder::patches`]: detach this child, and keep it for a [`InsertSource::Moved`] if matched.
	RemoveOrMatch(Option<Move<N, M>>),
}

impl<N, M> PatchOp<N, M> {
	#[must_use]
	pub fn kind(&self) -> PatchKind {
		match self {
			Self::FullReplace(_) => PatchKind::FullReplace,
			Self::Subtree(_) => PatchKind::SubtreePatch,
			Self::Retag(_) => PatchKind::RetagPatch,
			Self::Text(_) => PatchKind::TextPatch,
			Self::Facts(_) => PatchKind::FactPatch,
			Self::Widget { .. } => PatchKind::WidgetPatch,
			Self::RemoveRange { .. } => PatchKind::RemoveRange,
			Self::InsertRange { .. } => PatchKind::InsertRange,
			Self::Reorder(_) => PatchKind::Reorder,
			Self::RemoveOrMatch(_) => PatchKind::RemoveOrMatch,
		}
	}
}

/// The combined result of one keyed list reconciliation.
///
/// Applied as: [`patches`](`Reorder::patches`) in order (including removals), then [`inserts`](`Reorder::inserts`)
/// by ascending position, then all [`end_inserts`](`Reorder::end_inserts`) appended as one batch.
pub struct Reorder<N, M> {
	/// Patches to (and removals of) the old children, sorted by index.
	pub patches: Vec<Patch<N, M>>,
	pub inserts: Vec<Insert<N, M>>,
	pub end_inserts: Vec<InsertSource<N, M>>,
	/// The number of move slots referenced by [`Move::slot`] and [`InsertSource::Moved`].
	pub slots: usize,
}

pub struct Insert<N, M> {
	/// The child position in the new list.
	pub position: usize,
	pub source: InsertSource<N, M>,
}

pub enum InsertSource<N, M> {
	Render(Node<N, M>),
	/// The live node detached by the [`PatchOp::RemoveOrMatch`] with this slot.
	Moved(usize),
}

/// A removed child that reappears elsewhere in the list.
pub struct Move<N, M> {
	pub slot: usize,
	/// Patches to apply to the moved node, indexed like the removed child in the old snapshot.
	pub patches: Vec<Patch<N, M>>,
}

impl<N: Debug, M: Debug> Debug for Patch<N, M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Patch").field("index", &self.index).field("op", &self.op).finish()
	}
}

impl<N: Debug, M: Debug> Debug for PatchOp<N, M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::FullReplace(node) => f.debug_tuple("FullReplace").field(node).finish(),
			Self::Subtree(patches) => f.debug_tuple("Subtree").field(patches).finish(),
			Self::Retag(transforms) => f.debug_tuple("Retag").field(&transforms.len()).finish(),
			Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Self::Facts(diff) => f.debug_tuple("Facts").field(diff).finish(),
			Self::Widget { facts, .. } => f.debug_struct("Widget").field("facts", facts).finish(),
			Self::RemoveRange { offset, count } => f.debug_struct("RemoveRange").field("offset", offset).field("count", count).finish(),
			Self::InsertRange { offset, nodes } => f.debug_struct("InsertRange").field("offset", offset).field("nodes", nodes).finish(),
			Self::Reorder(reorder) => reorder.fmt(f),
			Self::RemoveOrMatch(moved) => f.debug_tuple("RemoveOrMatch").field(moved).finish(),
		}
	}
}

impl<N: Debug, M: Debug> Debug for Reorder<N, M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Reorder")
			.field("patches", &self.patches)
			.field("inserts", &self.inserts)
			.field("end_inserts", &self.end_inserts)
			.field("slots", &self.slots)
			.finish()
	}
}

impl<N: Debug, M: Debug> Debug for Insert<N, M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Insert").field("position", &self.position).field("source", &self.source).finish()
	}
}

impl<N: Debug, M: Debug> Debug for InsertSource<N, M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Render(node) => f.debug_tuple("Render").field(node).finish(),
			Self::Moved(slot) => f.debug_tuple("Moved").field(slot).finish(),
		}
	}
}

impl<N: Debug, M: Debug> Debug for Move<N, M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Move").field("slot", &self.slot).field("patches", &self.patches).finish()
	}
}
