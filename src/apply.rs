//! The patch executor.
//!
//! Patches are first [located](`crate::locate::locate`) as a whole, and only then applied in order,
//! so that structural edits never shift the live nodes that later patches were resolved to.

use crate::{
	event::EventNode,
	locate::{locate, Located},
	node::Node,
	patch::{InsertSource, Move, Patch, PatchOp, Reorder},
	platform::Platform,
	render::{apply_facts, apply_facts_diff, render},
};
use core::fmt::Debug;
use tracing::{error, instrument, trace, trace_span};

/// Applies `patches` (as returned by [`diff`](`crate::diff::diff`)`(old, …)`) to the live tree at `root`, which was rendered from `old`.
///
/// Returns the live root, which differs from `root` iff the root itself was replaced.
#[instrument(skip(platform, root, old, patches, event_node))]
pub fn apply<N: Clone + PartialEq + Debug, M: 'static>(platform: &mut dyn Platform<Node = N>, root: &N, old: &Node<N, M>, patches: &[Patch<N, M>], event_node: &EventNode<M>) -> N {
	if patches.is_empty() {
		return root.clone();
	}
	let located = locate(&*platform, root, old, patches, event_node);
	trace!("Located {} of {} patch(es).", located.len(), patches.len());
	apply_located(platform, root, &located)
}

pub(crate) fn apply_located<N: Clone + PartialEq + Debug, M: 'static>(platform: &mut dyn Platform<Node = N>, root: &N, located: &[Located<'_, N, M>]) -> N {
	let mut root = root.clone();
	for entry in located {
		let replaces_root = entry.target == root;
		let result = apply_patch(platform, entry);
		if replaces_root {
			root = result;
		}
	}
	root
}

/// Returns the live node that now stands where `located.target` was.
fn apply_patch<N: Clone + PartialEq + Debug, M: 'static>(platform: &mut dyn Platform<Node = N>, located: &Located<'_, N, M>) -> N {
	let target = &located.target;
	let span = trace_span!("Applying patch", index = located.patch.index, kind = ?located.patch.kind());
	let _enter = span.enter();

	match &located.patch.op {
		PatchOp::FullReplace(node) => redraw(platform, target, node, &located.event_node),

		PatchOp::Subtree(_) => apply_located(platform, target, &located.nested),

		PatchOp::Retag(transforms) => {
			match platform.event_node(target).and_then(EventNode::<M>::from_any) {
				Some(tagger) => {
					if !tagger.retag(transforms.clone()) {
						error!("Retag target carries the root event node.");
					}
				}
				None => error!("Retag target carries no event node."),
			}
			target.clone()
		}

		PatchOp::Text(text) => {
			if cfg!(feature = "dangerous-logging") {
				trace!(text = &**text, "Setting text.");
			}
			platform.set_text(target, text);
			target.clone()
		}

		PatchOp::Facts(diff) => {
			apply_facts_diff(platform, target, diff, &located.event_node);
			target.clone()
		}

		PatchOp::Widget { update, facts } => {
			let next = update(platform, target);
			if next != *target {
				trace!("Widget replaced its live node.");
				apply_facts(platform, &next, facts, &located.event_node);
				carry_tagger(platform, target, &next, &located.event_node);
				if let Some(parent) = platform.parent(target) {
					platform.replace_child(&parent, &next, target);
				}
				platform.release(target);
			}
			next
		}

		PatchOp::RemoveRange { offset, count } => {
			for _ in 0..*count {
				match platform.child(target, *offset) {
					Some(child) => {
						platform.remove_child(target, &child);
						platform.release(&child);
					}
					None => {
						error!(offset, count, "Fewer live children than expected.");
						break;
					}
				}
			}
			target.clone()
		}

		PatchOp::InsertRange { offset, nodes } => {
			let fragment = platform.create_fragment();
			for node in nodes {
				let dom = render(platform, node, &located.event_node);
				platform.append_child(&fragment, &dom);
			}
			let reference = platform.child(target, *offset);
			platform.insert_before(target, &fragment, reference.as_ref());
			target.clone()
		}

		PatchOp::Reorder(reorder) => {
			apply_reorder(platform, located, reorder);
			target.clone()
		}

		PatchOp::RemoveOrMatch(_) => {
			error!("Removal outside of a keyed reorder. Ignoring it.");
			target.clone()
		}
	}
}

fn redraw<N: Clone + PartialEq + Debug, M: 'static>(platform: &mut dyn Platform<Node = N>, target: &N, node: &Node<N, M>, event_node: &EventNode<M>) -> N {
	let dom = render(platform, node, event_node);
	carry_tagger(platform, target, &dom, event_node);
	if let Some(parent) = platform.parent(target) {
		platform.replace_child(&parent, &dom, target);
	}
	platform.release(target);
	dom
}

/// Moves the tagger recorded on `old` over to its replacement `new`, but only if `old` is the inner node of a tagged node.
///
/// At a tagged node's own index, `event_node` is the enclosing one and the old tagger is left behind.
fn carry_tagger<N: Clone + PartialEq + Debug, M: 'static>(platform: &mut dyn Platform<Node = N>, old: &N, new: &N, event_node: &EventNode<M>) {
	if platform.event_node(new).is_some() {
		return;
	}
	if let Some(tagger) = platform.event_node(old) {
		if event_node.is_recorded_as(&tagger) {
			platform.set_event_node(new, tagger);
		}
	}
}

fn apply_reorder<N: Clone + PartialEq + Debug, M: 'static>(platform: &mut dyn Platform<Node = N>, located: &Located<'_, N, M>, reorder: &Reorder<N, M>) {
	let parent = &located.target;
	let mut moved: Vec<Option<N>> = vec![None; reorder.slots];

	for entry in &located.nested {
		match &entry.patch.op {
			PatchOp::RemoveOrMatch(None) => {
				platform.remove_child(parent, &entry.target);
				platform.release(&entry.target);
			}
			PatchOp::RemoveOrMatch(Some(Move { slot, .. })) => {
				platform.remove_child(parent, &entry.target);
				let node = apply_located(platform, &entry.target, &entry.nested);
				match moved.get_mut(*slot) {
					Some(moved) => *moved = Some(node),
					None => error!(slot, "Move slot out of range."),
				}
			}
			_ => {
				apply_patch(platform, entry);
			}
		}
	}

	let mut take = |platform: &mut dyn Platform<Node = N>, source: &InsertSource<N, M>| match source {
		InsertSource::Render(node) => Some(render(platform, node, &located.event_node)),
		InsertSource::Moved(slot) => {
			let node = moved.get_mut(*slot).and_then(Option::take);
			if node.is_none() {
				error!(slot, "Moved node is missing.");
			}
			node
		}
	};

	for insert in &reorder.inserts {
		if let Some(dom) = take(platform, &insert.source) {
			let reference = platform.child(parent, insert.position);
			platform.insert_before(parent, &dom, reference.as_ref());
		}
	}

	if !reorder.end_inserts.is_empty() {
		let fragment = platform.create_fragment();
		for source in &reorder.end_inserts {
			if let Some(dom) = take(platform, source) {
				platform.append_child(&fragment, &dom);
			}
		}
		platform.append_child(parent, &fragment);
	}
}
