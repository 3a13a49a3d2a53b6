//! The patch builder: compares two snapshots and lists the edits that turn one into the other.
//!
//! Patches are indexed by the depth-first position of their target within the *old* snapshot and come out sorted.
//! Whenever an incremental comparison is unsupported (kind, tag, namespace, tagger arity or widget identity
//! mismatch), the differ bails to a single [`PatchOp::FullReplace`] of that node.

use crate::{
	event::same_rc,
	facts::diff_facts,
	keyed::diff_keyed,
	node::{Element, Node},
	patch::{Patch, PatchOp},
};
use tracing::{instrument, trace, trace_span};

/// Lists the patches that turn `old` into `new`, sorted by [`Patch::index`].
///
/// The list is empty iff no live change is needed.
/// Lazy nodes in `new` are produced as needed, or take over the cached subtree of their counterpart in `old`.
#[must_use]
#[instrument(skip(old, new))]
pub fn diff<N, M>(old: &Node<N, M>, new: &Node<N, M>) -> Vec<Patch<N, M>> {
	let mut patches = Vec::new();
	diff_help(old, new, &mut patches, 0);
	trace!("Found {} patch(es).", patches.len());
	patches
}

pub(crate) fn diff_help<N, M>(old: &Node<N, M>, new: &Node<N, M>, patches: &mut Vec<Patch<N, M>>, index: usize) {
	if old.same(new) {
		return;
	}

	match (old, new) {
		(Node::Text(old_text), Node::Text(new_text)) => {
			if old_text != new_text {
				patches.push(Patch {
					index,
					op: PatchOp::Text(new_text.to_string()),
				});
			}
		}

		(Node::Element(old_element), Node::Element(new_element)) => diff_elements(old_element, new_element, new, patches, index),
		(Node::Element(old_element), Node::Keyed(new_keyed)) => {
			trace!("Comparing element against keyed element without keys.");
			diff_elements(old_element, &new_keyed.dekeyed(), new, patches, index)
		}
		(Node::Keyed(old_keyed), Node::Element(new_element)) => {
			trace!("Comparing keyed element against element without keys.");
			diff_elements(&old_keyed.dekeyed(), new_element, new, patches, index)
		}

		(Node::Keyed(old_keyed), Node::Keyed(new_keyed)) => {
			let span = trace_span!("Keyed", index);
			let _enter = span.enter();

			if old_keyed.tag() != new_keyed.tag() || old_keyed.namespace() != new_keyed.namespace() {
				return full_replace(new, patches, index);
			}
			if let Some(facts) = diff_facts(old_keyed.facts(), new_keyed.facts()) {
				patches.push(Patch {
					index,
					op: PatchOp::Facts(facts),
				});
			}
			diff_keyed(old_keyed.children(), new_keyed.children(), patches, index);
		}

		(Node::Tagged(old_tagged), Node::Tagged(new_tagged)) => {
			let span = trace_span!("Tagged", index);
			let _enter = span.enter();

			let (old_transforms, old_inner) = old_tagged.chain();
			let (new_transforms, new_inner) = new_tagged.chain();
			if old_transforms.len() != new_transforms.len() {
				trace!("Tagger chain length changed from {} to {}.", old_transforms.len(), new_transforms.len());
				return full_replace(new, patches, index);
			}

			let chain_len = new_transforms.len();
			if !old_transforms.iter().zip(&new_transforms).all(|(old, new)| same_rc(old, new)) {
				patches.push(Patch {
					index,
					op: PatchOp::Retag(new_transforms),
				});
			}
			diff_help(old_inner, new_inner, patches, index + chain_len);
		}

		(Node::Lazy(old_lazy), Node::Lazy(new_lazy)) => {
			let span = trace_span!("Lazy", index);
			let _enter = span.enter();

			if new_lazy.same_identity(old_lazy) {
				trace!("Identity unchanged. Reusing the produced subtree.");
				return new_lazy.adopt(old_lazy);
			}

			let mut subtree = Vec::new();
			diff_help(&old_lazy.force(), &new_lazy.force(), &mut subtree, 0);
			if !subtree.is_empty() {
				patches.push(Patch {
					index,
					op: PatchOp::Subtree(subtree),
				});
			}
		}

		(Node::Widget(old_widget), Node::Widget(new_widget)) => {
			if old_widget.widget().identity() != new_widget.widget().identity() {
				return full_replace(new, patches, index);
			}
			if let Some(facts) = diff_facts(old_widget.facts(), new_widget.facts()) {
				patches.push(Patch {
					index,
					op: PatchOp::Facts(facts),
				});
			}
			if let Some(update) = new_widget.widget().diff(old_widget.widget().as_any()) {
				patches.push(Patch {
					index,
					op: PatchOp::Widget {
						update,
						facts: new_widget.facts().clone(),
					},
				});
			}
		}

		_ => {
			trace!("Node kind changed from {:?} to {:?}.", old.kind(), new.kind());
			full_replace(new, patches, index)
		}
	}
}

fn full_replace<N, M>(new: &Node<N, M>, patches: &mut Vec<Patch<N, M>>, index: usize) {
	patches.push(Patch {
		index,
		op: PatchOp::FullReplace(new.clone()),
	});
}

/// `new_node` is what a bail-out renders; it may still carry keys that `new` had stripped.
fn diff_elements<N, M>(old: &Element<N, M>, new: &Element<N, M>, new_node: &Node<N, M>, patches: &mut Vec<Patch<N, M>>, index: usize) {
	let span = trace_span!("Element", index, tag = new.tag());
	let _enter = span.enter();

	if old.tag() != new.tag() || old.namespace() != new.namespace() {
		return full_replace(new_node, patches, index);
	}
	if let Some(facts) = diff_facts(old.facts(), new.facts()) {
		patches.push(Patch {
			index,
			op: PatchOp::Facts(facts),
		});
	}
	diff_children(old.children(), new.children(), patches, index);
}

/// Positional reconciliation of unkeyed children, whose parent is at `index`.
///
/// Surplus old children are dropped with one [`PatchOp::RemoveRange`], surplus new ones appended with one
/// [`PatchOp::InsertRange`]. Both are pushed ahead of the per-child patches so the list stays sorted.
fn diff_children<N, M>(old: &[Node<N, M>], new: &[Node<N, M>], patches: &mut Vec<Patch<N, M>>, index: usize) {
	if old.len() > new.len() {
		patches.push(Patch {
			index,
			op: PatchOp::RemoveRange {
				offset: new.len(),
				count: old.len() - new.len(),
			},
		});
	} else if old.len() < new.len() {
		patches.push(Patch {
			index,
			op: PatchOp::InsertRange {
				offset: old.len(),
				nodes: new[old.len()..].to_vec(),
			},
		});
	}

	let mut index = index;
	for (old_child, new_child) in old.iter().zip(new) {
		index += 1;
		diff_help(old_child, new_child, patches, index);
		index += old_child.subtree_size();
	}
}
