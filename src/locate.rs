//! Resolves patch indices to live nodes.
//!
//! The walk descends the old snapshot and the live tree in lockstep, but only into children whose index window
//! `[index, index + subtree_size]` contains the next pending patch. Untouched branches are skipped without
//! reading the live tree at all.

use crate::{
	event::EventNode,
	node::Node,
	patch::{Patch, PatchOp},
	platform::Platform,
};
use core::fmt::{self, Debug, Formatter};
use tracing::{error, instrument, level_filters::STATIC_MAX_LEVEL, warn, Level};

/// A patch paired with the live node it applies to.
pub struct Located<'p, N, M> {
	pub patch: &'p Patch<N, M>,
	pub target: N,
	/// The event node that listeners rendered at `target` bind to.
	///
	/// For a tagged node this is the event node *enclosing* it; its own tagger is recorded on `target`.
	pub event_node: EventNode<M>,
	/// Located contents of [`PatchOp::Subtree`], [`PatchOp::Reorder`] and matched [`PatchOp::RemoveOrMatch`] patches.
	pub nested: Vec<Located<'p, N, M>>,
}

impl<'p, N: Debug, M: Debug> Debug for Located<'p, N, M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Located")
			.field("index", &self.patch.index)
			.field("kind", &self.patch.kind())
			.field("target", &self.target)
			.field("nested", &self.nested)
			.finish()
	}
}

/// Locates `patches` (sorted, as returned by [`diff`](`crate::diff::diff`)) within the live tree at `root`, which was rendered from `old`.
///
/// Patches whose live node can't be found are logged and left out.
#[instrument(skip(platform, root, old, patches, event_node))]
pub fn locate<'p, N: Clone + PartialEq + Debug, M: 'static>(
	platform: &dyn Platform<Node = N>,
	root: &N,
	old: &Node<N, M>,
	patches: &'p [Patch<N, M>],
	event_node: &EventNode<M>,
) -> Vec<Located<'p, N, M>> {
	Locator::new(platform, patches, Vec::new()).run(root, old, 0, event_node)
}

struct Locator<'a, 'p, N, M> {
	platform: &'a dyn Platform<Node = N>,
	patches: &'p [Patch<N, M>],
	next: usize,
	located: Vec<Located<'p, N, M>>,
	/// Child positions from the root of this walk. Only recorded with the `log-paths` feature.
	path: Vec<usize>,
}

impl<'a, 'p, N: Clone + PartialEq + Debug, M: 'static> Locator<'a, 'p, N, M> {
	fn new(platform: &'a dyn Platform<Node = N>, patches: &'p [Patch<N, M>], path: Vec<usize>) -> Self {
		debug_assert!(patches.windows(2).all(|pair| pair[0].index <= pair[1].index), "Patches must be sorted by index.");
		Self {
			platform,
			patches,
			next: 0,
			located: Vec::new(),
			path,
		}
	}

	fn run(mut self, dom: &N, vnode: &Node<N, M>, low: usize, event_node: &EventNode<M>) -> Vec<Located<'p, N, M>> {
		self.walk(dom, vnode, low, event_node);
		if STATIC_MAX_LEVEL >= Level::WARN && self.next < self.patches.len() {
			warn!(
				unlocated = self.patches.len() - self.next,
				first_index = self.patches[self.next].index,
				"Some patches lie outside the old tree and were not located."
			);
		}
		self.located
	}

	fn peek(&self) -> Option<usize> {
		self.patches.get(self.next).map(|patch| patch.index)
	}

	fn nested(&self, patches: &'p [Patch<N, M>], dom: &N, vnode: &Node<N, M>, low: usize, event_node: &EventNode<M>) -> Vec<Located<'p, N, M>> {
		Locator::new(self.platform, patches, self.path.clone()).run(dom, vnode, low, event_node)
	}

	/// Drops pending patches up to and including `high`.
	fn skip_through(&mut self, high: usize, reason: &str) {
		let start = self.next;
		while self.peek().map_or(false, |index| index <= high) {
			self.next += 1;
		}
		if self.next > start {
			error!(skipped = self.next - start, path = ?self.path, "{}", reason);
		}
	}

	fn walk(&mut self, dom: &N, vnode: &Node<N, M>, low: usize, event_node: &EventNode<M>) {
		let patches = self.patches;
		while let Some(patch) = patches.get(self.next).filter(|patch| patch.index == low) {
			self.next += 1;
			let nested = match (&patch.op, vnode) {
				(PatchOp::Subtree(subtree), Node::Lazy(lazy)) => self.nested(subtree, dom, &lazy.force(), 0, event_node),
				(PatchOp::Subtree(_), _) => {
					error!(index = low, path = ?self.path, "Subtree patch doesn't target a lazy node.");
					continue;
				}
				(PatchOp::Reorder(reorder), _) => self.nested(&reorder.patches, dom, vnode, low, event_node),
				(PatchOp::RemoveOrMatch(Some(moved)), _) => self.nested(&moved.patches, dom, vnode, low, event_node),
				_ => Vec::new(),
			};
			self.located.push(Located {
				patch,
				target: dom.clone(),
				event_node: event_node.clone(),
				nested,
			});
		}

		let high = low + vnode.subtree_size();
		match self.peek() {
			Some(index) if index <= high => (),
			_ => return,
		}

		match vnode {
			Node::Element(element) => self.walk_children(dom, element.children().iter(), low, high, event_node),
			Node::Keyed(keyed) => self.walk_children(dom, keyed.children().iter().map(|(_, child)| child), low, high, event_node),
			Node::Tagged(tagged) => {
				let (chain_len, inner) = tagged.chain_len();
				let tagger = match self.platform.event_node(dom).and_then(EventNode::<M>::from_any) {
					Some(tagger) => tagger,
					None => {
						error!(index = low, path = ?self.path, "Tagged node has no event node. Falling back to the enclosing one.");
						event_node.clone()
					}
				};
				self.walk(dom, inner, low + chain_len, &tagger);
			}
			Node::Text(_) | Node::Lazy(_) | Node::Widget(_) => (),
		}

		self.skip_through(high, "Patches below a leaf or a missing child were not located.");
	}

	fn walk_children<'v>(&mut self, dom: &N, children: impl Iterator<Item = &'v Node<N, M>>, low: usize, high: usize, event_node: &EventNode<M>)
	where
		N: 'v,
		M: 'v,
	{
		let mut child_low = low;
		for (position, child) in children.enumerate() {
			child_low += 1;
			let child_high = child_low + child.subtree_size();

			match self.peek() {
				Some(index) if index > high => return,
				None => return,
				Some(index) if index < child_low || index > child_high => (),
				Some(_) => match self.platform.child(dom, position) {
					Some(child_dom) => {
						if cfg!(feature = "log-paths") {
							self.path.push(position);
						}
						self.walk(&child_dom, child, child_low, event_node);
						if cfg!(feature = "log-paths") {
							self.path.pop();
						}
					}
					None => self.skip_through(child_high, "Live child is missing."),
				},
			}

			child_low = child_high;
		}
	}
}
