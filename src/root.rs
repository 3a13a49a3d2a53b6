//! A mounted tree: the live root, the snapshot it was last patched to, and the dispatcher its listeners feed.

use crate::{
	apply::apply,
	diff::diff,
	event::EventNode,
	load::virtualize,
	node::Node,
	platform::Platform,
	render::render,
};
use tracing::{info, instrument, trace};

/// Owns a [`Platform`] and keeps one live tree in sync with successive snapshots.
///
/// This does no scheduling of its own. Call [`update`](`Root::update`) whenever a new snapshot is ready.
pub struct Root<P: Platform, M> {
	platform: P,
	live: P::Node,
	snapshot: Node<P::Node, M>,
	event_node: EventNode<M>,
}

impl<P: Platform, M: 'static> Root<P, M> {
	/// Renders `node` and appends it to `container`.
	///
	/// Every decoded event message ends up in `dispatcher`, along with whether it should be handled synchronously.
	#[instrument(skip(platform, node, dispatcher))]
	pub fn mount(mut platform: P, container: &P::Node, node: Node<P::Node, M>, dispatcher: impl Fn(M, bool) + 'static) -> Self {
		let event_node = EventNode::root(dispatcher);
		let live = render(&mut platform, &node, &event_node);
		platform.append_child(container, &live);
		Self {
			platform,
			live,
			snapshot: node,
			event_node,
		}
	}

	/// Takes over `live`, e.g. server-rendered content, and patches it to `node` instead of rendering anew.
	#[instrument(skip(platform, node, dispatcher))]
	pub fn hydrate(platform: P, live: P::Node, node: Node<P::Node, M>, dispatcher: impl Fn(M, bool) + 'static) -> Self {
		let snapshot = virtualize(&platform, &live);
		let mut root = Self {
			platform,
			live,
			snapshot,
			event_node: EventNode::root(dispatcher),
		};
		root.update(node);
		root
	}

	/// Patches the live tree to `next`, which then becomes the current snapshot.
	pub fn update(&mut self, next: Node<P::Node, M>) {
		let patches = diff(&self.snapshot, &next);
		info!("Applying {} patch(es).", patches.len());
		if patches.is_empty() {
			trace!("Live tree is up to date.");
		} else {
			self.live = apply(&mut self.platform, &self.live, &self.snapshot, &patches, &self.event_node);
		}
		self.snapshot = next;
	}

	#[must_use]
	pub fn live(&self) -> &P::Node {
		&self.live
	}

	#[must_use]
	pub fn snapshot(&self) -> &Node<P::Node, M> {
		&self.snapshot
	}

	#[must_use]
	pub fn event_node(&self) -> &EventNode<M> {
		&self.event_node
	}

	#[must_use]
	pub fn platform(&self) -> &P {
		&self.platform
	}

	/// For widgets and tests. Changes made through this aren't known to the differ.
	pub fn platform_mut(&mut self) -> &mut P {
		&mut self.platform
	}

	/// Detaches the live tree and releases it, returning the platform.
	pub fn unmount(mut self) -> P {
		if let Some(parent) = self.platform.parent(&self.live) {
			self.platform.remove_child(&parent, &self.live);
		}
		self.platform.release(&self.live);
		self.platform
	}
}
