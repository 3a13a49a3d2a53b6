//! The capability set the engine needs from a UI platform.
//!
//! Nothing in the differ, locator or executor knows which platform it drives. Backends implement
//! [`Platform`]: [`memory::MemoryDom`](`crate::memory::MemoryDom`) headlessly, [`web::WebPlatform`](`crate::web::WebPlatform`)
//! on top of [`web_sys`].
//!
//! Platform operations are infallible from the engine's point of view.
//! Backends that can fail log the failure and carry on, as the engine has no better recovery than that.

use crate::{event::EventSink, facts::Property};
use core::{any::Any, fmt::Debug};
use std::rc::Rc;

/// Process-wide platform features, detected once at startup and handed to the backend at construction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
	/// Whether event listeners accept the `passive` option.
	pub passive_events: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerOptions {
	pub passive: bool,
}

/// A read-only view of a live node, used to [virtualize](`crate::load::virtualize`) existing content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inspected {
	Text(String),
	Element {
		tag: String,
		namespace: Option<String>,
		attributes: Vec<(String, String)>,
	},
	Other,
}

/// A UI platform's node creation, mutation and traversal primitives.
///
/// This trait is object safe, so that [`Widget`](`crate::node::Widget`)s can drive any backend through `&mut dyn Platform<Node = N>`.
pub trait Platform {
	/// A handle to one live node. Clones refer to the same node, and equality is identity.
	type Node: Clone + PartialEq + Debug;

	fn capabilities(&self) -> Capabilities;

	fn create_text(&mut self, text: &str) -> Self::Node;
	fn create_element(&mut self, tag: &str, namespace: Option<&str>) -> Self::Node;
	/// A detached container whose children move into the parent when it is appended or inserted.
	fn create_fragment(&mut self) -> Self::Node;

	fn set_text(&mut self, node: &Self::Node, text: &str);
	/// An empty `value` removes the style.
	fn set_style(&mut self, node: &Self::Node, name: &str, value: &str);
	/// `None` removes the attribute.
	fn set_attribute(&mut self, node: &Self::Node, name: &str, value: Option<&str>);
	/// `None` removes the attribute.
	fn set_attribute_ns(&mut self, node: &Self::Node, namespace: &str, name: &str, value: Option<&str>);
	/// `None` resets the property.
	fn set_property(&mut self, node: &Self::Node, name: &str, value: Option<&Property>);

	/// Registers `sink` for `event` on `node`, replacing any listener the engine registered there before.
	fn add_listener(&mut self, node: &Self::Node, event: &str, sink: Rc<dyn EventSink>, options: ListenerOptions);
	fn listener(&self, node: &Self::Node, event: &str) -> Option<Rc<dyn EventSink>>;
	fn remove_listener(&mut self, node: &Self::Node, event: &str);

	/// The event node recorded on `node` by a tagged render, if any.
	fn event_node(&self, node: &Self::Node) -> Option<Rc<dyn Any>>;
	fn set_event_node(&mut self, node: &Self::Node, event_node: Rc<dyn Any>);

	fn child(&self, parent: &Self::Node, index: usize) -> Option<Self::Node>;
	fn child_count(&self, parent: &Self::Node) -> usize;
	fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

	fn append_child(&mut self, parent: &Self::Node, child: &Self::Node);
	/// Appends if `reference` is `None`.
	fn insert_before(&mut self, parent: &Self::Node, child: &Self::Node, reference: Option<&Self::Node>);
	fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node);
	fn replace_child(&mut self, parent: &Self::Node, new: &Self::Node, old: &Self::Node);

	fn inspect(&self, node: &Self::Node) -> Inspected;

	/// Called once a detached subtree will not be reused, so backends can drop per-node side tables.
	fn release(&mut self, node: &Self::Node) {
		let _ = node;
	}
}
