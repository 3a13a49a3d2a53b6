//! A headless [`Platform`] backed by an arena of nodes.
//!
//! Nodes are never freed, so [`NodeId`]s stay valid (and comparable) for the lifetime of the [`MemoryDom`].
//! Released nodes only drop their listeners and event nodes. The arena therefore grows with every node an update creates,
//! which suits tests and short-lived headless renders, not a long-running [`Root`](`crate::Root`).
//!
//! It can [`fire`](`MemoryDom::fire`) events with bubbling, and [`serialize`](`MemoryDom::serialize`) subtrees for structural comparison.

use crate::{
	event::{EventOutcome, EventSink},
	facts::Property,
	platform::{Capabilities, Inspected, ListenerOptions, Platform},
};
use core::{
	any::Any,
	fmt::{self, Debug, Formatter, Write},
};
use std::{collections::BTreeMap, rc::Rc};
use tracing::{error, trace, trace_span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

enum Data {
	Text(String),
	Element {
		tag: String,
		namespace: Option<String>,
		attributes: BTreeMap<String, String>,
		/// By name: namespace and value.
		namespaced_attributes: BTreeMap<String, (String, String)>,
		styles: BTreeMap<String, String>,
		properties: BTreeMap<String, Property>,
	},
	Fragment,
}

struct Entry {
	data: Data,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
	listeners: BTreeMap<String, (Rc<dyn EventSink>, ListenerOptions)>,
	event_node: Option<Rc<dyn Any>>,
	released: bool,
}

#[derive(Default)]
pub struct MemoryDom {
	nodes: Vec<Entry>,
	capabilities: Capabilities,
	registrations: usize,
}

impl Debug for MemoryDom {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryDom")
			.field("nodes", &self.nodes.len())
			.field("capabilities", &self.capabilities)
			.field("registrations", &self.registrations)
			.finish()
	}
}

impl MemoryDom {
	#[must_use]
	pub fn new(capabilities: Capabilities) -> Self {
		Self {
			nodes: Vec::new(),
			capabilities,
			registrations: 0,
		}
	}

	/// How many nodes (including fragments) were ever created.
	#[must_use]
	pub fn created(&self) -> usize {
		self.nodes.len()
	}

	/// How many times a listener was registered.
	#[must_use]
	pub fn registrations(&self) -> usize {
		self.registrations
	}

	#[must_use]
	pub fn is_released(&self, node: NodeId) -> bool {
		self.get(node).map_or(false, |entry| entry.released)
	}

	#[must_use]
	pub fn children(&self, node: NodeId) -> &[NodeId] {
		self.get(node).map_or(&[][..], |entry| entry.children.as_slice())
	}

	#[must_use]
	pub fn tag(&self, node: NodeId) -> Option<&str> {
		match &self.get(node)?.data {
			Data::Element { tag, .. } => Some(tag),
			Data::Text(_) | Data::Fragment => None,
		}
	}

	#[must_use]
	pub fn text(&self, node: NodeId) -> Option<&str> {
		match &self.get(node)?.data {
			Data::Text(text) => Some(text),
			Data::Element { .. } | Data::Fragment => None,
		}
	}

	#[must_use]
	pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
		match &self.get(node)?.data {
			Data::Element { attributes, .. } => attributes.get(name).map(String::as_str),
			Data::Text(_) | Data::Fragment => None,
		}
	}

	#[must_use]
	pub fn style(&self, node: NodeId, name: &str) -> Option<&str> {
		match &self.get(node)?.data {
			Data::Element { styles, .. } => styles.get(name).map(String::as_str),
			Data::Text(_) | Data::Fragment => None,
		}
	}

	#[must_use]
	pub fn property(&self, node: NodeId, name: &str) -> Option<&Property> {
		match &self.get(node)?.data {
			Data::Element { properties, .. } => properties.get(name),
			Data::Text(_) | Data::Fragment => None,
		}
	}

	#[must_use]
	pub fn listener_options(&self, node: NodeId, event: &str) -> Option<ListenerOptions> {
		self.get(node)?.listeners.get(event).map(|(_, options)| *options)
	}

	/// Dispatches `event` at `target`, then bubbles it up through the ancestors until a listener stops propagation.
	///
	/// `payload` is what handler decoders receive.
	pub fn fire(&self, target: NodeId, event: &str, payload: &dyn Any) -> EventOutcome {
		let span = trace_span!("Firing event", ?target, event);
		let _enter = span.enter();

		let mut outcome = EventOutcome::default();
		let mut current = Some(target);
		while let Some(node) = current {
			let entry = match self.get(node) {
				Some(entry) => entry,
				None => break,
			};
			if let Some((sink, _)) = entry.listeners.get(event) {
				let handled = sink.handle(payload);
				outcome.prevent_default |= handled.prevent_default;
				if handled.stop_propagation {
					outcome.stop_propagation = true;
					trace!(?node, "Propagation stopped.");
					break;
				}
			}
			current = entry.parent;
		}
		outcome
	}

	/// An HTML-like rendering of the subtree at `node`, with properties as `.name=value` and listeners as `@event`.
	///
	/// Attributes, styles, properties and listeners are listed in name order, so structurally equal trees serialize equally.
	#[must_use]
	pub fn serialize(&self, node: NodeId) -> String {
		let mut serialized = String::new();
		self.serialize_into(node, &mut serialized);
		serialized
	}

	fn serialize_into(&self, node: NodeId, out: &mut String) {
		let entry = match self.get(node) {
			Some(entry) => entry,
			None => return,
		};
		match &entry.data {
			Data::Text(text) => out.push_str(text),
			Data::Fragment => {
				for child in &entry.children {
					self.serialize_into(*child, out);
				}
			}
			Data::Element {
				tag,
				namespace,
				attributes,
				namespaced_attributes,
				styles,
				properties,
			} => {
				out.push('<');
				out.push_str(tag);
				// Writing to a `String` can't fail.
				if let Some(namespace) = namespace {
					let _ = write!(out, " xmlns=\"{}\"", namespace);
				}
				for (name, value) in attributes {
					let _ = write!(out, " {}=\"{}\"", name, value);
				}
				for (name, (namespace, value)) in namespaced_attributes {
					let _ = write!(out, " {{{}}}{}=\"{}\"", namespace, name, value);
				}
				if !styles.is_empty() {
					out.push_str(" style=\"");
					for (name, value) in styles {
						let _ = write!(out, "{}: {};", name, value);
					}
					out.push('"');
				}
				for (name, value) in properties {
					let _ = write!(out, " .{}={:?}", name, value);
				}
				for event in entry.listeners.keys() {
					let _ = write!(out, " @{}", event);
				}
				out.push('>');
				for child in &entry.children {
					self.serialize_into(*child, out);
				}
				let _ = write!(out, "</{}>", tag);
			}
		}
	}

	fn get(&self, node: NodeId) -> Option<&Entry> {
		let entry = self.nodes.get(node.0 as usize);
		if entry.is_none() {
			error!(?node, "Unknown node.");
		}
		entry
	}

	fn get_mut(&mut self, node: NodeId) -> Option<&mut Entry> {
		let entry = self.nodes.get_mut(node.0 as usize);
		if entry.is_none() {
			error!(?node, "Unknown node.");
		}
		entry
	}

	fn element_mut(&mut self, node: NodeId) -> Option<&mut Data> {
		let entry = self.get_mut(node)?;
		match &mut entry.data {
			data @ Data::Element { .. } => Some(data),
			Data::Text(_) | Data::Fragment => {
				error!(?node, "Expected an element.");
				None
			}
		}
	}

	#[allow(clippy::cast_possible_truncation)]
	fn push(&mut self, data: Data) -> NodeId {
		let id = NodeId(self.nodes.len() as u32);
		self.nodes.push(Entry {
			data,
			parent: None,
			children: Vec::new(),
			listeners: BTreeMap::new(),
			event_node: None,
			released: false,
		});
		id
	}

	fn detach(&mut self, node: NodeId) {
		if let Some(parent) = self.get(node).and_then(|entry| entry.parent) {
			if let Some(parent) = self.get_mut(parent) {
				parent.children.retain(|child| *child != node);
			}
			if let Some(entry) = self.get_mut(node) {
				entry.parent = None;
			}
		}
	}

	/// Inserts `child` (or a fragment's children, in order) into `parent` before `reference`, or last.
	fn insert(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
		let moving = match self.get(child) {
			Some(Entry { data: Data::Fragment, children, .. }) => children.clone(),
			Some(_) => vec![child],
			None => return,
		};
		for node in moving {
			self.detach(node);
			if let Some(entry) = self.get_mut(node) {
				entry.parent = Some(parent);
			}
			if let Some(parent) = self.get_mut(parent) {
				let at = reference
					.and_then(|reference| parent.children.iter().position(|child| *child == reference))
					.unwrap_or_else(|| parent.children.len());
				parent.children.insert(at, node);
			}
		}
	}
}

impl Platform for MemoryDom {
	type Node = NodeId;

	fn capabilities(&self) -> Capabilities {
		self.capabilities
	}

	fn create_text(&mut self, text: &str) -> NodeId {
		self.push(Data::Text(text.to_owned()))
	}

	fn create_element(&mut self, tag: &str, namespace: Option<&str>) -> NodeId {
		self.push(Data::Element {
			tag: tag.to_owned(),
			namespace: namespace.map(ToOwned::to_owned),
			attributes: BTreeMap::new(),
			namespaced_attributes: BTreeMap::new(),
			styles: BTreeMap::new(),
			properties: BTreeMap::new(),
		})
	}

	fn create_fragment(&mut self) -> NodeId {
		self.push(Data::Fragment)
	}

	fn set_text(&mut self, node: &NodeId, text: &str) {
		match self.get_mut(*node).map(|entry| &mut entry.data) {
			Some(Data::Text(current)) => text.clone_into(current),
			Some(_) => error!(?node, "Expected a text node."),
			None => (),
		}
	}

	fn set_style(&mut self, node: &NodeId, name: &str, value: &str) {
		if let Some(Data::Element { styles, .. }) = self.element_mut(*node) {
			if value.is_empty() {
				styles.remove(name);
			} else {
				styles.insert(name.to_owned(), value.to_owned());
			}
		}
	}

	fn set_attribute(&mut self, node: &NodeId, name: &str, value: Option<&str>) {
		if let Some(Data::Element { attributes, .. }) = self.element_mut(*node) {
			match value {
				Some(value) => attributes.insert(name.to_owned(), value.to_owned()),
				None => attributes.remove(name),
			};
		}
	}

	fn set_attribute_ns(&mut self, node: &NodeId, namespace: &str, name: &str, value: Option<&str>) {
		if let Some(Data::Element { namespaced_attributes, .. }) = self.element_mut(*node) {
			match value {
				Some(value) => namespaced_attributes.insert(name.to_owned(), (namespace.to_owned(), value.to_owned())),
				None => namespaced_attributes.remove(name),
			};
		}
	}

	fn set_property(&mut self, node: &NodeId, name: &str, value: Option<&Property>) {
		if let Some(Data::Element { properties, .. }) = self.element_mut(*node) {
			match value {
				Some(value) => properties.insert(name.to_owned(), value.clone()),
				None => properties.remove(name),
			};
		}
	}

	fn add_listener(&mut self, node: &NodeId, event: &str, sink: Rc<dyn EventSink>, options: ListenerOptions) {
		if let Some(entry) = self.get_mut(*node) {
			entry.listeners.insert(event.to_owned(), (sink, options));
			self.registrations += 1;
		}
	}

	fn listener(&self, node: &NodeId, event: &str) -> Option<Rc<dyn EventSink>> {
		self.get(*node)?.listeners.get(event).map(|(sink, _)| sink.clone())
	}

	fn remove_listener(&mut self, node: &NodeId, event: &str) {
		if let Some(entry) = self.get_mut(*node) {
			entry.listeners.remove(event);
		}
	}

	fn event_node(&self, node: &NodeId) -> Option<Rc<dyn Any>> {
		self.get(*node)?.event_node.clone()
	}

	fn set_event_node(&mut self, node: &NodeId, event_node: Rc<dyn Any>) {
		if let Some(entry) = self.get_mut(*node) {
			entry.event_node = Some(event_node);
		}
	}

	fn child(&self, parent: &NodeId, index: usize) -> Option<NodeId> {
		self.get(*parent)?.children.get(index).copied()
	}

	fn child_count(&self, parent: &NodeId) -> usize {
		self.children(*parent).len()
	}

	fn parent(&self, node: &NodeId) -> Option<NodeId> {
		self.get(*node)?.parent
	}

	fn append_child(&mut self, parent: &NodeId, child: &NodeId) {
		self.insert(*parent, *child, None);
	}

	fn insert_before(&mut self, parent: &NodeId, child: &NodeId, reference: Option<&NodeId>) {
		let reference = reference.copied().filter(|reference| {
			let found = self.parent(reference) == Some(*parent);
			if !found {
				error!(?parent, ?reference, "Reference node is not a child. Appending instead.");
			}
			found
		});
		self.insert(*parent, *child, reference);
	}

	fn remove_child(&mut self, parent: &NodeId, child: &NodeId) {
		if self.parent(child) == Some(*parent) {
			self.detach(*child);
		} else {
			error!(?parent, ?child, "Not a child of this parent.");
		}
	}

	fn replace_child(&mut self, parent: &NodeId, new: &NodeId, old: &NodeId) {
		if self.parent(old) == Some(*parent) {
			self.insert(*parent, *new, Some(*old));
			self.detach(*old);
		} else {
			error!(?parent, ?old, "Replaced node is not a child.");
		}
	}

	fn inspect(&self, node: &NodeId) -> Inspected {
		match self.get(*node).map(|entry| &entry.data) {
			Some(Data::Text(text)) => Inspected::Text(text.clone()),
			Some(Data::Element { tag, namespace, attributes, .. }) => Inspected::Element {
				tag: tag.clone(),
				namespace: namespace.clone(),
				attributes: attributes.iter().map(|(name, value)| (name.clone(), value.clone())).collect(),
			},
			Some(Data::Fragment) | None => Inspected::Other,
		}
	}

	fn release(&mut self, node: &NodeId) {
		let mut pending = vec![*node];
		while let Some(node) = pending.pop() {
			if let Some(entry) = self.get_mut(node) {
				entry.listeners.clear();
				entry.event_node = None;
				entry.released = true;
				pending.extend(entry.children.iter().copied());
			}
		}
	}
}
