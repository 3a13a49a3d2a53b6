//! A [`Platform`] on top of the browser DOM via [`web_sys`].
//!
//! Per-node engine state (listeners and event nodes) lives in side tables on the [`WebPlatform`],
//! keyed by a numeric id that is stored on each node as a plain JavaScript property on first use.
//! [`release`](`Platform::release`) drops that state for discarded subtrees.

use crate::{
	event::EventSink,
	facts::Property,
	platform::{Capabilities, Inspected, ListenerOptions, Platform},
};
use core::{
	any::Any,
	cell::Cell,
	convert::TryFrom,
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use js_sys::{Function, Object, Reflect};
use std::rc::Rc;
use tracing::{error, instrument, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue, UnwrapThrowExt};

const ID_PROPERTY: &str = "__studioVdomId";
const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Detects which optional DOM features the current browser supports.
///
/// Call this once at startup and hand the result to [`WebPlatform::new`].
#[must_use]
#[instrument]
pub fn detect_capabilities() -> Capabilities {
	let window = match web_sys::window() {
		Some(window) => window,
		None => {
			warn!("No `window` found. Assuming no optional capabilities.");
			return Capabilities::default();
		}
	};

	let passive_events = Rc::new(Cell::new(false));
	let getter = {
		let passive_events = passive_events.clone();
		Closure::wrap(Box::new(move || {
			passive_events.set(true);
			JsValue::FALSE
		}) as Box<dyn Fn() -> JsValue>)
	};

	let descriptor = Object::new();
	if let Err(error) = Reflect::set(&descriptor, &JsValue::from_str("get"), getter.as_ref()) {
		error!("Failed to build the passive listener probe: {:?}", error);
		return Capabilities::default();
	}
	let options = Object::define_property(&Object::new(), &JsValue::from_str("passive"), &descriptor);

	let noop = Function::new_no_args("");
	if window
		.add_event_listener_with_callback_and_add_event_listener_options("studio-vdom-probe", &noop, options.unchecked_ref())
		.is_ok()
	{
		let _ = window.remove_event_listener_with_callback("studio-vdom-probe", &noop);
	}

	let capabilities = Capabilities {
		passive_events: passive_events.get(),
	};
	trace!(?capabilities, "Detected capabilities.");
	capabilities
}

struct Registration {
	sink: Rc<dyn EventSink>,
	closure: Closure<dyn Fn(web_sys::Event)>,
}

#[derive(Default)]
struct SideTable {
	event_node: Option<Rc<dyn Any>>,
	listeners: HashMap<String, Registration>,
}

pub struct WebPlatform {
	document: web_sys::Document,
	capabilities: Capabilities,
	next_id: u32,
	side_tables: HashMap<u32, SideTable>,
	event_listener_options_cache: [Option<web_sys::AddEventListenerOptions>; 2],
}

impl Debug for WebPlatform {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebPlatform")
			.field("document", &self.document)
			.field("capabilities", &self.capabilities)
			.field("side_tables", &self.side_tables.len())
			.finish()
	}
}

impl WebPlatform {
	#[must_use]
	pub fn new(document: web_sys::Document, capabilities: Capabilities) -> Self {
		Self {
			document,
			capabilities,
			next_id: 0,
			side_tables: HashMap::new(),
			event_listener_options_cache: [None, None],
		}
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	/// The number of nodes that currently carry engine state.
	#[must_use]
	pub fn tracked_nodes(&self) -> usize {
		self.side_tables.len()
	}

	fn get_cached_add_event_listener_options(event_listener_options_cache: &mut [Option<web_sys::AddEventListenerOptions>; 2], options: ListenerOptions) -> &web_sys::AddEventListenerOptions {
		let entry = event_listener_options_cache.get_mut(usize::from(options.passive)).unwrap_throw();

		if entry.is_none() {
			let mut web_options = web_sys::AddEventListenerOptions::new();
			web_options.passive(options.passive);
			*entry = Some(web_options)
		}

		entry.as_ref().unwrap_throw()
	}

	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	fn existing_id(node: &web_sys::Node) -> Option<u32> {
		Reflect::get(node, &JsValue::from_str(ID_PROPERTY))
			.ok()
			.and_then(|id| id.as_f64())
			.and_then(|id| if id.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&id) { Some(id as u32) } else { None })
	}

	fn id(&mut self, node: &web_sys::Node) -> Option<u32> {
		if let Some(id) = Self::existing_id(node) {
			return Some(id);
		}

		let id = self.next_id;
		match Reflect::set(node, &JsValue::from_str(ID_PROPERTY), &JsValue::from(id)) {
			Ok(true) => {
				self.next_id += 1;
				Some(id)
			}
			Ok(false) => {
				error!("Node {:?} rejected its id.", node);
				None
			}
			Err(error) => {
				error!("Failed to assign an id to {:?}: {:?}", node, error);
				None
			}
		}
	}

	fn side_table(&self, node: &web_sys::Node) -> Option<&SideTable> {
		self.side_tables.get(&Self::existing_id(node)?)
	}

	fn side_table_mut(&mut self, node: &web_sys::Node) -> Option<&mut SideTable> {
		let id = self.id(node)?;
		Some(self.side_tables.entry(id).or_default())
	}

	fn element<'a>(node: &'a web_sys::Node, operation: &str) -> Option<&'a web_sys::Element> {
		let element = node.dyn_ref::<web_sys::Element>();
		if element.is_none() {
			error!("Can't {} on non-element {:?}.", operation, node);
		}
		element
	}

	fn unregister(node: &web_sys::Node, event: &str, registration: &Registration) {
		let target: &web_sys::EventTarget = node.as_ref();
		if let Err(error) = target.remove_event_listener_with_callback(event, registration.closure.as_ref().unchecked_ref()) {
			error!("Failed to remove event listener {:?}: {:?}", event, error)
		}
	}
}

impl Platform for WebPlatform {
	type Node = web_sys::Node;

	fn capabilities(&self) -> Capabilities {
		self.capabilities
	}

	fn create_text(&mut self, text: &str) -> web_sys::Node {
		self.document.create_text_node(text).into()
	}

	fn create_element(&mut self, tag: &str, namespace: Option<&str>) -> web_sys::Node {
		let created = match namespace {
			Some(namespace) => self.document.create_element_ns(Some(namespace), tag),
			None => self.document.create_element(tag),
		};
		match created {
			Ok(element) => element.into(),
			Err(error) => {
				error!("Failed to create <{}> (namespace {:?}): {:?}. Rendering an empty text node instead.", tag, namespace, error);
				self.document.create_text_node("").into()
			}
		}
	}

	fn create_fragment(&mut self) -> web_sys::Node {
		self.document.create_document_fragment().into()
	}

	fn set_text(&mut self, node: &web_sys::Node, text: &str) {
		match node.dyn_ref::<web_sys::CharacterData>() {
			Some(character_data) => character_data.set_data(text),
			None => error!("Can't set text of {:?}.", node),
		}
	}

	fn set_style(&mut self, node: &web_sys::Node, name: &str, value: &str) {
		let style = if let Some(html_element) = node.dyn_ref::<web_sys::HtmlElement>() {
			html_element.style()
		} else if let Some(svg_element) = node.dyn_ref::<web_sys::SvgElement>() {
			svg_element.style()
		} else {
			return error!("Can't style {:?}.", node);
		};

		let result = if value.is_empty() { style.remove_property(name).map(drop) } else { style.set_property(name, value) };
		if let Err(error) = result {
			error!("Failed to set style {:?}: {:?}", name, error)
		}
	}

	fn set_attribute(&mut self, node: &web_sys::Node, name: &str, value: Option<&str>) {
		let element = match Self::element(node, "set attribute") {
			Some(element) => element,
			None => return,
		};
		let result = match value {
			Some(value) => element.set_attribute(name, value),
			None => element.remove_attribute(name),
		};
		if let Err(error) = result {
			error!("Failed to update attribute {:?}: {:?}", name, error)
		}
	}

	fn set_attribute_ns(&mut self, node: &web_sys::Node, namespace: &str, name: &str, value: Option<&str>) {
		let element = match Self::element(node, "set namespaced attribute") {
			Some(element) => element,
			None => return,
		};
		let result = match value {
			Some(value) => element.set_attribute_ns(Some(namespace), name, value),
			None => element.remove_attribute_ns(Some(namespace), name),
		};
		if let Err(error) = result {
			error!("Failed to update attribute {:?} in namespace {:?}: {:?}", name, namespace, error)
		}
	}

	fn set_property(&mut self, node: &web_sys::Node, name: &str, value: Option<&Property>) {
		let key = JsValue::from_str(name);
		let value = match value {
			Some(Property::Bool(value)) => JsValue::from_bool(*value),
			Some(Property::Number(value)) => JsValue::from_f64(*value),
			Some(Property::Text(value)) => JsValue::from_str(value),
			Some(Property::Null) => JsValue::NULL,
			// Resetting a string property to `null` would often stringify it.
			None => match Reflect::get(node, &key) {
				Ok(current) if current.is_string() => JsValue::from_str(""),
				_ => JsValue::NULL,
			},
		};
		if let Err(error) = Reflect::set(node, &key, &value) {
			error!("Failed to set property {:?}: {:?}", name, error)
		}
	}

	#[instrument(skip(self, sink))]
	fn add_listener(&mut self, node: &web_sys::Node, event: &str, sink: Rc<dyn EventSink>, options: ListenerOptions) {
		self.remove_listener(node, event);

		let closure = {
			let sink = sink.clone();
			Closure::wrap(Box::new(move |event: web_sys::Event| {
				let outcome = sink.handle(&event);
				if outcome.stop_propagation {
					event.stop_propagation();
				}
				if outcome.prevent_default {
					event.prevent_default();
				}
			}) as Box<dyn Fn(web_sys::Event)>)
		};

		let target: &web_sys::EventTarget = node.as_ref();
		// Browsers without options support would read the options object as a truthy `useCapture`.
		let result = if self.capabilities.passive_events {
			target.add_event_listener_with_callback_and_add_event_listener_options(
				event,
				closure.as_ref().unchecked_ref(),
				Self::get_cached_add_event_listener_options(&mut self.event_listener_options_cache, options),
			)
		} else {
			target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
		};
		if let Err(error) = result {
			return error!("Failed to add event listener {:?}: {:?}", event, error);
		}

		if let Some(side_table) = self.side_table_mut(node) {
			side_table.listeners.insert(event.to_owned(), Registration { sink, closure });
		}
	}

	fn listener(&self, node: &web_sys::Node, event: &str) -> Option<Rc<dyn EventSink>> {
		self.side_table(node)?.listeners.get(event).map(|registration| registration.sink.clone())
	}

	fn remove_listener(&mut self, node: &web_sys::Node, event: &str) {
		let removed = Self::existing_id(node)
			.and_then(|id| self.side_tables.get_mut(&id))
			.and_then(|side_table| side_table.listeners.remove(event));
		if let Some(registration) = removed {
			Self::unregister(node, event, &registration);
		}
	}

	fn event_node(&self, node: &web_sys::Node) -> Option<Rc<dyn Any>> {
		self.side_table(node)?.event_node.clone()
	}

	fn set_event_node(&mut self, node: &web_sys::Node, event_node: Rc<dyn Any>) {
		if let Some(side_table) = self.side_table_mut(node) {
			side_table.event_node = Some(event_node);
		}
	}

	fn child(&self, parent: &web_sys::Node, index: usize) -> Option<web_sys::Node> {
		parent.child_nodes().item(u32::try_from(index).ok()?)
	}

	fn child_count(&self, parent: &web_sys::Node) -> usize {
		parent.child_nodes().length() as usize
	}

	fn parent(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.parent_node()
	}

	fn append_child(&mut self, parent: &web_sys::Node, child: &web_sys::Node) {
		if let Err(error) = parent.append_child(child) {
			error!("Failed to append {:?} to {:?}: {:?}", child, parent, error)
		}
	}

	fn insert_before(&mut self, parent: &web_sys::Node, child: &web_sys::Node, reference: Option<&web_sys::Node>) {
		if let Err(error) = parent.insert_before(child, reference) {
			error!("Failed to insert {:?} into {:?}: {:?}", child, parent, error)
		}
	}

	fn remove_child(&mut self, parent: &web_sys::Node, child: &web_sys::Node) {
		if let Err(error) = parent.remove_child(child) {
			error!("Failed to remove {:?} from {:?}: {:?}", child, parent, error)
		}
	}

	fn replace_child(&mut self, parent: &web_sys::Node, new: &web_sys::Node, old: &web_sys::Node) {
		if let Err(error) = parent.replace_child(new, old) {
			error!("Failed to replace {:?} with {:?}: {:?}", old, new, error)
		}
	}

	fn inspect(&self, node: &web_sys::Node) -> Inspected {
		if let Some(text) = node.dyn_ref::<web_sys::Text>() {
			return Inspected::Text(text.data());
		}
		let element = match node.dyn_ref::<web_sys::Element>() {
			Some(element) => element,
			None => return Inspected::Other,
		};

		let attributes = element.attributes();
		let attributes = (0..attributes.length())
			.filter_map(|i| attributes.item(i))
			.map(|attribute| (attribute.local_name(), attribute.value()))
			.collect();
		Inspected::Element {
			tag: element.local_name(),
			namespace: element.namespace_uri().filter(|namespace| namespace != XHTML_NAMESPACE),
			attributes,
		}
	}

	fn release(&mut self, node: &web_sys::Node) {
		let mut pending = vec![node.clone()];
		while let Some(node) = pending.pop() {
			if let Some(side_table) = Self::existing_id(&node).and_then(|id| self.side_tables.remove(&id)) {
				for (event, registration) in &side_table.listeners {
					Self::unregister(&node, event, registration);
				}
			}
			let children = node.child_nodes();
			pending.extend((0..children.length()).filter_map(|i| children.item(i)));
		}
	}
}
