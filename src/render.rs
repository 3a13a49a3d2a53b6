//! Materializes snapshot nodes as live platform nodes, and applies facts to them.

use crate::{
	event::{EventNode, Handler, Listener},
	facts::{Facts, FactsDiff},
	node::Node,
	platform::{ListenerOptions, Platform},
};
use core::fmt::Debug;
use std::rc::Rc;
use tracing::{instrument, trace, trace_span};

/// Renders `node` and its whole subtree, binding all listeners to `event_node` or the taggers below it.
///
/// The result is detached. Lazy nodes are produced (and cache their result) as needed.
#[instrument(skip(platform, node, event_node))]
pub fn render<N: Clone + PartialEq + Debug, M: 'static>(platform: &mut dyn Platform<Node = N>, node: &Node<N, M>, event_node: &EventNode<M>) -> N {
	render_help(platform, node, event_node)
}

fn render_help<N: Clone + PartialEq + Debug, M: 'static>(platform: &mut dyn Platform<Node = N>, node: &Node<N, M>, event_node: &EventNode<M>) -> N {
	match node {
		Node::Text(text) => {
			if cfg!(feature = "dangerous-logging") {
				trace!(text = &**text, "Creating text node.");
			}
			platform.create_text(text)
		}

		Node::Element(element) => {
			let span = trace_span!("Element", tag = element.tag());
			let _enter = span.enter();

			let dom = platform.create_element(element.tag(), element.namespace());
			apply_facts(platform, &dom, element.facts(), event_node);
			for child in element.children() {
				let child = render_help(platform, child, event_node);
				platform.append_child(&dom, &child);
			}
			dom
		}

		Node::Keyed(keyed) => {
			let span = trace_span!("Keyed", tag = keyed.tag());
			let _enter = span.enter();

			let dom = platform.create_element(keyed.tag(), keyed.namespace());
			apply_facts(platform, &dom, keyed.facts(), event_node);
			for (_, child) in keyed.children() {
				let child = render_help(platform, child, event_node);
				platform.append_child(&dom, &child);
			}
			dom
		}

		Node::Tagged(tagged) => {
			let (transforms, inner) = tagged.chain();
			let tagger = EventNode::tagger(transforms, event_node);
			let dom = render_help(platform, inner, &tagger);
			platform.set_event_node(&dom, tagger.to_any());
			dom
		}

		Node::Lazy(lazy) => render_help(platform, &lazy.force(), event_node),

		Node::Widget(widget) => {
			let span = trace_span!("Widget", identity = widget.widget().identity());
			let _enter = span.enter();

			let dom = widget.widget().render(platform);
			apply_facts(platform, &dom, widget.facts(), event_node);
			dom
		}
	}
}

/// Applies a complete fact set to a fresh node.
pub fn apply_facts<N: Clone + PartialEq + Debug, M: 'static>(platform: &mut dyn Platform<Node = N>, dom: &N, facts: &Facts<M>, event_node: &EventNode<M>) {
	for (name, value) in &facts.styles {
		platform.set_style(dom, name, value);
	}
	for (name, handler) in &facts.events {
		apply_event(platform, dom, name, Some(handler), event_node);
	}
	for (name, value) in &facts.attributes {
		if cfg!(feature = "dangerous-logging") {
			trace!(name = &**name, value = &**value, "Setting attribute.");
		}
		platform.set_attribute(dom, name, Some(value));
	}
	for (name, ns_value) in &facts.namespaced_attributes {
		platform.set_attribute_ns(dom, &ns_value.namespace, name, Some(&ns_value.value));
	}
	for (name, value) in &facts.properties {
		platform.set_property(dom, name, Some(value));
	}
}

pub(crate) fn apply_facts_diff<N: Clone + PartialEq + Debug, M: 'static>(platform: &mut dyn Platform<Node = N>, dom: &N, diff: &FactsDiff<M>, event_node: &EventNode<M>) {
	trace!(changes = diff.len(), "Updating facts.");

	for (name, value) in &diff.styles {
		platform.set_style(dom, name, value);
	}
	for (name, handler) in &diff.events {
		apply_event(platform, dom, name, handler.as_ref(), event_node);
	}
	for (name, value) in &diff.attributes {
		platform.set_attribute(dom, name, value.as_deref());
	}
	for (name, update) in &diff.namespaced_attributes {
		platform.set_attribute_ns(dom, &update.namespace, name, update.value.as_deref());
	}
	for (name, value) in &diff.properties {
		platform.set_property(dom, name, value.as_ref());
	}
}

/// Adds, swaps or removes the engine's listener for `event` on `dom`.
///
/// A handler of unchanged shape is swapped into the existing listener, which keeps its platform registration.
pub(crate) fn apply_event<N: Clone + PartialEq + Debug, M: 'static>(platform: &mut dyn Platform<Node = N>, dom: &N, event: &str, handler: Option<&Handler<M>>, event_node: &EventNode<M>) {
	let existing = platform.listener(dom, event);

	let handler = match handler {
		Some(handler) => handler,
		None => {
			if existing.is_some() {
				trace!(event, "Removing listener.");
				platform.remove_listener(dom, event);
			}
			return;
		}
	};

	if let Some(existing) = existing {
		if let Some(listener) = existing.as_any().downcast_ref::<Listener<M>>() {
			if listener.try_swap(handler) {
				trace!(event, "Swapped handler into existing listener.");
				return;
			}
		}
		trace!(event, "Replacing listener.");
		platform.remove_listener(dom, event);
	}

	let options = ListenerOptions {
		passive: platform.capabilities().passive_events && !handler.may_prevent_default_action(),
	};
	platform.add_listener(dom, event, Rc::new(Listener::new(handler.clone(), event_node.clone())), options);
}
