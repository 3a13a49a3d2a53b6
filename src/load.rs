//! Turns existing live content into a snapshot, so that it can be patched instead of re-rendered.

use crate::{
	facts::{normalize, Fact},
	node::{Element, Node},
	platform::{Inspected, Platform},
};
use core::fmt::Debug;
use std::rc::Rc;
use tracing::{instrument, trace};

/// Mirrors the live subtree at `live`: text as text, elements with their attributes and children.
///
/// Other live nodes (like comments) become empty text. Names and values are taken verbatim, without sanitizing.
#[instrument(skip(platform))]
pub fn virtualize<N: Clone + PartialEq + Debug, M>(platform: &dyn Platform<Node = N>, live: &N) -> Node<N, M> {
	virtualize_node(platform, live)
}

fn virtualize_node<N: Clone + PartialEq + Debug, M>(platform: &dyn Platform<Node = N>, live: &N) -> Node<N, M> {
	match platform.inspect(live) {
		Inspected::Text(text) => Node::text(text),
		Inspected::Element { tag, namespace, attributes } => {
			let facts = normalize(attributes.into_iter().map(|(name, value)| Fact::Attribute { name, value }));
			let children = (0..platform.child_count(live))
				.filter_map(|i| platform.child(live, i))
				.map(|child| virtualize_node(platform, &child))
				.collect();
			Node::Element(Rc::new(Element::new(tag, namespace, facts, children)))
		}
		Inspected::Other => {
			trace!("Virtualizing {:?} as empty text.", live);
			Node::text("")
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{diff::diff, memory::MemoryDom};

	#[test]
	fn virtualized_trees_match_their_source() {
		let mut dom = MemoryDom::default();
		let gallery = dom.create_element("section", None);
		dom.set_attribute(&gallery, "class", Some("gallery"));
		let caption = dom.create_text("Renders");
		dom.append_child(&gallery, &caption);

		let virtualized: Node<_, ()> = virtualize(&dom, &gallery);
		let expected = Node::element("section", vec![Fact::class("gallery")], vec![Node::text("Renders")]);

		assert!(diff(&virtualized, &expected).is_empty());
	}

	#[test]
	fn script_content_is_mirrored_verbatim() {
		let mut dom = MemoryDom::default();
		let script = dom.create_element("script", None);

		match virtualize::<_, ()>(&dom, &script) {
			Node::Element(element) => assert_eq!(element.tag(), "script"),
			other => panic!("Unexpected {:?}", other),
		}
	}
}
