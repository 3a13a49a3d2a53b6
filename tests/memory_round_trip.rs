//! Patching a rendered tree must yield the same live structure (and the same event behaviour) as rendering the new tree from scratch.

use std::{any::Any, cell::RefCell, rc::Rc};
use studio_vdom::{
	apply, diff,
	event::Transform,
	memory::{MemoryDom, NodeId},
	render, EventNode, Fact, Handler, Node, Platform, Widget, WidgetUpdate,
};

type TestNode = Node<NodeId, u32>;
type Received = Rc<RefCell<Vec<(u32, bool)>>>;

const TAGS: [&str; 3] = ["div", "span", "section"];
const TEXTS: [&str; 4] = ["", "alpha", "beta", "gamma"];
const KEYS: [&str; 5] = ["a", "b", "c", "d", "e"];
const GAUGES: [&str; 2] = ["gauge", "dial"];

/// A tiny linear congruential generator, so that failing seeds are reproducible.
struct Lcg(u64);

impl Lcg {
	#[allow(clippy::cast_possible_truncation)]
	fn next(&mut self) -> u32 {
		self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
		(self.0 >> 33) as u32
	}

	fn below(&mut self, n: usize) -> usize {
		self.next() as usize % n
	}

	fn chance(&mut self, one_in: usize) -> bool {
		self.below(one_in) == 0
	}
}

/// A `<meter>` showing `value`. Even values are drawn onto a new node, odd ones update the text in place.
struct Gauge {
	identity: &'static str,
	value: u32,
}

fn draw(platform: &mut dyn Platform<Node = NodeId>, value: u32) -> NodeId {
	let meter = platform.create_element("meter", None);
	let text = platform.create_text(&value.to_string());
	platform.append_child(&meter, &text);
	meter
}

impl Widget<NodeId> for Gauge {
	fn identity(&self) -> &str {
		self.identity
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn render(&self, platform: &mut dyn Platform<Node = NodeId>) -> NodeId {
		draw(platform, self.value)
	}

	fn diff(&self, previous: &dyn Any) -> Option<WidgetUpdate<NodeId>> {
		let previous = previous.downcast_ref::<Self>()?;
		if previous.value == self.value {
			return None;
		}
		let value = self.value;
		Some(Rc::new(move |platform: &mut dyn Platform<Node = NodeId>, meter: &NodeId| {
			if value % 2 == 0 {
				return draw(platform, value);
			}
			if let Some(text) = platform.child(meter, 0) {
				platform.set_text(&text, &value.to_string());
			}
			*meter
		}))
	}
}

/// Random trees over shared transforms and lazy contents, so that old and new trees can agree on identities.
struct Trees {
	rng: Lcg,
	transforms: Vec<Transform<u32>>,
	/// Each content doubles as its own lazy identity.
	lazies: Vec<Rc<TestNode>>,
}

fn lazy(content: &Rc<TestNode>) -> TestNode {
	let identity: Rc<dyn Any> = content.clone();
	let content = content.clone();
	Node::lazy(vec![identity], move || (*content).clone())
}

impl Trees {
	fn new(seed: u64) -> Self {
		Self {
			rng: Lcg(seed),
			transforms: vec![
				Rc::new(|n: u32| n.wrapping_add(10)) as Transform<u32>,
				Rc::new(|n: u32| n.wrapping_mul(3)) as Transform<u32>,
				Rc::new(|n: u32| n ^ 0x100) as Transform<u32>,
			],
			lazies: Vec::new(),
		}
	}

	fn transform(&mut self) -> Transform<u32> {
		self.transforms[self.rng.below(self.transforms.len())].clone()
	}

	fn handler(&mut self) -> Handler<u32> {
		match self.rng.below(3) {
			0 => Handler::normal(|_| Some(1)),
			1 => Handler::normal(|_| Some(2)),
			_ => Handler::may_stop_propagation(|_| Some((3, true))),
		}
	}

	fn facts(&mut self) -> Vec<Fact<u32>> {
		let rng = &mut self.rng;
		let mut facts = Vec::new();
		if rng.chance(2) {
			facts.push(Fact::class(TEXTS[rng.below(TEXTS.len())]));
		}
		if rng.chance(3) {
			facts.push(Fact::style("color", ["red", "blue"][rng.below(2)]));
		}
		if rng.chance(4) {
			facts.push(Fact::property("value", TEXTS[rng.below(TEXTS.len())]));
		}
		if rng.chance(5) {
			facts.push(Fact::attribute("title", "thumbnail"));
		}
		if rng.chance(3) {
			facts.push(Fact::on("click", self.handler()));
		}
		facts
	}

	fn tree(&mut self, depth: usize) -> TestNode {
		self.tree_of(depth, true)
	}

	/// Without `composite`, only text, element and keyed nodes are generated.
	fn tree_of(&mut self, depth: usize, composite: bool) -> TestNode {
		let choice = match depth {
			0 => 0,
			_ if composite => self.rng.below(7),
			_ => self.rng.below(4),
		};
		match choice {
			0 => Node::text(TEXTS[self.rng.below(TEXTS.len())]),
			1 | 2 => {
				let children = (0..self.rng.below(4)).map(|_| self.tree_of(depth - 1, composite)).collect();
				Node::element(TAGS[self.rng.below(TAGS.len())], self.facts(), children)
			}
			3 => {
				let children = (0..self.rng.below(5)).map(|_| (KEYS[self.rng.below(KEYS.len())].to_owned(), self.tree_of(depth - 1, composite))).collect();
				Node::keyed("ul", self.facts(), children)
			}
			4 => {
				let inner = self.tree(depth - 1);
				Node::tagged(self.transform(), inner)
			}
			5 => self.lazy(depth),
			_ => self.widget(),
		}
	}

	/// A lazy node over an existing content, or over a new element-rooted one.
	fn lazy(&mut self, depth: usize) -> TestNode {
		if !self.lazies.is_empty() && self.rng.chance(2) {
			let content = self.lazies[self.rng.below(self.lazies.len())].clone();
			return lazy(&content);
		}
		let children = (0..self.rng.below(3)).map(|_| self.tree_of(depth.saturating_sub(1), false)).collect();
		let content = Rc::new(Node::element(TAGS[self.rng.below(TAGS.len())], self.facts(), children));
		self.lazies.push(content.clone());
		lazy(&content)
	}

	fn widget(&mut self) -> TestNode {
		let identity = GAUGES[self.rng.below(GAUGES.len())];
		let value = self.rng.below(4) as u32;
		Node::widget(self.facts(), Rc::new(Gauge { identity, value }))
	}

	/// A variation of `node` that shares most of its structure.
	fn edit(&mut self, node: &TestNode, depth: usize) -> TestNode {
		let depth = depth.saturating_sub(1);
		match node {
			Node::Text(_) if self.rng.chance(3) => Node::text(TEXTS[self.rng.below(TEXTS.len())]),
			_ if self.rng.chance(10) => self.tree(depth),
			Node::Element(element) => {
				let mut children: Vec<_> = element.children().iter().map(|child| self.edit(child, depth)).collect();
				match self.rng.below(4) {
					0 => children.truncate(self.rng.below(children.len() + 1)),
					1 => children.push(self.tree(depth)),
					_ => (),
				}
				let facts = if self.rng.chance(2) { self.facts() } else { Vec::new() };
				Node::element(element.tag(), facts, children)
			}
			Node::Keyed(keyed) => {
				let mut children: Vec<_> = keyed.children().iter().map(|(key, child)| (key.clone(), self.edit(child, depth))).collect();
				for _ in 0..self.rng.below(4) {
					match self.rng.below(3) {
						0 if !children.is_empty() => {
							let at = self.rng.below(children.len());
							children.remove(at);
						}
						1 => {
							let at = self.rng.below(children.len() + 1);
							children.insert(at, (KEYS[self.rng.below(KEYS.len())].to_owned(), self.tree(depth)));
						}
						_ if children.len() >= 2 => {
							let at = self.rng.below(children.len() - 1);
							children.swap(at, at + 1);
						}
						_ => (),
					}
				}
				Node::keyed("ul", self.facts(), children)
			}
			Node::Tagged(tagged) => {
				let inner = self.edit(tagged.inner(), depth);
				match self.rng.below(5) {
					0 => Node::tagged(self.transform(), inner),
					1 => inner,
					2 => {
						let outer = self.transform();
						Node::tagged(outer, Node::tagged(tagged.transform().clone(), inner))
					}
					_ => Node::tagged(tagged.transform().clone(), inner),
				}
			}
			Node::Lazy(old) => match self.rng.below(3) {
				0 => self.lazy(depth),
				_ => match self.lazies.iter().find(|content| matches!(lazy(content), Node::Lazy(candidate) if candidate.same_identity(old))) {
					Some(content) => lazy(content),
					None => node.clone(),
				},
			},
			Node::Widget(widget) => {
				let identity = widget.widget().as_any().downcast_ref::<Gauge>().map_or(GAUGES[0], |gauge| gauge.identity);
				let value = self.rng.below(4) as u32;
				let facts = if self.rng.chance(2) { self.facts() } else { Vec::new() };
				Node::widget(facts, Rc::new(Gauge { identity, value }))
			}
			other => other.clone(),
		}
	}
}

fn recording_root() -> (EventNode<u32>, Received) {
	let received = Received::default();
	let event_node = {
		let received = received.clone();
		EventNode::root(move |message, synchronous| received.borrow_mut().push((message, synchronous)))
	};
	(event_node, received)
}

fn pre_order(dom: &MemoryDom, node: NodeId, out: &mut Vec<NodeId>) {
	out.push(node);
	for child in dom.children(node) {
		pre_order(dom, *child, out);
	}
}

/// Clicks each node of the subtree in turn, returning what every click dispatched.
fn click_all(dom: &MemoryDom, root: NodeId, received: &Received) -> Vec<Vec<(u32, bool)>> {
	let mut nodes = Vec::new();
	pre_order(dom, root, &mut nodes);
	nodes
		.into_iter()
		.map(|node| {
			dom.fire(node, "click", &());
			received.borrow_mut().drain(..).collect()
		})
		.collect()
}

fn assert_attached_nodes_live(dom: &MemoryDom, node: NodeId) {
	assert!(!dom.is_released(node), "{:?} is attached but released.", node);
	for child in dom.children(node) {
		assert_eq!(dom.parent(child), Some(node));
		assert_attached_nodes_live(dom, *child);
	}
}

fn assert_round_trip(old: &TestNode, new: &TestNode) {
	let (event_node, received) = recording_root();
	let mut dom = MemoryDom::default();
	let container = dom.create_element("main", None);
	let live = render(&mut dom, old, &event_node);
	dom.append_child(&container, &live);

	let patches = diff(old, new);
	let live = apply(&mut dom, &live, old, &patches, &event_node);

	let (fresh_event_node, fresh_received) = recording_root();
	let mut fresh = MemoryDom::default();
	let expected = render(&mut fresh, new, &fresh_event_node);

	assert_eq!(dom.children(container), &[live][..]);
	assert_eq!(dom.serialize(live), fresh.serialize(expected), "Patches: {:#?}", patches);
	assert_attached_nodes_live(&dom, container);
	assert_eq!(click_all(&dom, live, &received), click_all(&fresh, expected, &fresh_received), "Patches: {:#?}", patches);
	assert!(diff(new, new).is_empty());
}

#[test]
fn edited_trees() {
	for seed in 0..500 {
		let mut trees = Trees::new(seed);
		let old = trees.tree(4);
		let new = trees.edit(&old, 4);
		assert_round_trip(&old, &new);
	}
}

#[test]
fn unrelated_trees() {
	for seed in 0..200 {
		let mut trees = Trees::new(seed);
		let old = trees.tree(3);
		let new = trees.tree(3);
		assert_round_trip(&old, &new);
	}
}

#[test]
fn repeated_edits() {
	let mut trees = Trees::new(7);
	let mut old = Node::keyed("ul", vec![], KEYS.iter().map(|key| ((*key).to_owned(), Node::text(*key))).collect());
	for _ in 0..100 {
		let new = trees.edit(&old, 3);
		assert_round_trip(&old, &new);
		old = new;
	}
}
