use std::{any::Any, cell::Cell, rc::Rc};
use studio_vdom::{
	diff,
	memory::{MemoryDom, NodeId},
	Fact, Node, PatchKind, PatchOp, Platform, Root, Widget, WidgetUpdate,
};

type View = Node<NodeId, ()>;

fn mount(view: View) -> (Root<MemoryDom, ()>, NodeId) {
	let mut dom = MemoryDom::default();
	let body = dom.create_element("body", None);
	(Root::mount(dom, &body, view, |_, _| ()), body)
}

fn list(keys: &[&str]) -> View {
	Node::keyed("ul", vec![], keys.iter().map(|key| ((*key).to_owned(), Node::element("li", vec![], vec![Node::text(*key)]))).collect())
}

#[test]
fn create_diff_identical_remove() {
	let view = || Node::element("p", vec![Fact::class("greeting")], vec![Node::text("Hello!")]);
	let (mut root, body) = mount(view());
	assert_eq!(root.platform().serialize(body), "<body><p class=\"greeting\">Hello!</p></body>");

	let created = root.platform().created();
	root.update(view());
	assert_eq!(root.platform().created(), created);

	root.update(Node::element("p", vec![], vec![]));
	assert_eq!(root.platform().serialize(body), "<body><p></p></body>");
	assert_eq!(root.platform().created(), created);

	let dom = root.unmount();
	assert!(dom.children(body).is_empty());
}

#[test]
fn keyed_rotation_moves_live_nodes() {
	let (mut root, _) = mount(list(&["a", "b", "c"]));
	let before = root.platform().children(*root.live()).to_vec();

	root.update(list(&["c", "a", "b"]));

	let after = root.platform().children(*root.live());
	assert_eq!(after, &[before[2], before[0], before[1]][..]);
	assert!(after.iter().all(|node| !root.platform().is_released(*node)));
	assert_eq!(root.platform().serialize(*root.live()), "<ul><li>c</li><li>a</li><li>b</li></ul>");
}

#[test]
fn keyed_swap_and_removal_keep_survivors() {
	let (mut root, _) = mount(list(&["a", "b", "c", "d"]));
	let before = root.platform().children(*root.live()).to_vec();

	root.update(list(&["b", "a", "d"]));

	assert_eq!(root.platform().children(*root.live()), &[before[1], before[0], before[3]][..]);
	assert!(root.platform().is_released(before[2]));
}

#[test]
fn repeated_keys_append_once() {
	let (mut root, _) = mount(list(&["k", "k"]));
	let before = root.platform().children(*root.live()).to_vec();

	let patches = diff(root.snapshot(), &list(&["k", "k", "k"]));
	assert_eq!(patches.len(), 1);
	match &patches[0].op {
		PatchOp::Reorder(reorder) => {
			assert!(reorder.inserts.is_empty());
			assert_eq!(reorder.end_inserts.len(), 1);
		}
		other => panic!("Unexpected {:?}", other),
	}

	root.update(list(&["k", "k", "k"]));
	let after = root.platform().children(*root.live());
	assert_eq!(after.len(), 3);
	assert_eq!(&after[..2], &before[..]);
}

#[test]
fn one_style_change_is_one_fact_update() {
	let view = |color: &str| {
		let mut facts: Vec<_> = (0..10).map(|i| Fact::attribute(format!("data-{}", i), i.to_string())).collect();
		facts.push(Fact::style("color", color));
		Node::element("div", facts, vec![Node::text("styled")])
	};
	let (mut root, _) = mount(view("red"));

	let patches = diff(root.snapshot(), &view("blue"));
	assert_eq!(patches.len(), 1);
	match &patches[0].op {
		PatchOp::Facts(facts) => {
			assert_eq!(facts.len(), 1);
			assert_eq!(facts.styles["color"], "blue");
		}
		other => panic!("Unexpected {:?}", other),
	}

	root.update(view("blue"));
	assert_eq!(root.platform().style(*root.live(), "color"), Some("blue"));
}

#[test]
fn unkeyed_children_truncate_and_grow() {
	let view = |texts: &[&str]| Node::element("div", vec![], texts.iter().map(|text| Node::text(*text)).collect::<Vec<View>>());
	let (mut root, _) = mount(view(&["a", "b", "c", "d", "e"]));
	let first = root.platform().children(*root.live())[0];

	root.update(view(&["a", "x"]));
	assert_eq!(root.platform().serialize(*root.live()), "<div>ax</div>");
	assert_eq!(root.platform().children(*root.live())[0], first);

	root.update(view(&["a", "x", "y", "z"]));
	assert_eq!(root.platform().serialize(*root.live()), "<div>axyz</div>");
	assert_eq!(root.platform().children(*root.live()).len(), 4);
}

#[test]
fn root_replacement_is_tracked() {
	let (mut root, body) = mount(Node::text("loading"));
	let old = *root.live();

	root.update(Node::element("main", vec![], vec![]));

	assert_ne!(*root.live(), old);
	assert!(root.platform().is_released(old));
	assert_eq!(root.platform().children(body), &[*root.live()][..]);
}

#[test]
fn lazy_subtrees_are_reused() {
	let calls = Rc::new(Cell::new(0));
	let identity: Rc<dyn Any> = Rc::new("gallery");
	let view = |label: &str, identity: &Rc<dyn Any>| -> View {
		let calls = calls.clone();
		Node::element(
			"main",
			vec![],
			vec![
				Node::text(label),
				Node::lazy(vec![identity.clone()], move || {
					calls.set(calls.get() + 1);
					Node::element("ul", vec![], vec![Node::text("heavy")])
				}),
			],
		)
	};

	let (mut root, _) = mount(view("a", &identity));
	assert_eq!(calls.get(), 1);

	root.update(view("b", &identity));
	root.update(view("c", &identity));
	assert_eq!(calls.get(), 1);
	assert_eq!(root.platform().serialize(*root.live()), "<main>c<ul>heavy</ul></main>");

	let fresh: Rc<dyn Any> = Rc::new("gallery");
	let patches = diff(root.snapshot(), &view("c", &fresh));
	assert_eq!(calls.get(), 2);
	assert!(patches.is_empty());
}

#[test]
fn lazy_changes_patch_in_place() {
	let view = |text: &'static str| -> View {
		let identity: Rc<dyn Any> = Rc::new(text);
		Node::element("main", vec![], vec![Node::lazy(vec![identity], move || Node::element("p", vec![], vec![Node::text(text)]))])
	};
	let (mut root, _) = mount(view("first"));
	let paragraph = root.platform().children(*root.live())[0];

	let patches = diff(root.snapshot(), &view("second"));
	assert_eq!(patches.iter().map(|patch| (patch.index, patch.kind())).collect::<Vec<_>>(), vec![(1, PatchKind::SubtreePatch)]);

	root.update(view("second"));
	assert_eq!(root.platform().children(*root.live())[0], paragraph);
	assert_eq!(root.platform().serialize(*root.live()), "<main><p>second</p></main>");
}

struct Counter {
	identity: &'static str,
	count: u32,
}

impl Widget<NodeId> for Counter {
	fn identity(&self) -> &str {
		self.identity
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn render(&self, platform: &mut dyn Platform<Node = NodeId>) -> NodeId {
		let node = platform.create_element("output", None);
		let text = platform.create_text(&self.count.to_string());
		platform.append_child(&node, &text);
		node
	}

	fn diff(&self, previous: &dyn Any) -> Option<WidgetUpdate<NodeId>> {
		let previous = previous.downcast_ref::<Self>()?;
		if previous.count == self.count {
			return None;
		}
		let count = self.count;
		Some(Rc::new(move |platform: &mut dyn Platform<Node = NodeId>, node: &NodeId| {
			if let Some(text) = platform.child(node, 0) {
				platform.set_text(&text, &count.to_string());
			}
			*node
		}))
	}
}

#[test]
fn widgets_update_themselves() {
	let view = |identity: &'static str, count: u32| -> View { Node::element("div", vec![], vec![Node::widget(vec![Fact::class("counter")], Rc::new(Counter { identity, count }))]) };
	let (mut root, _) = mount(view("counter", 1));
	let widget = root.platform().children(*root.live())[0];
	assert_eq!(root.platform().serialize(widget), "<output class=\"counter\">1</output>");

	root.update(view("counter", 1));
	root.update(view("counter", 2));
	assert_eq!(root.platform().children(*root.live())[0], widget);
	assert_eq!(root.platform().serialize(widget), "<output class=\"counter\">2</output>");

	root.update(view("other", 2));
	let replacement = root.platform().children(*root.live())[0];
	assert_ne!(replacement, widget);
	assert!(root.platform().is_released(widget));
}

/// Generic over the live node type, without requiring it to be `'static`.
fn widget_identity<N, M>(node: &Node<N, M>) -> Option<&str> {
	match node {
		Node::Widget(widget) => Some(widget.widget().identity()),
		_ => None,
	}
}

#[test]
fn widgets_are_inspectable_generically() {
	let widget: View = Node::widget(vec![], Rc::new(Counter { identity: "counter", count: 0 }));
	assert_eq!(widget_identity(&widget), Some("counter"));
	assert_eq!(widget_identity(&Node::<NodeId, ()>::text("plain")), None);
}

#[test]
fn hydration_reuses_live_nodes() {
	let mut dom = MemoryDom::default();
	let article = dom.create_element("article", None);
	dom.set_attribute(&article, "class", Some("post"));
	let title = dom.create_text("Draft");
	dom.append_child(&article, &title);
	let created = dom.created();

	let root = Root::hydrate(dom, article, Node::element("article", vec![Fact::class("post")], vec![Node::text("Published")]), |_: (), _| ());

	assert_eq!(*root.live(), article);
	assert_eq!(root.platform().children(article), &[title][..]);
	assert_eq!(root.platform().text(title), Some("Published"));
	assert_eq!(root.platform().created(), created);
}

#[test]
fn unmount_releases_everything() {
	let (root, body) = mount(list(&["a", "b"]));
	let live = *root.live();
	let items = root.platform().children(live).to_vec();

	let dom = root.unmount();

	assert!(dom.children(body).is_empty());
	assert!(dom.is_released(live));
	assert!(items.iter().all(|item| dom.is_released(*item)));
}
