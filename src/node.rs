//! The immutable node model: one snapshot of a UI tree per render cycle.
//!
//! Composite nodes record their subtree size (the number of descendants, excluding themselves) at construction.
//! Numbering a tree depth-first, a node at index `i` then owns exactly the indices `i..=i + subtree_size`,
//! which is what lets the differ and the locator step over whole unaffected branches.

use crate::{
	event::Transform,
	facts::{normalize, Fact, Facts},
	platform::Platform,
	sanitize,
};
use core::{
	any::Any,
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;

/// A caller-defined node that renders and diffs itself, e.g. a third-party canvas.
///
/// Two widgets are only ever diffed against each other if their [`identity`](`Widget::identity`) matches.
pub trait Widget<N> {
	fn identity(&self) -> &str;
	fn as_any(&self) -> &dyn Any;
	fn render(&self, platform: &mut dyn Platform<Node = N>) -> N;
	/// Compares `self` against the `previous` widget of the same identity.
	fn diff(&self, previous: &dyn Any) -> Option<WidgetUpdate<N>>;
}

/// Updates a rendered widget in place, returning the (possibly replaced) live node.
pub type WidgetUpdate<N> = Rc<dyn Fn(&mut dyn Platform<Node = N>, &N) -> N>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
	Text,
	Element,
	Keyed,
	Tagged,
	Lazy,
	Widget,
}

/// One node of a UI tree snapshot. Cheap to clone.
pub enum Node<N, M> {
	Text(Rc<str>),
	Element(Rc<Element<N, M>>),
	Keyed(Rc<KeyedElement<N, M>>),
	Tagged(Rc<Tagged<N, M>>),
	Lazy(Rc<Lazy<N, M>>),
	Widget(Rc<WidgetNode<N, M>>),
}

impl<N, M> Clone for Node<N, M> {
	fn clone(&self) -> Self {
		match self {
			Self::Text(text) => Self::Text(text.clone()),
			Self::Element(element) => Self::Element(element.clone()),
			Self::Keyed(keyed) => Self::Keyed(keyed.clone()),
			Self::Tagged(tagged) => Self::Tagged(tagged.clone()),
			Self::Lazy(lazy) => Self::Lazy(lazy.clone()),
			Self::Widget(widget) => Self::Widget(widget.clone()),
		}
	}
}

impl<N: Debug, M: Debug> Debug for Node<N, M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Self::Element(element) => Debug::fmt(&**element, f),
			Self::Keyed(keyed) => Debug::fmt(&**keyed, f),
			Self::Tagged(tagged) => Debug::fmt(&**tagged, f),
			Self::Lazy(lazy) => Debug::fmt(&**lazy, f),
			Self::Widget(widget) => Debug::fmt(&**widget, f),
		}
	}
}

fn descendants<'a, N: 'a, M: 'a>(children: impl Iterator<Item = &'a Node<N, M>>) -> usize {
	children.map(|child| 1 + child.subtree_size()).sum()
}

impl<N, M> Node<N, M> {
	pub fn text(text: impl Into<String>) -> Self {
		Self::Text(Rc::from(text.into()))
	}

	pub fn element(tag: &str, facts: impl IntoIterator<Item = Fact<M>>, children: Vec<Self>) -> Self {
		Self::Element(Rc::new(Element::new(sanitize::tag(tag).to_owned(), None, normalize(facts), children)))
	}

	pub fn element_ns(namespace: &str, tag: &str, facts: impl IntoIterator<Item = Fact<M>>, children: Vec<Self>) -> Self {
		Self::Element(Rc::new(Element::new(sanitize::tag(tag).to_owned(), Some(namespace.to_owned()), normalize(facts), children)))
	}

	pub fn keyed(tag: &str, facts: impl IntoIterator<Item = Fact<M>>, children: Vec<(String, Self)>) -> Self {
		Self::Keyed(Rc::new(KeyedElement::new(sanitize::tag(tag).to_owned(), None, normalize(facts), children)))
	}

	pub fn keyed_ns(namespace: &str, tag: &str, facts: impl IntoIterator<Item = Fact<M>>, children: Vec<(String, Self)>) -> Self {
		Self::Keyed(Rc::new(KeyedElement::new(sanitize::tag(tag).to_owned(), Some(namespace.to_owned()), normalize(facts), children)))
	}

	/// Wraps `inner` so that messages dispatched from within it pass through `transform`.
	///
	/// Reuse the same `transform` across snapshots where possible: a pointer-identical chain needs no patch.
	pub fn tagged(transform: Transform<M>, inner: Self) -> Self {
		let descendants = 1 + inner.subtree_size();
		Self::Tagged(Rc::new(Tagged { transform, inner, descendants }))
	}

	/// A subtree that is only produced if `identity` changed (by reference) since the last snapshot.
	pub fn lazy(identity: Vec<Rc<dyn Any>>, produce: impl Fn() -> Self + 'static) -> Self {
		Self::Lazy(Rc::new(Lazy {
			identity,
			produce: Rc::new(produce),
			cached: RefCell::new(None),
		}))
	}

	pub fn widget(facts: impl IntoIterator<Item = Fact<M>>, widget: Rc<dyn Widget<N>>) -> Self {
		Self::Widget(Rc::new(WidgetNode { facts: normalize(facts), widget }))
	}

	#[must_use]
	pub fn kind(&self) -> NodeKind {
		match self {
			Self::Text(_) => NodeKind::Text,
			Self::Element(_) => NodeKind::Element,
			Self::Keyed(_) => NodeKind::Keyed,
			Self::Tagged(_) => NodeKind::Tagged,
			Self::Lazy(_) => NodeKind::Lazy,
			Self::Widget(_) => NodeKind::Widget,
		}
	}

	/// The number of descendants, not counting `self`.
	///
	/// [`Lazy`] and [`Widget`] nodes count as leaves; a lazy subtree is numbered on its own.
	#[must_use]
	pub fn subtree_size(&self) -> usize {
		match self {
			Self::Text(_) | Self::Lazy(_) | Self::Widget(_) => 0,
			Self::Element(element) => element.descendants,
			Self::Keyed(keyed) => keyed.descendants,
			Self::Tagged(tagged) => tagged.descendants,
		}
	}

	/// Whether both are the very same snapshot node.
	#[must_use]
	pub fn same(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Text(a), Self::Text(b)) => Rc::ptr_eq(a, b),
			(Self::Element(a), Self::Element(b)) => Rc::ptr_eq(a, b),
			(Self::Keyed(a), Self::Keyed(b)) => Rc::ptr_eq(a, b),
			(Self::Tagged(a), Self::Tagged(b)) => Rc::ptr_eq(a, b),
			(Self::Lazy(a), Self::Lazy(b)) => Rc::ptr_eq(a, b),
			(Self::Widget(a), Self::Widget(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}

pub struct Element<N, M> {
	tag: String,
	namespace: Option<String>,
	facts: Facts<M>,
	children: Vec<Node<N, M>>,
	descendants: usize,
}

impl<N, M> Element<N, M> {
	/// Builds an element verbatim, without sanitizing `tag`.
	pub(crate) fn new(tag: String, namespace: Option<String>, facts: Facts<M>, children: Vec<Node<N, M>>) -> Self {
		let descendants = descendants(children.iter());
		Self {
			tag,
			namespace,
			facts,
			children,
			descendants,
		}
	}

	#[must_use]
	pub fn tag(&self) -> &str {
		&self.tag
	}

	#[must_use]
	pub fn namespace(&self) -> Option<&str> {
		self.namespace.as_deref()
	}

	#[must_use]
	pub fn facts(&self) -> &Facts<M> {
		&self.facts
	}

	#[must_use]
	pub fn children(&self) -> &[Node<N, M>] {
		&self.children
	}
}

impl<N: Debug, M: Debug> Debug for Element<N, M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Element")
			.field("tag", &self.tag)
			.field("namespace", &self.namespace)
			.field("facts", &self.facts)
			.field("children", &self.children)
			.finish()
	}
}

pub struct KeyedElement<N, M> {
	tag: String,
	namespace: Option<String>,
	facts: Facts<M>,
	children: Vec<(String, Node<N, M>)>,
	descendants: usize,
}

impl<N, M> KeyedElement<N, M> {
	pub(crate) fn new(tag: String, namespace: Option<String>, facts: Facts<M>, children: Vec<(String, Node<N, M>)>) -> Self {
		let descendants = descendants(children.iter().map(|(_, child)| child));
		Self {
			tag,
			namespace,
			facts,
			children,
			descendants,
		}
	}

	#[must_use]
	pub fn tag(&self) -> &str {
		&self.tag
	}

	#[must_use]
	pub fn namespace(&self) -> Option<&str> {
		self.namespace.as_deref()
	}

	#[must_use]
	pub fn facts(&self) -> &Facts<M> {
		&self.facts
	}

	#[must_use]
	pub fn children(&self) -> &[(String, Node<N, M>)] {
		&self.children
	}

	/// The same element with its keys stripped. Subtree sizes and numbering are unchanged.
	#[must_use]
	pub fn dekeyed(&self) -> Element<N, M> {
		Element::new(
			self.tag.clone(),
			self.namespace.clone(),
			self.facts.clone(),
			self.children.iter().map(|(_, child)| child.clone()).collect(),
		)
	}
}

impl<N: Debug, M: Debug> Debug for KeyedElement<N, M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyedElement")
			.field("tag", &self.tag)
			.field("namespace", &self.namespace)
			.field("facts", &self.facts)
			.field("children", &self.children)
			.finish()
	}
}

pub struct Tagged<N, M> {
	transform: Transform<M>,
	inner: Node<N, M>,
	descendants: usize,
}

impl<N, M> Tagged<N, M> {
	#[must_use]
	pub fn transform(&self) -> &Transform<M> {
		&self.transform
	}

	#[must_use]
	pub fn inner(&self) -> &Node<N, M> {
		&self.inner
	}

	/// Collapses directly nested tagged nodes: their transforms outermost first, and the first untagged node.
	#[must_use]
	pub fn chain(&self) -> (Vec<Transform<M>>, &Node<N, M>) {
		let mut transforms = vec![self.transform.clone()];
		let mut inner = &self.inner;
		while let Node::Tagged(tagged) = inner {
			transforms.push(tagged.transform.clone());
			inner = &tagged.inner;
		}
		(transforms, inner)
	}

	/// Like [`chain`](`Tagged::chain`), but only counts the transforms.
	#[must_use]
	pub fn chain_len(&self) -> (usize, &Node<N, M>) {
		let mut len = 1;
		let mut inner = &self.inner;
		while let Node::Tagged(tagged) = inner {
			len += 1;
			inner = &tagged.inner;
		}
		(len, inner)
	}
}

impl<N: Debug, M: Debug> Debug for Tagged<N, M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Tagged")
			.field("transform", &Rc::as_ptr(&self.transform).cast::<()>())
			.field("inner", &self.inner)
			.finish()
	}
}

pub struct Lazy<N, M> {
	identity: Vec<Rc<dyn Any>>,
	produce: Rc<dyn Fn() -> Node<N, M>>,
	cached: RefCell<Option<Node<N, M>>>,
}

impl<N, M> Lazy<N, M> {
	/// The produced subtree, producing and caching it on first use.
	pub fn force(&self) -> Node<N, M> {
		if let Some(cached) = &*self.cached.borrow() {
			return cached.clone();
		}
		let produced = (self.produce)();
		*self.cached.borrow_mut() = Some(produced.clone());
		produced
	}

	#[must_use]
	pub fn cached(&self) -> Option<Node<N, M>> {
		self.cached.borrow().clone()
	}

	/// Pairwise reference equality of both identity lists, in order.
	#[must_use]
	pub fn same_identity(&self, other: &Self) -> bool {
		self.identity.len() == other.identity.len() && self.identity.iter().zip(&other.identity).all(|(a, b)| crate::event::same_rc(a, b))
	}

	/// Takes over `previous`'s produced subtree without producing anew.
	pub(crate) fn adopt(&self, previous: &Self) {
		let cached = previous.cached.borrow().clone();
		*self.cached.borrow_mut() = cached;
	}
}

impl<N: Debug, M: Debug> Debug for Lazy<N, M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Lazy")
			.field("identity", &self.identity.len())
			.field("cached", &*self.cached.borrow())
			.finish()
	}
}

pub struct WidgetNode<N, M> {
	facts: Facts<M>,
	widget: Rc<dyn Widget<N>>,
}

impl<N, M> WidgetNode<N, M> {
	#[must_use]
	pub fn facts(&self) -> &Facts<M> {
		&self.facts
	}

	#[must_use]
	pub fn widget(&self) -> &dyn Widget<N> {
		&*self.widget
	}
}

impl<N, M: Debug> Debug for WidgetNode<N, M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("WidgetNode")
			.field("identity", &self.widget.identity())
			.field("facts", &self.facts)
			.finish()
	}
}
