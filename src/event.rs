//! Event handlers and the event-node chain that carries decoded messages up to the dispatcher.
//!
//! Every rendered subtree is bound to an [`EventNode`]. The root node holds the dispatcher supplied by the
//! surrounding scheduler; each [`Node::Tagged`](`crate::Node::Tagged`) boundary adds a tagger node holding
//! that boundary's transform chain. A platform listener decodes the raw event with its [`Handler`], then walks
//! the chain upwards, transforming the message at each tagger, until it reaches the dispatcher.

use core::{
	any::Any,
	cell::RefCell,
	fmt::{self, Debug, Formatter},
	mem,
};
use std::rc::Rc;
use tracing::{trace, trace_span};

/// Decodes a raw platform event (e.g. a [`web_sys::Event`]) into a handler result.
pub type Decoder<T> = Rc<dyn Fn(&dyn Any) -> Option<T>>;

/// Converts a message produced inside a nested component into one its parent understands.
pub type Transform<M> = Rc<dyn Fn(M) -> M>;

/// Receives each fully transformed message along with whether it should be processed synchronously.
pub type Dispatcher<M> = Rc<dyn Fn(M, bool)>;

pub(crate) fn same_rc<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
	Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

/// The full result of a [`Handler::Custom`] decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomOutcome<M> {
	pub message: M,
	pub stop_propagation: bool,
	pub prevent_default: bool,
}

/// An event handler, by shape.
///
/// The shape decides what the decoder may request besides the message,
/// and whether the platform listener can be registered as passive.
pub enum Handler<M> {
	Normal(Decoder<M>),
	MayStopPropagation(Decoder<(M, bool)>),
	MayPreventDefault(Decoder<(M, bool)>),
	Custom(Decoder<CustomOutcome<M>>),
}

impl<M> Handler<M> {
	pub fn normal(decoder: impl Fn(&dyn Any) -> Option<M> + 'static) -> Self {
		Self::Normal(Rc::new(decoder))
	}

	pub fn may_stop_propagation(decoder: impl Fn(&dyn Any) -> Option<(M, bool)> + 'static) -> Self {
		Self::MayStopPropagation(Rc::new(decoder))
	}

	pub fn may_prevent_default(decoder: impl Fn(&dyn Any) -> Option<(M, bool)> + 'static) -> Self {
		Self::MayPreventDefault(Rc::new(decoder))
	}

	pub fn custom(decoder: impl Fn(&dyn Any) -> Option<CustomOutcome<M>> + 'static) -> Self {
		Self::Custom(Rc::new(decoder))
	}

	/// Whether `self` and `other` are the same variant, regardless of decoder.
	#[must_use]
	pub fn same_shape(&self, other: &Self) -> bool {
		mem::discriminant(self) == mem::discriminant(other)
	}

	/// Listeners for handlers that can't prevent the default action may be registered as passive.
	#[must_use]
	pub fn may_prevent_default_action(&self) -> bool {
		matches!(self, Self::MayPreventDefault(_) | Self::Custom(_))
	}

	fn decoder_ptr(&self) -> *const () {
		match self {
			Self::Normal(decoder) => Rc::as_ptr(decoder).cast(),
			Self::MayStopPropagation(decoder) | Self::MayPreventDefault(decoder) => Rc::as_ptr(decoder).cast(),
			Self::Custom(decoder) => Rc::as_ptr(decoder).cast(),
		}
	}

	/// Runs the decoder and normalizes its result.
	pub fn decode(&self, event: &dyn Any) -> Option<CustomOutcome<M>> {
		match self {
			Self::Normal(decoder) => decoder(event).map(|message| CustomOutcome {
				message,
				stop_propagation: false,
				prevent_default: false,
			}),
			Self::MayStopPropagation(decoder) => decoder(event).map(|(message, stop_propagation)| CustomOutcome {
				message,
				stop_propagation,
				prevent_default: false,
			}),
			Self::MayPreventDefault(decoder) => decoder(event).map(|(message, prevent_default)| CustomOutcome {
				message,
				stop_propagation: false,
				prevent_default,
			}),
			Self::Custom(decoder) => decoder(event),
		}
	}
}

impl<M> Clone for Handler<M> {
	fn clone(&self) -> Self {
		match self {
			Self::Normal(decoder) => Self::Normal(decoder.clone()),
			Self::MayStopPropagation(decoder) => Self::MayStopPropagation(decoder.clone()),
			Self::MayPreventDefault(decoder) => Self::MayPreventDefault(decoder.clone()),
			Self::Custom(decoder) => Self::Custom(decoder.clone()),
		}
	}
}

/// Handlers are equal if they have the same shape and the very same decoder.
impl<M> PartialEq for Handler<M> {
	fn eq(&self, other: &Self) -> bool {
		self.same_shape(other) && self.decoder_ptr() == other.decoder_ptr()
	}
}

impl<M> Debug for Handler<M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let shape = match self {
			Self::Normal(_) => "Normal",
			Self::MayStopPropagation(_) => "MayStopPropagation",
			Self::MayPreventDefault(_) => "MayPreventDefault",
			Self::Custom(_) => "Custom",
		};
		f.debug_tuple(shape).field(&self.decoder_ptr()).finish()
	}
}

/// What the platform should do with the event after a listener ran.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EventOutcome {
	pub stop_propagation: bool,
	pub prevent_default: bool,
}

/// The type-erased callback a [`Platform`](`crate::Platform`) registers for an event.
///
/// [`as_any`](`EventSink::as_any`) lets the engine find its own listener again on a later fact update.
pub trait EventSink {
	fn handle(&self, event: &dyn Any) -> EventOutcome;
	fn as_any(&self) -> &dyn Any;
}

enum EventNodeKind<M> {
	Root(Dispatcher<M>),
	Tagger { transforms: RefCell<Vec<Transform<M>>>, parent: EventNode<M> },
}

/// One link of the chain between a listener and the dispatcher. Cheap to clone.
pub struct EventNode<M>(Rc<EventNodeKind<M>>);

impl<M> Clone for EventNode<M> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<M> Debug for EventNode<M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match &*self.0 {
			EventNodeKind::Root(_) => f.write_str("EventNode::Root"),
			EventNodeKind::Tagger { transforms, parent } => f
				.debug_struct("EventNode::Tagger")
				.field("transforms", &transforms.borrow().len())
				.field("parent", parent)
				.finish(),
		}
	}
}

impl<M: 'static> EventNode<M> {
	pub fn root(dispatcher: impl Fn(M, bool) + 'static) -> Self {
		Self(Rc::new(EventNodeKind::Root(Rc::new(dispatcher))))
	}

	pub(crate) fn tagger(transforms: Vec<Transform<M>>, parent: &Self) -> Self {
		Self(Rc::new(EventNodeKind::Tagger {
			transforms: RefCell::new(transforms),
			parent: parent.clone(),
		}))
	}

	/// Replaces the transform chain of a tagger node in place.
	///
	/// Returns `false` without effect if `self` is the root.
	pub(crate) fn retag(&self, next: Vec<Transform<M>>) -> bool {
		match &*self.0 {
			EventNodeKind::Root(_) => false,
			EventNodeKind::Tagger { transforms, .. } => {
				*transforms.borrow_mut() = next;
				true
			}
		}
	}

	#[must_use]
	pub fn is_root(&self) -> bool {
		matches!(&*self.0, EventNodeKind::Root(_))
	}

	/// Transforms `message` through every tagger up to the root, then dispatches it there.
	///
	/// Within one tagger node, the innermost transform applies first.
	pub fn dispatch(&self, mut message: M, synchronous: bool) {
		let span = trace_span!("Dispatching message", synchronous);
		let _enter = span.enter();

		let mut current = self.clone();
		loop {
			let parent = match &*current.0 {
				EventNodeKind::Root(dispatcher) => return dispatcher(message, synchronous),
				EventNodeKind::Tagger { transforms, parent } => {
					for transform in transforms.borrow().iter().rev() {
						message = transform(message);
					}
					parent.clone()
				}
			};
			current = parent;
		}
	}

	pub(crate) fn to_any(&self) -> Rc<dyn Any> {
		self.0.clone()
	}

	/// Whether `any` is what [`to_any`](`EventNode::to_any`) returns for `self`.
	pub(crate) fn is_recorded_as(&self, any: &Rc<dyn Any>) -> bool {
		same_rc(&self.to_any(), any)
	}

	pub(crate) fn from_any(any: Rc<dyn Any>) -> Option<Self> {
		any.downcast::<EventNodeKind<M>>().ok().map(Self)
	}
}

/// The engine's own [`EventSink`]: a swappable handler bound to the event node it was rendered under.
pub(crate) struct Listener<M> {
	handler: RefCell<Handler<M>>,
	event_node: EventNode<M>,
}

impl<M: 'static> Listener<M> {
	pub(crate) fn new(handler: Handler<M>, event_node: EventNode<M>) -> Self {
		Self {
			handler: RefCell::new(handler),
			event_node,
		}
	}

	/// Swaps the handler if its shape is unchanged, keeping the platform registration alive.
	///
	/// Returns `false` if the shapes differ, in which case the listener must be re-registered.
	pub(crate) fn try_swap(&self, next: &Handler<M>) -> bool {
		let mut handler = self.handler.borrow_mut();
		if handler.same_shape(next) {
			*handler = next.clone();
			true
		} else {
			false
		}
	}
}

impl<M: 'static> EventSink for Listener<M> {
	fn handle(&self, event: &dyn Any) -> EventOutcome {
		let handler = self.handler.borrow().clone();
		match handler.decode(event) {
			None => {
				trace!("Decoder rejected the event.");
				EventOutcome::default()
			}
			Some(CustomOutcome {
				message,
				stop_propagation,
				prevent_default,
			}) => {
				self.event_node.dispatch(message, stop_propagation);
				EventOutcome {
					stop_propagation,
					prevent_default,
				}
			}
		}
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

impl<M> Debug for Listener<M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Listener")
			.field("handler", &*self.handler.borrow())
			.field("event_node", &self.event_node)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::RefCell;

	#[test]
	fn dispatch_applies_innermost_transform_first() {
		let received = Rc::new(RefCell::new(Vec::new()));
		let root = {
			let received = received.clone();
			EventNode::root(move |message: String, synchronous| received.borrow_mut().push((message, synchronous)))
		};
		let outer = EventNode::tagger(vec![Rc::new(|m: String| format!("outer({})", m)) as Transform<String>], &root);
		let inner = EventNode::tagger(
			vec![
				Rc::new(|m: String| format!("a({})", m)) as Transform<String>,
				Rc::new(|m: String| format!("b({})", m)),
			],
			&outer,
		);

		inner.dispatch("click".to_owned(), true);

		assert_eq!(*received.borrow(), vec![("outer(a(b(click)))".to_owned(), true)]);
	}

	#[test]
	fn retag_changes_future_dispatch_only_on_taggers() {
		let received = Rc::new(RefCell::new(Vec::new()));
		let root = {
			let received = received.clone();
			EventNode::root(move |message: u32, _| received.borrow_mut().push(message))
		};
		let tagger = EventNode::tagger(vec![Rc::new(|m: u32| m + 1) as Transform<u32>], &root);

		tagger.dispatch(1, false);
		assert!(tagger.retag(vec![Rc::new(|m: u32| m * 10)]));
		tagger.dispatch(1, false);
		assert!(!root.retag(Vec::new()));

		assert_eq!(*received.borrow(), vec![2, 10]);
	}

	#[test]
	fn handler_equality_is_shape_and_decoder_identity() {
		let decoder: Decoder<u8> = Rc::new(|_| Some(1));
		let a = Handler::Normal(decoder.clone());
		let b = Handler::Normal(decoder);
		let c = Handler::normal(|_| Some(1));

		assert_eq!(a, b);
		assert_ne!(a, c);
		assert!(a.same_shape(&c));
		assert!(!a.same_shape(&Handler::may_prevent_default(|_| Some((1, true)))));
	}

	#[test]
	fn listener_swaps_same_shape_only() {
		let root = EventNode::root(|_: u8, _| ());
		let listener = Listener::new(Handler::normal(|_| Some(1)), root);

		assert!(listener.try_swap(&Handler::normal(|_| Some(2))));
		assert!(!listener.try_swap(&Handler::custom(|_| None)));
	}
}
