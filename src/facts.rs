//! Facts: the styles, event handlers, attributes and properties attached to an element.
//!
//! A view declares facts as a flat list of [`Fact`]s. [`normalize`] sorts them into per-category maps once,
//! when the node is built, so that both the renderer and the differ only ever see [`Facts`].

use crate::{event::Handler, sanitize};
use core::fmt::Debug;
use hashbrown::{hash_map::Entry, HashMap};

/// A property value, set on the live node as-is rather than serialized into an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
	Bool(bool),
	Number(f64),
	Text(String),
	Null,
}

impl From<bool> for Property {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<f64> for Property {
	fn from(value: f64) -> Self {
		Self::Number(value)
	}
}

impl From<&str> for Property {
	fn from(value: &str) -> Self {
		Self::Text(value.to_owned())
	}
}

impl From<String> for Property {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

/// One declared fact, before normalization.
///
/// The constructor functions sanitize names and values; the variants themselves are taken verbatim.
#[derive(Debug)]
pub enum Fact<M> {
	Style { name: String, value: String },
	Event { name: String, handler: Handler<M> },
	Attribute { name: String, value: String },
	AttributeNs { namespace: String, name: String, value: String },
	Property { name: String, value: Property },
}

impl<M> Fact<M> {
	pub fn style(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self::Style {
			name: name.into(),
			value: value.into(),
		}
	}

	pub fn on(name: impl Into<String>, handler: Handler<M>) -> Self {
		Self::Event { name: name.into(), handler }
	}

	pub fn attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self::Attribute {
			name: sanitize::attribute_name(name.into()),
			value: sanitize::attribute_value(value.into()),
		}
	}

	pub fn attribute_ns(namespace: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
		Self::AttributeNs {
			namespace: namespace.into(),
			name: sanitize::attribute_name(name.into()),
			value: sanitize::attribute_value(value.into()),
		}
	}

	pub fn property(name: impl Into<String>, value: impl Into<Property>) -> Self {
		Self::Property {
			name: sanitize::property_name(name.into()),
			value: value.into(),
		}
	}

	/// Shorthand for the `class` attribute. Repeated declarations accumulate.
	pub fn class(value: impl Into<String>) -> Self {
		Self::attribute("class", value)
	}
}

impl<M> Clone for Fact<M> {
	fn clone(&self) -> Self {
		match self {
			Self::Style { name, value } => Self::Style {
				name: name.clone(),
				value: value.clone(),
			},
			Self::Event { name, handler } => Self::Event {
				name: name.clone(),
				handler: handler.clone(),
			},
			Self::Attribute { name, value } => Self::Attribute {
				name: name.clone(),
				value: value.clone(),
			},
			Self::AttributeNs { namespace, name, value } => Self::AttributeNs {
				namespace: namespace.clone(),
				name: name.clone(),
				value: value.clone(),
			},
			Self::Property { name, value } => Self::Property {
				name: name.clone(),
				value: value.clone(),
			},
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsValue {
	pub namespace: String,
	pub value: String,
}

/// Normalized facts, keyed by name within each category.
#[derive(Debug)]
pub struct Facts<M> {
	pub styles: HashMap<String, String>,
	pub events: HashMap<String, Handler<M>>,
	pub attributes: HashMap<String, String>,
	pub namespaced_attributes: HashMap<String, NsValue>,
	pub properties: HashMap<String, Property>,
}

impl<M> Default for Facts<M> {
	fn default() -> Self {
		Self {
			styles: HashMap::new(),
			events: HashMap::new(),
			attributes: HashMap::new(),
			namespaced_attributes: HashMap::new(),
			properties: HashMap::new(),
		}
	}
}

impl<M> Clone for Facts<M> {
	fn clone(&self) -> Self {
		Self {
			styles: self.styles.clone(),
			events: self.events.clone(),
			attributes: self.attributes.clone(),
			namespaced_attributes: self.namespaced_attributes.clone(),
			properties: self.properties.clone(),
		}
	}
}

impl<M> Facts<M> {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.styles.is_empty() && self.events.is_empty() && self.attributes.is_empty() && self.namespaced_attributes.is_empty() && self.properties.is_empty()
	}
}

/// Sorts a flat fact list into [`Facts`].
///
/// Later declarations of the same name win, except for the `class` attribute and the `className` property,
/// which accumulate space-separated in declaration order.
pub fn normalize<M>(facts: impl IntoIterator<Item = Fact<M>>) -> Facts<M> {
	let mut normalized = Facts::default();
	for fact in facts {
		match fact {
			Fact::Style { name, value } => {
				normalized.styles.insert(name, value);
			}
			Fact::Event { name, handler } => {
				normalized.events.insert(name, handler);
			}
			Fact::Attribute { name, value } if name == "class" => match normalized.attributes.entry(name) {
				Entry::Occupied(occupied) => {
					let classes = occupied.into_mut();
					classes.push(' ');
					classes.push_str(&value);
				}
				Entry::Vacant(vacant) => {
					vacant.insert(value);
				}
			},
			Fact::Attribute { name, value } => {
				normalized.attributes.insert(name, value);
			}
			Fact::AttributeNs { namespace, name, value } => {
				normalized.namespaced_attributes.insert(name, NsValue { namespace, value });
			}
			Fact::Property { name, value: Property::Text(value) } if name == "className" => match normalized.properties.entry(name) {
				Entry::Occupied(occupied) => match occupied.into_mut() {
					Property::Text(classes) => {
						classes.push(' ');
						classes.push_str(&value);
					}
					other => *other = Property::Text(value),
				},
				Entry::Vacant(vacant) => {
					vacant.insert(Property::Text(value));
				}
			},
			Fact::Property { name, value } => {
				normalized.properties.insert(name, value);
			}
		}
	}
	normalized
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsUpdate {
	pub namespace: String,
	pub value: Option<String>,
}

/// The changes that turn one [`Facts`] into another.
///
/// Removed entries map to an empty style, `None`, or [`NsUpdate`] with a `None` value respectively.
#[derive(Debug)]
pub struct FactsDiff<M> {
	pub styles: HashMap<String, String>,
	pub events: HashMap<String, Option<Handler<M>>>,
	pub attributes: HashMap<String, Option<String>>,
	pub namespaced_attributes: HashMap<String, NsUpdate>,
	pub properties: HashMap<String, Option<Property>>,
}

impl<M> FactsDiff<M> {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// The total number of changed entries across all categories.
	#[must_use]
	pub fn len(&self) -> usize {
		self.styles.len() + self.events.len() + self.attributes.len() + self.namespaced_attributes.len() + self.properties.len()
	}
}

fn diff_category<V: PartialEq, D>(old: &HashMap<String, V>, new: &HashMap<String, V>, removed: impl Fn(&V) -> D, changed: impl Fn(&V) -> D) -> HashMap<String, D> {
	let mut diff = HashMap::new();
	for (name, value) in old {
		if !new.contains_key(name) {
			diff.insert(name.clone(), removed(value));
		}
	}
	for (name, value) in new {
		if old.get(name) != Some(value) {
			diff.insert(name.clone(), changed(value));
		}
	}
	diff
}

/// Compares two normalized fact sets, returning `None` if nothing changed.
#[must_use]
pub fn diff_facts<M>(old: &Facts<M>, new: &Facts<M>) -> Option<FactsDiff<M>> {
	let diff = FactsDiff {
		styles: diff_category(&old.styles, &new.styles, |_| String::new(), Clone::clone),
		events: diff_category(&old.events, &new.events, |_| None, |handler| Some(handler.clone())),
		attributes: diff_category(&old.attributes, &new.attributes, |_| None, |value| Some(value.clone())),
		namespaced_attributes: diff_category(
			&old.namespaced_attributes,
			&new.namespaced_attributes,
			|removed| NsUpdate {
				namespace: removed.namespace.clone(),
				value: None,
			},
			|changed| NsUpdate {
				namespace: changed.namespace.clone(),
				value: Some(changed.value.clone()),
			},
		),
		properties: diff_category(&old.properties, &new.properties, |_| None, |value| Some(value.clone())),
	};
	if diff.is_empty() {
		None
	} else {
		Some(diff)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classes_accumulate_in_order() {
		let facts = normalize::<()>(vec![
			Fact::class("card"),
			Fact::attribute("id", "thumb"),
			Fact::class("selected"),
			Fact::property("className", "a"),
			Fact::property("className", "b"),
		]);

		assert_eq!(facts.attributes["class"], "card selected");
		assert_eq!(facts.attributes["id"], "thumb");
		assert_eq!(facts.properties["className"], Property::Text("a b".to_owned()));
	}

	#[test]
	fn other_facts_overwrite() {
		let facts = normalize::<()>(vec![Fact::style("color", "red"), Fact::style("color", "blue"), Fact::attribute("title", "x"), Fact::attribute("title", "y")]);

		assert_eq!(facts.styles["color"], "blue");
		assert_eq!(facts.attributes["title"], "y");
	}

	#[test]
	fn identical_facts_have_no_diff() {
		let facts = || normalize::<()>(vec![Fact::style("width", "10px"), Fact::attribute("alt", "thumbnail"), Fact::property("checked", true)]);
		assert!(diff_facts(&facts(), &facts()).is_none());
	}

	#[test]
	fn single_style_change_touches_one_entry() {
		let styles = |highlight: &str| {
			normalize::<()>(
				(0..10)
					.map(|i| if i == 4 { Fact::style("color", highlight) } else { Fact::style(format!("--slot-{}", i), i.to_string()) })
					.collect::<Vec<_>>(),
			)
		};

		let diff = diff_facts(&styles("red"), &styles("blue")).unwrap();

		assert_eq!(diff.len(), 1);
		assert_eq!(diff.styles["color"], "blue");
	}

	#[test]
	fn removals_are_explicit() {
		let old = normalize::<()>(vec![
			Fact::style("color", "red"),
			Fact::attribute("title", "x"),
			Fact::attribute_ns("http://www.w3.org/1999/xlink", "href", "#a"),
			Fact::property("value", "typed"),
			Fact::on("click", Handler::normal(|_| Some(()))),
		]);
		let diff = diff_facts(&old, &Facts::default()).unwrap();

		assert_eq!(diff.styles["color"], "");
		assert_eq!(diff.attributes["title"], None);
		assert_eq!(diff.namespaced_attributes["href"].value, None);
		assert_eq!(diff.namespaced_attributes["href"].namespace, "http://www.w3.org/1999/xlink");
		assert_eq!(diff.properties["value"], None);
		assert!(diff.events["click"].is_none());
	}
}
