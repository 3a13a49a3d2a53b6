#![doc(html_root_url = "https://docs.rs/studio-vdom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod apply;
pub mod diff;
pub mod event;
pub mod facts;
mod keyed;
pub mod load;
pub mod locate;
pub mod memory;
pub mod node;
pub mod patch;
pub mod platform;
pub mod render;
pub mod root;
pub mod sanitize;
pub mod web;

pub use crate::{
	apply::apply,
	diff::diff,
	event::{CustomOutcome, EventNode, Handler},
	facts::{Fact, Facts, Property},
	load::virtualize,
	locate::{locate, Located},
	node::{Node, NodeKind, Widget, WidgetUpdate},
	patch::{Patch, PatchKind, PatchOp},
	platform::{Capabilities, Platform},
	render::render,
	root::Root,
};
