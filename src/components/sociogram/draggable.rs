use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use web_sys::Element;

use super::dom::{ClonePreview, DomScroller, PointerBinding, page_offset};
use crate::config::DragConfig;
use crate::drag_and_drop::{DragManager, DragPreview, DragSource, Meta, MonotonicClock, Registry};

type Binding = PointerBinding<DragSource<MonotonicClock>>;

/// Wraps its children in a drag source publishing `meta` into `registry`.
///
/// Dragging shows a clone of the item under the pointer and auto-scrolls the
/// nearest scrollable ancestor.
#[component]
pub fn DraggableItem(
	/// Source id in the registry.
	#[prop(into)]
	id: String,
	/// Registry the drag is published into.
	registry: Registry,
	/// Meta snapshotted at drag start.
	meta: Meta,
	/// Gesture tuning.
	#[prop(optional)]
	config: DragConfig,
	/// When `false`, presses are ignored.
	#[prop(into, optional)]
	enabled: Option<Signal<bool>>,
	/// The dragged content.
	children: Children,
) -> impl IntoView {
	let node_ref = NodeRef::<leptos::html::Div>::new();
	let binding: Rc<RefCell<Option<Binding>>> = Rc::new(RefCell::new(None));
	let binding_init = binding.clone();

	Effect::new(move |_| {
		let Some(div) = node_ref.get() else {
			return;
		};
		if binding_init.borrow().is_some() {
			return;
		}
		let element: Element = div.into();
		let (snapshot, preview_source) = (meta.clone(), element.clone());
		let source = DragSource::new(
			id.clone(),
			registry.clone(),
			move || snapshot.clone(),
			MonotonicClock::default(),
			config.throttle_ms,
		)
		.with_preview(move || -> Box<dyn DragPreview> { Box::new(ClonePreview::new(preview_source.clone())) });
		let mut manager = DragManager::new(source, &config);
		if let Some(scroller) = DomScroller::nearest(&element) {
			manager = manager.with_scroller(scroller);
		}
		*binding_init.borrow_mut() = Some(PointerBinding::bind(element, manager, |manager| {
			manager.listener_mut().set_page_offset(page_offset());
		}));
	});

	let binding_enabled = binding.clone();
	Effect::new(move |_| {
		let allowed = enabled.map(|s| s.get()).unwrap_or(true);
		if let Some(binding) = binding_enabled.borrow().as_ref() {
			binding.manager().borrow_mut().listener_mut().set_enabled(allowed);
		}
	});

	let cleanup = StoredValue::new_local(binding);
	on_cleanup(move || {
		let _ = cleanup.try_with_value(|binding| {
			let taken = binding.borrow_mut().take();
			drop(taken);
		});
	});

	view! {
		<div node_ref=node_ref class="sociogram-draggable" style="touch-action: none; user-select: none;">
			{children()}
		</div>
	}
}
