#![cfg(target_arch = "wasm32")]

//! Browser glue for the AR session button.
//!
//! Builds the button and its DOM overlay, forwards presses to
//! `navigator.xr`, and feeds the platform's session lifecycle back into
//! [`ArButton`]. Needs `--cfg=web_sys_unstable_apis` for the WebXR
//! bindings.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Document, HtmlElement, XrReferenceSpace, XrReferenceSpaceType, XrSession, XrSessionEvent,
    XrSessionInit, XrSessionMode,
};

use crate::session::{
    ArButton, ButtonAction, ReferenceSpace, SessionError, SessionFeature, SessionHandle,
    SessionInit, SessionMode,
};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
const NOT_SUPPORTED_LABEL: &str = "AR NOT SUPPORTED";

/// AR toggle button mounted in the page.
#[wasm_bindgen]
pub struct WebArButton {
    context: ButtonContext,
}

#[wasm_bindgen]
impl WebArButton {
    /// Creates the button inside the element with the given id, along
    /// with a hidden DOM overlay that comes up while a session runs.
    #[wasm_bindgen(constructor)]
    pub fn new(container_id: String) -> Result<WebArButton, JsValue> {
        console_error_panic_hook::set_once();

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("missing window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("missing document"))?;
        let container = document
            .get_element_by_id(&container_id)
            .ok_or_else(|| JsValue::from_str("container element not found"))?;

        let element: HtmlElement = document
            .create_element("button")?
            .dyn_into()
            .map_err(|_| JsValue::from_str("button is not an html element"))?;
        container.append_child(&element)?;

        let overlay = create_overlay(&document)?;

        let context = ButtonContext {
            button: Rc::new(RefCell::new(ArButton::new(SessionInit::default()))),
            session: Rc::new(RefCell::new(None)),
            next_id: Rc::new(Cell::new(0)),
            element: element.clone(),
            overlay,
        };
        context.sync_ui();

        let press_context = context.clone();
        let on_press = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event| {
            press_context.handle_press();
        });
        element.add_event_listener_with_callback("click", on_press.as_ref().unchecked_ref())?;
        on_press.forget();

        wire_close_glyph(&document, &context)?;

        let support_context = context.clone();
        wasm_bindgen_futures::spawn_local(async move {
            support_context.check_support().await;
        });

        Ok(WebArButton { context })
    }

    pub fn label(&self) -> String {
        self.context.button.borrow().label().to_string()
    }

    pub fn is_active(&self) -> bool {
        self.context.button.borrow().is_active()
    }
}

/// Everything the DOM callbacks share. Clones are shallow; the wasm
/// build is single threaded, so plain `Rc`/`RefCell` suffice.
#[derive(Clone)]
struct ButtonContext {
    button: Rc<RefCell<ArButton>>,
    session: Rc<RefCell<Option<XrSession>>>,
    next_id: Rc<Cell<u64>>,
    element: HtmlElement,
    overlay: HtmlElement,
}

impl ButtonContext {
    fn handle_press(&self) {
        let action = self.button.borrow_mut().press();
        match action {
            ButtonAction::Request(mode, init) => {
                let context = self.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    context.request_flow(mode, init).await;
                });
            }
            ButtonAction::End(_handle) => self.end_active_session(),
            ButtonAction::None => {}
        }
        self.sync_ui();
    }

    async fn request_flow(self, mode: SessionMode, init: SessionInit) {
        match request_xr_session(mode, &init, &self.overlay).await {
            Ok(xr_session) => {
                let id = self.next_id.get();
                self.next_id.set(id + 1);
                let handle = SessionHandle::new(id);
                self.attach_end_listener(&xr_session, handle.clone());
                match bind_reference_space(&xr_session, init.reference_space).await {
                    Ok(_space) => log_to_console(&format!(
                        "bound the {} reference space",
                        init.reference_space.name()
                    )),
                    Err(err) => {
                        log_to_console(&format!("reference space error: {err:?}"));
                    }
                }
                *self.session.borrow_mut() = Some(xr_session);
                self.button.borrow_mut().session_started(handle);
            }
            Err(err) => {
                let error = SessionError::Rejected(js_error_message(&err));
                self.button.borrow_mut().session_failed(&error);
            }
        }
        self.sync_ui();
    }

    /// Asks the platform to end the running session. The cleanup happens
    /// in the `end` listener once the platform confirms.
    fn end_active_session(&self) {
        let Some(xr_session) = self.session.borrow().clone() else {
            return;
        };
        let promise = xr_session.end();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = JsFuture::from(promise).await {
                log_to_console(&format!("failed to end session: {err:?}"));
            }
        });
    }

    fn attach_end_listener(&self, xr_session: &XrSession, handle: SessionHandle) {
        let context = self.clone();
        let on_end = Closure::<dyn FnMut(XrSessionEvent)>::new(move |_event: XrSessionEvent| {
            handle.notify_ended();
            context.button.borrow_mut().process_events();
            context.session.borrow_mut().take();
            context.sync_ui();
        });
        if let Err(err) =
            xr_session.add_event_listener_with_callback("end", on_end.as_ref().unchecked_ref())
        {
            log_to_console(&format!("failed to watch for session end: {err:?}"));
        }
        // The listener lives as long as the page.
        on_end.forget();
    }

    async fn check_support(self) {
        let supported = match session_supported().await {
            Ok(supported) => supported,
            Err(err) => {
                log_to_console(&format!("xr support query failed: {err:?}"));
                false
            }
        };
        if !supported {
            let _ = self.element.set_attribute("disabled", "");
            self.element.set_text_content(Some(NOT_SUPPORTED_LABEL));
        }
    }

    fn sync_ui(&self) {
        let button = self.button.borrow();
        self.element.set_text_content(Some(button.label()));
        let display = if button.overlay_visible() { "" } else { "none" };
        if let Err(err) = self.overlay.style().set_property("display", display) {
            log_to_console(&format!("overlay style error: {err:?}"));
        }
    }
}

async fn session_supported() -> Result<bool, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("missing window"))?;
    let xr = window.navigator().xr();
    let result = JsFuture::from(xr.is_session_supported(XrSessionMode::ImmersiveAr)).await?;
    Ok(result.as_bool().unwrap_or(false))
}

async fn request_xr_session(
    mode: SessionMode,
    init: &SessionInit,
    overlay: &HtmlElement,
) -> Result<XrSession, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("missing window"))?;
    let xr = window.navigator().xr();

    let mut xr_init = XrSessionInit::new();
    xr_init.required_features(&feature_array(&init.required_features));
    xr_init.optional_features(&feature_array(&init.optional_features));
    if init.has_feature(SessionFeature::DomOverlay) {
        let dom_overlay = js_sys::Object::new();
        let overlay_value: &JsValue = overlay.as_ref();
        js_sys::Reflect::set(&dom_overlay, &JsValue::from_str("root"), overlay_value)?;
        js_sys::Reflect::set(
            xr_init.as_ref(),
            &JsValue::from_str("domOverlay"),
            &dom_overlay,
        )?;
    }

    let session =
        JsFuture::from(xr.request_session_with_options(session_mode(mode), &xr_init)).await?;
    session
        .dyn_into()
        .map_err(|_| JsValue::from_str("granted session has an unexpected type"))
}

async fn bind_reference_space(
    session: &XrSession,
    space: ReferenceSpace,
) -> Result<XrReferenceSpace, JsValue> {
    let promise = session.request_reference_space(reference_space_type(space));
    JsFuture::from(promise)
        .await?
        .dyn_into()
        .map_err(|_| JsValue::from_str("granted reference space has an unexpected type"))
}

fn create_overlay(document: &Document) -> Result<HtmlElement, JsValue> {
    let overlay: HtmlElement = document
        .create_element("div")?
        .dyn_into()
        .map_err(|_| JsValue::from_str("overlay is not an html element"))?;
    overlay.style().set_property("display", "none")?;
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("missing body"))?;
    body.append_child(&overlay)?;
    Ok(overlay)
}

/// Adds the close cross to the overlay; clicking it ends the session.
fn wire_close_glyph(document: &Document, context: &ButtonContext) -> Result<(), JsValue> {
    let svg = document.create_element_ns(Some(SVG_NAMESPACE), "svg")?;
    svg.set_attribute("width", "38")?;
    svg.set_attribute("height", "38")?;
    svg.set_attribute("style", "position: absolute; right: 20px; top: 20px;")?;
    let path = document.create_element_ns(Some(SVG_NAMESPACE), "path")?;
    path.set_attribute("d", "M 12,12 L 28,28 M 28,12 12,28")?;
    path.set_attribute("stroke", "#fff")?;
    path.set_attribute("stroke-width", "2")?;
    svg.append_child(&path)?;
    context.overlay.append_child(&svg)?;

    let close_context = context.clone();
    let on_close = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event| {
        close_context.end_active_session();
    });
    svg.add_event_listener_with_callback("click", on_close.as_ref().unchecked_ref())?;
    on_close.forget();
    Ok(())
}

fn feature_array(features: &[SessionFeature]) -> JsValue {
    let array = js_sys::Array::new();
    for feature in features {
        array.push(&JsValue::from_str(feature.name()));
    }
    array.into()
}

fn session_mode(mode: SessionMode) -> XrSessionMode {
    match mode {
        SessionMode::Inline => XrSessionMode::Inline,
        SessionMode::ImmersiveVr => XrSessionMode::ImmersiveVr,
        SessionMode::ImmersiveAr => XrSessionMode::ImmersiveAr,
    }
}

fn reference_space_type(space: ReferenceSpace) -> XrReferenceSpaceType {
    match space {
        ReferenceSpace::Viewer => XrReferenceSpaceType::Viewer,
        ReferenceSpace::Local => XrReferenceSpaceType::Local,
        ReferenceSpace::LocalFloor => XrReferenceSpaceType::LocalFloor,
        ReferenceSpace::BoundedFloor => XrReferenceSpaceType::BoundedFloor,
        ReferenceSpace::Unbounded => XrReferenceSpaceType::Unbounded,
    }
}

fn js_error_message(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}

fn log_to_console(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}
