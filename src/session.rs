use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{EventHub, Subscription};

/// Kind of XR session to request from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionMode {
    Inline,
    ImmersiveVr,
    ImmersiveAr,
}

impl SessionMode {
    pub fn name(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::ImmersiveVr => "immersive-vr",
            Self::ImmersiveAr => "immersive-ar",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "inline" => Some(Self::Inline),
            "immersive-vr" => Some(Self::ImmersiveVr),
            "immersive-ar" => Some(Self::ImmersiveAr),
            _ => None,
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Capability negotiated when the session is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionFeature {
    LocalFloor,
    BoundedFloor,
    Unbounded,
    HandTracking,
    HitTest,
    Anchors,
    DomOverlay,
    Layers,
    LightEstimation,
}

impl SessionFeature {
    pub fn name(self) -> &'static str {
        match self {
            Self::LocalFloor => "local-floor",
            Self::BoundedFloor => "bounded-floor",
            Self::Unbounded => "unbounded",
            Self::HandTracking => "hand-tracking",
            Self::HitTest => "hit-test",
            Self::Anchors => "anchors",
            Self::DomOverlay => "dom-overlay",
            Self::Layers => "layers",
            Self::LightEstimation => "light-estimation",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "local-floor" => Some(Self::LocalFloor),
            "bounded-floor" => Some(Self::BoundedFloor),
            "unbounded" => Some(Self::Unbounded),
            "hand-tracking" => Some(Self::HandTracking),
            "hit-test" => Some(Self::HitTest),
            "anchors" => Some(Self::Anchors),
            "dom-overlay" => Some(Self::DomOverlay),
            "layers" => Some(Self::Layers),
            "light-estimation" => Some(Self::LightEstimation),
            _ => None,
        }
    }
}

/// Coordinate frame the renderer binds its camera to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceSpace {
    Viewer,
    Local,
    LocalFloor,
    BoundedFloor,
    Unbounded,
}

impl Default for ReferenceSpace {
    fn default() -> Self {
        Self::Local
    }
}

impl ReferenceSpace {
    pub fn name(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Local => "local",
            Self::LocalFloor => "local-floor",
            Self::BoundedFloor => "bounded-floor",
            Self::Unbounded => "unbounded",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "viewer" => Some(Self::Viewer),
            "local" => Some(Self::Local),
            "local-floor" => Some(Self::LocalFloor),
            "bounded-floor" => Some(Self::BoundedFloor),
            "unbounded" => Some(Self::Unbounded),
            _ => None,
        }
    }
}

/// Options sent along with a session request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionInit {
    #[serde(default)]
    pub required_features: Vec<SessionFeature>,
    #[serde(default)]
    pub optional_features: Vec<SessionFeature>,
    #[serde(default)]
    pub reference_space: ReferenceSpace,
}

impl SessionInit {
    pub fn has_feature(&self, feature: SessionFeature) -> bool {
        self.required_features.contains(&feature) || self.optional_features.contains(&feature)
    }
}

/// Failure modes of session acquisition and teardown.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0} sessions are not supported here")]
    Unsupported(SessionMode),
    #[error("session request was rejected: {0}")]
    Rejected(String),
    #[error("no session is active")]
    NotActive,
}

/// Notification raised by the platform about a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Ended,
}

/// Live session granted by a [`SessionBackend`].
///
/// The handle is cheap to clone; every clone shares the end-event hub,
/// so the platform can end the session from anywhere and each listener
/// hears about it.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: u64,
    events: EventHub<SessionEvent>,
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SessionHandle {}

impl SessionHandle {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            events: EventHub::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn subscribe(&self) -> Subscription<SessionEvent> {
        self.events.subscribe()
    }

    /// Announces that the platform has ended this session, whatever the
    /// reason. Backends must raise this from `end_session` too.
    pub fn notify_ended(&self) {
        self.events.emit(SessionEvent::Ended);
    }
}

/// Platform side of session management.
///
/// The widgets never talk to the device API directly; they hand intents
/// to a backend and react to the events it raises.
pub trait SessionBackend {
    fn request_session(
        &mut self,
        mode: SessionMode,
        init: &SessionInit,
    ) -> Result<SessionHandle, SessionError>;

    /// Renderer hook run once a session is live: bind output to the
    /// session using the given reference space.
    fn bind_session(&mut self, handle: &SessionHandle, reference_space: ReferenceSpace) {
        let _ = (handle, reference_space);
    }

    fn end_session(&mut self, handle: &SessionHandle) -> Result<(), SessionError>;
}

/// Lifecycle phase of the toggle widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Requesting,
    Active,
}

/// What a button press asks the caller to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ButtonAction {
    /// Ask the backend for a new session with these options.
    Request(SessionMode, SessionInit),
    /// End the currently active session.
    End(SessionHandle),
    /// Nothing; a request is already in flight.
    None,
}

/// Toggle widget that starts and stops an immersive AR session.
///
/// The widget is a plain state machine: `press` produces an intent, the
/// platform resolves it (synchronously or not), and reports back through
/// `session_started` / `session_failed`. Session teardown always arrives
/// as an end event, whether the button, the platform, or the user's
/// system UI caused it, so `process_events` is the single place the
/// widget returns to idle.
#[derive(Debug)]
pub struct ArButton {
    init: SessionInit,
    state: SessionState,
    session: Option<SessionHandle>,
    end_events: Option<Subscription<SessionEvent>>,
    overlay_visible: bool,
}

impl ArButton {
    pub const START_LABEL: &'static str = "START AR";
    pub const STOP_LABEL: &'static str = "STOP AR";

    /// Builds the widget. When the caller has not asked for a DOM
    /// overlay anywhere, one is added to the optional features so the
    /// overlay UI can come up with the session.
    pub fn new(mut init: SessionInit) -> Self {
        if !init.has_feature(SessionFeature::DomOverlay) {
            init.optional_features.push(SessionFeature::DomOverlay);
        }
        Self {
            init,
            state: SessionState::Idle,
            session: None,
            end_events: None,
            overlay_visible: false,
        }
    }

    pub fn session_init(&self) -> &SessionInit {
        &self.init
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// Button text for the current state.
    pub fn label(&self) -> &'static str {
        match self.state {
            SessionState::Active => Self::STOP_LABEL,
            SessionState::Idle | SessionState::Requesting => Self::START_LABEL,
        }
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    /// Handles a press and returns the intent for the platform to carry
    /// out. Pressing while a request is in flight does nothing.
    pub fn press(&mut self) -> ButtonAction {
        match self.state {
            SessionState::Idle => {
                self.state = SessionState::Requesting;
                ButtonAction::Request(SessionMode::ImmersiveAr, self.init.clone())
            }
            SessionState::Requesting => ButtonAction::None,
            SessionState::Active => match &self.session {
                Some(session) => ButtonAction::End(session.clone()),
                None => ButtonAction::None,
            },
        }
    }

    /// Reports a granted session: the label flips to the stop text and
    /// the overlay becomes visible.
    pub fn session_started(&mut self, session: SessionHandle) {
        log::info!("ar session {} started", session.id());
        self.end_events = Some(session.subscribe());
        self.session = Some(session);
        self.state = SessionState::Active;
        self.overlay_visible = true;
    }

    /// Reports a rejected request. The widget returns to idle with its
    /// UI untouched; there is no retry.
    pub fn session_failed(&mut self, error: &SessionError) {
        log::warn!("ar session request failed: {error}");
        self.state = SessionState::Idle;
    }

    /// Per-frame hook: applies any queued end event, dropping the
    /// session and restoring the idle UI.
    pub fn process_events(&mut self) {
        let Some(events) = &self.end_events else {
            return;
        };
        let mut ended = false;
        while events.poll().is_some() {
            ended = true;
        }
        if ended {
            let id = self.session.as_ref().map(SessionHandle::id);
            log::info!("ar session {:?} ended", id);
            self.session = None;
            self.end_events = None;
            self.state = SessionState::Idle;
            self.overlay_visible = false;
        }
    }

    /// Drives a full press against a synchronous backend: request and
    /// bind a session while idle, end the active one otherwise.
    pub fn toggle(&mut self, backend: &mut impl SessionBackend) -> Result<(), SessionError> {
        match self.press() {
            ButtonAction::Request(mode, init) => match backend.request_session(mode, &init) {
                Ok(session) => {
                    backend.bind_session(&session, init.reference_space);
                    self.session_started(session);
                    Ok(())
                }
                Err(error) => {
                    self.session_failed(&error);
                    Err(error)
                }
            },
            ButtonAction::End(session) => {
                let result = backend.end_session(&session);
                self.process_events();
                result
            }
            ButtonAction::None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct StubBackend {
        next_id: u64,
        reject: bool,
        bound: Option<(u64, ReferenceSpace)>,
        ended: Vec<u64>,
    }

    impl SessionBackend for StubBackend {
        fn request_session(
            &mut self,
            mode: SessionMode,
            _init: &SessionInit,
        ) -> Result<SessionHandle, SessionError> {
            if self.reject {
                return Err(SessionError::Unsupported(mode));
            }
            let handle = SessionHandle::new(self.next_id);
            self.next_id += 1;
            Ok(handle)
        }

        fn bind_session(&mut self, handle: &SessionHandle, reference_space: ReferenceSpace) {
            self.bound = Some((handle.id(), reference_space));
        }

        fn end_session(&mut self, handle: &SessionHandle) -> Result<(), SessionError> {
            self.ended.push(handle.id());
            handle.notify_ended();
            Ok(())
        }
    }

    #[test]
    fn name_tables_round_trip() {
        for mode in [
            SessionMode::Inline,
            SessionMode::ImmersiveVr,
            SessionMode::ImmersiveAr,
        ] {
            assert_eq!(SessionMode::from_name(mode.name()), Some(mode));
        }
        assert_eq!(
            SessionFeature::from_name("dom-overlay"),
            Some(SessionFeature::DomOverlay)
        );
        assert_eq!(ReferenceSpace::from_name("local"), Some(ReferenceSpace::Local));
        assert_eq!(ReferenceSpace::from_name("sitting"), None);
    }

    #[test]
    fn starts_idle_with_the_start_label() {
        let button = ArButton::new(SessionInit::default());
        assert_eq!(button.state(), SessionState::Idle);
        assert_eq!(button.label(), "START AR");
        assert!(!button.overlay_visible());
    }

    #[test]
    fn dom_overlay_is_added_once() {
        let button = ArButton::new(SessionInit::default());
        let optional = &button.session_init().optional_features;
        assert_eq!(
            optional
                .iter()
                .filter(|f| **f == SessionFeature::DomOverlay)
                .count(),
            1
        );
    }

    #[test]
    fn configured_dom_overlay_is_left_alone() {
        let explicit = ArButton::new(SessionInit {
            optional_features: vec![SessionFeature::DomOverlay],
            ..SessionInit::default()
        });
        assert_eq!(explicit.session_init().optional_features.len(), 1);

        let required = ArButton::new(SessionInit {
            required_features: vec![SessionFeature::DomOverlay],
            ..SessionInit::default()
        });
        assert!(required.session_init().optional_features.is_empty());
    }

    #[test]
    fn press_while_requesting_is_ignored() {
        let mut button = ArButton::new(SessionInit::default());
        assert!(matches!(
            button.press(),
            ButtonAction::Request(SessionMode::ImmersiveAr, _)
        ));
        assert_eq!(button.state(), SessionState::Requesting);
        assert_eq!(button.press(), ButtonAction::None);
        assert_eq!(button.label(), "START AR");
    }

    #[test]
    fn started_session_flips_label_and_overlay() {
        let mut button = ArButton::new(SessionInit::default());
        button.press();
        button.session_started(SessionHandle::new(7));
        assert!(button.is_active());
        assert_eq!(button.label(), "STOP AR");
        assert!(button.overlay_visible());
        assert_eq!(button.session().map(SessionHandle::id), Some(7));
    }

    #[test]
    fn end_event_restores_the_idle_ui() {
        let mut button = ArButton::new(SessionInit::default());
        button.press();
        let session = SessionHandle::new(3);
        button.session_started(session.clone());

        session.notify_ended();
        button.process_events();
        assert_eq!(button.state(), SessionState::Idle);
        assert_eq!(button.label(), "START AR");
        assert!(!button.overlay_visible());
        assert!(button.session().is_none());
    }

    #[test]
    fn rejection_returns_to_idle_without_ui_changes() {
        let mut button = ArButton::new(SessionInit::default());
        let mut backend = StubBackend {
            reject: true,
            ..StubBackend::default()
        };
        let result = button.toggle(&mut backend);
        assert!(matches!(result, Err(SessionError::Unsupported(_))));
        assert_eq!(button.state(), SessionState::Idle);
        assert_eq!(button.label(), "START AR");
        assert!(!button.overlay_visible());

        // a later press may try again
        assert!(matches!(button.press(), ButtonAction::Request(_, _)));
    }

    #[test]
    fn toggle_round_trip_binds_and_ends() {
        let mut button = ArButton::new(SessionInit::default());
        let mut backend = StubBackend::default();

        button.toggle(&mut backend).unwrap();
        assert!(button.is_active());
        assert_eq!(backend.bound, Some((0, ReferenceSpace::Local)));

        button.toggle(&mut backend).unwrap();
        assert_eq!(button.state(), SessionState::Idle);
        assert_eq!(backend.ended, vec![0]);
        assert!(!button.overlay_visible());
    }

    #[test]
    fn platform_end_reaches_the_widget_through_events() {
        let mut button = ArButton::new(SessionInit::default());
        let mut backend = StubBackend::default();
        button.toggle(&mut backend).unwrap();

        // system UI ends the session behind the widget's back
        if let Some(session) = button.session() {
            session.notify_ended();
        }
        button.process_events();
        assert_eq!(button.state(), SessionState::Idle);
    }
}
