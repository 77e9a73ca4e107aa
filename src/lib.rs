//! Hand-tracking UI widgets for immersive sessions, rewritten in Rust.
//!
//! The crate exposes the presentation-layer pieces an XR app composes per
//! tracked hand: a session toggle button, a joint-sphere hand model with
//! touch buttons, and a pinch-driven pointer with a ray cursor.  Platform
//! integration stays behind small traits so the widgets run the same
//! against a live device API, the bundled demo renderer, or plain tests.

pub mod app;
pub mod config;
pub mod events;
pub mod geometry;
pub mod hand;
pub mod input;
pub mod obj;
pub mod pinch;
pub mod pointer;
pub mod render;
pub mod session;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::{HandConfig, PinchConfig, PointerConfig};
pub use events::{EventHub, Subscription};
pub use geometry::{uv_sphere, Aabb, MeshData, PointerGeometry, Ray};
pub use hand::{HandModel, HandSkeleton, TouchButton};
pub use input::{Handedness, Joint, JointPose, Pose, TrackedController, TrackingEvent};
pub use obj::{export_obj, obj_string};
pub use pinch::{PinchState, PinchTracker};
pub use pointer::{HandPointerModel, PointerVisual};
pub use render::CameraParams;
#[cfg(not(target_arch = "wasm32"))]
pub use render::{Renderer, SphereInstance};
pub use session::{
    ArButton, ButtonAction, ReferenceSpace, SessionBackend, SessionError, SessionEvent,
    SessionFeature, SessionHandle, SessionInit, SessionMode, SessionState,
};
