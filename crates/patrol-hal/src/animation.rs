//! `AnimationSink` – the single scalar channel into an animation system.
//!
//! The patrol runtime never plays clips itself; it writes one named float
//! per frame and leaves blending between idle and locomotion to whatever
//! sits behind this trait.

/// Receives named float parameters for an animation state machine.
pub trait AnimationSink: Send {
    /// Set the float parameter `name` to `value`.
    fn set_blend_parameter(&mut self, name: &str, value: f32);
}
