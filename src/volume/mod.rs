// Volume module - Gain envelope calculation for region preview
//
// Pure functions only: no engine access and no shared state.

pub mod fade;
pub mod profile;

pub use fade::{FadeParameters, fade_envelope};
pub use profile::{CustomGains, GainParams, VolumeProfile, compute_gain};
