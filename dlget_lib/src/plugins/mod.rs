mod dlive;

pub use dlive::{asset_from_state, extract_apollo_state, DLive};
