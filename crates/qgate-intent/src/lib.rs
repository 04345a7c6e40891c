//! qgate-intent
//!
//! Query intent probability from a calibrated linear classifier over word
//! n-gram TF-IDF features.

pub mod features;
pub mod model;

pub use features::NgramVectorizer;
pub use model::{CalibratedMember, Calibration, IntentModel, IntentModelMeta};
