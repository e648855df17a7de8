#![deny(missing_docs)]
#![doc = "Core error, randomness and probability types shared by the dagmc crates."]

pub mod errors;
pub mod interval;
pub mod logdouble;
pub mod rng;

pub use errors::{ErrorInfo, McmcError};
pub use interval::{IntervalKind, RealInterval};
pub use logdouble::LogDouble;
pub use rng::{derive_substream_seed, RngHandle};
