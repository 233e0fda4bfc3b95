//! Hardware-independent logic for the roomsense telemetry node.
//!
//! The firmware crate implements the collaborator traits from [`cycle`]
//! over real esp-idf drivers; the boot sequence and the
//! sample-display-publish loop live here so they can be tested on the
//! host against mock collaborators.

pub mod cycle;
pub mod point;
pub mod reading;

pub use cycle::Cycle;
pub use point::Point;
pub use reading::Reading;
