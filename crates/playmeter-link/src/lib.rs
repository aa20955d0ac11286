//! Hardware link for playmeterd
//!
//! The unit controller (a microcontroller driving one relay per unit and a
//! status display) is fed over a line-oriented serial link:
//! - one `SYNC|...` status frame per tick describing every unit
//! - one-shot `ON:<unit>` / `OFF:<unit>` relay commands
//!
//! Writes are best-effort and never block billing: they go through a
//! background writer task behind [`LinkHandle`].

mod device;
mod handle;
mod mock;
pub mod protocol;
mod traits;

pub use device::*;
pub use handle::*;
pub use mock::*;
pub use traits::*;
