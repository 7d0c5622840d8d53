mod aperture;
mod board;
mod generate;
mod geometry;
mod gerber;
mod ipc2581;
mod region;
pub mod spacial;

pub use aperture::*;
pub use board::*;
pub use generate::*;
pub use geometry::*;
pub use gerber::*;
pub use ipc2581::*;
pub use region::*;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
