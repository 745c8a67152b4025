pub mod clock;
pub mod repository;
pub mod rng;

pub use clock::{Clock, SystemClock};
pub use repository::{EngineEvent, Repository};
pub use rng::{EngineRng, StdEngineRng};

#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
#[cfg(any(test, feature = "testing"))]
pub use rng::SequenceRng;

#[cfg(any(test, feature = "testing"))]
pub use repository::MockRepository;
