pub mod gradient;
pub mod matrix;
pub mod poly;
pub mod smoothing;
pub mod stats;

pub use gradient::gradient;
pub use matrix::MatrixHelper;
pub use poly::Polynomial;
pub use smoothing::SavitzkyGolay;
pub use stats::{LinearFit, StatsHelper};
