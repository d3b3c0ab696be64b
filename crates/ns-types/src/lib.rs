pub mod errors;
pub mod graph;
pub mod params;
pub mod score;
pub mod traits;

pub use errors::*;
pub use graph::*;
pub use params::*;
pub use score::*;
pub use traits::*;
