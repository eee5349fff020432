pub mod artifact;
pub mod features;
pub mod prediction;
pub mod report;

pub use artifact::*;
pub use features::*;
pub use prediction::*;
pub use report::*;
