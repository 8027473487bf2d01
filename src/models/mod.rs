pub mod artifact;
pub mod incident;

pub use artifact::*;
pub use incident::*;
