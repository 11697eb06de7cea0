pub mod action;
pub mod content;

pub use action::*;
pub use content::*;
