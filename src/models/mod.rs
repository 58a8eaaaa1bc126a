pub mod task;
pub mod review;
pub mod user;
pub mod pet;

pub use task::*;
pub use review::*;
pub use user::*;
pub use pet::*;
