pub mod error;
pub mod health;
pub mod shutdown;
pub mod state;

pub use error::*;
pub use health::*;
pub use shutdown::*;
pub use state::*;
