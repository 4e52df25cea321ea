pub mod clean;
pub mod detect;
pub mod error;
pub mod io;
pub mod modifier;
pub mod refine;
pub mod signal;

pub use clean::*;
pub use detect::*;
pub use error::*;
pub use modifier::*;
pub use refine::*;
pub use signal::*;
