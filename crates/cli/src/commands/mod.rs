pub mod build;
pub mod clean;
pub mod discover;
pub mod inspect;
pub mod test_run;
pub mod toolchain;
pub mod util;

pub use build::*;
pub use clean::*;
pub use discover::*;
pub use inspect::*;
pub use test_run::*;
pub use toolchain::*;
pub use util::*;
