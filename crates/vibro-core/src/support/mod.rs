pub mod boundary;
pub mod quiet;

pub use boundary::kernel_boundary;
pub use quiet::QuietScope;
