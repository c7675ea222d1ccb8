mod exit;
mod fork;
mod thread;
mod wait;

pub use self::exit::*;
pub use self::fork::*;
pub use self::thread::*;
pub use self::wait::*;
