pub mod behavioral;
pub mod driver;
pub mod fingerprint;
pub mod launch;
pub mod page;

pub use driver::KontaktDriver;
pub use launch::{BrowserKind, BrowserOptions};
pub use page::{KontaktPage, ScopedElement};
