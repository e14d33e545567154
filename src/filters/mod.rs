pub mod allowlist;

pub use allowlist::{PairAllowlist, PairAllowlistFile};
