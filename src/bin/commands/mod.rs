pub mod bench_cmd;
pub mod lookup_cmd;
pub mod validate_cmd;

pub use bench_cmd::cmd_bench;
pub use lookup_cmd::{cmd_lookup, LookupArgs};
pub use validate_cmd::cmd_validate;
