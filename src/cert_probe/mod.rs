pub mod batch;
pub mod probe;
pub mod result;

pub mod prelude {
    pub use super::batch::probe_all;
    pub use super::probe::Prober;
    pub use super::result::{ProbeError, ProbeResult};
}

use std::fmt::Write;

/// Flattens an error and its chain of sources into a single line,
/// e.g. `tls handshake with example.com: unexpected EOF`.
pub fn describe(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, ": {}", src);
        err = src;
    }
    s
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn test_describe_joins_sources() {
        let err = Outer(std::io::Error::other("inner"));
        assert_eq!(describe(&err), "outer: inner");
    }

    #[test]
    fn test_describe_single_error() {
        let err = std::io::Error::other("alone");
        assert_eq!(describe(&err), "alone");
    }
}
