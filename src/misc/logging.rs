use std::fmt::Display;

/// Report a rejected input at debug level when the `log` feature is enabled
#[inline]
pub(crate) fn log_rejection<E: Display>(context: &str, err: &E) {
    #[cfg(feature = "log")]
    log::debug!("{}: {}", context, err);
    #[cfg(not(feature = "log"))]
    let _ = (context, err);
}
