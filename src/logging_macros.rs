#![warn(clippy::all, rust_2018_idioms)]

//! Logging macros that stamp every message with `[file:module:line]`.
//!
//! The `log_*` family writes to both the `log` facade and `tracing` so that
//! library users on either ecosystem see the same output. The `trace_*`
//! family only writes to `tracing`, which is what the hot paths (per page,
//! per row) use to stay cheap when no `log` logger is installed.

#[doc(hidden)]
#[macro_export]
macro_rules! __describe_log {
    ($level:ident, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        log::$level!("[{}:{}:{}] {}", file!(), module_path!(), line!(), message);
        tracing::$level!("[{}:{}:{}] {}", file!(), module_path!(), line!(), message);
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __describe_trace {
    ($level:ident, $($arg:tt)*) => {
        tracing::$level!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => { $crate::__describe_log!(trace, $($arg)*) };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::__describe_log!(debug, $($arg)*) };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::__describe_log!(info, $($arg)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::__describe_log!(warn, $($arg)*) };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::__describe_log!(error, $($arg)*) };
}

#[macro_export]
macro_rules! trace_trace {
    ($($arg:tt)*) => { $crate::__describe_trace!(trace, $($arg)*) };
}

#[macro_export]
macro_rules! trace_debug {
    ($($arg:tt)*) => { $crate::__describe_trace!(debug, $($arg)*) };
}
