//! Convenience macros.

/// Builds a `Vec<EventArg>` from heterogeneous values.
///
/// # Example
/// ```rust,ignore
/// let args = event_args![page.clone(), json!({ "old_parent": 12 }), "moved"];
/// events.fire("on_page_move", args).await?;
/// ```
#[macro_export]
macro_rules! event_args {
    () => {
        ::std::vec::Vec::<$crate::args::EventArg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::args::EventArg::from($arg)),+]
    };
}
