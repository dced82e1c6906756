//! Content model boundary.

/// A content item (page) that type-scoped listeners are matched against.
///
/// The event core only reads the page type through this trait; it never
/// loads or modifies the item.
pub trait ContentItem: Send + Sync + std::fmt::Debug {
    /// Numeric page type identifier. `0` means the item has no page type.
    fn collection_type_id(&self) -> i64;

    /// Page type handle, e.g. `"blog_entry"`.
    fn collection_type_handle(&self) -> Option<&str>;
}
