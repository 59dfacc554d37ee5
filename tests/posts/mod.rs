//! Post extraction tests.

mod extract_test;
mod format_test;

/// Verify the public post types are exported from the library.
#[test]
fn test_all_posts_types_exported() {
    use ideaforge::posts::{
        canonicalize, classify, display_rows, extract_posts, format_post_view, ExtractStatus,
        FieldValue, LineKind, PostRecord, LIST_FIELD, NO_POSTS_MESSAGE,
    };

    let posts: Vec<PostRecord> = extract_posts("");
    assert_eq!(ExtractStatus::of(&posts), ExtractStatus::NoPosts);
    assert_eq!(format_post_view(&posts, 0), NO_POSTS_MESSAGE);
    assert_eq!(canonicalize(LIST_FIELD), LIST_FIELD);
    assert!(matches!(classify("plain"), LineKind::Continuation));
    let _: fn(&PostRecord) -> Vec<(String, String)> = display_rows;
    let _ = FieldValue::Text(String::new());
}
