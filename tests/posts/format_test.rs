//! Tests for post display rows and the single-post view.

use ideaforge::posts::{display_rows, extract_posts, format_post_view};

#[test]
fn rows_follow_preferred_order_then_document_order() {
    let doc = "\
Post 1
1. Hashtags - #a
2. Caption 1: cap
3. Graphic Title - Title
4. Optional List: x; y
5. Mood - calm
";
    let posts = extract_posts(doc);
    let rows = display_rows(&posts[0]);
    let labels: Vec<&str> = rows.iter().map(|(label, _)| label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "Graphic Title",
            "Optional List 1",
            "Optional List 2",
            "Caption 1",
            "Hashtags",
            "Mood",
        ]
    );
    assert_eq!(rows[1].1, "x");
}

#[test]
fn empty_list_shows_one_blank_row() {
    let posts = extract_posts("Post 1\n5. Optional List:\nnot a bullet\n");
    let rows = display_rows(&posts[0]);
    assert_eq!(rows, vec![("Optional List".to_string(), String::new())]);
}

#[test]
fn post_view_renders_selected_post() {
    let posts = extract_posts("Post 1\nCTA: One\nPost 2 - Promo\nCTA: Two\n5. Optional List: a; b\n");
    let view = format_post_view(&posts, 1);
    assert_eq!(
        view,
        format!(
            "Post 2 - Promo\nViewing 2 of 2\n{}\nCTA: Two\nOptional List:\n- a\n- b",
            "-".repeat(40)
        )
    );
}

#[test]
fn post_view_clamps_index() {
    let posts = extract_posts("Post 1\nCTA: One\n");
    assert!(format_post_view(&posts, 99).starts_with("Post 1\nViewing 1 of 1\n"));
}
