//! Tests for extracting post records from generated markdown.

use ideaforge::posts::{canonicalize, extract_posts, ExtractStatus, FieldValue, LIST_FIELD};

const FIXTURE: &str = include_str!("../fixtures/march_ideas.md");

#[test]
fn fixture_yields_two_posts() {
    let posts = extract_posts(FIXTURE);
    assert_eq!(posts.len(), 2);
    assert_eq!(ExtractStatus::of(&posts), ExtractStatus::Fields);
    assert_eq!(posts[0].header(), "Post 1 - Week 1 Launch");
    assert_eq!(posts[0].number(), Some(1));
    assert_eq!(posts[1].number(), Some(2));
}

#[test]
fn fixture_first_post_fields() {
    let posts = extract_posts(FIXTURE);
    let post = &posts[0];

    let names: Vec<&str> = post.fields().map(|(name, _)| name).collect();
    assert_eq!(
        names,
        vec![
            "Graphic Title",
            "Graphic Subtitle",
            "CTA",
            "Title for Optional List",
            "Optional List",
            "Website",
            "Caption 1",
            "Caption 2",
        ]
    );
    assert_eq!(post.text("Graphic Subtitle"), Some("Bright, floral, limited"));
    assert_eq!(post.text("Website"), Some("https://harbor.example/spring"));
    assert_eq!(
        post.list(LIST_FIELD),
        Some(
            &[
                "Honeysuckle".to_string(),
                "Meyer lemon".to_string(),
                "cocoa nib".to_string(),
                "Brown sugar".to_string(),
            ][..]
        )
    );
    assert_eq!(
        post.text("Caption 1"),
        Some("Spring is pouring in: our seasonal blend lands Monday.\n\nStop by - first 50 cups are on us.")
    );
    assert_eq!(
        post.text("Caption 2"),
        Some("Short and sweet: new blend, same harbor.")
    );
}

#[test]
fn fixture_second_post_skips_unknown_prose() {
    let posts = extract_posts(FIXTURE);
    let post = &posts[1];

    assert_eq!(post.text("Graphic Title"), Some("Meet the Roasters"));
    assert_eq!(post.text("Hashtags"), Some("#harborcoffee #spring"));
    assert_eq!(post.text("Caption 1"), Some("Ten years, one drum roaster."));
    assert!(post.get("Brand Voice").is_none());
}

#[test]
fn document_without_headers_is_empty() {
    for doc in ["", "just prose", "1. Graphic Title - X\n- bullet", "Posted 3 times"] {
        let posts = extract_posts(doc);
        assert!(posts.is_empty(), "expected no posts for {doc:?}");
    }
}

#[test]
fn header_then_graphic_title_is_first_field() {
    let posts = extract_posts("Post 7\n1. Graphic Title - X\n");
    let first = posts[0].fields().next();
    assert_eq!(first, Some(("Graphic Title", &FieldValue::Text("X".to_string()))));
}

#[test]
fn optional_list_takes_exactly_six_bullets() {
    let doc = "\
Post 1
5. Optional List:
- one
- two
- three
- four
- five
- six
6. Website - example.com
- stray bullet
";
    let posts = extract_posts(doc);
    let items = posts[0].list(LIST_FIELD).unwrap();
    assert_eq!(items, ["one", "two", "three", "four", "five", "six"]);
    assert_eq!(posts[0].text("Website"), Some("example.com"));
}

#[test]
fn inline_list_value_is_split() {
    let posts = extract_posts("Post 1\n5. Optional List - a; b\n- c\n");
    assert_eq!(posts[0].list(LIST_FIELD).unwrap(), ["a", "b", "c"]);
}

#[test]
fn caption_keeps_blank_line_between_paragraphs() {
    let doc = "\
Post 2
10. Caption 1:
First paragraph: with a colon.

Second paragraph - with a dash.
11. Caption 2 - next
";
    let posts = extract_posts(doc);
    assert_eq!(
        posts[0].text("Caption 1"),
        Some("First paragraph: with a colon.\n\nSecond paragraph - with a dash.")
    );
    assert_eq!(posts[0].text("Caption 2"), Some("next"));
}

#[test]
fn caption_ends_at_next_header() {
    let posts = extract_posts("Post 1\nCaption 3: line one\nline two\n### Post 2\nCTA: Go\n");
    assert_eq!(posts[0].text("Caption 3"), Some("line one\nline two"));
    assert_eq!(posts[1].text("CTA"), Some("Go"));
}

#[test]
fn numbered_unknown_field_stays_inside_caption() {
    let posts = extract_posts("Post 1\n7. Caption 1: a\n9. Hashtags - x\n");
    assert_eq!(posts[0].text("Caption 1"), Some("a\n9. Hashtags - x"));
    assert_eq!(posts[0].text("Hashtags"), None);
    assert_eq!(posts[0].fields().count(), 1);
}

#[test]
fn repeated_caption_label_is_caption_content() {
    let posts = extract_posts("Post 1\n7. Caption 1: a\nCaption 1: b\n8. Caption 2 - c\n");
    assert_eq!(posts[0].text("Caption 1"), Some("a\nCaption 1: b"));
    assert_eq!(posts[0].text("Caption 2"), Some("c"));
}

#[test]
fn custom_caption_field_is_multiline() {
    let posts = extract_posts("Post 1\n4. Caption Alt: first\nsecond\n5. CTA - Buy\n");
    assert_eq!(posts[0].text("Caption Alt"), Some("first\nsecond"));
    assert_eq!(posts[0].text("CTA"), Some("Buy"));
}

#[test]
fn canonical_names_are_stable() {
    for name in ["Graphic Title", "CTA", LIST_FIELD, "Caption 2"] {
        assert_eq!(canonicalize(name), name);
    }
    assert_eq!(
        canonicalize("Optional List Title"),
        canonicalize("Title for Optional List")
    );
}

#[test]
fn posts_serialize_with_metadata_first() {
    let posts = extract_posts("Post 3 - Reel\n1. CTA - Watch\n");
    let json = serde_json::to_string(&posts[0]).unwrap();
    assert_eq!(
        json,
        r#"{"Post Header":"Post 3 - Reel","Post Number":3,"CTA":"Watch"}"#
    );
}
