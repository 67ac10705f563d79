use safelist::arena_dom::Document;
use safelist::config::file::PolicyFile;
use safelist::{clean, clean_with_base_uri, is_valid, Cleaner, Error, Policy};

const BASE: &str = "http://example.com/";

const SAMPLES: &[&str] = &[
    "<p>Hello <b>World</b></p>",
    "<div><p><a href='javascript:sendAllMoney()'>Dodgy</a> Link</p></div>",
    "<a href='/foo' title='t'>Link</a> <img src='/bar' alt='x' onerror='evil()'>",
    "<a href=\"ja&Tab;va&Tab;script&colon;alert(1)\">Link</a>",
    "<table><tr><td colspan='2'>cell</td></tr></table>",
    "<blockquote cite='http://example.com/q'><p>quote</p></blockquote><script>x</script>",
    "5 is < 6 & 7 > 5 <span>\"quoted\"</span>",
    "<ul><li>one<li>two</ul><!-- comment --><style>p{}</style>",
    "<a href='#top'>anchor</a><a href='mailto:a@example.com' rel='me'>mail</a>",
    "<a href='http://x.com/'>1<table><tr><td><a href='http://y.com/'>2</a></td></tr></table></a>",
    "<ul><li>a<ul><li>b</li></ul></li></ul>",
    "<p>one<div><p>two</p></div></p>",
];

fn presets() -> Vec<Policy> {
    let mut preserving = Policy::basic_with_images();
    preserving.preserve_relative_links(true);
    let mut list_items = Policy::new();
    list_items.add_tags(&["li", "p"]).unwrap();
    vec![
        Policy::none(),
        Policy::simple_text(),
        Policy::basic(),
        Policy::basic_with_images(),
        Policy::relaxed(),
        preserving,
        list_items,
    ]
}

#[test]
fn cleaning_is_idempotent() {
    for policy in presets() {
        for html in SAMPLES {
            let once = clean_with_base_uri(html, BASE, &policy).unwrap();
            let twice = clean_with_base_uri(&once, BASE, &policy).unwrap();
            assert_eq!(once, twice, "{:?}", html);
        }
    }
}

#[test]
fn cleaned_body_html_is_valid() {
    let mut policy = Policy::relaxed();
    policy.preserve_relative_links(true);
    for html in SAMPLES {
        let cleaned = clean(html, &policy).unwrap();
        assert!(is_valid(&cleaned, &policy), "{:?} -> {:?}", html, cleaned);
    }
}

#[test]
fn none_policy_emits_only_escaped_text() {
    let policy = Policy::none();
    for html in SAMPLES {
        let cleaned = clean(html, &policy).unwrap();
        assert!(!cleaned.contains('<'), "{:?}", cleaned);
        assert!(!cleaned.contains('>'), "{:?}", cleaned);
    }
    assert_eq!(
        clean("<p>Hello <b>World</b></p>", &policy).unwrap(),
        "Hello World"
    );
    assert_eq!(clean("<script>alert(1)</script>", &policy).unwrap(), "");
    assert_eq!(
        clean("5 is < 6 & 7 > 5", &policy).unwrap(),
        "5 is &lt; 6 &amp; 7 &gt; 5"
    );
}

#[test]
fn removing_global_attribute_keeps_tag_grant() {
    let mut policy = Policy::new();
    policy
        .add_tags(&["div", "p"])
        .unwrap()
        .add_attributes(":all", &["class"])
        .unwrap()
        .add_attributes("p", &["class"])
        .unwrap()
        .remove_attributes(":all", &["class"])
        .unwrap();
    assert_eq!(
        clean("<div class='a'><p class='b'>x</p></div>", &policy).unwrap(),
        "<div><p class=\"b\">x</p></div>"
    );
}

#[test]
fn protocol_restrictions_can_be_lifted_and_restored() {
    let html = "<a href='any://example.com/'>Link</a>";
    let mut policy = Policy::relaxed();
    assert_eq!(clean(html, &policy).unwrap(), "<a>Link</a>");

    policy
        .remove_protocols("a", "href", &["ftp", "http", "https", "mailto"])
        .unwrap();
    assert_eq!(
        clean(html, &policy).unwrap(),
        "<a href=\"any://example.com/\">Link</a>"
    );

    policy.add_protocols("a", "href", &["any"]).unwrap();
    assert_eq!(
        clean("<a href='http://example.com/'>x</a>", &policy).unwrap(),
        "<a>x</a>"
    );
}

#[test]
fn relative_links() {
    let html = "<a href='/foo'>Link</a>";
    let mut policy = Policy::basic();
    assert_eq!(
        clean_with_base_uri(html, BASE, &policy).unwrap(),
        "<a href=\"http://example.com/foo\" rel=\"nofollow\">Link</a>"
    );
    assert_eq!(
        clean(html, &policy).unwrap(),
        "<a rel=\"nofollow\">Link</a>"
    );

    policy.preserve_relative_links(true);
    assert_eq!(
        clean_with_base_uri(html, BASE, &policy).unwrap(),
        "<a href=\"/foo\" rel=\"nofollow\">Link</a>"
    );
    assert_eq!(
        clean(html, &policy).unwrap(),
        "<a href=\"/foo\" rel=\"nofollow\">Link</a>"
    );
}

#[test]
fn obfuscated_javascript_is_rejected() {
    let samples = [
        "<a href=\"ja&Tab;va&Tab;script&colon;alert(1)\">x</a>",
        "<a href=\"&#106;avascript:alert(1)\">x</a>",
        "<a href=\"java&#x09;script:alert(1)\">x</a>",
        "<a href=\" JAVASCRIPT:alert(1)\">x</a>",
    ];
    for preserve in &[false, true] {
        let mut policy = Policy::basic();
        policy.preserve_relative_links(*preserve);
        for html in &samples {
            assert_eq!(
                clean_with_base_uri(html, BASE, &policy).unwrap(),
                "<a rel=\"nofollow\">x</a>",
                "{:?}",
                html
            );
            assert!(!is_valid(html, &policy), "{:?}", html);
        }
    }
}

#[test]
fn named_references_are_decoded_before_classifying() {
    let policy = Policy::basic();
    assert_eq!(
        clean_with_base_uri(
            "<a href=\"&amp;NonBreakingSpace;javascript:alert(1)\">x</a>",
            BASE,
            &policy
        )
        .unwrap(),
        "<a rel=\"nofollow\">x</a>"
    );
    // The stored text has no scheme a browser would read, so it is a relative link.
    assert_eq!(
        clean("<a href=\"http&amp;colon;evil\">x</a>", &policy).unwrap(),
        "<a rel=\"nofollow\">x</a>"
    );
}

#[test]
fn document_validity() {
    let policy = Policy::basic();
    let cleaner = Cleaner::new(&policy);
    let check = |html: &str| {
        let arena = typed_arena::Arena::new();
        let document = Document::parse(&arena, html, Some(BASE));
        cleaner.is_valid(&document).unwrap()
    };

    assert!(check(
        "<html><head></head><body><p>Hello <b>there</b></p></body></html>"
    ));
    assert!(!check(
        "<html><head><script>x</script></head><body><p>Hello</p></body></html>"
    ));
    assert!(!check(
        "<html><head><meta charset='utf-8'></head><body></body></html>"
    ));
    assert!(!check(
        "<html><head></head><body><p>Hello</p><div>x</div></body></html>"
    ));
}

#[test]
fn enforced_attributes_always_win() {
    let mut policy = Policy::new();
    policy
        .add_attributes("a", &["href", "rel"])
        .unwrap()
        .add_enforced_attribute("a", "rel", "nofollow")
        .unwrap()
        .add_enforced_attribute("a", "target", "_blank")
        .unwrap();
    assert_eq!(
        clean(
            "<a href='x' rel='me' target='_self'>1</a><a>2</a>",
            &policy
        )
        .unwrap(),
        "<a href=\"x\" rel=\"nofollow\" target=\"_blank\">1</a>\
         <a rel=\"nofollow\" target=\"_blank\">2</a>"
    );
}

#[test]
fn invalid_policy_arguments() {
    let mut policy = Policy::new();
    assert!(matches!(
        policy.add_tags(&[" "]),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        policy.add_attributes("p", &[""]),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn policy_from_file() {
    let policy = PolicyFile::from_json(
        r#"{
            "preset": "simple-text",
            "tags": ["p"],
            "enforced_attributes": { "p": { "dir": "auto" } }
        }"#,
    )
    .unwrap()
    .into_policy()
    .unwrap();
    assert_eq!(
        clean("<p><b>bold</b> <i>it</i> <span>plain</span></p>", &policy).unwrap(),
        "<p dir=\"auto\"><b>bold</b> <i>it</i> plain</p>"
    );
}
