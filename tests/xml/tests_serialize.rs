use rstest::rstest;

use arcadia::xml::{Document, parse};
use arcadia::{ErrorKind, Model, NewObject, SerializeOptions, Serializer};

use crate::helpers::{DEMO, DEMO_PATH, FRAGMENT, FRAGMENT_PATH, demo_model, node, registry};

fn unbounded() -> Serializer {
    Serializer::new(SerializeOptions {
        line_length: usize::MAX,
        siblings: true,
        declare_encoding: false,
    })
}

/// Serialize the root element of `input` with [`unbounded`] options.
fn reserialize(input: &str) -> String {
    let (doc, document) = parse(input.as_bytes()).unwrap();
    let root = doc.root_element(document).unwrap();
    unbounded().to_string(&doc, root).unwrap()
}

// ============================================================================
// Escaping
// ============================================================================

#[rstest]
#[case::text(
    "<root>&quot;&amp;&lt;&gt;&#x9;&#x1F;&#x7F;</root>",
    "<root>&quot;&amp;&lt;>\t&#x1F;&#x7F;</root>\n"
)]
#[case::attribute(
    r#"<root a="&quot;&amp;&lt;&gt;&#x9;&#x1F;&#x7F;"/>"#,
    "<root a=\"&quot;&amp;&lt;>&#x9;&#x1F;&#x7F;\"/>\n"
)]
#[case::comment(
    "<root><!--\"&<>--></root>",
    "<root>\n  <!--\"&<&gt;-->\n</root>\n"
)]
fn test_escaping(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(reserialize(input), expected);
}

// ============================================================================
// Layout
// ============================================================================

#[test]
fn test_siblings_surround_root() {
    let input = "<?xml version=\"1.0\"?><!--before--><?pi data?><root/><!--after-->";
    assert_eq!(
        reserialize(input),
        "\n<!--before-->\n<?pi data?>\n<root/>\n<!--after-->\n"
    );
}

#[test]
fn test_without_siblings() {
    let (doc, document) = parse(b"<!--c--><root><a/></root>").unwrap();
    let root = doc.root_element(document).unwrap();
    let out = Serializer::default().to_string(&doc, root).unwrap();
    assert_eq!(out, "<root>\n  <a/>\n</root>\n");
}

#[test]
fn test_declaration() {
    let (doc, document) = parse(b"<root/>").unwrap();
    let out = Serializer::new(SerializeOptions::file())
        .to_string(&doc, document)
        .unwrap();
    assert_eq!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root/>\n");
}

#[test]
fn test_text_and_children() {
    assert_eq!(
        reserialize("<root>head<a/>tail<b>inner</b></root>"),
        "<root>head\n  <a/>tail\n  <b>inner</b>\n</root>\n"
    );
}

#[test]
fn test_write_to_sink() {
    let (doc, document) = parse(b"<root/>").unwrap();
    let mut sink = Vec::new();
    Serializer::default()
        .write_to(&doc, document, &mut sink)
        .unwrap();
    assert_eq!(sink, b"<root/>\n");
}

// ============================================================================
// Reader
// ============================================================================

#[rstest]
#[case::unclosed("<root><a></root>")]
#[case::unbalanced("<root/></extra>")]
#[case::no_root("<!--only a comment-->")]
#[case::truncated("<root")]
fn test_malformed_input(#[case] input: &str) {
    let err = parse(input.as_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io, "{input}");
}

#[test]
fn test_cdata_becomes_text() {
    let (doc, document) = parse(b"<root><![CDATA[a < b]]></root>").unwrap();
    let root = doc.root_element(document).unwrap();
    assert_eq!(doc.text(root), Some("a < b"));
}

#[test]
fn test_whitespace_only_text_is_dropped() {
    let mut doc = Document::new();
    let document = arcadia::xml::parse_into(&mut doc, b"<root>\n  <a/>\n</root>").unwrap();
    let root = doc.root_element(document).unwrap();
    assert_eq!(doc.text(root), None);
    let a = doc.element_children(root).next().unwrap();
    assert_eq!(doc.tail(a), None);
}

// ============================================================================
// Model round trips
// ============================================================================

#[test]
fn test_load_save_is_byte_identical() {
    let mut model = Model::new(registry());
    model.add_resource(DEMO_PATH, DEMO).unwrap();
    model.add_resource(FRAGMENT_PATH, FRAGMENT).unwrap();
    assert_eq!(model.to_bytes(DEMO_PATH).unwrap(), DEMO);
    assert_eq!(model.to_bytes(FRAGMENT_PATH).unwrap(), FRAGMENT);
}

#[test]
fn test_edit_then_reload() {
    let mut model = demo_model();
    let pkg = node(&model, "pkg-sub");
    model
        .set(
            pkg,
            "components",
            vec![NewObject::new().attr("id", "lc-new").attr("name", "Fresh").into()],
        )
        .unwrap();
    let bytes = model.to_bytes(DEMO_PATH).unwrap();

    let mut reloaded = Model::new(registry());
    reloaded.add_resource(DEMO_PATH, &bytes).unwrap();
    let fresh = reloaded.by_id("lc-new").unwrap();
    assert_eq!(fresh.name(), Some("Fresh"));
    assert_eq!(fresh.parent().and_then(|p| p.id()), Some("pkg-sub"));
    assert_eq!(reloaded.to_bytes(DEMO_PATH).unwrap(), bytes);
}
