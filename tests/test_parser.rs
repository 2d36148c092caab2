mod fixtures;

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use arbor_xml::{ErrorKind, ParseSettings, ParseWarning, Strict, TreeParser, Value};
use fixtures::*;

fn collecting_settings() -> (ParseSettings, Rc<RefCell<Vec<String>>>) {
    let warnings = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&warnings);
    let settings = ParseSettings::new().warning_policy(move |w: &ParseWarning| {
        sink.borrow_mut().push(w.to_string());
        false
    });
    (settings, warnings)
}

#[test]
fn parses_a_complete_document() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let root = TreeParser::new(&schema)
        .parse_from_text(SAMPLE_DOCUMENT)
        .unwrap();

    assert_eq!(root.tag(), "doxygen");
    let doc = root.value().as_node().unwrap();
    assert_eq!(doc.type_name(), "document");
    assert_eq!(doc.field("version").unwrap().as_str(), Some("1.9.1"));

    let compounds = doc.field("compounddef").unwrap().as_list().unwrap();
    assert_eq!(compounds.len(), 1);
    let compound = compounds[0].as_node().unwrap();
    assert_eq!(compound.field("id").unwrap().as_str(), Some("class_widget"));
    assert_eq!(compound.field("kind").unwrap().as_enum(), Some("class"));
    assert_eq!(compound.field("prot").unwrap().as_enum(), Some("public"));
    assert!(compound.field("checked").unwrap().is_null());
    assert_eq!(
        compound.field("compoundname").unwrap().as_str(),
        Some("Widget")
    );

    let sections = compound.field("sectiondef").unwrap().as_list().unwrap();
    let members = sections[0]
        .as_node()
        .unwrap()
        .field("memberdef")
        .unwrap()
        .as_list()
        .unwrap();
    assert_eq!(members.len(), 2);

    let size = members[0].as_node().unwrap();
    assert_eq!(size.field("name").unwrap().as_str(), Some("size"));
    assert_eq!(size.field("static").unwrap().as_bool(), Some(true));
    assert_eq!(size.field("line").unwrap().as_int(), Some(42));
    // A present `#empty` child and an absent optional child both read as
    // null.
    assert!(size.field("initializer").unwrap().is_null());

    let name = members[1].as_node().unwrap();
    assert!(name.field("static").unwrap().is_null());
    assert!(name.field("line").unwrap().is_null());
    assert!(name.field("initializer").unwrap().is_null());
}

#[test]
fn mixed_content_keeps_document_order() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let root = TreeParser::new(&schema)
        .parse_from_text(SAMPLE_DOCUMENT)
        .unwrap();

    let doc = root.value().as_node().unwrap();
    let compound = doc.field("compounddef").unwrap().as_list().unwrap()[0]
        .as_node()
        .unwrap();
    let brief = compound
        .field("briefdescription")
        .unwrap()
        .as_node()
        .unwrap();
    let content = brief.content().unwrap();
    assert_eq!(content.len(), 3);
    assert_eq!(content[0].as_str(), Some("A "));
    let bold = content[1].as_tagged().unwrap();
    assert_eq!(bold.tag(), "bold");
    let inner = bold.value().as_node().unwrap().content().unwrap();
    assert_eq!(inner[0].as_str(), Some("small"));
    assert_eq!(content[2].as_str(), Some(" thing."));
}

#[test]
fn text_union_alternatives_keep_their_tags() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = concat!(
        r#"<doxygen version="1"><compounddef id="c" kind="class">"#,
        "<compoundname>X</compoundname>",
        "<briefdescription>see <ref>foo</ref> end</briefdescription>",
        "</compounddef></doxygen>",
    );
    let root = TreeParser::new(&schema).parse_from_text(doc).unwrap();
    let brief = root.value().as_node().unwrap().field("compounddef").unwrap()
        .as_list().unwrap()[0]
        .as_node().unwrap()
        .field("briefdescription").unwrap()
        .as_node().unwrap();
    let content = brief.content().unwrap();
    assert_eq!(content.len(), 3);
    assert_eq!(content[0].as_str(), Some("see "));
    let reference = content[1].as_tagged().unwrap();
    assert_eq!(reference.tag(), "ref");
    assert_eq!(reference.value().as_str(), Some("foo"));
    assert_eq!(content[2].as_str(), Some(" end"));
}

#[test]
fn character_substitutes_merge_into_text_runs() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = concat!(
        r#"<doxygen version="1"><compounddef id="c" kind="class">"#,
        "<compoundname>X</compoundname>",
        r#"<briefdescription>a<sp value="9"/>b</briefdescription>"#,
        "</compounddef></doxygen>",
    );
    let root = TreeParser::new(&schema).parse_from_text(doc).unwrap();
    let brief = root.value().as_node().unwrap().field("compounddef").unwrap()
        .as_list().unwrap()[0]
        .as_node().unwrap()
        .field("briefdescription").unwrap()
        .as_node().unwrap();
    let content = brief.content().unwrap();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0].as_str(), Some("a\tb"));
}

#[test]
fn character_substitute_without_adjacent_text_is_tagged() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = concat!(
        r#"<doxygen version="1"><compounddef id="c" kind="class">"#,
        "<compoundname>X</compoundname>",
        "<briefdescription><sp/>x</briefdescription>",
        "</compounddef></doxygen>",
    );
    let root = TreeParser::new(&schema).parse_from_text(doc).unwrap();
    let brief = root.value().as_node().unwrap().field("compounddef").unwrap()
        .as_list().unwrap()[0]
        .as_node().unwrap()
        .field("briefdescription").unwrap()
        .as_node().unwrap();
    let content = brief.content().unwrap();
    assert_eq!(content.len(), 2);
    let sp = content[0].as_tagged().unwrap();
    assert_eq!(sp.tag(), "sp");
    assert_eq!(sp.value().as_str(), Some(" "));
    assert_eq!(content[1].as_str(), Some("x"));
}

#[test]
fn invalid_enumeration_value_reports_its_line() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = "<doxygen version=\"1\">\n  <compounddef id=\"c\" kind=\"bogus\">\n  </compounddef>\n</doxygen>";
    let err = TreeParser::new(&schema).parse_from_text(doc).unwrap_err();
    assert_eq!(err.line(), Some(2));
    assert_eq!(
        err.to_string(),
        "Error on line 2: \"bogus\" is not one of the allowed enumeration values"
    );
}

#[test]
fn attribute_coercion_failures() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let member = |attrs: &str| {
        format!(
            concat!(
                r#"<doxygen version="1"><compounddef id="c" kind="class">"#,
                "<compoundname>X</compoundname><sectiondef>",
                r#"<memberdef id="m" {}><name>n</name></memberdef>"#,
                "</sectiondef></compounddef></doxygen>",
            ),
            attrs
        )
    };
    let mut parser = TreeParser::new(&schema);

    let err = parser.parse_from_text(member("static=\"maybe\"")).unwrap_err();
    assert!(err.to_string().ends_with("\"static\" must be \"yes\" or \"no\""));

    let err = parser.parse_from_text(member("line=\"4x\"")).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidInteger));
    assert!(err.to_string().ends_with("cannot parse integer"));

    // Surrounding whitespace is fine for integers.
    let root = parser.parse_from_text(member("line=\" 7 \"")).unwrap();
    assert!(root.value().as_node().is_some());
}

#[test]
fn char_enum_attributes() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let compound = |attrs: &str| {
        format!(
            concat!(
                r#"<doxygen version="1"><compounddef id="c" kind="class" {}>"#,
                "<compoundname>X</compoundname></compounddef></doxygen>",
            ),
            attrs
        )
    };
    let mut parser = TreeParser::new(&schema);

    let root = parser.parse_from_text(compound("checked=\"y\"")).unwrap();
    let node = root.value().as_node().unwrap();
    let compounddef = node.field("compounddef").unwrap().as_list().unwrap()[0]
        .as_node()
        .unwrap();
    assert_eq!(compounddef.field("checked").unwrap().as_char(), Some('y'));

    let err = parser.parse_from_text(compound("checked=\"x\"")).unwrap_err();
    assert!(err.to_string().ends_with(
        "\"x\" is not one of the allowed character values; must be one of \"ynd\""
    ));

    let err = parser.parse_from_text(compound("checked=\"yn\"")).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotSingleChar));
}

#[test]
fn missing_required_attribute_fails_at_the_start_tag() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = "<doxygen version=\"1\">\n<compounddef kind=\"class\">\n<compoundname>X</compoundname>\n</compounddef>\n</doxygen>";
    let err = TreeParser::new(&schema).parse_from_text(doc).unwrap_err();
    assert_eq!(err.line(), Some(2));
    assert_eq!(err.to_string(), "Error on line 2: missing \"id\" attribute");
}

#[test]
fn missing_required_child_fails_at_the_end_tag() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = "<doxygen version=\"1\">\n<compounddef id=\"c\" kind=\"class\">\n</compounddef>\n</doxygen>";
    let err = TreeParser::new(&schema).parse_from_text(doc).unwrap_err();
    assert_eq!(err.line(), Some(3));
    assert_eq!(
        err.to_string(),
        "Error on line 3: missing \"compoundname\" child"
    );
}

#[test]
fn empty_required_list_is_an_error() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = concat!(
        r#"<doxygen version="1"><compounddef id="c" kind="class">"#,
        "<compoundname>X</compoundname><sectiondef></sectiondef>",
        "</compounddef></doxygen>",
    );
    let err = TreeParser::new(&schema).parse_from_text(doc).unwrap_err();
    assert!(err
        .to_string()
        .ends_with("at least one \"memberdef\" child is required"));
}

#[test]
fn duplicate_single_child_is_an_error() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = concat!(
        r#"<doxygen version="1"><compounddef id="c" kind="class">"#,
        "<compoundname>X</compoundname><compoundname>Y</compoundname>",
        "</compounddef></doxygen>",
    );
    let err = TreeParser::new(&schema).parse_from_text(doc).unwrap_err();
    assert!(err
        .to_string()
        .ends_with("\"compoundname\" cannot appear more than once in this context"));
}

#[test]
fn unknown_subtree_warns_once_and_parsing_continues() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = "<doxygen version=\"1\">\n<compounddef id=\"c\" kind=\"class\">\n<compoundname>X</compoundname>\n</compounddef>\n<FAKE_TAG>\n<more><stuff/></more>\n</FAKE_TAG>\n</doxygen>";

    let (settings, warnings) = collecting_settings();
    let root = TreeParser::with_settings(&schema, settings)
        .parse_from_text(doc)
        .unwrap();
    assert!(root.value().as_node().is_some());
    assert_eq!(
        warnings.borrow().as_slice(),
        ["Warning on line 5: unexpected element \"FAKE_TAG\""]
    );
}

#[test]
fn strict_policy_escalates_warnings() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = "<doxygen version=\"1\">\n<FAKE_TAG/>\n</doxygen>";
    let err = TreeParser::with_settings(&schema, ParseSettings::new().warning_policy(Strict))
        .parse_from_text(doc)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error on line 2: unexpected element \"FAKE_TAG\""
    );
}

#[test]
fn unknown_and_duplicate_attributes_warn() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = concat!(
        r#"<doxygen version="1" version="2" mystery="?">"#,
        r#"<compounddef id="c" kind="class">"#,
        "<compoundname>X</compoundname></compounddef></doxygen>",
    );

    let (settings, warnings) = collecting_settings();
    let root = TreeParser::with_settings(&schema, settings)
        .parse_from_text(doc)
        .unwrap();
    // The first value wins; the duplicate is reported and dropped.
    assert_eq!(
        root.value().as_node().unwrap().field("version").unwrap().as_str(),
        Some("1")
    );
    assert_eq!(
        warnings.borrow().as_slice(),
        [
            "Warning on line 1: duplicate attribute \"version\"",
            "Warning on line 1: unexpected attribute \"mystery\"",
        ]
    );
}

#[test]
fn stray_character_data_warns_only_when_non_whitespace() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = "<doxygen version=\"1\">\nstray text\n<compounddef id=\"c\" kind=\"class\"><compoundname>X</compoundname></compounddef>\n</doxygen>";

    let (settings, warnings) = collecting_settings();
    TreeParser::with_settings(&schema, settings)
        .parse_from_text(doc)
        .unwrap();
    assert_eq!(
        warnings.borrow().as_slice(),
        ["Warning on line 3: unexpected character data"]
    );
}

#[test]
fn truncated_document_is_an_error() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = r#"<doxygen version="1"><compounddef id="c" kind="class">"#;
    let err = TreeParser::new(&schema).parse_from_text(doc).unwrap_err();
    assert!(err.line().is_some());
}

#[test]
fn mismatched_close_tag_is_a_syntax_error() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = r#"<doxygen version="1"><compounddef id="c" kind="class"></doxygen>"#;
    let err = TreeParser::new(&schema).parse_from_text(doc).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Syntax(_)));
}

#[test]
fn second_root_element_is_an_error() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = "<doxygen version=\"1\"><compounddef id=\"c\" kind=\"class\"><compoundname>X</compoundname></compounddef></doxygen>\n<doxygen version=\"2\"></doxygen>";
    let err = TreeParser::new(&schema).parse_from_text(doc).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error on line 2: cannot have more than one root element"
    );
}

#[test]
fn document_without_recognized_root_has_no_line() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let (settings, warnings) = collecting_settings();
    let err = TreeParser::with_settings(&schema, settings)
        .parse_from_text("<unknown><x/></unknown>")
        .unwrap_err();
    assert_eq!(err.line(), None);
    assert_eq!(
        err.to_string(),
        "Error: document without a recognized root element"
    );
    assert_eq!(warnings.borrow().len(), 1);
}

#[test]
fn tuple_content_groups_repeat() {
    ensure_env_logger_initialized();
    let schema = parameter_schema();
    let doc = concat!(
        "<parameterlist>",
        "<type>int</type><declname>x</declname><defval>0</defval>",
        "<type>float</type><declname>y</declname><defval>1.5</defval>",
        "</parameterlist>",
    );
    let root = TreeParser::new(&schema).parse_from_text(doc).unwrap();
    let content = root.value().as_node().unwrap().content().unwrap();
    assert_eq!(content.len(), 2);

    let first = content[0].as_tuple().unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(first.get(0).unwrap().as_str(), Some("int"));
    assert_eq!(first.field("declname").unwrap().as_str(), Some("x"));
    assert_eq!(first.field("defval").unwrap().as_str(), Some("0"));

    let second = content[1].as_tuple().unwrap();
    assert_eq!(second.field("type").unwrap().as_str(), Some("float"));
}

#[test]
fn tuple_group_restarted_early() {
    ensure_env_logger_initialized();
    let schema = parameter_schema();
    let doc = concat!(
        "<parameterlist>",
        "<type>int</type><declname>x</declname>",
        "<type>float</type>",
        "</parameterlist>",
    );
    let err = TreeParser::new(&schema).parse_from_text(doc).unwrap_err();
    assert!(err.to_string().ends_with(
        "\"type\" element can only come after \"defval\" element or be the first in its group"
    ));
}

#[test]
fn tuple_element_out_of_order() {
    ensure_env_logger_initialized();
    let schema = parameter_schema();
    let doc = "<parameterlist><declname>x</declname></parameterlist>";
    let err = TreeParser::new(&schema).parse_from_text(doc).unwrap_err();
    assert!(err
        .to_string()
        .ends_with("\"declname\" element can only come after \"type\" element"));
}

#[test]
fn tuple_left_incomplete_at_end() {
    ensure_env_logger_initialized();
    let schema = parameter_schema();
    let doc = "<parameterlist><type>int</type><declname>x</declname></parameterlist>";
    let err = TreeParser::new(&schema).parse_from_text(doc).unwrap_err();
    assert!(err
        .to_string()
        .ends_with("\"defval\" element must come after \"declname\" element"));
}

#[test]
fn nesting_deeper_than_one_stack_block() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let depth = 250;
    let mut doc = String::from(
        r#"<doxygen version="1"><compounddef id="c" kind="class"><compoundname>X</compoundname><briefdescription>"#,
    );
    for _ in 0..depth {
        doc.push_str("<bold>");
    }
    doc.push_str("deep");
    for _ in 0..depth {
        doc.push_str("</bold>");
    }
    doc.push_str("</briefdescription></compounddef></doxygen>");

    let root = TreeParser::new(&schema).parse_from_text(&doc).unwrap();
    let mut node = root.value().as_node().unwrap().field("compounddef").unwrap()
        .as_list().unwrap()[0]
        .as_node().unwrap()
        .field("briefdescription").unwrap()
        .as_node().unwrap();
    for _ in 0..depth {
        node = node.content().unwrap()[0].as_tagged().unwrap().value().as_node().unwrap();
    }
    assert_eq!(node.content().unwrap()[0].as_str(), Some("deep"));
}

#[test]
fn cdata_reaches_text_content_unescaped() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = concat!(
        r#"<doxygen version="1"><compounddef id="c" kind="class">"#,
        "<compoundname><![CDATA[a < b]]></compoundname>",
        "</compounddef></doxygen>",
    );
    let root = TreeParser::new(&schema).parse_from_text(doc).unwrap();
    let compound = root.value().as_node().unwrap().field("compounddef").unwrap()
        .as_list().unwrap()[0]
        .as_node().unwrap();
    assert_eq!(compound.field("compoundname").unwrap().as_str(), Some("a < b"));
}

#[test]
fn entity_references_are_resolved() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = concat!(
        r#"<doxygen version="1"><compounddef id="c" kind="class">"#,
        "<compoundname>a &amp; b</compoundname>",
        "</compounddef></doxygen>",
    );
    let root = TreeParser::new(&schema).parse_from_text(doc).unwrap();
    let compound = root.value().as_node().unwrap().field("compounddef").unwrap()
        .as_list().unwrap()[0]
        .as_node().unwrap();
    assert_eq!(compound.field("compoundname").unwrap().as_str(), Some("a & b"));
}

#[test]
fn char_substitute_value_out_of_range() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let doc = concat!(
        r#"<doxygen version="1"><compounddef id="c" kind="class">"#,
        "<compoundname>X</compoundname>",
        r#"<briefdescription><sp value="200"/></briefdescription>"#,
        "</compounddef></doxygen>",
    );
    let err = TreeParser::new(&schema).parse_from_text(doc).unwrap_err();
    assert!(err
        .to_string()
        .ends_with("\"value\" must be between 0 and 127"));
}

#[test]
fn values_compare_structurally() {
    ensure_env_logger_initialized();
    let schema = compound_schema();
    let mut parser = TreeParser::new(&schema);
    let a = parser.parse_from_text(SAMPLE_DOCUMENT).unwrap();
    let b = parser.parse_from_text(SAMPLE_DOCUMENT).unwrap();
    assert_eq!(a.value(), b.value());
    assert!(matches!(a.value(), Value::Node(_)));
}
