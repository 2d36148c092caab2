use std::sync::Once;

use arbor_xml::{ElementDef, Schema};

static LOGGER_INIT: Once = Once::new();

/// Safe to call multiple times.
pub fn ensure_env_logger_initialized() {
    LOGGER_INIT.call_once(env_logger::init);
}

/// A schema shaped like a code-documentation dump: nested compounds and
/// members with typed attributes, plus mixed-content descriptions.
pub fn compound_schema() -> Schema {
    Schema::builder()
        .root("doxygen", "document")
        .enumeration("CompoundKind", ["class", "struct", "namespace", "file"])
        .enumeration("Protection", ["public", "protected", "private"])
        .char_enum("Checked", "ynd")
        .element(
            "document",
            ElementDef::new()
                .attribute("version", "#string")
                .list_child("compounddef", "compounddef"),
        )
        .element(
            "compounddef",
            ElementDef::new()
                .attribute("id", "#string")
                .attribute("kind", "CompoundKind")
                .opt_attribute("prot", "Protection")
                .opt_attribute("checked", "Checked")
                .child("compoundname", "#text")
                .opt_child("briefdescription", "description")
                .list_child("sectiondef", "sectiondef"),
        )
        .element(
            "sectiondef",
            ElementDef::new().nonempty_list_child("memberdef", "memberdef"),
        )
        .element(
            "memberdef",
            ElementDef::new()
                .attribute("id", "#string")
                .opt_attribute("static", "#bool")
                .opt_attribute("line", "#int")
                .child("name", "#text")
                .opt_child("initializer", "#empty"),
        )
        .element(
            "description",
            ElementDef::new()
                .allow_text()
                .union_content([("bold", "description"), ("ref", "#text"), ("sp", "#char")]),
        )
        .build()
        .expect("fixture schema compiles")
}

/// A schema whose root holds strict ordered-tuple content: repeated
/// `(type, declname, defval)` groups.
pub fn parameter_schema() -> Schema {
    Schema::builder()
        .root("parameterlist", "parameterlist")
        .element(
            "parameterlist",
            ElementDef::new().tuple_content([
                ("type", "#text"),
                ("declname", "#text"),
                ("defval", "#text"),
            ]),
        )
        .build()
        .expect("fixture schema compiles")
}

pub const SAMPLE_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<doxygen version="1.9.1">
  <compounddef id="class_widget" kind="class" prot="public">
    <compoundname>Widget</compoundname>
    <briefdescription>A <bold>small</bold> thing.</briefdescription>
    <sectiondef>
      <memberdef id="widget_size" static="yes" line="42">
        <name>size</name>
        <initializer/>
      </memberdef>
      <memberdef id="widget_name">
        <name>name</name>
      </memberdef>
    </sectiondef>
  </compounddef>
</doxygen>
"#;
