//! Renders a document script to the terminal with ANSI escape codes,
//! using the line iterator to honor per-line block attributes.
//!
//! Run with: `cargo run --example ansi_output`

use script::{AttributeMap, Op, Script};
use serde_json::{json, Value as JsonValue};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const UNDERLINE: &str = "\x1b[4m";

fn color_code(color: &str) -> Option<&'static str> {
    match color {
        "black" => Some("\x1b[30m"),
        "red" => Some("\x1b[31m"),
        "green" => Some("\x1b[32m"),
        "yellow" => Some("\x1b[33m"),
        "blue" => Some("\x1b[34m"),
        "magenta" => Some("\x1b[35m"),
        "cyan" => Some("\x1b[36m"),
        "white" => Some("\x1b[37m"),
        _ => None,
    }
}

fn attributes_to_ansi(attributes: Option<&AttributeMap>) -> String {
    let mut codes = String::new();
    let Some(attrs) = attributes else {
        return codes;
    };
    for (key, value) in attrs {
        match (key.as_str(), value) {
            ("bold", JsonValue::Bool(true)) => codes.push_str(BOLD),
            ("italic", JsonValue::Bool(true)) => codes.push_str(ITALIC),
            ("underline", JsonValue::Bool(true)) => codes.push_str(UNDERLINE),
            ("color", JsonValue::String(color)) => {
                if let Some(code) = color_code(color) {
                    codes.push_str(code);
                }
            }
            _ => {}
        }
    }
    codes
}

fn render_line(line: &Script) -> String {
    let mut out = String::new();
    line.for_each(|op| match op {
        Op::Insert { text, attributes } => {
            out.push_str(&attributes_to_ansi(attributes.as_ref()));
            out.push_str(text);
            out.push_str(RESET);
        }
        Op::InsertEmbed { embed, .. } => {
            out.push_str(&format!("[{}]", embed.embed_type));
        }
        _ => {}
    });
    out
}

fn main() {
    let mut bold = AttributeMap::new();
    bold.insert("bold".to_string(), json!(true));

    let mut red = AttributeMap::new();
    red.insert("color".to_string(), json!("red"));

    let mut header = AttributeMap::new();
    header.insert("header".to_string(), json!(1));

    let document = Script::new()
        .insert("Release notes", None)
        .insert("\n", Some(header))
        .insert("All ", None)
        .insert("breaking", Some(bold))
        .insert(" changes are ", None)
        .insert("highlighted", Some(red))
        .insert(".\n", None)
        .insert_embed("image", json!({"url": "https://example.com/diagram.png"}), None)
        .insert("\n", None);

    for line in document.lines() {
        let is_header = line
            .attributes
            .as_ref()
            .is_some_and(|attrs| attrs.contains_key("header"));
        let rendered = render_line(&line.script);
        if is_header {
            println!("{BOLD}{UNDERLINE}{rendered}{RESET}");
        } else {
            println!("{rendered}");
        }
    }
}
