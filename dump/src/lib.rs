//! Formatting of DICOM data sets for the command line.
//!
//! Renders a parsed file as indented text, JSON or CSV rows, with
//! optional tag filtering and per-group statistics.

use dcmio_core::dictionary::{DataDictionary, StandardDictionary};
use dcmio_core::header::Header;
use dcmio_core::value::{DataElement, DataValue};
use dcmio_core::{DataSet, Tag};
use dcmio_object::DicomFile;
use snafu::Snafu;
use std::collections::BTreeMap;
use std::io::Write;

/// The output renderings supported by the dumper.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    /// Indented, human-readable text.
    #[default]
    Text,
    /// A JSON object keyed by tag.
    Json,
    /// One CSV row per element.
    Csv,
}

/// Options controlling the dump.
#[derive(Debug, Default, Clone)]
pub struct DumpOptions {
    /// the output rendering
    pub format: OutputFormat,
    /// restrict output to these attributes
    /// (PS3.6 keywords or `GGGG,EEEE` forms); empty shows all
    pub tags: Vec<String>,
    /// include private elements
    pub show_private: bool,
    /// append per-group statistics
    pub statistics: bool,
}

/// An error preparing the dump.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum DumpError {
    /// A `--tag` argument is neither a keyword nor a tag form.
    #[snafu(display("unknown attribute selector `{selector}`"))]
    UnknownSelector {
        /// the offending argument
        selector: String,
    },
    /// The destination could not be written.
    #[snafu(display("could not write output"))]
    WriteOutput {
        /// the I/O failure
        source: std::io::Error,
    },
}

type Result<T, E = DumpError> = std::result::Result<T, E>;

/// Resolve `--tag` selectors into concrete tags.
fn resolve_selectors(selectors: &[String]) -> Result<Vec<Tag>> {
    let dict = StandardDictionary;
    selectors
        .iter()
        .map(|selector| {
            selector
                .parse::<Tag>()
                .ok()
                .or_else(|| dict.by_keyword(selector).map(|e| e.tag))
                .ok_or_else(|| DumpError::UnknownSelector {
                    selector: selector.clone(),
                })
        })
        .collect()
}

fn keyword_of(tag: Tag) -> &'static str {
    if tag.is_private_creator() {
        return "PrivateCreator";
    }
    if tag.is_group_length() {
        return "GroupLength";
    }
    StandardDictionary
        .by_tag(tag)
        .map(|e| e.keyword)
        .unwrap_or("Unknown")
}

fn value_preview(element: &DataElement) -> String {
    match element.value() {
        DataValue::Primitive(bytes) => {
            if element.vr().is_text() {
                match element.to_str() {
                    Ok(text) => format!("[{text}]"),
                    Err(_) => format!("<{} bytes>", bytes.len()),
                }
            } else if let Ok(values) = element.to_f64s() {
                let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                format!("[{}]", rendered.join("\\"))
            } else {
                format!("<{} bytes>", bytes.len())
            }
        }
        DataValue::Sequence(items) => format!("<sequence of {} items>", items.len()),
        DataValue::PixelSequence { fragments, .. } => {
            format!("<encapsulated, {} fragments>", fragments.len())
        }
        DataValue::Lazy(lazy) => format!("<deferred, {} bytes>", lazy.length),
    }
}

fn included(tag: Tag, filter: &[Tag], show_private: bool) -> bool {
    if !show_private && tag.is_private() {
        return false;
    }
    filter.is_empty() || filter.contains(&tag)
}

fn dump_text(
    out: &mut dyn Write,
    dataset: &DataSet,
    filter: &[Tag],
    show_private: bool,
    indent: usize,
) -> std::io::Result<()> {
    let pad = "  ".repeat(indent);
    for element in dataset.iter() {
        let tag = element.tag();
        // filters apply at the top level only
        if indent == 0 && !included(tag, filter, show_private) {
            continue;
        }
        if indent > 0 && !show_private && tag.is_private() {
            continue;
        }
        writeln!(
            out,
            "{pad}{tag} {vr} {keyword:<32} # {len}, {preview}",
            vr = element.vr(),
            keyword = keyword_of(tag),
            len = element.header().length,
            preview = value_preview(element),
        )?;
        if let DataValue::Sequence(items) = element.value() {
            for (index, item) in items.iter().enumerate() {
                writeln!(out, "{pad}  item {index}:")?;
                dump_text(out, item, filter, show_private, indent + 2)?;
            }
        }
    }
    Ok(())
}

fn dataset_to_json(dataset: &DataSet, filter: &[Tag], show_private: bool, top: bool) -> serde_json::Value {
    let mut object = serde_json::Map::new();
    for element in dataset.iter() {
        let tag = element.tag();
        if top && !included(tag, filter, show_private) {
            continue;
        }
        if !top && !show_private && tag.is_private() {
            continue;
        }
        let value = match element.value() {
            DataValue::Sequence(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| dataset_to_json(item, filter, show_private, false))
                    .collect(),
            ),
            _ => serde_json::Value::String(value_preview(element)),
        };
        let mut entry = serde_json::Map::new();
        entry.insert("vr".into(), element.vr().name().into());
        entry.insert("name".into(), keyword_of(tag).into());
        entry.insert("value".into(), value);
        object.insert(
            format!("{:04X},{:04X}", tag.group(), tag.element()),
            serde_json::Value::Object(entry),
        );
    }
    serde_json::Value::Object(object)
}

fn dump_csv(
    out: &mut dyn Write,
    dataset: &DataSet,
    filter: &[Tag],
    show_private: bool,
) -> std::io::Result<()> {
    writeln!(out, "tag,vr,name,length,value")?;
    for element in dataset.iter() {
        let tag = element.tag();
        if !included(tag, filter, show_private) {
            continue;
        }
        let preview = value_preview(element).replace('"', "\"\"");
        writeln!(
            out,
            "\"({:04X},{:04X})\",{},{},{},\"{}\"",
            tag.group(),
            tag.element(),
            element.vr(),
            keyword_of(tag),
            element.header().length,
            preview,
        )?;
    }
    Ok(())
}

fn dump_statistics(out: &mut dyn Write, dataset: &DataSet) -> std::io::Result<()> {
    let mut groups: BTreeMap<u16, (usize, u64)> = BTreeMap::new();
    let mut private = 0usize;
    for element in dataset.iter() {
        let entry = groups.entry(element.tag().group()).or_default();
        entry.0 += 1;
        entry.1 += u64::from(element.header().length.get().unwrap_or(0));
        if element.tag().is_private() {
            private += 1;
        }
    }
    writeln!(out)?;
    writeln!(out, "statistics:")?;
    writeln!(out, "  elements: {}", dataset.len())?;
    writeln!(out, "  private elements: {private}")?;
    for (group, (count, bytes)) in groups {
        writeln!(out, "  group {group:04X}: {count} elements, {bytes} value bytes")?;
    }
    Ok(())
}

/// Render a parsed file to the given writer.
pub fn dump_file(
    file: &DicomFile,
    options: &DumpOptions,
    out: &mut dyn Write,
) -> Result<()> {
    let filter = resolve_selectors(&options.tags)?;
    let write = |out: &mut dyn Write| -> std::io::Result<()> {
        match options.format {
            OutputFormat::Text => {
                dump_text(out, file.meta().as_dataset(), &filter, true, 0)?;
                dump_text(out, file.dataset(), &filter, options.show_private, 0)?;
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "meta": dataset_to_json(file.meta().as_dataset(), &filter, true, true),
                    "dataset": dataset_to_json(
                        file.dataset(),
                        &filter,
                        options.show_private,
                        true,
                    ),
                });
                writeln!(out, "{}", serde_json::to_string_pretty(&json).expect("valid JSON tree"))?;
            }
            OutputFormat::Csv => {
                dump_csv(out, file.dataset(), &filter, options.show_private)?;
            }
        }
        if options.statistics {
            dump_statistics(out, file.dataset())?;
        }
        Ok(())
    };
    write(out).map_err(|source| DumpError::WriteOutput { source })
}
