use crate::error::{self, Result};
use model::slot::ResultStatus;
use model::ResultItem;
use quick_xml::events::Event;
use quick_xml::Reader;
use snafu::ResultExt;
use std::path::Path;

/// Parses one JUnit XML file into a result item per `<testcase>`, named `classname.name`
/// (SPEC_FULL.md §4.5). `<failure>`/`<error>` children mark the case failed, `<skipped>` marks it
/// skipped, otherwise it passed. The file itself becomes a branch node so the tree has one
/// junit-file-level node per submitted artifact.
pub fn read_file(path: &Path) -> Result<ResultItem> {
    let contents = std::fs::read_to_string(path).context(error::ReadFileSnafu {
        path: path.to_path_buf(),
    })?;
    let cases = parse_testcases(&contents).context(error::ParseJunitSnafu {
        path: path.to_path_buf(),
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(ResultItem::branch(file_name, cases))
}

#[derive(Default)]
struct Case {
    classname: String,
    name: String,
    failed: bool,
    skipped: bool,
    message: Option<String>,
}

fn parse_testcases(xml: &str) -> std::result::Result<Vec<ResultItem>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut cases = Vec::new();
    let mut current: Option<Case> = None;

    loop {
        let event = reader.read_event(&mut buf)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_self_closing = matches!(event, Event::Empty(_));
                match e.name() {
                    b"testcase" => {
                        let mut case = Case::default();
                        for attr in e.attributes().flatten() {
                            let value = attr.unescape_and_decode_value(&reader).unwrap_or_default();
                            match attr.key {
                                b"classname" => case.classname = value,
                                b"name" => case.name = value,
                                _ => {}
                            }
                        }
                        if is_self_closing {
                            cases.push(case_to_item(case));
                        } else {
                            current = Some(case);
                        }
                    }
                    b"failure" | b"error" => {
                        if let Some(case) = current.as_mut() {
                            case.failed = true;
                            for attr in e.attributes().flatten() {
                                if matches!(attr.key, b"message") {
                                    case.message =
                                        Some(attr.unescape_and_decode_value(&reader).unwrap_or_default());
                                }
                            }
                        }
                    }
                    b"skipped" => {
                        if let Some(case) = current.as_mut() {
                            case.skipped = true;
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => {
                if e.name() == b"testcase" {
                    if let Some(case) = current.take() {
                        cases.push(case_to_item(case));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(cases)
}

fn case_to_item(case: Case) -> ResultItem {
    let status = if case.failed {
        ResultStatus::Failed
    } else if case.skipped {
        ResultStatus::Other("skipped".to_string())
    } else {
        ResultStatus::Passed
    };
    let name = if case.classname.is_empty() {
        case.name
    } else {
        format!("{}.{}", case.classname, case.name)
    };
    let mut item = ResultItem::leaf(name, status);
    if let Some(message) = case.message {
        item.details.insert("message".to_string(), message);
    }
    item
}
