//! Heidelberg (`.fh`) format reader.
//!
//! A Heidelberg file is a sequence of series blocks:
//!
//! ```not_rust
//! HEADER:
//! KeyCode=ABC123
//! DataFormat=Tree
//! Unit=1/100 mm
//! Length=6
//! DATA:Single
//!   53  60  71  80  95 101   0
//! ```
//!
//! Ring widths follow the `DATA` line, whitespace separated; a trailing 0
//! terminates the series. A `DataFormat` naming a chronology marks the
//! block as derived-series data.

use crate::tridas::{TridasValue, TridasValues};

use super::{TreeRingData, TreeRingError, TreeRingResult};

const FORMAT: &str = "Heidelberg";

#[derive(Debug, Default)]
struct Block {
    data_format: Option<String>,
    unit: Option<String>,
    readings: Vec<String>,
}

impl Block {
    fn is_chronology(&self) -> bool {
        self.data_format
            .as_deref()
            .map(|f| f.to_ascii_lowercase().contains("chrono"))
            .unwrap_or(false)
    }

    fn into_values(self) -> TridasValues {
        TridasValues {
            variable: Some("ring width".to_string()),
            unit: Some(self.unit.unwrap_or_else(|| "1/100 mm".to_string())),
            values: self.readings.into_iter().map(TridasValue::new).collect(),
        }
    }
}

pub(super) fn parse(file_name: &str, text: &str) -> TreeRingResult<TreeRingData> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut current: Option<Block> = None;
    let mut in_data = false;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("HEADER:") {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            current = Some(Block::default());
            in_data = false;
        } else if line.to_ascii_uppercase().starts_with("DATA") {
            if current.is_none() {
                return Err(malformed(file_name, "DATA section before HEADER"));
            }
            in_data = true;
        } else if in_data {
            let block = current
                .as_mut()
                .ok_or_else(|| malformed(file_name, "readings outside a series block"))?;
            for token in line.split_ascii_whitespace() {
                if token.parse::<i64>().is_err() {
                    return Err(malformed(
                        file_name,
                        &format!("non-numeric reading: {token}"),
                    ));
                }
                block.readings.push(token.to_string());
            }
        } else if let Some((key, value)) = line.split_once('=') {
            let block = current
                .as_mut()
                .ok_or_else(|| malformed(file_name, "keyword outside HEADER block"))?;
            match key.trim().to_ascii_lowercase().as_str() {
                "dataformat" => block.data_format = Some(value.trim().to_string()),
                "unit" => block.unit = Some(value.trim().to_string()),
                _ => {}
            }
        } else {
            return Err(malformed(file_name, &format!("unexpected line: {line}")));
        }
    }
    if let Some(block) = current.take() {
        blocks.push(block);
    }
    if blocks.is_empty() {
        return Err(malformed(file_name, "no HEADER block found"));
    }

    // drop the conventional trailing 0 terminator of each series
    for block in &mut blocks {
        if block.readings.last().map(String::as_str) == Some("0") {
            block.readings.pop();
        }
        if block.readings.is_empty() {
            return Err(malformed(file_name, "series without readings"));
        }
    }

    let chronology = blocks.iter().any(Block::is_chronology);
    let groups = blocks.into_iter().map(Block::into_values).collect();
    Ok(if chronology {
        TreeRingData::for_derived(file_name.to_string(), groups)
    } else {
        TreeRingData::for_measurement(file_name.to_string(), groups)
    })
}

fn malformed(file_name: &str, message: &str) -> TreeRingError {
    TreeRingError::Parse {
        format: FORMAT.to_string(),
        file: file_name.to_string(),
        message: message.to_string(),
    }
}
