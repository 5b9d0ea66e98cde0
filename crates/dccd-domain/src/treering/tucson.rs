//! Tucson decadal format reader.
//!
//! Each line carries a series id, the decade start year, and up to ten
//! ring widths; the sentinel 999 (or -9999) ends a series:
//!
//! ```not_rust
//! BEAM01   1780    53    60    71    80    95   101   110    99    87    92
//! BEAM01   1790   102   999
//! ```
//!
//! A file may interleave several series ids; groups are returned in order
//! of first appearance.

use crate::tridas::{TridasValue, TridasValues};

use super::{TreeRingData, TreeRingError, TreeRingResult};

const FORMAT: &str = "Tucson";

const STOP_SENTINELS: [&str; 2] = ["999", "-9999"];

pub(super) fn parse(file_name: &str, text: &str) -> TreeRingResult<TreeRingData> {
    let mut order: Vec<String> = Vec::new();
    let mut readings: std::collections::HashMap<String, Vec<String>> =
        std::collections::HashMap::new();

    for line in text.lines() {
        let mut tokens = line.split_ascii_whitespace();
        let Some(id) = tokens.next() else {
            continue;
        };
        let Some(year) = tokens.next() else {
            return Err(malformed(file_name, &format!("line without decade: {line}")));
        };
        if year.parse::<i32>().is_err() {
            return Err(malformed(file_name, &format!("bad decade year: {year}")));
        }

        if !readings.contains_key(id) {
            order.push(id.to_string());
        }
        let series = readings.entry(id.to_string()).or_default();

        for token in tokens {
            if STOP_SENTINELS.contains(&token) {
                break;
            }
            if token.parse::<i64>().is_err() {
                return Err(malformed(
                    file_name,
                    &format!("non-numeric reading: {token}"),
                ));
            }
            series.push(token.to_string());
        }
    }

    if order.is_empty() {
        return Err(malformed(file_name, "no series found"));
    }

    let mut groups = Vec::with_capacity(order.len());
    for id in order {
        let values = readings.remove(&id).unwrap_or_default();
        if values.is_empty() {
            return Err(malformed(file_name, &format!("series {id} has no readings")));
        }
        groups.push(TridasValues {
            variable: Some("ring width".to_string()),
            unit: Some("1/100 mm".to_string()),
            values: values.into_iter().map(TridasValue::new).collect(),
        });
    }

    Ok(TreeRingData::for_measurement(file_name.to_string(), groups))
}

fn malformed(file_name: &str, message: &str) -> TreeRingError {
    TreeRingError::Parse {
        format: FORMAT.to_string(),
        file: file_name.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_series_in_order() {
        let text = "\
BEAM01   1780    53    60    71
BEAM02   1900    10    20
BEAM01   1790   102   999
BEAM02   1910    30   999
";
        let data = parse("site.rwl", text).unwrap();
        let groups = data.values_for_measurement_series();
        assert_eq!(groups.len(), 2);
        let first: Vec<_> = groups[0].values.iter().map(|v| v.value.as_str()).collect();
        assert_eq!(first, ["53", "60", "71", "102"]);
        let second: Vec<_> = groups[1].values.iter().map(|v| v.value.as_str()).collect();
        assert_eq!(second, ["10", "20", "30"]);
    }

    #[test]
    fn test_sentinel_ends_series_line() {
        let text = "B 1780 53 999 77\n";
        let data = parse("b.rwl", text).unwrap();
        assert_eq!(data.values_for_measurement_series()[0].values.len(), 1);
    }

    #[test]
    fn test_rejects_bad_year() {
        assert!(parse("bad.rwl", "B yearless 53\n").is_err());
    }

    #[test]
    fn test_rejects_empty_file() {
        assert!(parse("empty.rwl", "\n").is_err());
    }
}
