//! Header, header2 and xheader codecs
//!
//! The header section is a tab-separated text block: a version line, a
//! category line, a field-code line and a value line. Seven textual
//! layouts exist across the EnCase generations; one table of layouts
//! drives both directions. header2 is the same text in UTF-16LE behind a
//! byte order mark; xheader is the XML generation.

use crate::values::date;
use crate::values::table::ValueTable;
use crate::values::xml;
use witness_core::{CompressionLevel, DateFormat, Error, Format, HeaderCodepage, Result};

/// How date fields are encoded within the header text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateCodec {
    /// `YYYY M D h m s` (original header)
    Spaced,
    /// Decimal Unix timestamp (header2 and the version-3 headers)
    Timestamp,
}

/// Constant appendix blocks following the EnCase 5/6 header2 value line
const SRCE_APPENDIX: &str =
    "srce\n0\t1\np\tn\tid\tev\ttb\tlo\tpo\tah\tgu\taq\n0\t0\n\t\t\t\t\t-1\t-1\t\t\t\n\n";
const SUB_APPENDIX: &str = "sub\n0\t1\np\tn\tid\tnu\tco\tgu\n0\t0\n\t\t\t\t1\t\n\n";

/// One textual header layout
struct HeaderLayout {
    version: &'static str,
    newline: &'static str,
    field_codes: &'static [&'static str],
    date_codec: DateCodec,
    /// Emit `"0"` for an absent password (the version-1 layouts do)
    password_default: Option<&'static str>,
    with_appendices: bool,
}

const FIELDS_TYPE1: &[&str] = &["c", "n", "a", "e", "t", "m", "u", "p", "r"];
const FIELDS_TYPE2: &[&str] = &["c", "n", "a", "e", "t", "av", "ov", "m", "u", "p", "r"];
const FIELDS_TYPE3: &[&str] = &["c", "n", "a", "e", "t", "av", "ov", "m", "u", "p"];
const FIELDS_TYPE4: &[&str] = &["a", "c", "n", "e", "t", "av", "ov", "m", "u", "p"];
const FIELDS_TYPE5: &[&str] = &["a", "c", "n", "e", "t", "av", "ov", "m", "u", "p", "dc"];
const FIELDS_TYPE6: &[&str] = &[
    "a", "c", "n", "e", "t", "md", "sn", "av", "ov", "m", "u", "p", "dc",
];

fn layout(
    version: &'static str,
    newline: &'static str,
    field_codes: &'static [&'static str],
    date_codec: DateCodec,
    password_default: Option<&'static str>,
    with_appendices: bool,
) -> HeaderLayout {
    HeaderLayout {
        version,
        newline,
        field_codes,
        date_codec,
        password_default,
        with_appendices,
    }
}

/// The header section layout a format writes
fn header_layout(format: Format) -> Result<HeaderLayout> {
    let layout = match format {
        Format::Ewf | Format::Smart => {
            layout("1", "\n", FIELDS_TYPE1, DateCodec::Spaced, Some("0"), false)
        }
        Format::Encase1 => layout("1", "\r\n", FIELDS_TYPE1, DateCodec::Spaced, Some("0"), false),
        Format::Ftk => layout("1", "\n", FIELDS_TYPE2, DateCodec::Spaced, Some("0"), false),
        Format::Encase2 | Format::Encase3 => {
            layout("1", "\r\n", FIELDS_TYPE2, DateCodec::Spaced, Some("0"), false)
        }
        Format::Encase4 | Format::Encase5 | Format::Encase6 => {
            layout("1", "\r\n", FIELDS_TYPE3, DateCodec::Spaced, Some("0"), false)
        }
        Format::Ewfx => layout("1", "\n", FIELDS_TYPE3, DateCodec::Spaced, Some("0"), false),
        Format::Linen5 => layout("3", "\n", FIELDS_TYPE4, DateCodec::Timestamp, None, false),
        Format::Linen6 => layout("3", "\n", FIELDS_TYPE6, DateCodec::Timestamp, None, true),
        Format::Lvf => {
            return Err(Error::unsupported(
                "logical evidence files do not carry a generated header",
            ))
        }
    };
    Ok(layout)
}

/// The header2 section layout a format writes, if it writes one
fn header2_layout(format: Format) -> Result<HeaderLayout> {
    let layout = match format {
        Format::Encase4 | Format::Ewfx => {
            layout("1", "\n", FIELDS_TYPE4, DateCodec::Timestamp, None, false)
        }
        Format::Encase5 => layout("3", "\n", FIELDS_TYPE5, DateCodec::Timestamp, None, true),
        Format::Encase6 => layout("3", "\n", FIELDS_TYPE6, DateCodec::Timestamp, None, true),
        _ => {
            return Err(Error::unsupported(format!(
                "format {format} does not carry a header2 section"
            )))
        }
    };
    Ok(layout)
}

/// The well-known identifier a field code stores under
fn identifier_for_code(code: &str) -> Option<&'static str> {
    match code {
        "c" => Some("case_number"),
        "n" => Some("evidence_number"),
        "a" => Some("description"),
        "e" => Some("examiner_name"),
        "t" => Some("notes"),
        "m" => Some("acquiry_date"),
        "u" => Some("system_date"),
        "p" => Some("password"),
        "r" => Some("compression_type"),
        "av" => Some("acquiry_software_version"),
        "ov" => Some("acquiry_operating_system"),
        "md" => Some("model"),
        "sn" => Some("serial_number"),
        "dc" => Some("unknown_dc"),
        _ => None,
    }
}

/// Parses the four-line tab-separated header text into a value table
fn parse_header_text(text: &str, date_format: DateFormat) -> Result<ValueTable> {
    let lines: Vec<&str> = text.split('\n').collect();

    if lines.len() < 4 {
        return Err(Error::invalid_data("header text shorter than four lines"));
    }
    let types: Vec<&str> = lines[2].split('\t').map(|t| t.trim_end_matches('\r')).collect();
    let values: Vec<&str> = lines[3].split('\t').map(|v| v.trim_end_matches('\r')).collect();

    let mut header_values = ValueTable::header_values();

    for (index, type_code) in types.iter().enumerate() {
        let value = values.get(index).copied().unwrap_or("");

        if value.is_empty() {
            continue;
        }
        match *type_code {
            "m" | "u" => {
                // A date with embedded spaces is the old header form,
                // otherwise it is a bare timestamp.
                let converted = if value.contains(' ') {
                    date::convert_header_date(value, date_format)
                } else {
                    date::convert_header2_date(value, date_format)
                };
                let identifier = if *type_code == "m" {
                    "acquiry_date"
                } else {
                    "system_date"
                };
                match converted {
                    Ok(date_string) => {
                        header_values.set_string(identifier, &date_string)?;
                    }
                    Err(error) => {
                        tracing::warn!(%error, identifier, "unable to convert date header value");
                    }
                }
            }
            "p" => {
                if value != "0" {
                    header_values.set_string("password", value)?;
                }
            }
            code => match identifier_for_code(code) {
                Some(identifier) => {
                    header_values.set_string(identifier, value)?;
                }
                None => {
                    return Err(Error::unsupported(format!(
                        "unsupported header value type {code:?}"
                    )));
                }
            },
        }
    }
    Ok(header_values)
}

/// Parses a header section: narrow text in the configured codepage
pub fn parse_header(
    data: &[u8],
    codepage: HeaderCodepage,
    date_format: DateFormat,
) -> Result<ValueTable> {
    let text = match codepage.encoding() {
        Some(encoding) => encoding.decode(data).0.into_owned(),
        None => String::from_utf8_lossy(data).into_owned(),
    };
    parse_header_text(text.trim_end_matches('\0'), date_format)
}

/// Parses a header2 section: UTF-16LE text behind a byte order mark
pub fn parse_header2(data: &[u8], date_format: DateFormat) -> Result<ValueTable> {
    if data.len() < 2 {
        return Err(Error::invalid_data("header2 section too short"));
    }
    let (text, _, _) = encoding_rs::UTF_16LE.decode(data);
    parse_header_text(text.trim_start_matches('\u{feff}').trim_end_matches('\0'), date_format)
}

/// Parses an xheader section: lenient line-oriented XML
pub fn parse_xheader(data: &[u8], date_format: DateFormat) -> Result<ValueTable> {
    let document = xml::decode_document(data);
    let mut header_values = ValueTable::header_values();

    for (identifier, value) in xml::scan_tags(&document) {
        if identifier == "acquiry_date" || identifier == "system_date" {
            match date::convert_xheader_date(value, date_format) {
                Ok(date_string) => {
                    header_values.set_string(identifier, &date_string)?;
                }
                Err(error) => {
                    tracing::warn!(%error, identifier, "unable to convert xheader date value");
                }
            }
        } else {
            header_values.set_string(identifier, value)?;
        }
    }
    Ok(header_values)
}

/// Resolves the date value for a field, generating one from the timestamp
/// when the table has none
fn date_field_value(
    header_values: &ValueTable,
    identifier: &str,
    codec: DateCodec,
    timestamp: i64,
) -> Result<String> {
    if let Some(value) = header_values.get_utf8(identifier.as_bytes()) {
        return Ok(value.to_string());
    }
    match codec {
        DateCodec::Spaced => date::generate_header_date(timestamp),
        DateCodec::Timestamp => Ok(date::generate_header2_date(timestamp)),
    }
}

/// Generates the header text for a layout
fn generate_header_text(
    header_values: &ValueTable,
    layout: &HeaderLayout,
    timestamp: i64,
    compression_level: CompressionLevel,
) -> Result<String> {
    if layout.field_codes.contains(&"r")
        && !matches!(
            compression_level,
            CompressionLevel::None | CompressionLevel::Fast | CompressionLevel::Best
        )
    {
        return Err(Error::unsupported("compression level not supported"));
    }
    let mut field_values: Vec<String> = Vec::with_capacity(layout.field_codes.len());

    for &code in layout.field_codes {
        let value = match code {
            "m" => date_field_value(header_values, "acquiry_date", layout.date_codec, timestamp)?,
            "u" => date_field_value(header_values, "system_date", layout.date_codec, timestamp)?,
            "p" => header_values
                .get_utf8(b"password")
                .unwrap_or(layout.password_default.unwrap_or(""))
                .to_string(),
            "r" => header_values
                .get_utf8(b"compression_type")
                .unwrap_or(compression_level.header_value())
                .to_string(),
            code => {
                let identifier = identifier_for_code(code)
                    .ok_or_else(|| Error::unsupported(format!("unsupported field code {code:?}")))?;
                header_values
                    .get_utf8(identifier.as_bytes())
                    .unwrap_or("")
                    .to_string()
            }
        };
        field_values.push(value);
    }
    let mut text = String::new();
    text.push_str(layout.version);
    text.push_str(layout.newline);
    text.push_str("main");
    text.push_str(layout.newline);
    text.push_str(&layout.field_codes.join("\t"));
    text.push_str(layout.newline);
    text.push_str(&field_values.join("\t"));
    text.push_str(layout.newline);
    text.push_str(layout.newline);

    if layout.with_appendices {
        text.push_str(SRCE_APPENDIX);
        text.push_str(SUB_APPENDIX);
    }
    Ok(text)
}

/// Generates a header section for a format
pub fn generate_header(
    header_values: &ValueTable,
    format: Format,
    timestamp: i64,
    compression_level: CompressionLevel,
) -> Result<Vec<u8>> {
    let layout = header_layout(format)?;
    let text = generate_header_text(header_values, &layout, timestamp, compression_level)?;
    Ok(text.into_bytes())
}

/// Generates a header2 section for a format: byte order mark plus UTF-16LE
pub fn generate_header2(
    header_values: &ValueTable,
    format: Format,
    timestamp: i64,
) -> Result<Vec<u8>> {
    let layout = header2_layout(format)?;
    let text = generate_header_text(
        header_values,
        &layout,
        timestamp,
        CompressionLevel::None,
    )?;

    let mut data = Vec::with_capacity(2 + 2 * text.len());
    data.extend_from_slice(&[0xff, 0xfe]);
    for unit in text.encode_utf16() {
        data.extend_from_slice(&unit.to_le_bytes());
    }
    Ok(data)
}

/// Generates an xheader section.
///
/// Every set value is emitted under its identifier; an absent acquiry date
/// is filled in from the timestamp in ctime form with the timezone
/// abbreviation appended.
pub fn generate_xheader(header_values: &ValueTable, timestamp: i64) -> Result<Vec<u8>> {
    let generated_date;
    let mut entries: Vec<(String, &str)> = header_values
        .iter_set()
        .map(|(identifier, value)| {
            (
                String::from_utf8_lossy(identifier).into_owned(),
                std::str::from_utf8(value).unwrap_or(""),
            )
        })
        .collect();

    if header_values.get(b"acquiry_date").is_none() {
        generated_date = date::generate_xheader_date(timestamp)?;
        entries.push(("acquiry_date".to_string(), &generated_date));
    }
    Ok(xml::generate_document("xheader", entries.into_iter()))
}

/// Distinguishes EnCase 2 from EnCase 3, which share a header layout.
/// EnCase 3 images report an acquiry software version starting with `3`.
pub fn detect_encase2_or_encase3(header_values: &ValueTable) -> Format {
    match header_values.get_utf8(b"acquiry_software_version") {
        Some(version) if version.starts_with('3') => Format::Encase3,
        _ => Format::Encase2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPE1_HEADER: &[u8] =
        b"1\nmain\nc\tn\ta\te\tt\tm\tu\tp\tr\nC1\tE1\tD1\tX1\tN1\t2019 1 1 0 0 0\t2019 1 1 0 0 0\t0\tb\n\n";

    #[test]
    fn test_parse_type1_header() {
        let values = parse_header(TYPE1_HEADER, HeaderCodepage::Ascii, DateFormat::MonthDay).unwrap();

        assert_eq!(values.get_utf8(b"case_number"), Some("C1"));
        assert_eq!(values.get_utf8(b"evidence_number"), Some("E1"));
        assert_eq!(values.get_utf8(b"description"), Some("D1"));
        assert_eq!(values.get_utf8(b"examiner_name"), Some("X1"));
        assert_eq!(values.get_utf8(b"notes"), Some("N1"));
        assert_eq!(values.get_utf8(b"acquiry_date"), Some("01/01/2019 00:00:00"));
        assert_eq!(values.get_utf8(b"system_date"), Some("01/01/2019 00:00:00"));
        // A password of "0" means no password was set.
        assert_eq!(values.get_utf8(b"password"), None);
        assert_eq!(values.get_utf8(b"compression_type"), Some("b"));
    }

    #[test]
    fn test_parse_header_with_crlf_separators() {
        let header = b"1\r\nmain\r\nc\tn\ta\te\tt\tav\tov\tm\tu\tp\tr\r\n\
                       case\tevid\tdesc\texam\tnote\t2.20\tWindows\t1546300800\t1546300800\t0\tf\r\n\r\n";
        let values = parse_header(header, HeaderCodepage::Ascii, DateFormat::Iso8601).unwrap();

        assert_eq!(values.get_utf8(b"case_number"), Some("case"));
        assert_eq!(values.get_utf8(b"acquiry_software_version"), Some("2.20"));
        assert_eq!(values.get_utf8(b"acquiry_operating_system"), Some("Windows"));
        // Timestamp-form dates carry no spaces.
        let acquiry_date = values.get_utf8(b"acquiry_date").unwrap();
        assert_eq!(acquiry_date.len(), 19);
        assert!(acquiry_date.contains('T'));
    }

    #[test]
    fn test_parse_header_unknown_type_with_value_fails() {
        let header = b"1\nmain\nc\tzz\nC1\tsurprise\n\n";
        assert!(parse_header(header, HeaderCodepage::Ascii, DateFormat::Ctime).is_err());
    }

    #[test]
    fn test_parse_header_unknown_type_without_value_is_skipped() {
        let header = b"1\nmain\nc\tzz\nC1\t\n\n";
        let values = parse_header(header, HeaderCodepage::Ascii, DateFormat::Ctime).unwrap();
        assert_eq!(values.get_utf8(b"case_number"), Some("C1"));
    }

    #[test]
    fn test_type1_header_roundtrip() {
        let parsed = parse_header(TYPE1_HEADER, HeaderCodepage::Ascii, DateFormat::MonthDay).unwrap();

        // Regenerating from parsed values: dates were converted to the
        // display format on parse, so supply the original encodings again.
        let mut values = parsed.clone();
        values.set_string("acquiry_date", "2019 1 1 0 0 0").unwrap();
        values.set_string("system_date", "2019 1 1 0 0 0").unwrap();

        let generated = generate_header(&values, Format::Ewf, 0, CompressionLevel::Best).unwrap();
        assert_eq!(generated, TYPE1_HEADER);
    }

    #[test]
    fn test_type3_encase4_header_roundtrip() {
        let original: &[u8] = b"1\r\nmain\r\nc\tn\ta\te\tt\tav\tov\tm\tu\tp\r\n\
                                C1\tE1\tD1\tX1\tN1\t4.22\tWindows XP\t2019 1 1 0 0 0\t2019 1 1 0 0 0\t0\r\n\r\n";

        let parsed = parse_header(original, HeaderCodepage::Ascii, DateFormat::MonthDay).unwrap();

        let mut values = parsed.clone();
        values.set_string("acquiry_date", "2019 1 1 0 0 0").unwrap();
        values.set_string("system_date", "2019 1 1 0 0 0").unwrap();

        let generated =
            generate_header(&values, Format::Encase4, 0, CompressionLevel::None).unwrap();
        assert_eq!(generated, original);
    }

    #[test]
    fn test_generate_header_auto_populates_dates() {
        let values = ValueTable::header_values();
        let timestamp = date::parse_header_date("2019 1 1 0 0 0").unwrap();

        let generated =
            generate_header(&values, Format::Ewf, timestamp, CompressionLevel::None).unwrap();
        let text = String::from_utf8(generated).unwrap();

        assert!(text.starts_with("1\nmain\nc\tn\ta\te\tt\tm\tu\tp\tr\n"));
        assert!(text.contains("2019 1 1 0 0 0\t2019 1 1 0 0 0\t0\tn\n\n"));
    }

    #[test]
    fn test_generate_header_rejects_default_level_for_type1() {
        let values = ValueTable::header_values();
        assert!(generate_header(&values, Format::Ewf, 0, CompressionLevel::Default).is_err());
    }

    #[test]
    fn test_generate_linen6_header_layout() {
        let mut values = ValueTable::header_values();
        values.set_string("model", "WD10EZEX").unwrap();
        values.set_string("serial_number", "WCC6Y3").unwrap();

        let generated = generate_header(&values, Format::Linen6, 1546300800, CompressionLevel::None)
            .unwrap();
        let text = String::from_utf8(generated).unwrap();

        assert!(text.starts_with("3\nmain\na\tc\tn\te\tt\tmd\tsn\tav\tov\tm\tu\tp\tdc\n"));
        assert!(text.contains("WD10EZEX\tWCC6Y3"));
        assert!(text.contains("1546300800"));
        assert!(text.contains(SRCE_APPENDIX));
        assert!(text.ends_with(SUB_APPENDIX));
    }

    #[test]
    fn test_header2_roundtrip() {
        let mut values = ValueTable::header_values();
        values.set_string("case_number", "2026-113").unwrap();
        values.set_string("description", "laptop image").unwrap();
        values.set_string("unknown_dc", "dc-value").unwrap();

        let data = generate_header2(&values, Format::Encase5, 1546300800).unwrap();
        assert_eq!(&data[..2], &[0xff, 0xfe]);

        let parsed = parse_header2(&data, DateFormat::Iso8601).unwrap();
        assert_eq!(parsed.get_utf8(b"case_number"), Some("2026-113"));
        assert_eq!(parsed.get_utf8(b"description"), Some("laptop image"));
        assert_eq!(parsed.get_utf8(b"unknown_dc"), Some("dc-value"));
        assert_eq!(
            parsed.get_utf8(b"acquiry_date"),
            Some(
                date::convert_timestamp(1546300800, DateFormat::Iso8601)
                    .unwrap()
                    .as_str()
            )
        );
    }

    #[test]
    fn test_header2_preserves_non_ascii_text() {
        let mut values = ValueTable::header_values();
        values.set_string("examiner_name", "Søren Åberg").unwrap();

        let data = generate_header2(&values, Format::Encase4, 0).unwrap();
        let parsed = parse_header2(&data, DateFormat::Ctime).unwrap();
        assert_eq!(parsed.get_utf8(b"examiner_name"), Some("Søren Åberg"));
    }

    #[test]
    fn test_parse_header_codepage_decoding() {
        // 0xe9 is e-acute in windows-1252.
        let header = b"1\nmain\na\nR\xe9sum\xe9\n\n";
        let values =
            parse_header(header, HeaderCodepage::Windows1252, DateFormat::Ctime).unwrap();
        assert_eq!(values.get_utf8(b"description"), Some("Résumé"));
    }

    #[test]
    fn test_xheader_roundtrip() {
        let mut values = ValueTable::header_values();
        values.set_string("case_number", "2026-113").unwrap();
        values.set_string("custom_field", "kept as-is").unwrap();
        values
            .set_string("acquiry_date", "Tue Jan  1 00:00:00 2019 UTC")
            .unwrap();

        let data = generate_xheader(&values, 0).unwrap();
        let parsed = parse_xheader(&data, DateFormat::Ctime).unwrap();

        assert_eq!(parsed.get_utf8(b"case_number"), Some("2026-113"));
        assert_eq!(parsed.get_utf8(b"custom_field"), Some("kept as-is"));
        assert_eq!(
            parsed.get_utf8(b"acquiry_date"),
            Some("Tue Jan  1 00:00:00 2019 UTC")
        );
    }

    #[test]
    fn test_xheader_generates_missing_acquiry_date() {
        let values = ValueTable::header_values();
        let data = generate_xheader(&values, 1546300800).unwrap();
        let text = xml::decode_document(&data);

        assert!(text.contains("<acquiry_date>"));
        let parsed = parse_xheader(&data, DateFormat::Iso8601).unwrap();
        assert_eq!(
            parsed.get_utf8(b"acquiry_date"),
            Some(
                date::convert_timestamp(1546300800, DateFormat::Iso8601)
                    .unwrap()
                    .as_str()
            )
        );
    }

    #[test]
    fn test_encase2_encase3_disambiguation() {
        let mut values = ValueTable::header_values();
        assert_eq!(detect_encase2_or_encase3(&values), Format::Encase2);

        values.set_string("acquiry_software_version", "2.20").unwrap();
        assert_eq!(detect_encase2_or_encase3(&values), Format::Encase2);

        values.set_string("acquiry_software_version", "3.01").unwrap();
        assert_eq!(detect_encase2_or_encase3(&values), Format::Encase3);
    }
}
