//! Date string conversion between the on-disk encodings
//!
//! Three input encodings occur: the old header form `YYYY M D h m s`, the
//! header2 decimal Unix timestamp, and the xheader ctime string. All are
//! converted through a local-time decomposition into one of four output
//! formats.

use chrono::{DateTime, Local, LocalResult, NaiveDate, TimeZone};
use witness_core::{DateFormat, Error, Result};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Resolves a wall-clock time in the local zone. An ambiguous time (the
/// repeated hour when daylight saving ends) takes the earliest mapping; a
/// nonexistent time is an error.
fn local_datetime(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Result<DateTime<Local>> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(|| {
            Error::invalid_data(format!(
                "date components out of range: {year}-{month}-{day} {hour}:{minute}:{second}"
            ))
        })?;

    match Local.from_local_datetime(&naive) {
        LocalResult::Single(datetime) => Ok(datetime),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => Err(Error::invalid_data(format!(
            "local time does not exist: {naive}"
        ))),
    }
}

/// Converts a Unix timestamp into a date string of the requested format
pub fn convert_timestamp(timestamp: i64, date_format: DateFormat) -> Result<String> {
    let datetime = Local
        .timestamp_opt(timestamp, 0)
        .single()
        .ok_or_else(|| Error::invalid_data(format!("timestamp out of range: {timestamp}")))?;

    let formatted = match date_format {
        DateFormat::Ctime => datetime.format("%a %b %e %H:%M:%S %Y"),
        DateFormat::MonthDay => datetime.format("%m/%d/%Y %H:%M:%S"),
        DateFormat::DayMonth => datetime.format("%d/%m/%Y %H:%M:%S"),
        DateFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S"),
    };
    Ok(formatted.to_string())
}

/// Parses an old-style header date value: `YYYY M D h m s`
pub fn parse_header_date(value: &str) -> Result<i64> {
    let elements: Vec<&str> = value.split(' ').filter(|token| !token.is_empty()).collect();

    if elements.len() != 6 {
        return Err(Error::unsupported(format!(
            "unsupported number of date elements in header value: {}",
            elements.len()
        )));
    }
    let mut numbers = [0u32; 6];
    for (index, element) in elements.iter().enumerate() {
        numbers[index] = element
            .parse()
            .map_err(|_| Error::invalid_data(format!("invalid date element: {element:?}")))?;
    }
    let datetime = local_datetime(
        numbers[0] as i32,
        numbers[1],
        numbers[2],
        numbers[3],
        numbers[4],
        numbers[5],
    )?;
    Ok(datetime.timestamp())
}

/// Converts an old-style header date value into the requested format
pub fn convert_header_date(value: &str, date_format: DateFormat) -> Result<String> {
    convert_timestamp(parse_header_date(value)?, date_format)
}

/// Parses a header2 date value: a decimal Unix timestamp
pub fn parse_header2_date(value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid_data(format!("invalid header2 timestamp: {value:?}")))
}

/// Converts a header2 date value into the requested format
pub fn convert_header2_date(value: &str, date_format: DateFormat) -> Result<String> {
    convert_timestamp(parse_header2_date(value)?, date_format)
}

/// Parses an xheader ctime date value: `DoW Mon DD hh:mm:ss YYYY TZ`.
/// The trailing timezone abbreviation is required but not interpreted.
pub fn parse_xheader_date(value: &str) -> Result<i64> {
    let elements: Vec<&str> = value.split(' ').filter(|token| !token.is_empty()).collect();

    if elements.len() != 6 {
        return Err(Error::unsupported(format!(
            "unsupported number of date elements in xheader value: {}",
            elements.len()
        )));
    }
    let month = MONTH_ABBREVIATIONS
        .iter()
        .position(|&abbreviation| abbreviation == elements[1])
        .ok_or_else(|| Error::invalid_data(format!("invalid month: {:?}", elements[1])))?
        as u32
        + 1;

    let day: u32 = elements[2]
        .parse()
        .map_err(|_| Error::invalid_data(format!("invalid day of month: {:?}", elements[2])))?;

    let time_elements: Vec<&str> = elements[3].split(':').collect();
    if time_elements.len() != 3 {
        return Err(Error::invalid_data(format!(
            "invalid time of day: {:?}",
            elements[3]
        )));
    }
    let mut time = [0u32; 3];
    for (index, element) in time_elements.iter().enumerate() {
        time[index] = element
            .parse()
            .map_err(|_| Error::invalid_data(format!("invalid time element: {element:?}")))?;
    }
    let year: i32 = elements[4]
        .parse()
        .map_err(|_| Error::invalid_data(format!("invalid year: {:?}", elements[4])))?;

    let datetime = local_datetime(year, month, day, time[0], time[1], time[2])?;
    Ok(datetime.timestamp())
}

/// Converts an xheader date value into the requested format.
/// For ctime output the value is passed through unchanged.
pub fn convert_xheader_date(value: &str, date_format: DateFormat) -> Result<String> {
    if date_format == DateFormat::Ctime {
        return Ok(value.to_string());
    }
    convert_timestamp(parse_xheader_date(value)?, date_format)
}

/// Generates an old-style header date value: `YYYY M D h m s`
pub fn generate_header_date(timestamp: i64) -> Result<String> {
    let datetime = Local
        .timestamp_opt(timestamp, 0)
        .single()
        .ok_or_else(|| Error::invalid_data(format!("timestamp out of range: {timestamp}")))?;
    Ok(datetime.format("%Y %-m %-d %-H %-M %-S").to_string())
}

/// Generates a header2 date value: a decimal Unix timestamp
pub fn generate_header2_date(timestamp: i64) -> String {
    timestamp.to_string()
}

/// Generates an xheader date value: ctime with the local timezone
/// abbreviation appended
pub fn generate_xheader_date(timestamp: i64) -> Result<String> {
    let datetime = Local
        .timestamp_opt(timestamp, 0)
        .single()
        .ok_or_else(|| Error::invalid_data(format!("timestamp out of range: {timestamp}")))?;
    Ok(datetime.format("%a %b %e %H:%M:%S %Y %Z").to_string())
}
