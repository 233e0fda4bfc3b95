use std::fmt::Write;

/// A single named telemetry record: one measurement name plus a mapping
/// of field name to numeric value. The unit written to the remote
/// database per cycle.
///
/// The point is rebuilt fresh each cycle: [`Point::clear_fields`]
/// followed by [`Point::add_field`] for every value of the new sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Point {
    measurement: String,
    fields: Vec<(String, f64)>,
}

impl Point {
    pub fn new(measurement: &str) -> Self {
        Self {
            measurement: measurement.to_string(),
            fields: Vec::new(),
        }
    }

    /// Drops all fields while keeping the measurement name.
    pub fn clear_fields(&mut self) {
        self.fields.clear();
    }

    pub fn add_field(&mut self, name: &str, value: f64) {
        self.fields.push((name.to_string(), value));
    }

    pub fn fields(&self) -> &[(String, f64)] {
        &self.fields
    }

    /// Renders the point as InfluxDB line protocol, without a trailing
    /// timestamp (the server assigns the receive time):
    /// `<measurement> <field>=<value>,<field>=<value>`
    ///
    /// Spaces and commas in the measurement name and in field keys are
    /// backslash-escaped as the protocol requires.
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape_name(&self.measurement);
        for (i, (name, value)) in self.fields.iter().enumerate() {
            line.push(if i == 0 { ' ' } else { ',' });
            let _ = write!(line, "{}={}", escape_name(name), value);
        }
        line
    }
}

fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, ' ' | ',' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Minimal percent-encoding for URL query components (RFC 3986
/// unreserved characters pass through unchanged).
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.as_bytes() {
        let c = *b as char;
        if c.is_ascii_alphanumeric() || "-_.~".contains(c) {
            out.push(c);
        } else {
            let _ = write!(out, "%{:02X}", b);
        }
    }
    out
}

#[test]
fn test_line_protocol_preserves_values() {
    let mut point = Point::new("Room data");
    point.add_field("temperature", f64::from(21.5f32));
    point.add_field("humidity", f64::from(48.25f32));

    assert_eq!(
        point.to_line_protocol(),
        "Room\\ data temperature=21.5,humidity=48.25"
    );
}

#[test]
fn test_clear_fields_drops_previous_cycle() {
    let mut point = Point::new("Room data");
    point.add_field("temperature", 21.5);
    point.add_field("humidity", 48.25);

    point.clear_fields();
    point.add_field("temperature", -3.0);
    point.add_field("humidity", 90.0);

    assert_eq!(
        point.fields(),
        &[("temperature".to_string(), -3.0), ("humidity".to_string(), 90.0)]
    );
    assert_eq!(
        point.to_line_protocol(),
        "Room\\ data temperature=-3,humidity=90"
    );
}

#[test]
fn test_escapes_field_keys() {
    let mut point = Point::new("m,1");
    point.add_field("a key=x", 1.0);
    assert_eq!(point.to_line_protocol(), "m\\,1 a\\ key\\=x=1");
}

#[test]
fn test_percent_encode() {
    assert_eq!(percent_encode("room-data_1.~"), "room-data_1.~");
    assert_eq!(percent_encode("my org/bucket"), "my%20org%2Fbucket");
}
