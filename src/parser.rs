//! XML parser for PSKReporter reception-report documents.

use anyhow::{Result, bail};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

const ROOT: &[u8] = b"receptionReports";
const REPORT: &[u8] = b"receptionReport";

/// One `receptionReport` as it appeared in the document.
///
/// Every field is optional; validation happens in the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceptionReport {
    pub sender_locator: Option<String>,
    pub receiver_locator: Option<String>,
    pub frequency: Option<i64>,
    pub snr: Option<i64>,
    pub flow_start_seconds: Option<i64>,
}

impl ReceptionReport {
    fn set(&mut self, key: &[u8], value: &str) {
        match key {
            b"senderLocator" => self.sender_locator = Some(value.trim().to_string()),
            b"receiverLocator" => self.receiver_locator = Some(value.trim().to_string()),
            b"frequency" => self.frequency = parse_number(value),
            b"sNR" => self.snr = parse_number(value),
            b"flowStartSeconds" => self.flow_start_seconds = parse_number(value),
            _ => {}
        }
    }

    fn from_attributes(start: &BytesStart) -> Result<Self> {
        let mut report = Self::default();
        for attr in start.attributes() {
            let attr = attr?;
            let value = attr.unescape_value()?;
            report.set(attr.key.as_ref(), &value);
        }
        Ok(report)
    }
}

/// Integer value of `text`, truncating decimals toward zero. Anything else is
/// treated as absent.
fn parse_number(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)
    })
}

/// Decodes every `receptionReport` under the `receptionReports` root.
///
/// Fields are read from attributes (the live feed's form) or from child
/// elements. Other children of the root are ignored.
///
/// # Errors
///
/// Returns an error for malformed or truncated XML, an unexpected root
/// element, or a document without any reception report.
pub fn parse_reports(bytes: &[u8]) -> Result<Vec<ReceptionReport>> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut reports = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut current: Option<ReceptionReport> = None;
    let mut field: Option<Vec<u8>> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                match depth {
                    0 => {
                        check_root(&e)?;
                        saw_root = true;
                    }
                    1 if e.name().as_ref() == REPORT => {
                        current = Some(ReceptionReport::from_attributes(&e)?);
                    }
                    2 if current.is_some() => field = Some(e.name().as_ref().to_vec()),
                    _ => {}
                }
                depth += 1;
            }
            Event::Empty(e) => match depth {
                0 => {
                    check_root(&e)?;
                    saw_root = true;
                }
                1 if e.name().as_ref() == REPORT => {
                    reports.push(ReceptionReport::from_attributes(&e)?);
                }
                _ => {}
            },
            Event::Text(t) => {
                if let (Some(report), Some(key)) = (current.as_mut(), field.as_deref()) {
                    report.set(key, &t.unescape()?);
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                match depth {
                    2 => field = None,
                    1 => reports.extend(current.take()),
                    _ => {}
                }
            }
            Event::Eof => {
                if depth != 0 {
                    bail!("document ended with {depth} unclosed element(s)");
                }
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        bail!("document has no <receptionReports> root element");
    }
    if reports.is_empty() {
        bail!("document contains no <receptionReport> elements");
    }

    Ok(reports)
}

fn check_root(start: &BytesStart) -> Result<()> {
    if start.name().as_ref() != ROOT {
        bail!(
            "expected <receptionReports> root element, found <{}>",
            String::from_utf8_lossy(start.name().as_ref())
        );
    }
    Ok(())
}
