//! Text encoding of template lists.
//!
//! Each template is two lines:
//!
//! ```text
//! VID PID VERSION NAME
//! [(SRC PART DST)(SRC PART DST)...]
//! ```
//!
//! Numbers are unpadded lowercase hex without prefix, `PART` is one of
//! `b w e n s l h`.

use joymap_input::{ButtonId, Part};
use thiserror::Error;

use crate::template::{ButtonRule, Matcher, Template};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("line {0}: malformed header")]
    Header(usize),
    #[error("line {0}: missing rule list")]
    MissingRules(usize),
    #[error("line {0}: malformed rule list")]
    Rules(usize),
    #[error("line {line}: invalid hex number \"{value}\"")]
    Hex { line: usize, value: String },
    #[error("line {line}: invalid part \"{part}\"")]
    Part { line: usize, part: String },
    #[error("line {line}: duplicate rule for {button:x} {part}")]
    Duplicate { line: usize, button: ButtonId, part: char },
}

/// Encode templates in order.
pub fn encode(templates: &[Template]) -> String {
    let mut out = String::new();
    for template in templates {
        let m = &template.matcher;
        out.push_str(&format!(
            "{:x} {:x} {:x} {}\n[",
            m.vendor_id, m.product_id, m.version, m.name
        ));
        for rule in template.rules() {
            out.push_str(&format!(
                "({:x} {} {:x})",
                rule.source,
                rule.part.as_char(),
                rule.mask
            ));
        }
        out.push_str("]\n");
    }
    out
}

/// Decode a template list. Any malformed record rejects the whole input.
///
/// Names are raw bytes; invalid UTF-8 in them is replaced rather than
/// rejected.
pub fn decode(data: &[u8]) -> Result<Vec<Template>, DecodeError> {
    let text = String::from_utf8_lossy(data);
    // Storage backends may pad blobs with '='.
    let text = text.trim_end_matches(|c: char| c == '=' || c.is_whitespace());
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let mut templates = Vec::new();
    let mut lines = text.split('\n').enumerate().map(|(i, l)| (i + 1, l));
    while let Some((line_no, header)) = lines.next() {
        let matcher = decode_header(line_no, header)?;
        let (rules_no, rules) = lines
            .next()
            .ok_or(DecodeError::MissingRules(line_no + 1))?;
        let mut template = Template::new(matcher);
        decode_rules(rules_no, rules, &mut template)?;
        templates.push(template);
    }
    Ok(templates)
}

fn decode_header(line: usize, header: &str) -> Result<Matcher, DecodeError> {
    let mut fields = header.splitn(4, ' ');
    let (Some(vid), Some(pid), Some(version), Some(name)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(DecodeError::Header(line));
    };
    Ok(Matcher {
        vendor_id: parse_hex(line, vid)?,
        product_id: parse_hex(line, pid)?,
        version: parse_hex(line, version)?,
        name: name.to_string(),
    })
}

fn decode_rules(line: usize, input: &str, template: &mut Template) -> Result<(), DecodeError> {
    let mut rest = input
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or(DecodeError::Rules(line))?;

    while !rest.is_empty() {
        let body = rest.strip_prefix('(').ok_or(DecodeError::Rules(line))?;
        let end = body.find(')').ok_or(DecodeError::Rules(line))?;
        let (group, tail) = (&body[..end], &body[end + 1..]);
        rest = tail;

        let fields: Vec<&str> = group.split(' ').collect();
        let [source, part, mask] = fields[..] else {
            return Err(DecodeError::Rules(line));
        };
        let source: ButtonId = parse_hex(line, source)?;
        let part = parse_part(line, part)?;
        let mask = parse_hex(line, mask)?;
        if !template.insert(ButtonRule::new(source, part, mask)) {
            return Err(DecodeError::Duplicate {
                line,
                button: source,
                part: part.as_char(),
            });
        }
    }
    Ok(())
}

fn parse_part(line: usize, value: &str) -> Result<Part, DecodeError> {
    let invalid = || DecodeError::Part {
        line,
        part: value.to_string(),
    };
    let mut chars = value.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return Err(invalid());
    };
    match Part::from_char(c) {
        Some(Part::Connect) | None => Err(invalid()),
        Some(part) => Ok(part),
    }
}

/// Parse lowercase, unprefixed hex into any unsigned width.
fn parse_hex<T: TryFrom<u64>>(line: usize, value: &str) -> Result<T, DecodeError> {
    let invalid = || DecodeError::Hex {
        line,
        value: value.to_string(),
    };
    let valid_digits = !value.is_empty()
        && value.len() <= 16
        && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if !valid_digits {
        return Err(invalid());
    }
    let wide = u64::from_str_radix(value, 16).map_err(|_| invalid())?;
    T::try_from(wide).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use joymap_input::{CompoundControl, DeviceInfo, RawControl, KEYBOARD_DEVICE_ID};

    use super::*;
    use crate::config::MapperConfig;
    use crate::generate::generate_template;

    fn sample() -> Vec<Template> {
        let mut pad = Template::new(Matcher {
            vendor_id: 0x45e,
            product_id: 0x28e,
            version: 0x114,
            name: "Xbox 360 Controller".into(),
        });
        pad.insert(ButtonRule::new(0x80, Part::Button, 0x10));
        pad.insert(ButtonRule::new(0x40, Part::Low, 0x4));
        pad.insert(ButtonRule::new(0x40, Part::High, 0x8));
        let mut stick = Template::new(Matcher::default());
        stick.insert(ButtonRule::new(0x200, Part::North, 0x1));
        stick.insert(ButtonRule::new(0x200, Part::West, 0x4));
        let empty = Template::new(Matcher {
            name: "keyboard".into(),
            ..Default::default()
        });
        vec![pad, stick, empty]
    }

    const SAMPLE: &str = "45e 28e 114 Xbox 360 Controller\n\
                          [(40 l 4)(40 h 8)(80 b 10)]\n\
                          0 0 0 \n\
                          [(200 w 4)(200 n 1)]\n\
                          0 0 0 keyboard\n\
                          []\n";

    #[test]
    fn encode_writes_unpadded_hex() {
        assert_eq!(encode(&sample()), SAMPLE);
    }

    #[test]
    fn decode_reads_encoded_output() {
        assert_eq!(decode(SAMPLE.as_bytes()), Ok(sample()));
        assert_eq!(encode(&decode(SAMPLE.as_bytes()).expect("valid")), SAMPLE);
    }

    fn generated() -> Vec<Template> {
        let config = MapperConfig::default();
        let device = |id, vendor_id, name: &str, standard_mapping| DeviceInfo {
            id,
            vendor_id,
            product_id: 0x1f,
            version: 0x100,
            name: name.to_string(),
            standard_mapping,
        };
        let axis = CompoundControl::classify(&RawControl {
            button_id: 0x100,
            usage: 0x30,
            low: -128,
            high: 127,
            resting: 0,
        })
        .expect("axis");
        let hat = CompoundControl::classify(&RawControl {
            button_id: 0x200,
            usage: 0x39,
            low: 0,
            high: 7,
            resting: 8,
        })
        .expect("hat");
        vec![
            generate_template(&config, &device(1, 0x45e, "Xbox Pad", true), &[], &[]),
            generate_template(&config, &device(KEYBOARD_DEVICE_ID, 0, "keyboard", false), &[], &[]),
            generate_template(&config, &device(2, 0x79, "", false), &[hat, axis], &[1, 2, 3]),
            generate_template(&config, &device(3, 0x79, "Stick=", false), &[axis], &[1]),
            generate_template(&config, &device(4, 0, "Two\nLines ", false), &[], &[4, 5]),
        ]
    }

    #[test]
    fn generated_templates_survive_a_store_cycle() {
        let encoded = encode(&generated());
        let decoded = decode(encoded.as_bytes()).expect("generated output decodes");
        assert_eq!(decoded, generated());
        assert_eq!(encode(&decoded), encoded);
    }

    #[test]
    fn decode_trims_padding() {
        let padded = format!("{SAMPLE}===");
        assert_eq!(decode(padded.as_bytes()), Ok(sample()));
        assert_eq!(decode(b"=="), Ok(Vec::new()));
        assert_eq!(decode(b""), Ok(Vec::new()));
    }

    #[test]
    fn decode_accepts_padded_hex_from_hand_written_input() {
        let templates = decode(b"0045e 028e 0 Pad\n[(0080 b 01)]\n").expect("valid");
        assert_eq!(templates[0].matcher.vendor_id, 0x45e);
        assert_eq!(templates[0].rules(), &[ButtonRule::new(0x80, Part::Button, 1)]);
        assert_ne!(encode(&templates), "0045e 028e 0 Pad\n[(0080 b 01)]\n");
    }

    #[test]
    fn decode_rejects_malformed_records() {
        let cases: &[(&str, DecodeError)] = &[
            ("45e 28e\n[]\n", DecodeError::Header(1)),
            ("0 0 0 pad\n", DecodeError::MissingRules(2)),
            ("0 0 0 pad\n(80 b 1)\n", DecodeError::Rules(2)),
            ("0 0 0 pad\n[(80 b 1]\n", DecodeError::Rules(2)),
            ("0 0 0 pad\n[(80 b)]\n", DecodeError::Rules(2)),
            ("0 0 0 pad\n[(80  b 1)]\n", DecodeError::Rules(2)),
            (
                "45E 0 0 pad\n[]\n",
                DecodeError::Hex { line: 1, value: "45E".into() },
            ),
            (
                "0x45e 0 0 pad\n[]\n",
                DecodeError::Hex { line: 1, value: "0x45e".into() },
            ),
            (
                "10000 0 0 pad\n[]\n",
                DecodeError::Hex { line: 1, value: "10000".into() },
            ),
            (
                "0 0 0 pad\n[(80 b 10000)]\n",
                DecodeError::Hex { line: 2, value: "10000".into() },
            ),
            (
                "0 0 0 pad\n[(80 c 1)]\n",
                DecodeError::Part { line: 2, part: "c".into() },
            ),
            (
                "0 0 0 pad\n[(80 x 1)]\n",
                DecodeError::Part { line: 2, part: "x".into() },
            ),
            (
                "0 0 0 pad\n[(80 b 1)(80 b 2)]\n",
                DecodeError::Duplicate { line: 2, button: 0x80, part: 'b' },
            ),
        ];
        for (input, expected) in cases {
            assert_eq!(decode(input.as_bytes()).as_ref(), Err(expected), "{input:?}");
        }
    }

    #[test]
    fn one_bad_record_drops_the_whole_list() {
        let input = format!("{SAMPLE}0 0 0 broken\n[(zz b 1)]\n");
        assert!(decode(input.as_bytes()).is_err());
    }

    #[test]
    fn foreign_name_bytes_keep_the_list() {
        let mut input = b"0 0 0 Pad \xff\n[(80 b 1)]\n".to_vec();
        input.extend_from_slice(SAMPLE.as_bytes());
        let templates = decode(&input).expect("names are raw bytes");
        assert_eq!(templates.len(), 4);
        assert_eq!(templates[0].matcher.name, "Pad \u{fffd}");
        assert!(decode(b"0 0 0 pad\n[(8\xff b 1)]\n").is_err());
    }

    #[test]
    fn source_ids_are_32_bit() {
        let templates = decode(b"0 0 0 big\n[(ffffffff b 1)]\n").expect("valid");
        assert_eq!(templates[0].rules()[0].source, u32::MAX);
        assert!(decode(b"0 0 0 big\n[(100000000 b 1)]\n").is_err());
    }
}
