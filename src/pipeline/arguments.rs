//! Argument serialisation: option table × value holder → [`Arguments`].
//!
//! [`serialize`] walks a static [`OptionSpec`] table in declaration order and
//! emits one [`Segment`] per present value. It is a pure function: the same
//! holder always yields the same segments, so the rendered command line can
//! be compared byte-for-byte in tests and logs.
//!
//! Two renderings exist:
//!
//! * [`Arguments::to_command_line`]: one space-joined, trimmed string, the
//!   form used for logging and diagnostics.
//! * [`Arguments::to_argv`]: discrete argv entries handed straight to the
//!   process, with no shell in between. The raw passthrough is split with
//!   POSIX shell-word rules, so `--footer-center "Page [page]"` stays two
//!   entries.

use crate::error::RenderError;
use crate::options::{Accessor, OptionSpec};
use std::fmt;

/// Switches whose value is masked by [`Arguments::redacted`].
const SECRET_SWITCHES: &[&str] = &["--password"];

/// Pair switches whose value is always masked.
const SECRET_PAIR_SWITCHES: &[&str] = &["--cookie"];

/// Header names whose value is masked in `--custom-header` pairs.
const SECRET_HEADERS: &[&str] = &["authorization", "cookie", "proxy-authorization"];

const MASK: &str = "***";

/// A value holder that knows its own switch table(s).
pub trait ToArguments {
    fn to_arguments(&self) -> Arguments;
}

/// The contribution of one option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// `switch`
    Flag(&'static str),
    /// `switch value`
    Value { switch: &'static str, value: String },
    /// `switch key value`
    Pair {
        switch: &'static str,
        key: String,
        value: String,
    },
    /// Unmodeled switches, emitted verbatim.
    Raw(String),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Flag(switch) => write!(f, "{switch}"),
            Segment::Value { switch, value } => write!(f, "{switch} {value}"),
            Segment::Pair { switch, key, value } => write!(f, "{switch} {key} {value}"),
            Segment::Raw(raw) => write!(f, "{raw}"),
        }
    }
}

/// Ordered list of segments making up a command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    segments: Vec<Segment>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// Append all segments of `other`, preserving their order.
    pub fn extend(&mut self, other: Arguments) {
        self.segments.extend(other.segments);
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Space-prefix every segment, join, and trim the ends.
    pub fn to_command_line(&self) -> String {
        let mut line = String::new();
        for segment in &self.segments {
            line.push(' ');
            line.push_str(&segment.to_string());
        }
        line.trim().to_string()
    }

    /// Process argv. Raw passthrough is split into shell words.
    ///
    /// Unbalanced quotes or a trailing backslash in the raw passthrough are
    /// rejected with [`RenderError::InvalidSwitches`].
    pub fn to_argv(&self) -> Result<Vec<String>, RenderError> {
        let mut argv = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Flag(switch) => argv.push(switch.to_string()),
                Segment::Value { switch, value } => {
                    argv.push(switch.to_string());
                    argv.push(value.clone());
                }
                Segment::Pair { switch, key, value } => {
                    argv.push(switch.to_string());
                    argv.push(key.clone());
                    argv.push(value.clone());
                }
                Segment::Raw(raw) => {
                    let words = shell_words::split(raw).map_err(|e| {
                        RenderError::InvalidSwitches {
                            raw: raw.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                    argv.extend(words);
                }
            }
        }
        Ok(argv)
    }

    /// Copy with secret values replaced by `***`, for logging.
    pub fn redacted(&self) -> Arguments {
        let segments = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Value { switch, .. } if SECRET_SWITCHES.contains(switch) => {
                    Segment::Value {
                        switch: *switch,
                        value: MASK.to_string(),
                    }
                }
                Segment::Pair { switch, key, .. } if is_secret_pair(switch, key) => Segment::Pair {
                    switch: *switch,
                    key: key.clone(),
                    value: MASK.to_string(),
                },
                other => other.clone(),
            })
            .collect();
        Arguments { segments }
    }
}

fn is_secret_pair(switch: &str, key: &str) -> bool {
    SECRET_PAIR_SWITCHES.contains(&switch)
        || (switch == "--custom-header"
            && SECRET_HEADERS
                .iter()
                .any(|name| key.eq_ignore_ascii_case(name)))
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_command_line())
    }
}

/// Serialise `value` against `table`.
///
/// * Flag: the switch alone when true.
/// * Scalar: `switch value` when present; the bare value when the switch is
///   empty (raw passthrough).
/// * KeyedPairs: `switch key value` per entry, in the map's iteration order.
///
/// Absent values contribute nothing.
pub fn serialize<T>(table: &[OptionSpec<T>], value: &T) -> Arguments {
    let mut args = Arguments::new();
    for spec in table {
        match &spec.accessor {
            Accessor::Flag(read) => {
                if read(value) {
                    args.push(Segment::Flag(spec.switch));
                }
            }
            Accessor::Scalar(read) => match read(value) {
                Some(v) if spec.switch.is_empty() => args.push(Segment::Raw(v)),
                Some(v) => args.push(Segment::Value {
                    switch: spec.switch,
                    value: v,
                }),
                None => {}
            },
            Accessor::KeyedPairs(read) => {
                for (k, v) in read(value) {
                    args.push(Segment::Pair {
                        switch: spec.switch,
                        key: k.clone(),
                        value: v.clone(),
                    });
                }
            }
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ConversionOptions, KeyedPairs};

    fn pairs(entries: &[(&str, &str)]) -> KeyedPairs {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn unset_options_serialize_to_empty_string() {
        let options = ConversionOptions::default();
        assert_eq!(options.to_arguments().to_command_line(), "");
        assert!(options.to_arguments().to_argv().unwrap().is_empty());
    }

    #[test]
    fn false_flag_contributes_nothing() {
        let options = ConversionOptions {
            disable_javascript: false,
            ..Default::default()
        };
        assert!(options.to_arguments().is_empty());
    }

    #[test]
    fn keyed_pairs_emit_one_segment_per_entry() {
        let options = ConversionOptions {
            custom_headers: pairs(&[("X-A", "1"), ("X-B", "2"), ("X-C", "3")]),
            ..Default::default()
        };
        let args = options.to_arguments();
        assert_eq!(args.segments().len(), 3);
        let line = args.to_command_line();
        for entry in ["--custom-header X-A 1", "--custom-header X-B 2", "--custom-header X-C 3"] {
            assert_eq!(line.matches(entry).count(), 1, "{entry} in {line}");
        }
    }

    #[test]
    fn full_common_set_in_declaration_order() {
        let options = ConversionOptions {
            custom_headers: pairs(&[("X-Trace", "abc")]),
            cookies: pairs(&[("lang", "en")]),
            post: pairs(&[("q", "1")]),
            disable_javascript: true,
            minimum_font_size: Some(12),
            proxy: Some("http://proxy:3128".into()),
            username: Some("bob".into()),
            password: Some("hunter2".into()),
            custom_switches: Some("--print-media-type --no-outline".into()),
        };
        assert_eq!(
            options.to_arguments().to_command_line(),
            "--custom-header X-Trace abc --cookie lang en --post q 1 -n \
             --minimum-font-size 12 -p http://proxy:3128 --username bob \
             --password hunter2 --print-media-type --no-outline"
        );
    }

    #[test]
    fn serialization_is_idempotent() {
        let options = ConversionOptions {
            cookies: pairs(&[("b", "2"), ("a", "1")]),
            minimum_font_size: Some(9),
            ..Default::default()
        };
        let first = options.to_arguments().to_command_line();
        let second = options.to_arguments().to_command_line();
        assert_eq!(first, second);
        assert_eq!(first, "--cookie a 1 --cookie b 2 --minimum-font-size 9");
    }

    #[test]
    fn raw_passthrough_is_verbatim_in_line_and_split_in_argv() {
        let options = ConversionOptions {
            custom_switches: Some("--zoom 1.5  --no-images".into()),
            ..Default::default()
        };
        let args = options.to_arguments();
        assert_eq!(args.to_command_line(), "--zoom 1.5  --no-images");
        assert_eq!(args.to_argv().unwrap(), vec!["--zoom", "1.5", "--no-images"]);
    }

    #[test]
    fn raw_passthrough_keeps_quoted_values_whole() {
        let options = ConversionOptions {
            custom_switches: Some(
                r#"--footer-center "Page [page] of [toPage]" --title 'Q3 report' --print-media-type"#
                    .into(),
            ),
            ..Default::default()
        };
        assert_eq!(
            options.to_arguments().to_argv().unwrap(),
            vec![
                "--footer-center",
                "Page [page] of [toPage]",
                "--title",
                "Q3 report",
                "--print-media-type",
            ]
        );
    }

    #[test]
    fn raw_passthrough_with_unbalanced_quote_is_rejected() {
        let options = ConversionOptions {
            custom_switches: Some(r#"--footer-center "Page [page]"#.into()),
            ..Default::default()
        };
        let err = options.to_arguments().to_argv().unwrap_err();
        assert!(matches!(err, RenderError::InvalidSwitches { .. }), "got {err:?}");
        assert!(err.to_string().contains("--footer-center"));
    }

    #[test]
    fn argv_keeps_values_with_spaces_intact() {
        let options = ConversionOptions {
            custom_headers: pairs(&[("User-Agent", "Mozilla/5.0 (X11)")]),
            ..Default::default()
        };
        assert_eq!(
            options.to_arguments().to_argv().unwrap(),
            vec!["--custom-header", "User-Agent", "Mozilla/5.0 (X11)"]
        );
    }

    #[test]
    fn redacted_masks_credentials_only() {
        let options = ConversionOptions {
            custom_headers: pairs(&[
                ("authorization", "Bearer abc"),
                ("Proxy-Authorization", "Basic xyz"),
                ("X-Trace", "t1"),
            ]),
            cookies: pairs(&[("session", "s3cr3t")]),
            username: Some("bob".into()),
            password: Some("hunter2".into()),
            ..Default::default()
        };
        let args = options.to_arguments();
        let line = args.redacted().to_command_line();
        assert_eq!(
            line,
            "--custom-header Proxy-Authorization *** --custom-header X-Trace t1 \
             --custom-header authorization *** --cookie session *** \
             --username bob --password ***"
        );
        for secret in ["Bearer abc", "Basic xyz", "s3cr3t", "hunter2"] {
            assert!(!line.contains(secret), "{secret} leaked into {line}");
        }
        assert!(args.to_command_line().contains("s3cr3t"));
    }
}
