use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

use crate::error::ValidationError;

/// Default placeholder format for sequential numbering
pub const DEFAULT_SEQUENCE_FORMAT: &str = "{n:03d}";

/// Default strftime format for date prefixes
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// A renaming rule. Exactly one rule applies to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSpec {
    /// Prepend text to the whole name, extension included
    AddPrefix { prefix: String },
    /// Insert text between the base name and the extension
    AddSuffix { suffix: String },
    /// Literal replacement of every non-overlapping occurrence
    ReplaceText { search: String, replace: String },
    /// Regex replacement; `$1` / `${name}` refer to capture groups
    RegexReplace { pattern: String, replacement: String },
    /// Replace the base name with a number, keeping the extension
    SequentialNumber { format: String, start: i64 },
    /// Prefix the name with the current date and an underscore
    DatePrefix { date_format: String },
}

impl RuleSpec {
    /// Short machine name of the rule kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddPrefix { .. } => "add_prefix",
            Self::AddSuffix { .. } => "add_suffix",
            Self::ReplaceText { .. } => "replace_text",
            Self::RegexReplace { .. } => "regex_replace",
            Self::SequentialNumber { .. } => "sequential_number",
            Self::DatePrefix { .. } => "date_prefix",
        }
    }

    /// Validate every field and prepare the rule for name generation.
    pub fn compile(&self) -> Result<CompiledRule, ValidationError> {
        let rule = self.kind();
        let require = |field: &'static str, value: &str| {
            if value.is_empty() {
                Err(ValidationError::EmptyField { rule, field })
            } else {
                Ok(())
            }
        };

        match self {
            Self::AddPrefix { prefix } => {
                require("prefix", prefix)?;
                Ok(CompiledRule::AddPrefix(prefix.clone()))
            },
            Self::AddSuffix { suffix } => {
                require("suffix", suffix)?;
                Ok(CompiledRule::AddSuffix(suffix.clone()))
            },
            Self::ReplaceText { search, replace } => {
                require("search", search)?;
                Ok(CompiledRule::ReplaceText {
                    search: search.clone(),
                    replace: replace.clone(),
                })
            },
            Self::RegexReplace {
                pattern,
                replacement,
            } => {
                require("pattern", pattern)?;
                let regex = Regex::new(pattern).map_err(|e| ValidationError::InvalidRegex {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                Ok(CompiledRule::RegexReplace {
                    regex,
                    replacement: replacement.clone(),
                })
            },
            Self::SequentialNumber { format, start } => {
                require("format", format)?;
                Ok(CompiledRule::SequentialNumber {
                    format: SequenceFormat::parse(format)?,
                    start: *start,
                })
            },
            Self::DatePrefix { date_format } => {
                require("date_format", date_format)?;
                if StrftimeItems::new(date_format).any(|item| matches!(item, Item::Error)) {
                    return Err(ValidationError::InvalidDateFormat {
                        format: date_format.clone(),
                    });
                }
                Ok(CompiledRule::DatePrefix(date_format.clone()))
            },
        }
    }
}

impl fmt::Display for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddPrefix { prefix } => write!(f, "add prefix '{}'", prefix),
            Self::AddSuffix { suffix } => write!(f, "add suffix '{}'", suffix),
            Self::ReplaceText { search, replace } => {
                write!(f, "replace '{}' with '{}'", search, replace)
            },
            Self::RegexReplace {
                pattern,
                replacement,
            } => write!(f, "regex /{}/ -> '{}'", pattern, replacement),
            Self::SequentialNumber { format, start } => {
                write!(f, "number as '{}' from {}", format, start)
            },
            Self::DatePrefix { date_format } => write!(f, "date prefix '{}'", date_format),
        }
    }
}

/// Per-file inputs to name generation besides the name itself
#[derive(Debug, Clone, Copy)]
pub struct NameContext {
    /// 0-based position of the file in the confirmed ordering
    pub index: usize,
    /// The instant the preview was taken
    pub now: DateTime<Local>,
}

impl NameContext {
    pub fn new(index: usize, now: DateTime<Local>) -> Self {
        Self { index, now }
    }
}

/// A validated rule, ready to generate names.
#[derive(Debug, Clone)]
pub enum CompiledRule {
    AddPrefix(String),
    AddSuffix(String),
    ReplaceText { search: String, replace: String },
    RegexReplace { regex: Regex, replacement: String },
    SequentialNumber { format: SequenceFormat, start: i64 },
    DatePrefix(String),
}

impl CompiledRule {
    /// Compute the new name for `original`. Never fails.
    pub fn generate_name(&self, original: &str, ctx: &NameContext) -> String {
        match self {
            Self::AddPrefix(prefix) => format!("{}{}", prefix, original),
            Self::AddSuffix(suffix) => {
                let (base, ext) = split_extension(original);
                format!("{}{}{}", base, suffix, ext)
            },
            Self::ReplaceText { search, replace } => {
                if search.is_empty() {
                    original.to_string()
                } else {
                    original.replace(search.as_str(), replace)
                }
            },
            Self::RegexReplace { regex, replacement } => regex
                .replace_all(original, replacement.as_str())
                .into_owned(),
            Self::SequentialNumber { format, start } => {
                let offset = i64::try_from(ctx.index).unwrap_or(i64::MAX);
                let (_, ext) = split_extension(original);
                format!("{}{}", format.render(start.saturating_add(offset)), ext)
            },
            Self::DatePrefix(date_format) => {
                let mut date = String::new();
                // Items were checked at compile time; a failing item yields an empty date
                if write!(date, "{}", ctx.now.format(date_format)).is_err() {
                    date.clear();
                }
                format!("{}_{}", date, original)
            },
        }
    }
}

/// Split a file name into base and extension (including the dot).
///
/// Leading dots belong to the base, so `.bashrc` has no extension and
/// `archive.tar.gz` splits into `archive.tar` and `.gz`.
pub fn split_extension(name: &str) -> (&str, &str) {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(pos) => name.split_at(leading + pos),
        None => (name, ""),
    }
}

/// A sequence template with exactly one integer placeholder, such as
/// `img_{n:03d}`.
///
/// Supported placeholder forms are `{n}` and `{n:SPEC}` where SPEC is
/// `[0][width][d]`. `{{` and `}}` stand for literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceFormat {
    prefix: String,
    suffix: String,
    width: usize,
    zero_pad: bool,
}

impl SequenceFormat {
    pub fn parse(format: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidSequenceFormat {
            format: format.to_string(),
            reason: reason.to_string(),
        };

        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut placeholder: Option<(usize, bool)> = None;
        let mut chars = format.chars().peekable();

        while let Some(ch) = chars.next() {
            let literal = if placeholder.is_some() {
                &mut suffix
            } else {
                &mut prefix
            };
            match ch {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                },
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                },
                '}' => return Err(invalid("unmatched '}'")),
                '{' => {
                    let mut field = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        field.push(c);
                    }
                    if !closed {
                        return Err(invalid("unclosed '{'"));
                    }
                    if placeholder.is_some() {
                        return Err(invalid("only one {n} placeholder is allowed"));
                    }
                    placeholder = Some(parse_placeholder(&field).ok_or_else(|| {
                        invalid("placeholder must be {n} or {n:[0][width][d]}")
                    })?);
                },
                _ => literal.push(ch),
            }
        }

        let (width, zero_pad) = placeholder.ok_or_else(|| invalid("missing {n} placeholder"))?;
        Ok(Self {
            prefix,
            suffix,
            width,
            zero_pad,
        })
    }

    /// Render the template for one number
    pub fn render(&self, n: i64) -> String {
        let number = if self.zero_pad {
            format!("{:0width$}", n, width = self.width)
        } else {
            format!("{:>width$}", n, width = self.width)
        };
        format!("{}{}{}", self.prefix, number, self.suffix)
    }
}

/// Parse the inside of `{...}`, returning (width, zero_pad)
fn parse_placeholder(field: &str) -> Option<(usize, bool)> {
    let spec = match field.strip_prefix('n')? {
        "" => return Some((0, false)),
        rest => rest.strip_prefix(':')?,
    };
    let spec = spec.strip_suffix('d').unwrap_or(spec);
    let (zero_pad, digits) = match spec.strip_prefix('0') {
        Some(rest) => (true, rest),
        None => (false, spec),
    };
    if digits.is_empty() {
        return Some((0, zero_pad));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|width| (width, zero_pad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx(index: usize) -> NameContext {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        NameContext::new(index, now)
    }

    fn generate(rule: &RuleSpec, name: &str, index: usize) -> String {
        rule.compile().unwrap().generate_name(name, &ctx(index))
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("photo.jpg"), ("photo", ".jpg"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
        assert_eq!(split_extension(".config.toml"), (".config", ".toml"));
        assert_eq!(split_extension("trailing."), ("trailing", "."));
    }

    #[test]
    fn test_add_prefix_covers_extension() {
        let rule = RuleSpec::AddPrefix {
            prefix: "old_".to_string(),
        };
        assert_eq!(generate(&rule, "notes.txt", 0), "old_notes.txt");
    }

    #[test]
    fn test_add_suffix_before_extension() {
        let rule = RuleSpec::AddSuffix {
            suffix: "_v2".to_string(),
        };
        assert_eq!(generate(&rule, "notes.txt", 0), "notes_v2.txt");
        assert_eq!(generate(&rule, "Makefile", 0), "Makefile_v2");
        assert_eq!(generate(&rule, "a.tar.gz", 0), "a.tar_v2.gz");
    }

    #[test]
    fn test_replace_text_all_occurrences() {
        let rule = RuleSpec::ReplaceText {
            search: "aa".to_string(),
            replace: "b".to_string(),
        };
        assert_eq!(generate(&rule, "aaaaa.txt", 0), "bba.txt");

        let deletion = RuleSpec::ReplaceText {
            search: " copy".to_string(),
            replace: String::new(),
        };
        assert_eq!(generate(&deletion, "report copy.pdf", 0), "report.pdf");
    }

    #[test]
    fn test_replace_text_empty_search_is_identity() {
        let compiled = CompiledRule::ReplaceText {
            search: String::new(),
            replace: "x".to_string(),
        };
        assert_eq!(compiled.generate_name("keep.txt", &ctx(0)), "keep.txt");
    }

    #[test]
    fn test_regex_replace_with_groups() {
        let rule = RuleSpec::RegexReplace {
            pattern: r"^(\d{4})-(\d{2})".to_string(),
            replacement: "${2}_$1".to_string(),
        };
        assert_eq!(generate(&rule, "2023-07 trip.jpg", 0), "07_2023 trip.jpg");

        let rule = RuleSpec::RegexReplace {
            pattern: r"\s+".to_string(),
            replacement: "_".to_string(),
        };
        assert_eq!(generate(&rule, "my  holiday pic.png", 0), "my_holiday_pic.png");
    }

    #[test]
    fn test_sequential_number_discards_base() {
        let rule = RuleSpec::SequentialNumber {
            format: "img_{n:03d}".to_string(),
            start: 1,
        };
        assert_eq!(generate(&rule, "p1.jpg", 0), "img_001.jpg");
        assert_eq!(generate(&rule, "p2.jpg", 1), "img_002.jpg");
        assert_eq!(generate(&rule, "anything.jpg", 41), "img_042.jpg");
        assert_eq!(generate(&rule, "noext", 0), "img_001");
    }

    #[test]
    fn test_sequence_format_variants() {
        assert_eq!(SequenceFormat::parse("{n}").unwrap().render(7), "7");
        assert_eq!(SequenceFormat::parse("{n:d}").unwrap().render(7), "7");
        assert_eq!(SequenceFormat::parse("{n:4}").unwrap().render(7), "   7");
        assert_eq!(SequenceFormat::parse("{n:04d}").unwrap().render(7), "0007");
        assert_eq!(SequenceFormat::parse("{n:03d}").unwrap().render(-1), "-01");
        assert_eq!(SequenceFormat::parse("{n:02}").unwrap().render(1234), "1234");
        assert_eq!(
            SequenceFormat::parse("{{{n}}}-x").unwrap().render(5),
            "{5}-x"
        );
    }

    #[test]
    fn test_sequence_format_rejects_bad_templates() {
        for bad in ["img", "{n}{n}", "{x}", "{n:abc}", "{n", "n}", "{n:03s}"] {
            let err = SequenceFormat::parse(bad).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidSequenceFormat { .. }),
                "expected rejection for {bad}"
            );
        }
    }

    #[test]
    fn test_date_prefix_uses_context_instant() {
        let rule = RuleSpec::DatePrefix {
            date_format: "%Y%m%d".to_string(),
        };
        assert_eq!(generate(&rule, "scan.pdf", 0), "20240309_scan.pdf");

        let rule = RuleSpec::DatePrefix {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        };
        assert_eq!(generate(&rule, "scan.pdf", 3), "2024-03-09_scan.pdf");
    }

    #[test]
    fn test_compile_rejects_empty_fields() {
        let err = RuleSpec::AddPrefix {
            prefix: String::new(),
        }
        .compile()
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::EmptyField {
                rule: "add_prefix",
                field: "prefix"
            }
        );

        assert!(RuleSpec::ReplaceText {
            search: String::new(),
            replace: "x".to_string()
        }
        .compile()
        .is_err());

        // An empty replacement is a deletion and is allowed
        assert!(RuleSpec::RegexReplace {
            pattern: "x".to_string(),
            replacement: String::new()
        }
        .compile()
        .is_ok());
    }

    #[test]
    fn test_compile_rejects_bad_regex_and_date() {
        let err = RuleSpec::RegexReplace {
            pattern: "(unclosed".to_string(),
            replacement: String::new(),
        }
        .compile()
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRegex { .. }));

        let err = RuleSpec::DatePrefix {
            date_format: "%Q".to_string(),
        }
        .compile()
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDateFormat { .. }));
    }

    #[test]
    fn test_rule_spec_json_shape() {
        let rule: RuleSpec =
            serde_json::from_str(r#"{"kind":"sequential_number","format":"{n}","start":10}"#)
                .unwrap();
        assert_eq!(
            rule,
            RuleSpec::SequentialNumber {
                format: "{n}".to_string(),
                start: 10
            }
        );
        assert_eq!(rule.kind(), "sequential_number");
    }
}
