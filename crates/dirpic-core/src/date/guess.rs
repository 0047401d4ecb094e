use chrono::NaiveDateTime;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// How a convention locates the timestamp inside a filename.
enum Matcher {
    /// Fixed-width timestamp right after a literal prefix.
    Prefix {
        prefixes: &'static [&'static str],
        width: usize,
    },
    /// Timestamp anywhere in the name.
    Embedded(&'static LazyLock<Regex>),
}

/// A named device/app filename convention.
struct Convention {
    name: &'static str,
    matcher: Matcher,
    format: &'static str,
}

static RE_COMPACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<date>(20|19|18)\d{2}(0[1-9]|1[0-2])[0-3]\d[_-]\d{6})").unwrap()
});
static RE_DASHED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<date>(20|19|18)\d{2}-(0[1-9]|1[0-2])-[0-3]\d-\d{2}-\d{2}-\d{2})").unwrap()
});

// Order matters: a name that fits several conventions takes the first.
static CONVENTIONS: &[Convention] = &[
    Convention {
        name: "camera",
        matcher: Matcher::Prefix { prefixes: &[""], width: 15 },
        format: "%Y%m%d_%H%M%S",
    },
    Convention {
        name: "signal",
        matcher: Matcher::Prefix { prefixes: &["signal-"], width: 19 },
        format: "%Y-%m-%d-%H-%M-%S",
    },
    Convention {
        name: "android",
        matcher: Matcher::Prefix { prefixes: &["IMG_", "VID_", "PXL_"], width: 15 },
        format: "%Y%m%d_%H%M%S",
    },
    Convention {
        name: "screenshot",
        matcher: Matcher::Prefix { prefixes: &["Screenshot_"], width: 15 },
        format: "%Y%m%d-%H%M%S",
    },
    Convention {
        name: "embedded",
        matcher: Matcher::Embedded(&RE_COMPACT),
        format: "%Y%m%d%H%M%S",
    },
    Convention {
        name: "embedded-dashed",
        matcher: Matcher::Embedded(&RE_DASHED),
        format: "%Y%m%d%H%M%S",
    },
];

/// A timestamp guessed from a filename, with the convention that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilenameDate {
    pub date: NaiveDateTime,
    pub convention: &'static str,
}

impl Convention {
    fn parse(&self, basename: &str) -> Option<NaiveDateTime> {
        match &self.matcher {
            Matcher::Prefix { prefixes, width } => prefixes.iter().find_map(|prefix| {
                let rest = basename.strip_prefix(prefix)?;
                let stamp = rest.get(..*width)?;
                NaiveDateTime::parse_from_str(stamp, self.format).ok()
            }),
            Matcher::Embedded(regex) => {
                // Separators vary, so only the digits are kept
                let stamp: String = regex
                    .captures(basename)?
                    .name("date")?
                    .as_str()
                    .chars()
                    .filter(char::is_ascii_digit)
                    .collect();
                NaiveDateTime::parse_from_str(&stamp, self.format).ok()
            }
        }
    }
}

/// Try each known naming convention in order; the first that parses wins.
pub fn guess_date_from_filename(filename: &str) -> Option<FilenameDate> {
    let basename = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    CONVENTIONS.iter().find_map(|c| {
        c.parse(basename).map(|date| FilenameDate {
            date,
            convention: c.name,
        })
    })
}
