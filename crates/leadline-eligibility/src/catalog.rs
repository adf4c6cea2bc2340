//! Make aliases and the cross-brand model dictionary.
//!
//! Model keywords are matched against the tokens of a model string and
//! against its compacted form (lowercase, punctuation and spaces removed),
//! so `GSX-R750`, `gsxr 750`, and `Gsxr750` all hit the `gsxr` keyword. A
//! keyword matches a token when the token equals it or continues with a
//! digit (`crf` matches `crf450r` but not `crfoo`). Standalone keywords
//! only match a whole token, so `r1` hits `YZF-R1` but not `R1250GS`.

/// A canonical make and the spellings callers use for it.
struct MakeEntry {
    canonical: &'static str,
    aliases: &'static [&'static str],
}

const MAKES: &[MakeEntry] = &[
    MakeEntry {
        canonical: "Harley-Davidson",
        aliases: &["harley-davidson", "harley davidson", "harley", "hd", "h-d"],
    },
    MakeEntry {
        canonical: "Indian",
        aliases: &["indian"],
    },
    MakeEntry {
        canonical: "Victory",
        aliases: &["victory"],
    },
    MakeEntry {
        canonical: "Honda",
        aliases: &["honda"],
    },
    MakeEntry {
        canonical: "Yamaha",
        aliases: &["yamaha"],
    },
    MakeEntry {
        canonical: "Kawasaki",
        aliases: &["kawasaki"],
    },
    MakeEntry {
        canonical: "Suzuki",
        aliases: &["suzuki"],
    },
    MakeEntry {
        canonical: "Ducati",
        aliases: &["ducati"],
    },
    MakeEntry {
        canonical: "BMW",
        aliases: &["bmw"],
    },
    MakeEntry {
        canonical: "Triumph",
        aliases: &["triumph"],
    },
    MakeEntry {
        canonical: "KTM",
        aliases: &["ktm"],
    },
    MakeEntry {
        canonical: "Polaris",
        aliases: &["polaris"],
    },
    MakeEntry {
        canonical: "Can-Am",
        aliases: &["can-am", "can am", "canam", "brp"],
    },
    MakeEntry {
        canonical: "Arctic Cat",
        aliases: &["arctic cat", "arcticcat"],
    },
    MakeEntry {
        canonical: "John Deere",
        aliases: &["john deere", "deere"],
    },
    MakeEntry {
        canonical: "Vespa",
        aliases: &["vespa", "piaggio"],
    },
    MakeEntry {
        canonical: "Zero",
        aliases: &["zero", "zero motorcycles"],
    },
    MakeEntry {
        canonical: "LiveWire",
        aliases: &["livewire", "live wire"],
    },
];

/// Model keyword to the canonical make that builds it.
const MODEL_OWNERS: &[(&str, &str)] = &[
    // Yamaha
    ("grizzly", "Yamaha"),
    ("kodiak", "Yamaha"),
    ("rhino", "Yamaha"),
    ("viking", "Yamaha"),
    ("wolverine", "Yamaha"),
    ("raptor", "Yamaha"),
    ("yz", "Yamaha"),
    ("yzf", "Yamaha"),
    ("r1", "Yamaha"),
    ("r6", "Yamaha"),
    ("zuma", "Yamaha"),
    // Honda
    ("rancher", "Honda"),
    ("foreman", "Honda"),
    ("rubicon", "Honda"),
    ("pioneer", "Honda"),
    ("crf", "Honda"),
    ("cbr", "Honda"),
    ("goldwing", "Honda"),
    ("metropolitan", "Honda"),
    ("ruckus", "Honda"),
    ("pcx", "Honda"),
    ("scoopy", "Honda"),
    // Kawasaki
    ("ninja", "Kawasaki"),
    ("kx", "Kawasaki"),
    ("klx", "Kawasaki"),
    ("teryx", "Kawasaki"),
    ("mule", "Kawasaki"),
    ("bruteforce", "Kawasaki"),
    // Suzuki
    ("gsxr", "Suzuki"),
    ("hayabusa", "Suzuki"),
    ("kingquad", "Suzuki"),
    ("rm", "Suzuki"),
    ("rmz", "Suzuki"),
    // Polaris
    ("sportsman", "Polaris"),
    ("rzr", "Polaris"),
    ("ranger", "Polaris"),
    ("slingshot", "Polaris"),
    // Can-Am
    ("outlander", "Can-Am"),
    ("maverick", "Can-Am"),
    ("renegade", "Can-Am"),
    ("spyder", "Can-Am"),
    // Arctic Cat
    ("wildcat", "Arctic Cat"),
    ("prowler", "Arctic Cat"),
    ("alterra", "Arctic Cat"),
    // John Deere
    ("gator", "John Deere"),
    // KTM
    ("sx", "KTM"),
    ("exc", "KTM"),
    ("xc", "KTM"),
    // Harley-Davidson
    ("sportster", "Harley-Davidson"),
    ("softail", "Harley-Davidson"),
    ("dyna", "Harley-Davidson"),
    ("roadking", "Harley-Davidson"),
    ("streetglide", "Harley-Davidson"),
    ("fatboy", "Harley-Davidson"),
    // Indian
    ("chieftain", "Indian"),
    ("scout", "Indian"),
];

/// Sport and motocross designations that other makes reuse as prefixes
/// (BMW `R18`, `R1200GS`).
const STANDALONE_KEYWORDS: &[&str] = &["r1", "r6", "sx", "xc"];

/// Lowercases and strips everything but ASCII letters and digits.
pub fn compact(s: &str) -> String {
    s.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn tokens(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_lowercase)
}

fn token_matches(token: &str, keyword: &str, standalone: bool) -> bool {
    match token.strip_prefix(keyword) {
        Some("") => true,
        Some(rest) => !standalone && rest.starts_with(|c: char| c.is_ascii_digit()),
        None => false,
    }
}

/// Returns whether a model string contains the given keyword.
pub fn has_keyword(text: &str, keyword: &str) -> bool {
    let standalone = STANDALONE_KEYWORDS.contains(&keyword);
    tokens(text).any(|t| token_matches(&t, keyword, standalone))
        || token_matches(&compact(text), keyword, standalone)
}

/// Returns whether a model string contains any of the given keywords.
pub fn has_any_keyword(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| has_keyword(text, k))
}

/// Resolves a spoken or typed make to its canonical spelling.
///
/// Returns `None` for makes outside the catalog; those are accepted as
/// spoken and never fail a make/model check.
pub fn canonical_make(raw: &str) -> Option<&'static str> {
    let needle = compact(raw);
    if needle.is_empty() {
        return None;
    }
    MAKES
        .iter()
        .find(|m| m.aliases.iter().any(|a| compact(a) == needle))
        .map(|m| m.canonical)
}

/// Returns every catalog make that builds a model matching this string.
pub fn model_owners(model: &str) -> Vec<&'static str> {
    let mut owners: Vec<&'static str> = MODEL_OWNERS
        .iter()
        .filter(|(keyword, _)| has_keyword(model, keyword))
        .map(|(_, make)| *make)
        .collect();
    owners.sort_unstable();
    owners.dedup();
    owners
}
