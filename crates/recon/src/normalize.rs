//! Customer-name canonicalization.
//!
//! `normalize` is total and idempotent: symbols are rewritten, whitespace is
//! collapsed, trailing legal-entity tokens are stripped until none remain, and
//! the result is lowercased.

/// Legal-entity and trade-channel tokens dropped from the end of a name.
/// Periods are removed before this check, so "B.V." arrives as "bv".
const LEGAL_SUFFIXES: &[&str] = &["bv", "vof", "gmbh", "webshop", "retail", "export", "holland"];

/// Site / branch qualifiers dropped when computing a base name.
const LOCATION_SUFFIXES: &[&str] = &[
    "naaldwijk",
    "aalsmeer",
    "rijnsburg",
    "villa",
    "klondike",
    "koolhaas",
    "houter",
    "zuidplas",
];

/// Canonical comparable form of a raw customer name. Empty input yields "".
pub fn normalize(raw: &str) -> String {
    let mut substituted = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => substituted.push_str("en"),
            '.' | ',' => {}
            '-' | '/' => substituted.push(' '),
            c => substituted.push(c),
        }
    }

    let mut tokens: Vec<&str> = substituted.split_whitespace().collect();
    strip_trailing(&mut tokens, LEGAL_SUFFIXES);

    tokens.join(" ").to_lowercase()
}

/// `normalize` with trailing location qualifiers also removed, so
/// "Bloemen Groothandel Aalsmeer" and "Bloemen Groothandel" share a base name.
pub fn base_name(raw: &str) -> String {
    let normalized = normalize(raw);
    let mut tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();
    // A location token can hide a legal suffix ("acme bv aalsmeer").
    strip_trailing(&mut tokens, &[LOCATION_SUFFIXES, LEGAL_SUFFIXES].concat());
    tokens.join(" ")
}

/// Drop matching tokens from the end while at least one token would remain.
fn strip_trailing(tokens: &mut Vec<&str>, suffixes: &[&str]) {
    while tokens.len() > 1 {
        let last = tokens[tokens.len() - 1].to_lowercase();
        if suffixes.contains(&last.as_str()) {
            tokens.pop();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_legal_suffix_with_periods() {
        assert_eq!(normalize("ACME Bloemen B.V."), "acme bloemen");
        assert_eq!(normalize("Fleur v.o.f."), "fleur");
        assert_eq!(normalize("Gärtnerei Schmidt GmbH"), "gärtnerei schmidt");
    }

    #[test]
    fn symbols_and_whitespace() {
        assert_eq!(normalize("  Jansen  &  Zn "), "jansen en zn");
        assert_eq!(normalize("De Vries-Bloem/Plant"), "de vries bloem plant");
        assert_eq!(normalize("Van der Berg, Kwekerij"), "van der berg kwekerij");
    }

    #[test]
    fn stacked_suffixes_all_removed() {
        assert_eq!(normalize("Flora Holland Export BV"), "flora");
    }

    #[test]
    fn lone_suffix_token_is_kept() {
        assert_eq!(normalize("Export"), "export");
        assert_eq!(normalize("B.V."), "bv");
    }

    #[test]
    fn empty_and_blank() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t "), "");
        assert_eq!(normalize(".,"), "");
    }

    #[test]
    fn base_name_drops_location() {
        assert_eq!(base_name("Bloemenhuis Aalsmeer B.V."), "bloemenhuis");
        assert_eq!(base_name("Kwekerij Zuidplas"), "kwekerij");
        assert_eq!(base_name("Aalsmeer"), "aalsmeer");
        assert_eq!(base_name("Acme BV Aalsmeer"), "acme");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "\\PC{0,40}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_is_idempotent_on_suffix_heavy_names(
            words in proptest::collection::vec("(bv|B\\.V\\.|vof|Export|holland|acme|&|-| )", 0..8)
        ) {
            let s = words.join(" ");
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn base_name_is_idempotent(s in "\\PC{0,40}") {
            let once = base_name(&s);
            prop_assert_eq!(base_name(&once), once);
        }
    }
}
