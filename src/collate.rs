//! Natural alphabetic ordering for menu names.
//!
//! A three-level comparison in the spirit of locale collation: base letters
//! first (case and accents ignored, punctuation before digits before letters),
//! then accents, then case. Raw code points break any remaining tie so the
//! order is total.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Class {
    Space,
    Punct,
    Symbol,
    Digit,
    Letter,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollationKey {
    primary: Vec<(Class, char)>,
    secondary: Vec<bool>,
    // lowercase sorts first
    tertiary: Vec<bool>,
    raw: String,
}

pub fn sort_key(s: &str) -> CollationKey {
    let mut key = CollationKey {
        primary: Vec::with_capacity(s.len()),
        secondary: Vec::with_capacity(s.len()),
        tertiary: Vec::with_capacity(s.len()),
        raw: s.to_string(),
    };

    for c in s.chars() {
        // decomposed accents weigh on the preceding letter, like precomposed ones
        if is_combining_mark(c) {
            if let Some(accented) = key.secondary.last_mut() {
                *accented = true;
                continue;
            }
        }
        let upper = c.is_uppercase();
        for lower in c.to_lowercase() {
            match fold(lower) {
                Some(base) => {
                    for b in base.chars() {
                        key.push(b, true, upper);
                    }
                }
                None => key.push(lower, false, upper),
            }
        }
    }

    key
}

impl CollationKey {
    fn push(&mut self, c: char, accented: bool, upper: bool) {
        self.primary.push((classify(c), c));
        self.secondary.push(accented);
        self.tertiary.push(upper);
    }
}

fn classify(c: char) -> Class {
    if c.is_whitespace() {
        Class::Space
    } else if c.is_numeric() {
        Class::Digit
    } else if c.is_alphabetic() {
        Class::Letter
    } else if "`^<=>|~$+".contains(c) {
        Class::Symbol
    } else if c.is_ascii_punctuation() || ('\u{2010}'..='\u{2027}').contains(&c) {
        Class::Punct
    } else {
        Class::Symbol
    }
}

fn is_combining_mark(c: char) -> bool {
    matches!(
        c,
        '\u{0300}'..='\u{036F}'
            | '\u{1AB0}'..='\u{1AFF}'
            | '\u{1DC0}'..='\u{1DFF}'
            | '\u{20D0}'..='\u{20FF}'
            | '\u{FE20}'..='\u{FE2F}'
    )
}

/// Base letters for common Latin letters with diacritics or ligatures.
fn fold(c: char) -> Option<&'static str> {
    let base = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ğ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
        'ł' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'ř' => "r",
        'ś' | 'š' | 'ş' => "s",
        'ť' | 'ţ' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        _ => return None,
    };
    Some(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    fn compare(a: &str, b: &str) -> Ordering {
        sort_key(a).cmp(&sort_key(b))
    }

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut v: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        v.sort_by(|a, b| compare(a, b));
        v
    }

    #[test]
    fn case_does_not_dominate() {
        assert_eq!(sorted(&["banana", "Apple", "cherry"]), vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn accents_sort_with_base_letter() {
        assert_eq!(
            sorted(&["Funghi", "Élan Bianca", "Diavola"]),
            vec!["Diavola", "Élan Bianca", "Funghi"]
        );
    }

    #[test]
    fn unaccented_before_accented() {
        assert_eq!(compare("resume", "résumé"), Ordering::Less);
    }

    #[test]
    fn lowercase_before_uppercase_on_tie() {
        assert_eq!(compare("pizza", "Pizza"), Ordering::Less);
    }

    #[test]
    fn punctuation_and_digits_before_letters() {
        assert_eq!(sorted(&["Zeta", "4 Cheese", "'Nduja"]), vec!["'Nduja", "4 Cheese", "Zeta"]);
    }

    #[test]
    fn ligatures_expand() {
        assert_eq!(compare("Straße", "Strasse"), Ordering::Greater);
        assert_eq!(compare("Straße", "Strast"), Ordering::Less);
    }

    #[test]
    fn decomposed_accents_sort_like_precomposed() {
        let precomposed = "\u{c9}z";
        let decomposed = "E\u{301}z";
        assert_eq!(compare(decomposed, "Ea"), Ordering::Greater);
        assert_eq!(compare(precomposed, "Ea"), Ordering::Greater);
        assert_eq!(sorted(&["Ez", decomposed, "Ea", "Fa"]), vec!["Ea", "Ez", decomposed, "Fa"]);
        assert_eq!(sorted(&["Ez", precomposed, "Ea", "Fa"]), vec!["Ea", "Ez", precomposed, "Fa"]);

        let (a, b) = (sort_key(precomposed), sort_key(decomposed));
        assert_eq!((a.primary, a.secondary, a.tertiary), (b.primary, b.secondary, b.tertiary));
    }

    #[test]
    fn lone_combining_mark_still_sorts() {
        assert_eq!(sorted(&["a", "\u{301}"]), vec!["\u{301}", "a"]);
    }

    #[test]
    fn total_order_for_distinct_strings() {
        assert_ne!(compare("a", "\u{0061}\u{0301}"), Ordering::Equal);
        assert_eq!(compare("same", "same"), Ordering::Equal);
    }
}
