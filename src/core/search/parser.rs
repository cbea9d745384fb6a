//! Query text → rules.
//!
//! Tokens are whitespace-separated; double quotes group whitespace into one
//! token. A leading `-` inverts a token. `key:value` tokens select a typed
//! rule, bare tokens are tag names.

use super::rules::{Comparison, MissingField, RuleKind, SearchRule, TypeFilter};
use crate::core::model::{ItemId, Tag};
use crate::error::QuerySyntaxError;
use std::str::FromStr;

#[derive(Debug, Default)]
struct Token {
    /// Token as written, quotes included
    raw: String,
    /// Character offset of the token's first character
    offset: usize,
    /// Token text with quotes and the negation prefix removed
    text: String,
    /// Byte index into `text` of the first unquoted `:`
    colon: Option<usize>,
    negated: bool,
}

fn tokenize(query: &str) -> Result<Vec<Token>, QuerySyntaxError> {
    let mut tokens = Vec::new();
    let mut current: Option<Token> = None;
    let mut in_quote = false;

    for (offset, c) in query.chars().enumerate() {
        if in_quote {
            // Only reachable with an open token
            if let Some(token) = current.as_mut() {
                token.raw.push(c);
                if c == '"' {
                    in_quote = false;
                } else {
                    token.text.push(c);
                }
            }
            continue;
        }

        if c.is_whitespace() {
            tokens.extend(current.take());
            continue;
        }

        let token = current.get_or_insert_with(|| Token {
            offset,
            ..Token::default()
        });
        token.raw.push(c);

        match c {
            '"' => in_quote = true,
            '-' if token.raw.len() == 1 => token.negated = true,
            ':' if token.colon.is_none() => {
                token.colon = Some(token.text.len());
                token.text.push(c);
            }
            _ => token.text.push(c),
        }
    }

    if in_quote {
        if let Some(token) = current {
            return Err(QuerySyntaxError::new(
                token.raw,
                token.offset,
                "unterminated quote",
            ));
        }
    }
    tokens.extend(current);

    Ok(tokens)
}

/// Parse a query into rules, in the order they were written.
///
/// An empty or all-whitespace query yields no rules (accepts everything).
/// Any malformed token rejects the whole query.
pub fn parse_query(query: &str) -> Result<Vec<SearchRule>, QuerySyntaxError> {
    tokenize(query)?.iter().map(parse_token).collect()
}

fn parse_token(token: &Token) -> Result<SearchRule, QuerySyntaxError> {
    let error = |reason: &str| QuerySyntaxError::new(token.raw.clone(), token.offset, reason);

    let kind = match token.colon {
        None => {
            if token.text.is_empty() {
                return Err(error("expected a tag name"));
            }
            let name = Tag::normalize_name(&token.text)
                .map_err(|_| error("tag names cannot contain whitespace"))?;
            RuleKind::Tag(name)
        }
        Some(colon) => {
            let key = token.text[..colon].to_lowercase();
            let value = &token.text[colon + 1..];
            if value.is_empty() {
                return Err(error("missing value"));
            }
            parse_keyed(&key, value).map_err(error)?
        }
    };

    let rule = SearchRule::new(kind);
    Ok(if token.negated { rule.invert() } else { rule })
}

fn parse_keyed(key: &str, value: &str) -> Result<RuleKind, &'static str> {
    let kind = match key {
        "id" => {
            let (comparison, value) = parse_comparison(value)?;
            RuleKind::Id { comparison, value }
        }
        "tags" => {
            let (comparison, value) = parse_comparison(value)?;
            RuleKind::TagCount { comparison, value }
        }
        "date" | "time" | "added" => {
            let (comparison, value) = parse_comparison(value)?;
            RuleKind::DateAdded { comparison, value }
        }
        "in" => {
            let id = value.parse().map_err(|_| "expected a group id")?;
            RuleKind::InGroup(ItemId(id))
        }
        "type" | "is" => RuleKind::Type(match value.to_lowercase().as_str() {
            "group" => TypeFilter::Group,
            "media" => TypeFilter::Media,
            "image" => TypeFilter::Image,
            "video" => TypeFilter::Video,
            _ => return Err("expected group, media, image or video"),
        }),
        "missing" => RuleKind::Missing(match value.to_lowercase().as_str() {
            "md5" => MissingField::Md5,
            "file" => MissingField::File,
            "histogram" | "hist" => MissingField::Histogram,
            _ => return Err("expected md5, file or histogram"),
        }),
        "title" => {
            let words: Vec<String> = value.split_whitespace().map(str::to_lowercase).collect();
            if words.is_empty() {
                return Err("missing value");
            }
            RuleKind::Title(words)
        }
        "path" | "file" => {
            let text = value.trim();
            if text.is_empty() {
                return Err("missing value");
            }
            RuleKind::Path(text.to_lowercase())
        }
        "md5" => {
            if !value.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err("expected a hexadecimal hash");
            }
            RuleKind::Md5(value.to_ascii_lowercase())
        }
        _ => return Err("unknown key"),
    };
    Ok(kind)
}

/// `N`, `<N` or `>N`
fn parse_comparison<T: FromStr>(value: &str) -> Result<(Comparison, T), &'static str> {
    let (comparison, digits) = if let Some(rest) = value.strip_prefix('<') {
        (Comparison::LessThan, rest)
    } else if let Some(rest) = value.strip_prefix('>') {
        (Comparison::GreaterThan, rest)
    } else {
        (Comparison::EqualTo, value)
    };

    let number = digits.parse().map_err(|_| "expected a number")?;
    Ok((comparison, number))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(query: &str) -> SearchRule {
        let mut rules = parse_query(query).unwrap();
        assert_eq!(rules.len(), 1, "expected one rule from {query:?}");
        rules.remove(0)
    }

    #[test]
    fn id_comparisons() {
        for (query, comparison) in [
            ("id:123", Comparison::EqualTo),
            ("id:<123", Comparison::LessThan),
            ("id:>123", Comparison::GreaterThan),
        ] {
            assert_eq!(
                single(query).kind(),
                &RuleKind::Id {
                    comparison,
                    value: 123
                }
            );
        }
    }

    #[test]
    fn bare_token_is_tag() {
        let rule = single("Cat");
        assert_eq!(rule.kind(), &RuleKind::Tag("cat".into()));
        assert!(!rule.is_inverted());
    }

    #[test]
    fn leading_dash_inverts() {
        let rule = single("-cat");
        assert_eq!(rule.kind(), &RuleKind::Tag("cat".into()));
        assert!(rule.is_inverted());

        let rule = single("-type:video");
        assert_eq!(rule.kind(), &RuleKind::Type(TypeFilter::Video));
        assert!(rule.is_inverted());
    }

    #[test]
    fn keys_are_case_insensitive() {
        assert_eq!(single("TYPE:Group").kind(), &RuleKind::Type(TypeFilter::Group));
    }

    #[test]
    fn quoted_values_keep_whitespace() {
        assert_eq!(
            single("title:\"Summer  Holiday\"").kind(),
            &RuleKind::Title(vec!["summer".into(), "holiday".into()])
        );
        assert_eq!(
            single("path:\"My Photos/2020\"").kind(),
            &RuleKind::Path("my photos/2020".into())
        );
    }

    #[test]
    fn multiple_rules_keep_query_order() {
        let rules = parse_query("  type:video   id:>2 cat ").unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].kind(), &RuleKind::Type(TypeFilter::Video));
        assert_eq!(rules[2].kind(), &RuleKind::Tag("cat".into()));
    }

    #[test]
    fn empty_query_has_no_rules() {
        assert!(parse_query("").unwrap().is_empty());
        assert!(parse_query("   \t ").unwrap().is_empty());
    }

    #[test]
    fn other_keys() {
        assert_eq!(single("in:7").kind(), &RuleKind::InGroup(ItemId(7)));
        assert_eq!(
            single("missing:md5").kind(),
            &RuleKind::Missing(MissingField::Md5)
        );
        assert_eq!(
            single("md5:ABCDEF0123").kind(),
            &RuleKind::Md5("abcdef0123".into())
        );
        assert_eq!(
            single("tags:>2").kind(),
            &RuleKind::TagCount {
                comparison: Comparison::GreaterThan,
                value: 2
            }
        );
        assert_eq!(
            single("date:<1700000000000").kind(),
            &RuleKind::DateAdded {
                comparison: Comparison::LessThan,
                value: 1_700_000_000_000
            }
        );
    }

    #[test]
    fn malformed_number_reports_token_and_offset() {
        let err = parse_query("cat id:abc").unwrap_err();
        assert_eq!(err.token, "id:abc");
        assert_eq!(err.offset, 4);
        assert_eq!(err.reason, "expected a number");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = parse_query("colour:red").unwrap_err();
        assert_eq!(err.reason, "unknown key");
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn unterminated_quote_is_rejected() {
        let err = parse_query("dog title:\"abc").unwrap_err();
        assert_eq!(err.reason, "unterminated quote");
        assert_eq!(err.offset, 4);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(parse_query("type:sound").is_err());
        assert!(parse_query("missing:tags").is_err());
        assert!(parse_query("in:<3").is_err());
        assert!(parse_query("md5:xyz").is_err());
        assert!(parse_query("id:").is_err());
        assert!(parse_query("-").is_err());
        assert!(parse_query("\"two words\"").is_err());
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let err = parse_query("日本 id:x").unwrap_err();
        assert_eq!(err.offset, 3);
    }
}
