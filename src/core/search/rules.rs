//! Typed predicates over items.

use crate::core::model::{Item, ItemId, ItemKind, MediaType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a numeric rule compares an item's value to the rule's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    EqualTo,
    LessThan,
    GreaterThan,
}

impl Comparison {
    /// Compare `actual` (from the item) against `expected` (from the query)
    pub fn test<T: Ord>(&self, actual: T, expected: T) -> bool {
        match self {
            Comparison::EqualTo => actual == expected,
            Comparison::LessThan => actual < expected,
            Comparison::GreaterThan => actual > expected,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            Comparison::EqualTo => "",
            Comparison::LessThan => "<",
            Comparison::GreaterThan => ">",
        }
    }
}

/// Values accepted by `type:`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeFilter {
    Group,
    Media,
    Image,
    Video,
}

impl TypeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeFilter::Group => "group",
            TypeFilter::Media => "media",
            TypeFilter::Image => "image",
            TypeFilter::Video => "video",
        }
    }
}

/// Values accepted by `missing:`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingField {
    Md5,
    File,
    Histogram,
}

impl MissingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingField::Md5 => "md5",
            MissingField::File => "file",
            MissingField::Histogram => "histogram",
        }
    }
}

/// The predicate a rule applies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleKind {
    /// Item holds a tag with this (lowercase) name
    Tag(String),
    /// Number of tags on the item
    TagCount { comparison: Comparison, value: u64 },
    /// Item identifier
    Id { comparison: Comparison, value: u64 },
    /// Creation time in epoch millis
    DateAdded { comparison: Comparison, value: i64 },
    /// Item variant / media type
    Type(TypeFilter),
    /// Group title contains every (lowercase) word
    Title(Vec<String>),
    /// Media file path contains this (lowercase) text
    Path(String),
    /// Media item belongs to this group
    InGroup(ItemId),
    /// Media item lacks this field
    Missing(MissingField),
    /// Media item has exactly this (lowercase) MD5
    Md5(String),
}

impl RuleKind {
    /// Evaluation order; cheap, selective checks come first
    pub fn priority(&self) -> u32 {
        match self {
            RuleKind::Id { .. } => 0,
            RuleKind::Md5(_) => 10,
            RuleKind::Type(_) => 20,
            RuleKind::InGroup(_) => 30,
            RuleKind::Missing(_) => 40,
            RuleKind::DateAdded { .. } => 50,
            RuleKind::Tag(_) => 60,
            RuleKind::TagCount { .. } => 70,
            RuleKind::Title(_) => 80,
            RuleKind::Path(_) => 90,
        }
    }
}

/// A single, possibly inverted, predicate parsed from a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRule {
    kind: RuleKind,
    inverted: bool,
}

impl SearchRule {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            inverted: false,
        }
    }

    /// Flip the rule so it accepts exactly what it used to reject
    pub fn invert(mut self) -> Self {
        self.inverted = !self.inverted;
        self
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub fn priority(&self) -> u32 {
        self.kind.priority()
    }

    /// Evaluate the rule, honoring inversion
    pub fn accepts(&self, item: &Item) -> bool {
        self.matches(item) != self.inverted
    }

    fn matches(&self, item: &Item) -> bool {
        match &self.kind {
            RuleKind::Tag(name) => item.has_tag_named(name),
            RuleKind::TagCount { comparison, value } => {
                comparison.test(item.tag_count() as u64, *value)
            }
            RuleKind::Id { comparison, value } => comparison.test(item.id().0, *value),
            RuleKind::DateAdded { comparison, value } => comparison.test(item.added(), *value),
            RuleKind::Type(filter) => match (filter, item.kind()) {
                (TypeFilter::Group, ItemKind::Group(_)) => true,
                (TypeFilter::Media, ItemKind::Media(_)) => true,
                (TypeFilter::Image, ItemKind::Media(media)) => {
                    media.media_type() == MediaType::Image
                }
                (TypeFilter::Video, ItemKind::Media(media)) => {
                    media.media_type() == MediaType::Video
                }
                _ => false,
            },
            RuleKind::Title(words) => item.as_group().is_some_and(|group| {
                let title = group.title().to_lowercase();
                words.iter().all(|word| title.contains(word.as_str()))
            }),
            RuleKind::Path(text) => item.as_media().is_some_and(|media| {
                media
                    .file()
                    .to_string_lossy()
                    .to_lowercase()
                    .contains(text.as_str())
            }),
            RuleKind::InGroup(group) => item
                .as_media()
                .and_then(|media| media.membership())
                .is_some_and(|membership| membership.group == *group),
            RuleKind::Missing(field) => item.as_media().is_some_and(|media| match field {
                MissingField::Md5 => media.md5().is_none(),
                MissingField::File => !media.file().exists(),
                MissingField::Histogram => !media.has_histogram(),
            }),
            RuleKind::Md5(hash) => item
                .as_media()
                .and_then(|media| media.md5())
                .is_some_and(|md5| md5 == *hash),
        }
    }
}

impl fmt::Display for SearchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverted {
            write!(f, "-")?;
        }
        match &self.kind {
            RuleKind::Tag(name) => write!(f, "{name}"),
            RuleKind::TagCount { comparison, value } => {
                write!(f, "tags:{}{value}", comparison.prefix())
            }
            RuleKind::Id { comparison, value } => write!(f, "id:{}{value}", comparison.prefix()),
            RuleKind::DateAdded { comparison, value } => {
                write!(f, "date:{}{value}", comparison.prefix())
            }
            RuleKind::Type(filter) => write!(f, "type:{}", filter.as_str()),
            RuleKind::Title(words) => write!(f, "title:\"{}\"", words.join(" ")),
            RuleKind::Path(text) if text.chars().any(char::is_whitespace) => {
                write!(f, "path:\"{text}\"")
            }
            RuleKind::Path(text) => write!(f, "path:{text}"),
            RuleKind::InGroup(group) => write!(f, "in:{}", group.0),
            RuleKind::Missing(field) => write!(f, "missing:{}", field.as_str()),
            RuleKind::Md5(hash) => write!(f, "md5:{hash}"),
        }
    }
}

/// AND across every rule, in priority order
///
/// Sorting only changes how early evaluation short-circuits, never the result.
pub fn accepts_all(rules: &[SearchRule], item: &Item) -> bool {
    rules.iter().all(|rule| rule.accepts(item))
}

/// Sort rules so the cheapest, most selective ones run first
pub fn sort_by_priority(rules: &mut [SearchRule]) {
    rules.sort_by_key(SearchRule::priority);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Tag, TagId};
    use std::sync::Arc;

    fn tagged(id: u64, count: usize) -> Item {
        let item = Item::media(ItemId(id), format!("/photos/{id}.jpg"));
        for i in 0..count {
            item.add_tag(&Arc::new(Tag::new(TagId(i as u64), &format!("t{i}")).unwrap()));
        }
        item
    }

    fn tag_count(comparison: Comparison, value: u64) -> SearchRule {
        SearchRule::new(RuleKind::TagCount { comparison, value })
    }

    #[test]
    fn tag_count_equal_to() {
        let rule = tag_count(Comparison::EqualTo, 2);
        assert!(rule.accepts(&tagged(1, 2)));
        assert!(!rule.accepts(&tagged(2, 0)));
        assert!(!rule.accepts(&tagged(3, 3)));
        assert!(!rule.accepts(&tagged(4, 4)));
    }

    #[test]
    fn tag_count_less_and_greater() {
        assert!(tag_count(Comparison::LessThan, 2).accepts(&tagged(1, 1)));
        assert!(!tag_count(Comparison::LessThan, 2).accepts(&tagged(1, 2)));
        assert!(tag_count(Comparison::GreaterThan, 2).accepts(&tagged(1, 3)));
    }

    #[test]
    fn inverted_tag_rule() {
        let cat = Arc::new(Tag::new(TagId(1), "cat").unwrap());
        let dog = Arc::new(Tag::new(TagId(2), "dog").unwrap());
        let both = Item::media(ItemId(1), "/a.png");
        both.add_tag(&cat);
        both.add_tag(&dog);
        let only_dog = Item::media(ItemId(2), "/b.png");
        only_dog.add_tag(&dog);

        let rule = SearchRule::new(RuleKind::Tag("cat".into())).invert();
        assert!(!rule.accepts(&both));
        assert!(rule.accepts(&only_dog));
    }

    #[test]
    fn type_rules_dispatch_on_variant_and_extension() {
        let image = Item::media(ItemId(1), "/a.PNG");
        let video = Item::media(ItemId(2), "/b.mp4");
        let group = Item::group(ItemId(3), "set");

        let rule = |filter| SearchRule::new(RuleKind::Type(filter));
        assert!(rule(TypeFilter::Image).accepts(&image));
        assert!(!rule(TypeFilter::Image).accepts(&video));
        assert!(rule(TypeFilter::Video).accepts(&video));
        assert!(rule(TypeFilter::Media).accepts(&video));
        assert!(rule(TypeFilter::Group).accepts(&group));
        assert!(!rule(TypeFilter::Media).accepts(&group));
    }

    #[test]
    fn title_requires_every_word() {
        let group = Item::group(ItemId(1), "Summer Holiday in Spain");
        let rule = |words: &[&str]| {
            SearchRule::new(RuleKind::Title(words.iter().map(|w| w.to_string()).collect()))
        };
        assert!(rule(&["spain", "summer"]).accepts(&group));
        assert!(!rule(&["spain", "winter"]).accepts(&group));
        assert!(!rule(&["spain"]).accepts(&Item::media(ItemId(2), "/spain.jpg")));
    }

    #[test]
    fn path_is_case_insensitive() {
        let item = Item::media(ItemId(1), "/Photos/Beach/IMG_01.jpg");
        assert!(SearchRule::new(RuleKind::Path("beach/img".into())).accepts(&item));
        assert!(!SearchRule::new(RuleKind::Path("forest".into())).accepts(&item));
    }

    #[test]
    fn missing_rules_only_match_media() {
        let item = Item::media(ItemId(1), "/nonexistent/file.jpg");
        let group = Item::group(ItemId(2), "g");
        let missing = |field| SearchRule::new(RuleKind::Missing(field));

        assert!(missing(MissingField::Md5).accepts(&item));
        assert!(missing(MissingField::Histogram).accepts(&item));
        assert!(missing(MissingField::File).accepts(&item));
        assert!(!missing(MissingField::Md5).accepts(&group));

        item.as_media().unwrap().set_md5(Some("abc".into()));
        assert!(!missing(MissingField::Md5).accepts(&item));
    }

    #[test]
    fn md5_rule_matches_exactly() {
        let item = Item::media(ItemId(1), "/a.jpg");
        item.as_media().unwrap().set_md5(Some("0123abcd".into()));
        assert!(SearchRule::new(RuleKind::Md5("0123abcd".into())).accepts(&item));
        assert!(!SearchRule::new(RuleKind::Md5("0123abc".into())).accepts(&item));
    }

    #[test]
    fn in_group_rule() {
        let group = Item::group(ItemId(10), "g");
        let member = Arc::new(Item::media(ItemId(1), "/a.jpg"));
        let outsider = Item::media(ItemId(2), "/b.jpg");
        group.add_element(&member);

        let rule = SearchRule::new(RuleKind::InGroup(ItemId(10)));
        assert!(rule.accepts(&member));
        assert!(!rule.accepts(&outsider));
    }

    #[test]
    fn priority_sort_puts_id_first() {
        let mut rules = vec![
            SearchRule::new(RuleKind::Path("x".into())),
            SearchRule::new(RuleKind::Tag("cat".into())),
            SearchRule::new(RuleKind::Id {
                comparison: Comparison::EqualTo,
                value: 1,
            }),
        ];
        sort_by_priority(&mut rules);
        assert!(matches!(rules[0].kind(), RuleKind::Id { .. }));
        assert!(matches!(rules[2].kind(), RuleKind::Path(_)));
    }

    #[test]
    fn display_round_trips_query_syntax() {
        let rule = SearchRule::new(RuleKind::Id {
            comparison: Comparison::LessThan,
            value: 5,
        })
        .invert();
        assert_eq!(rule.to_string(), "-id:<5");
        assert_eq!(
            SearchRule::new(RuleKind::Title(vec!["a".into(), "b".into()])).to_string(),
            "title:\"a b\""
        );
    }
}
