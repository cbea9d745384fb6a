//! # Search Module
//!
//! Query-driven, ordered views over the library.
//!
//! ## Query Syntax
//! | Token            | Meaning                                      |
//! |------------------|----------------------------------------------|
//! | `cat`            | has tag `cat`                                |
//! | `-cat`           | does not have tag `cat`                      |
//! | `id:12` `id:<12` | identifier equal to / below / above (`>`)    |
//! | `date:>N`        | added after epoch millis N                   |
//! | `tags:2`         | number of tags                               |
//! | `type:video`     | `group`, `media`, `image` or `video`         |
//! | `title:"a b"`    | group title contains every word              |
//! | `path:beach`     | media path contains text                     |
//! | `in:10`          | media belongs to group 10                    |
//! | `missing:md5`    | `md5`, `file` or `histogram` is absent       |
//! | `md5:abc…`       | exact content hash                           |
//!
//! Keys and tag names are case-insensitive. All rules must pass.

mod engine;
mod parser;
mod rules;

pub use engine::Search;
pub use parser::parse_query;
pub use rules::{accepts_all, Comparison, MissingField, RuleKind, SearchRule, TypeFilter};
