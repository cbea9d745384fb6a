//! Filtered, ordered views over the library.

use super::parser::parse_query;
use super::rules::{accepts_all, sort_by_priority, RuleKind, SearchRule, TypeFilter};
use crate::core::model::{Item, ItemId, ItemKind};
use crate::error::QuerySyntaxError;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// A compiled query plus ordering and grouping options
#[derive(Debug, Clone, Default)]
pub struct Search {
    rules: Vec<SearchRule>,
    descending: bool,
    ungroup: bool,
}

impl Search {
    /// Build a search from rules; they are re-ordered by priority
    pub fn new(mut rules: Vec<SearchRule>, descending: bool, ungroup: bool) -> Self {
        sort_by_priority(&mut rules);
        Self {
            rules,
            descending,
            ungroup,
        }
    }

    /// Parse `query` and build a search from it
    pub fn parse(query: &str, descending: bool, ungroup: bool) -> Result<Self, QuerySyntaxError> {
        Ok(Self::new(parse_query(query)?, descending, ungroup))
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[SearchRule] {
        &self.rules
    }

    pub fn is_descending(&self) -> bool {
        self.descending
    }

    pub fn is_ungrouping(&self) -> bool {
        self.ungroup
    }

    /// Whether a single item passes every rule
    pub fn accepts(&self, item: &Item) -> bool {
        accepts_all(&self.rules, item)
    }

    /// A query that explicitly asks for groups keeps them as groups
    fn targets_groups(&self) -> bool {
        self.rules.iter().any(|rule| {
            !rule.is_inverted() && matches!(rule.kind(), RuleKind::Type(TypeFilter::Group))
        })
    }

    /// A query that explicitly asks for members of a group shows them
    fn targets_group_members(&self) -> bool {
        self.rules
            .iter()
            .any(|rule| !rule.is_inverted() && matches!(rule.kind(), RuleKind::InGroup(_)))
    }

    /// Rules left after dropping those that `exclude` selects
    fn rules_without(&self, exclude: impl Fn(&RuleKind) -> bool) -> Vec<SearchRule> {
        self.rules
            .iter()
            .filter(|rule| !exclude(rule.kind()))
            .cloned()
            .collect()
    }

    /// Evaluate the search over `items`.
    ///
    /// Without ungrouping, media inside a group are hidden behind the group
    /// (unless the query selects them with `in:`). With ungrouping, each
    /// accepted group is replaced by those of its elements that pass the
    /// media rules, unless the query asks for `type:group`. Results are
    /// unique and ordered by id.
    pub fn refresh(&self, items: &[Arc<Item>]) -> Vec<Arc<Item>> {
        let flatten = self.ungroup && !self.targets_groups();
        let show_members = self.ungroup || self.targets_group_members();
        let member_rules = self.rules_without(|kind| {
            matches!(kind, RuleKind::Title(_) | RuleKind::Type(TypeFilter::Group))
        });

        let mut seen: HashSet<ItemId> = HashSet::new();
        let mut results = Vec::new();

        for item in items {
            if !self.accepts(item) {
                continue;
            }

            match item.kind() {
                ItemKind::Group(group) if flatten => {
                    for element in group.elements() {
                        if accepts_all(&member_rules, &element) && seen.insert(element.id()) {
                            results.push(element);
                        }
                    }
                }
                ItemKind::Media(media) if media.is_in_group() && !show_members => {}
                _ => {
                    if seen.insert(item.id()) {
                        results.push(Arc::clone(item));
                    }
                }
            }
        }

        self.order(&mut results);
        debug!(
            rules = self.rules.len(),
            candidates = items.len(),
            results = results.len(),
            "search refreshed"
        );
        results
    }

    /// Evaluate the search over one group's elements, in group order.
    ///
    /// Rules about group membership or the group variant are meaningless
    /// inside a group and are dropped.
    pub fn refresh_group(&self, group: &Item) -> Vec<Arc<Item>> {
        let Some(group) = group.as_group() else {
            return Vec::new();
        };

        let rules = self.rules_without(|kind| {
            matches!(kind, RuleKind::InGroup(_) | RuleKind::Type(TypeFilter::Group))
        });

        let mut results: Vec<Arc<Item>> = group
            .elements()
            .into_iter()
            .filter(|element| accepts_all(&rules, element))
            .collect();

        if self.descending {
            results.reverse();
        }
        results
    }

    fn order(&self, results: &mut [Arc<Item>]) {
        if self.descending {
            results.sort_by_key(|item| std::cmp::Reverse(item.id()));
        } else {
            results.sort_by_key(|item| item.id());
        }
    }
}
