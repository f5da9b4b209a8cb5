//! Ordered extraction rule tables.
//!
//! Each table is a list of `(pattern, target, priority)` rows evaluated in
//! priority order, so every rule can be exercised on its own in tests.

use anyhow::{Context, Result};
use regex::{Match, Regex};

use crate::models::EntryKind;

use super::confusables::repair_numeric_tokens;

/// A number as OCR renders it: digits, lookalikes and grouping noise.
/// Case-sensitive even inside `(?i)` patterns, so `d`, `s` or `z` in
/// ordinary words never read as digits.
const NUM: &str = r"(?-i:[0-9OoDIl|SZB][0-9OoDIl|SZB,.' ]*[0-9OoDIl|SZB]|[0-9])";

/// Like `NUM` but a single token: a keyword-less price must not run back
/// across whitespace into the `xN` multiplier.
const BARE_NUM: &str = r"(?-i:[0-9OoDIl|SZB][0-9OoDIl|SZB,.']*[0-9OoDIl|SZB]|[0-9])";

/// Garbled keyword spellings, repaired before anything else runs.
const KEYWORD_REPAIRS: &[(&str, &str)] = &[
    (r"(?i)\btrans[a@]ct[i1l|][o0]n\b", "Transaction"),
    (r"(?i)\bs[i1l|][l1|I]ver\b", "Silver"),
    (r"(?i)\bw[o0]rth\b", "worth"),
    (r"(?i)\bpurch[a@]s[e3]d\b", "Purchased"),
    (r"(?i)\bw[i1l|]thdr[e3]w\b", "Withdrew"),
    (r"(?i)\bl[i1l|]st[e3]d\b", "Listed"),
    (r"(?i)\bpl[a@]c[e3]d\b", "Placed"),
    (r"(?i)\bs[o0][l1|I]d\b", "Sold"),
    (r"×", "x"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRegion {
    /// The item name follows the anchor phrase.
    AfterAnchor,
    /// The anchor phrase was lost; the item name starts the snippet.
    SnippetStart,
    /// The rule never yields an item.
    None,
}

#[derive(Debug, Clone)]
pub struct AnchorRule {
    pub name: &'static str,
    pub kind: EntryKind,
    pub priority: u8,
    pub item_region: ItemRegion,
    pub sold_marker: bool,
    pub pattern: Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceRuleName {
    Worth,
    For,
    Bare,
}

#[derive(Debug, Clone)]
pub struct PriceRule {
    pub name: PriceRuleName,
    pub pattern: Regex,
}

#[derive(Debug, Clone)]
pub struct RuleSet {
    keyword_repairs: Vec<(Regex, &'static str)>,
    anchors: Vec<AnchorRule>,
    prices: Vec<PriceRule>,
    quantity: Regex,
    price_boundary: Regex,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("failed to compile rule pattern {pattern}"))
}

fn anchor(
    name: &'static str,
    kind: EntryKind,
    priority: u8,
    item_region: ItemRegion,
    pattern: &str,
) -> Result<AnchorRule> {
    Ok(AnchorRule {
        name,
        kind,
        priority,
        item_region,
        sold_marker: false,
        pattern: compile(pattern)?,
    })
}

impl RuleSet {
    pub fn new() -> Result<Self> {
        let keyword_repairs = KEYWORD_REPAIRS
            .iter()
            .map(|(pattern, replacement)| Ok((compile(pattern)?, *replacement)))
            .collect::<Result<Vec<_>>>()?;

        let mut sold = anchor(
            "sold",
            EntryKind::Transaction,
            1,
            ItemRegion::AfterAnchor,
            r"(?i)\bsold\s+",
        )?;
        sold.sold_marker = true;

        let mut anchors = vec![
            anchor(
                "transaction_of",
                EntryKind::Transaction,
                0,
                ItemRegion::AfterAnchor,
                r"(?i)\btransaction\s+of\s+",
            )?,
            sold,
            anchor(
                "purchased",
                EntryKind::Purchased,
                2,
                ItemRegion::AfterAnchor,
                r"(?i)\bpurchased\s+",
            )?,
            anchor(
                "placed_order",
                EntryKind::Placed,
                3,
                ItemRegion::AfterAnchor,
                r"(?i)\bplaced\s+(?:an\s+)?order\s+(?:of\s+|for\s+)?",
            )?,
            anchor(
                "withdrew",
                EntryKind::Withdrew,
                4,
                ItemRegion::AfterAnchor,
                r"(?i)\bwithdr[ae]wn?\s+(?:an\s+)?(?:order\s+)?(?:of\s+|for\s+)?",
            )?,
            anchor(
                "listed",
                EntryKind::Listed,
                5,
                ItemRegion::AfterAnchor,
                r"(?i)\b(?:listed|registered)\s+",
            )?,
            anchor(
                "worth_silver",
                EntryKind::Transaction,
                6,
                ItemRegion::SnippetStart,
                &format!(r"(?i)\bworth\s+(?:{NUM})\s*silver"),
            )?,
            anchor(
                "bare_multiplier_price",
                EntryKind::Transaction,
                7,
                ItemRegion::SnippetStart,
                r"(?i)[x×]\s*[0-9][0-9,]*\b.*?\b[0-9]{1,3}(?:[,.][0-9]{3})+",
            )?,
            anchor(
                "collect",
                EntryKind::Other,
                8,
                ItemRegion::None,
                r"(?i)\bcollect",
            )?,
        ];
        anchors.sort_by_key(|rule| rule.priority);

        let prices = vec![
            PriceRule {
                name: PriceRuleName::Worth,
                pattern: compile(&format!(r"(?i)\bworth\s+({NUM})\s*silver"))?,
            },
            PriceRule {
                name: PriceRuleName::For,
                pattern: compile(&format!(r"(?i)\bfor\s+({NUM})\s*silver"))?,
            },
            PriceRule {
                name: PriceRuleName::Bare,
                pattern: compile(&format!(r"(?i)(?:^|\s)({BARE_NUM})\s*silver"))?,
            },
        ];

        Ok(Self {
            keyword_repairs,
            anchors,
            prices,
            quantity: compile(r"[xX×]\s*([0-9OoDIl|SZB][0-9OoDIl|SZB,.]*)")?,
            price_boundary: compile(r"(?i)\b(?:worth|for)\b|\bsilver\b")?,
        })
    }

    /// Keyword repair followed by numeric-token repair.
    pub fn repair(&self, text: &str) -> String {
        let mut repaired = text.to_string();
        for (pattern, replacement) in &self.keyword_repairs {
            if pattern.is_match(&repaired) {
                repaired = pattern.replace_all(&repaired, *replacement).into_owned();
            }
        }
        repair_numeric_tokens(&repaired)
    }

    /// First matching anchor rule in priority order.
    pub fn classify<'t>(&self, text: &'t str) -> Option<(&AnchorRule, Match<'t>)> {
        self.anchors
            .iter()
            .find_map(|rule| rule.pattern.find(text).map(|m| (rule, m)))
    }

    /// Price rules in preference order for `kind`: confirmed transactions
    /// report `worth`, everything else reports `for`.
    pub fn price_rules_for(&self, kind: EntryKind) -> Vec<&PriceRule> {
        let order: [PriceRuleName; 3] = match kind {
            EntryKind::Transaction => [PriceRuleName::Worth, PriceRuleName::For, PriceRuleName::Bare],
            EntryKind::Purchased
            | EntryKind::Placed
            | EntryKind::Listed
            | EntryKind::Withdrew
            | EntryKind::Other => [PriceRuleName::For, PriceRuleName::Worth, PriceRuleName::Bare],
        };
        order
            .iter()
            .filter_map(|name| self.prices.iter().find(|rule| rule.name == *name))
            .collect()
    }

    pub fn quantity_pattern(&self) -> &Regex {
        &self.quantity
    }

    /// Start of the first `worth` / `for` / currency keyword at or after `from`.
    pub fn price_boundary(&self, text: &str, from: usize) -> Option<usize> {
        self.price_boundary
            .find_at(text, from)
            .map(|m| m.start())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_name(rules: &RuleSet, text: &str) -> Option<&'static str> {
        rules.classify(text).map(|(rule, _)| rule.name)
    }

    #[test]
    fn transaction_of_beats_generic_worth() {
        let rules = RuleSet::new().unwrap();
        assert_eq!(
            rule_name(&rules, "Transaction of Magical Shard x200 worth 585,585,000 Silver"),
            Some("transaction_of")
        );
    }

    #[test]
    fn worth_fallback_catches_truncated_anchor() {
        let rules = RuleSet::new().unwrap();
        assert_eq!(
            rule_name(&rules, "ical Shard x200 worth 585,585,000 Silver has been completed"),
            Some("worth_silver")
        );
    }

    #[test]
    fn bare_multiplier_price_is_last_resort() {
        let rules = RuleSet::new().unwrap();
        assert_eq!(
            rule_name(&rules, "Magical Shard x200 585,585,000"),
            Some("bare_multiplier_price")
        );
        assert_eq!(rule_name(&rules, "nothing to see"), None);
    }

    #[test]
    fn each_kind_anchor_matches() {
        let rules = RuleSet::new().unwrap();
        assert_eq!(rule_name(&rules, "Purchased Black Stone x10 for 1,000 Silver"), Some("purchased"));
        assert_eq!(rule_name(&rules, "Placed an order of Black Stone x10 for 1,000 Silver"), Some("placed_order"));
        assert_eq!(rule_name(&rules, "Withdrew order of Black Stone x10 for 1,000 Silver"), Some("withdrew"));
        assert_eq!(rule_name(&rules, "Listed Black Stone x10 for 1,000 Silver"), Some("listed"));
        assert_eq!(rule_name(&rules, "Sold Black Stone x10 for 1,000 Silver"), Some("sold"));
        assert_eq!(rule_name(&rules, "Collect all"), Some("collect"));
    }

    #[test]
    fn repairs_garbled_keywords() {
        let rules = RuleSet::new().unwrap();
        let repaired = rules.repair("Transacti0n of Magical Shard ×2OO w0rth 585,585,OOO Si1ver");
        assert_eq!(repaired, "Transaction of Magical Shard x200 worth 585,585,000 Silver");
    }

    #[test]
    fn price_preference_depends_on_kind() {
        let rules = RuleSet::new().unwrap();
        let names: Vec<_> = rules
            .price_rules_for(EntryKind::Transaction)
            .iter()
            .map(|rule| rule.name)
            .collect();
        assert_eq!(names[0], PriceRuleName::Worth);
        let names: Vec<_> = rules
            .price_rules_for(EntryKind::Listed)
            .iter()
            .map(|rule| rule.name)
            .collect();
        assert_eq!(names[0], PriceRuleName::For);
    }
}
