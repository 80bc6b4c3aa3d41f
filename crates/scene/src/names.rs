//! Entity name matching between data sources and geometry.
//!
//! Data sources and geometry rarely agree on naming ("Russian Federation" vs
//! "Russia"). Resolution follows a fixed policy:
//!
//! 1. exact match against the known geometry names,
//! 2. the alias table,
//! 3. suffix heuristics (`Republic` -> `Rep.`, `Islands` -> `Is.`),
//! 4. otherwise unmatched, which renders as "no data".
//!
//! Surrounding quotes and whitespace are stripped before any step.
//! [`NameMatcher::normalize`] is idempotent. Suffix rules rewrite every
//! occurrence and repeat until the name stops changing; rewriting only the
//! first occurrence would leave a second `Republic` for the next call.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// Data-source spelling -> geometry spelling, for the world country geometry.
const WORLD_COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("Egypt, Arab Rep.", "Egypt"),
    ("United States", "United States of America"),
    ("Russian Federation", "Russia"),
    ("Democratic Republic of the Congo", "Dem. Rep. Congo"),
    ("Congo, Dem. Rep.", "Dem. Rep. Congo"),
    ("Dominican Republic", "Dominican Rep."),
    ("Western Sahara", "W. Sahara"),
    ("Central African Republic", "Central African Rep."),
    ("South Sudan", "S. Sudan"),
    ("Lao People's Democratic Republic", "Lao PDR"),
    ("Lao PDR", "Lao PDR"),
    ("Czechia", "Czech Rep."),
    ("Bosnia and Herzegovina", "Bosnia and Herz."),
    ("Equatorial Guinea", "Eq. Guinea"),
    ("Korea, Rep.", "South Korea"),
    ("Korea, Dem. People's Rep.", "North Korea"),
    ("Republic of the Congo", "Congo"),
    ("Congo, Rep.", "Congo"),
    ("Brunei Darussalam", "Brunei"),
    ("Viet Nam", "Vietnam"),
    ("North Macedonia", "Macedonia"),
    ("Swaziland", "eSwatini"),
    ("Eswatini", "eSwatini"),
    ("West Bank and Gaza", "Palestine"),
    ("Slovak Republic", "Slovakia"),
    ("Turkiye", "Turkey"),
    ("Kyrgyz Republic", "Kyrgyzstan"),
    ("Myanmar (Burma)", "Myanmar"),
    ("Taiwan, China", "Taiwan"),
    ("Hong Kong SAR, China", "Hong Kong"),
    ("Iran, Islamic Rep.", "Iran"),
    ("Venezuela, RB", "Venezuela"),
    ("Yemen, Rep.", "Yemen"),
    ("Gambia, The", "Gambia"),
    ("Bahamas, The", "Bahamas"),
    ("Syrian Arab Republic", "Syria"),
];

const DEFAULT_SUFFIX_RULES: &[(&str, &str)] = &[("Republic", "Rep."), ("Islands", "Is.")];

/// Bidirectional alias map. Kept flat: a target is never itself a key, so a
/// single lookup always lands on the final geometry name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    forward: BTreeMap<String, String>,
    reverse: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn world_countries() -> Self {
        let mut table = Self::new();
        for (data, geometry) in WORLD_COUNTRY_ALIASES {
            table.insert(*data, *geometry);
        }
        table
    }

    /// Maps `data` to `geometry`. Identity pairs are ignored.
    pub fn insert(&mut self, data: impl Into<String>, geometry: impl Into<String>) {
        let data = clean(&data.into()).to_string();
        let geometry = clean(&geometry.into()).to_string();
        if data == geometry {
            return;
        }

        // Collapse chains in both directions.
        let geometry = self.forward.get(&geometry).cloned().unwrap_or(geometry);
        for target in self.forward.values_mut() {
            if *target == data {
                *target = geometry.clone();
            }
        }
        self.forward.insert(data.clone(), geometry.clone());

        self.reverse.clear();
        for (d, g) in &self.forward {
            self.reverse.entry(g.clone()).or_insert_with(|| d.clone());
        }
    }

    pub fn to_geometry(&self, data: &str) -> Option<&str> {
        self.forward.get(data).map(String::as_str)
    }

    /// First data spelling (in sorted order) that maps onto `geometry`.
    pub fn to_data(&self, geometry: &str) -> Option<&str> {
        self.reverse.get(geometry).map(String::as_str)
    }

    pub fn is_target(&self, name: &str) -> bool {
        self.reverse.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.forward.iter().map(|(d, g)| (d.as_str(), g.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "via", content = "name", rename_all = "snake_case")]
pub enum MatchOutcome {
    Exact(String),
    Alias(String),
    Heuristic(String),
    Unmatched(String),
}

impl MatchOutcome {
    pub fn name(&self) -> &str {
        match self {
            MatchOutcome::Exact(n)
            | MatchOutcome::Alias(n)
            | MatchOutcome::Heuristic(n)
            | MatchOutcome::Unmatched(n) => n,
        }
    }

    pub fn is_matched(&self) -> bool {
        !matches!(self, MatchOutcome::Unmatched(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct NameMatcher {
    known: BTreeSet<String>,
    aliases: AliasTable,
    suffix_rules: Vec<(String, String)>,
}

impl NameMatcher {
    /// `known` is the geometry name set. When it is empty every rewrite is
    /// accepted, since there is nothing to verify it against.
    pub fn new<S: Into<String>>(known: impl IntoIterator<Item = S>, aliases: AliasTable) -> Self {
        Self {
            known: known.into_iter().map(Into::into).collect(),
            aliases,
            suffix_rules: DEFAULT_SUFFIX_RULES
                .iter()
                .map(|(f, t)| (f.to_string(), t.to_string()))
                .collect(),
        }
    }

    pub fn with_suffix_rule(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let (from, to) = (from.into(), to.into());
        // A rule whose output contains its input would never reach a fixpoint.
        if !from.is_empty() && !to.contains(&from) {
            self.suffix_rules.push((from, to));
        }
        self
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn resolve(&self, raw: &str) -> MatchOutcome {
        let name = clean(raw);

        if self.known.contains(name) || self.aliases.is_target(name) {
            return MatchOutcome::Exact(name.to_string());
        }
        if let Some(target) = self.aliases.to_geometry(name) {
            return MatchOutcome::Alias(target.to_string());
        }

        let rewritten = self.apply_suffix_rules(name);
        if rewritten != name {
            if let Some(target) = self.aliases.to_geometry(&rewritten) {
                return MatchOutcome::Alias(target.to_string());
            }
            if self.known.is_empty() || self.known.contains(&rewritten) {
                return MatchOutcome::Heuristic(rewritten);
            }
        }

        MatchOutcome::Unmatched(name.to_string())
    }

    pub fn normalize(&self, raw: &str) -> String {
        self.resolve(raw).name().to_string()
    }

    fn apply_suffix_rules(&self, name: &str) -> String {
        let mut out = name.to_string();
        // Rules can feed each other; iterate to a fixpoint (bounded).
        for _ in 0..=self.suffix_rules.len() {
            let before = out.clone();
            for (from, to) in &self.suffix_rules {
                if out.contains(from.as_str()) {
                    out = out.replace(from.as_str(), to);
                }
            }
            if out == before {
                break;
            }
        }
        out
    }
}

fn clean(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim()
}
