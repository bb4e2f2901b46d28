use std::collections::BTreeSet;

/// Canonical drug names offered for selection.
const DEFAULT_DRUGS: &[&str] = &[
    "abatacept",
    "abrocitinib",
    "adalimumab",
    "alemtuzumab",
    "anakinra",
    "apremilast",
    "baricitinib",
    "benralizumab",
    "brodalumab",
    "canakinumab",
    "certolizumab pegol",
    "deucravacitinib",
    "deuruxolitinib",
    "dupilumab",
    "etanercept",
    "etrasimod",
    "golimumab",
    "guselkumab",
    "infliximab",
    "ixekizumab",
    "mepolizumab",
    "mirikizumab-mrkz",
    "natalizumab",
    "ocrelizumab",
    "ofatumumab",
    "omalizumab",
    "ozanimod",
    "reslizumab",
    "risankizumab",
    "rituximab",
    "roflumilast",
    "ruxolitinib",
    "sarilumab",
    "secukinumab",
    "spesolimab-sbzo",
    "tezepelumab ekko",
    "tildrakizumab-asmn",
    "tocilizumab",
    "tocilizumab bavi",
    "tocilizumab aazg",
    "tofacitinib",
    "tralokinumab",
    "upadacitinib",
    "ustekinumab",
    "vedolizumab",
];

/// Lookup table of canonical drug names.
///
/// Biosimilar variants such as `tocilizumab bavi` are kept as their own keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrugReferenceTable {
    names: BTreeSet<String>,
}

impl Default for DrugReferenceTable {
    fn default() -> Self {
        Self::new(DEFAULT_DRUGS.iter().copied())
    }
}

impl DrugReferenceTable {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        Self { names }
    }

    /// Names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Maps user input onto the canonical spelling, ignoring case and
    /// surrounding whitespace.
    pub fn resolve(&self, input: &str) -> Option<&str> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        self.names
            .iter()
            .find(|name| name.eq_ignore_ascii_case(input))
            .map(String::as_str)
    }

    /// Canonical names sharing the input's first word, for "did you mean" hints.
    pub fn suggestions(&self, input: &str) -> Vec<&str> {
        let Some(stem) = input
            .trim()
            .split(|c: char| c.is_whitespace() || c == '-')
            .next()
            .filter(|s| s.len() >= 3)
        else {
            return Vec::new();
        };
        let stem = stem.to_ascii_lowercase();
        self.names
            .iter()
            .filter(|name| name.to_ascii_lowercase().starts_with(&stem))
            .map(String::as_str)
            .collect()
    }
}
