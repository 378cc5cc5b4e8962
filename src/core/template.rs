/// Random text templates: parsing, weighted token expansion, and linting.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::random::{RandomError, RandomSource};

/// Nesting depth used when the caller does not pick one.
pub const DEFAULT_MAX_DEPTH: usize = 10;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template parse error: {0}")]
    Parse(String),
    #[error("template not found: {0}")]
    NotFound(String),
    #[error("token {token}: {source}")]
    Random {
        token: String,
        #[source]
        source: RandomError,
    },
}

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, emitted as-is.
    Literal(String),
    /// A `{token}` marker.
    Token(String),
}

/// A parsed template: a sequence of segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    /// Parse template text.
    ///
    /// Syntax:
    /// - `{name}` → `Token`
    /// - `{{` / `}}` → literal `{` / `}`
    /// - Everything else → `Literal`
    pub fn parse(input: &str) -> Result<Template, TemplateError> {
        let mut segments = Vec::new();
        let mut literal_buf = String::new();
        let chars: Vec<char> = input.chars().collect();
        let len = chars.len();
        let mut i = 0;

        while i < len {
            match chars[i] {
                '{' if i + 1 < len && chars[i + 1] == '{' => {
                    literal_buf.push('{');
                    i += 2;
                }
                '{' => {
                    if !literal_buf.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal_buf)));
                    }

                    let start = i + 1;
                    let mut end = start;
                    while end < len && chars[end] != '}' {
                        if chars[end] == '{' {
                            return Err(TemplateError::Parse(
                                "nested braces are not allowed".to_string(),
                            ));
                        }
                        end += 1;
                    }
                    if end == len {
                        return Err(TemplateError::Parse("unclosed brace".to_string()));
                    }

                    let name: String = chars[start..end].iter().collect();
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(TemplateError::Parse("empty braces".to_string()));
                    }
                    segments.push(Segment::Token(name.to_string()));
                    i = end + 1;
                }
                '}' if i + 1 < len && chars[i + 1] == '}' => {
                    literal_buf.push('}');
                    i += 2;
                }
                '}' => {
                    return Err(TemplateError::Parse(
                        "unmatched closing brace".to_string(),
                    ));
                }
                c => {
                    literal_buf.push(c);
                    i += 1;
                }
            }
        }

        if !literal_buf.is_empty() {
            segments.push(Segment::Literal(literal_buf));
        }

        Ok(Template { segments })
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Token(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

/// A weighted replacement for a token. May contain further tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawCandidate", into = "RawCandidate")]
pub struct Candidate {
    pub text: String,
    pub weight: u32,
}

impl Candidate {
    pub fn new(text: impl Into<String>, weight: u32) -> Self {
        Self {
            text: text.into(),
            weight,
        }
    }
}

/// Settings documents write unweighted candidates as bare strings.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawCandidate {
    Text(String),
    Weighted { text: String, weight: u32 },
}

impl From<RawCandidate> for Candidate {
    fn from(raw: RawCandidate) -> Self {
        match raw {
            RawCandidate::Text(text) => Candidate { text, weight: 1 },
            RawCandidate::Weighted { text, weight } => Candidate { text, weight },
        }
    }
}

impl From<Candidate> for RawCandidate {
    fn from(candidate: Candidate) -> Self {
        if candidate.weight == 1 {
            RawCandidate::Text(candidate.text)
        } else {
            RawCandidate::Weighted {
                text: candidate.text,
                weight: candidate.weight,
            }
        }
    }
}

/// A named random generator: a root template plus its token table.
///
/// Table keys may be written bare (`adj`) or with braces (`{adj}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorTemplate {
    pub name: String,
    pub root: String,
    #[serde(default)]
    pub tokens: BTreeMap<String, Vec<Candidate>>,
}

/// Something an expansion could not resolve. The affected marker is left
/// in the text verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "token", rename_all = "camelCase")]
pub enum ExpansionIssue {
    /// No table entry for the token.
    UnknownToken(String),
    /// The token sat at the depth limit and was not expanded.
    DepthExceeded(String),
}

/// Text produced by an expansion plus anything left unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Expansion {
    pub text: String,
    pub issues: Vec<ExpansionIssue>,
}

impl Expansion {
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn depth_exceeded(&self) -> bool {
        self.issues
            .iter()
            .any(|i| matches!(i, ExpansionIssue::DepthExceeded(_)))
    }

    pub fn unknown_tokens(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().filter_map(|i| match i {
            ExpansionIssue::UnknownToken(name) => Some(name.as_str()),
            ExpansionIssue::DepthExceeded(_) => None,
        })
    }
}

fn marker(name: &str) -> String {
    format!("{{{name}}}")
}

fn bare_key(key: &str) -> &str {
    key.strip_prefix('{')
        .and_then(|k| k.strip_suffix('}'))
        .unwrap_or(key)
}

impl GeneratorTemplate {
    pub fn candidates(&self, token: &str) -> Option<&[Candidate]> {
        self.tokens
            .get(token)
            .or_else(|| self.tokens.get(&marker(token)))
            .map(Vec::as_slice)
    }

    /// Expand the root template.
    ///
    /// Tokens in the root sit at depth 0; text substituted for a token at
    /// depth `d` is expanded at `d + 1`. A token is only replaced while its
    /// depth is below `max_depth`, so `max_depth == 0` leaves the root as
    /// written. Unknown tokens and depth cut-offs keep their marker and are
    /// reported in [`Expansion::issues`].
    pub fn expand<R: RandomSource>(
        &self,
        max_depth: usize,
        rng: &mut R,
    ) -> Result<Expansion, TemplateError> {
        let mut out = Expansion::default();
        self.expand_text(&self.root, 0, max_depth, rng, &mut out)?;
        debug!(
            template = %self.name,
            issues = out.issues.len(),
            "expanded template"
        );
        Ok(out)
    }

    fn expand_text<R: RandomSource>(
        &self,
        text: &str,
        depth: usize,
        max_depth: usize,
        rng: &mut R,
        out: &mut Expansion,
    ) -> Result<(), TemplateError> {
        let template = Template::parse(text)?;

        for segment in template.segments {
            let name = match segment {
                Segment::Literal(literal) => {
                    out.text.push_str(&literal);
                    continue;
                }
                Segment::Token(name) => name,
            };

            let Some(candidates) = self.candidates(&name) else {
                warn!(template = %self.name, token = %name, "unknown token left in place");
                out.text.push_str(&marker(&name));
                out.issues.push(ExpansionIssue::UnknownToken(name));
                continue;
            };

            if depth >= max_depth {
                warn!(template = %self.name, token = %name, depth, "expansion depth limit reached");
                out.text.push_str(&marker(&name));
                out.issues.push(ExpansionIssue::DepthExceeded(name));
                continue;
            }

            let weights: Vec<u32> = candidates.iter().map(|c| c.weight).collect();
            let chosen = rng
                .weighted_choice(candidates, &weights)
                .map_err(|source| TemplateError::Random {
                    token: name.clone(),
                    source,
                })?;
            self.expand_text(&chosen.text, depth + 1, max_depth, rng, out)?;
        }

        Ok(())
    }

    /// Static checks over the root and every candidate.
    pub fn lint(&self) -> Vec<LintIssue> {
        let mut issues = Vec::new();
        let mut references: FxHashMap<&str, Vec<String>> = FxHashMap::default();

        let root_tokens = match Template::parse(&self.root) {
            Ok(t) => t.tokens().map(str::to_string).collect(),
            Err(e) => {
                issues.push(LintIssue::Parse {
                    location: "root".to_string(),
                    message: e.to_string(),
                });
                Vec::new()
            }
        };

        for (key, candidates) in &self.tokens {
            let token = bare_key(key);
            if candidates.iter().all(|c| c.weight == 0) {
                issues.push(LintIssue::NoCandidates(token.to_string()));
            }
            let refs = references.entry(token).or_default();
            for candidate in candidates {
                match Template::parse(&candidate.text) {
                    Ok(t) => refs.extend(t.tokens().map(str::to_string)),
                    Err(e) => issues.push(LintIssue::Parse {
                        location: token.to_string(),
                        message: e.to_string(),
                    }),
                }
            }
        }

        // Unknown references, from the root and from candidates.
        let mut unknown: FxHashSet<&str> = FxHashSet::default();
        let referenced = root_tokens
            .iter()
            .chain(references.values().flatten());
        for name in referenced {
            if self.candidates(name).is_none() && unknown.insert(name.as_str()) {
                issues.push(LintIssue::UnknownToken(name.clone()));
            }
        }

        // Reachability from the root.
        let mut reachable: FxHashSet<&str> = FxHashSet::default();
        let mut stack: Vec<&str> = root_tokens.iter().map(String::as_str).collect();
        while let Some(name) = stack.pop() {
            if reachable.insert(name) {
                if let Some(next) = references.get(name) {
                    stack.extend(next.iter().map(String::as_str));
                }
            }
        }
        let mut unused: Vec<&str> = references
            .keys()
            .copied()
            .filter(|k| !reachable.contains(k))
            .collect();
        unused.sort_unstable();
        issues.extend(unused.into_iter().map(|k| LintIssue::Unreachable(k.to_string())));

        // Tokens that can expand back into themselves.
        let mut recursive: Vec<&str> = references
            .keys()
            .copied()
            .filter(|start| reaches(&references, start, start))
            .collect();
        recursive.sort_unstable();
        issues.extend(
            recursive
                .into_iter()
                .map(|k| LintIssue::SelfReferential(k.to_string())),
        );

        issues
    }
}

/// True if `target` is reachable from `from` in one or more steps.
fn reaches(references: &FxHashMap<&str, Vec<String>>, from: &str, target: &str) -> bool {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut stack: Vec<&str> = references
        .get(from)
        .map(|refs| refs.iter().map(String::as_str).collect())
        .unwrap_or_default();
    while let Some(name) = stack.pop() {
        if name == target {
            return true;
        }
        if seen.insert(name) {
            if let Some(next) = references.get(name) {
                stack.extend(next.iter().map(String::as_str));
            }
        }
    }
    false
}

/// A problem found by [`GeneratorTemplate::lint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintIssue {
    Parse { location: String, message: String },
    UnknownToken(String),
    NoCandidates(String),
    Unreachable(String),
    SelfReferential(String),
}

impl LintIssue {
    /// Errors break expansion; everything else is a warning.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::UnknownToken(_) | Self::NoCandidates(_)
        )
    }
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { location, message } => write!(f, "{location}: {message}"),
            Self::UnknownToken(name) => write!(f, "reference to undefined token '{name}'"),
            Self::NoCandidates(name) => write!(f, "token '{name}' has no selectable candidates"),
            Self::Unreachable(name) => write!(f, "token '{name}' is never reached from the root"),
            Self::SelfReferential(name) => {
                write!(f, "token '{name}' can expand into itself (bounded by the depth limit)")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tavern() -> GeneratorTemplate {
        GeneratorTemplate {
            name: "tavernName".to_string(),
            root: "The {adj} {noun}".to_string(),
            tokens: BTreeMap::from([
                (
                    "{adj}".to_string(),
                    vec![Candidate::new("Rusty", 1), Candidate::new("Golden", 1)],
                ),
                (
                    "noun".to_string(),
                    vec![Candidate::new("Dragon", 1), Candidate::new("Anchor", 1)],
                ),
            ]),
        }
    }

    #[test]
    fn parse_literal_only() {
        let t = Template::parse("Hello, world.").unwrap();
        assert_eq!(t.segments, vec![Segment::Literal("Hello, world.".to_string())]);
    }

    #[test]
    fn parse_tokens_and_literals() {
        let t = Template::parse("The {adj} {noun}").unwrap();
        assert_eq!(
            t.segments,
            vec![
                Segment::Literal("The ".to_string()),
                Segment::Token("adj".to_string()),
                Segment::Literal(" ".to_string()),
                Segment::Token("noun".to_string()),
            ]
        );
    }

    #[test]
    fn parse_escaped_braces() {
        let t = Template::parse("Use {{braces}} here.").unwrap();
        assert_eq!(
            t.segments,
            vec![Segment::Literal("Use {braces} here.".to_string())]
        );
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(Template::parse("{open"), Err(TemplateError::Parse(_))));
        assert!(matches!(Template::parse("{}"), Err(TemplateError::Parse(_))));
        assert!(matches!(Template::parse("close}"), Err(TemplateError::Parse(_))));
        assert!(matches!(Template::parse("{a{b}}"), Err(TemplateError::Parse(_))));
    }

    #[test]
    fn expands_with_bare_and_braced_keys() {
        let template = tavern();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = template.expand(DEFAULT_MAX_DEPTH, &mut rng).unwrap();
            assert!(out.is_complete());
            let words: Vec<&str> = out.text.split(' ').collect();
            assert_eq!(words[0], "The");
            assert!(["Rusty", "Golden"].contains(&words[1]));
            assert!(["Dragon", "Anchor"].contains(&words[2]));
        }
    }

    #[test]
    fn nested_tokens_expand() {
        let mut template = tavern();
        template.root = "{name}".to_string();
        template.tokens.insert(
            "name".to_string(),
            vec![Candidate::new("The {adj} {noun}", 1)],
        );
        let mut rng = StdRng::seed_from_u64(5);
        let out = template.expand(DEFAULT_MAX_DEPTH, &mut rng).unwrap();
        assert!(out.is_complete());
        assert!(out.text.starts_with("The "));
        assert!(!out.text.contains('{'));
    }

    #[test]
    fn unknown_token_left_literal() {
        let mut template = tavern();
        template.root = "The {adj} {mystery}".to_string();
        let mut rng = StdRng::seed_from_u64(1);
        let out = template.expand(DEFAULT_MAX_DEPTH, &mut rng).unwrap();
        assert!(out.text.ends_with("{mystery}"));
        assert_eq!(out.unknown_tokens().collect::<Vec<_>>(), vec!["mystery"]);
        assert!(!out.depth_exceeded());
    }

    #[test]
    fn depth_zero_keeps_self_reference() {
        let template = GeneratorTemplate {
            name: "loop".to_string(),
            root: "{loop}".to_string(),
            tokens: BTreeMap::from([(
                "loop".to_string(),
                vec![Candidate::new("again {loop}", 1)],
            )]),
        };
        let mut rng = StdRng::seed_from_u64(1);
        let out = template.expand(0, &mut rng).unwrap();
        assert_eq!(out.text, "{loop}");
        assert_eq!(out.issues, vec![ExpansionIssue::DepthExceeded("loop".to_string())]);

        let out = template.expand(3, &mut rng).unwrap();
        assert_eq!(out.text, "again again again {loop}");
        assert!(out.depth_exceeded());
    }

    #[test]
    fn zero_weights_are_an_error() {
        let template = GeneratorTemplate {
            name: "broken".to_string(),
            root: "{a}".to_string(),
            tokens: BTreeMap::from([("a".to_string(), vec![Candidate::new("x", 0)])]),
        };
        let mut rng = StdRng::seed_from_u64(1);
        let err = template.expand(DEFAULT_MAX_DEPTH, &mut rng).unwrap_err();
        assert!(matches!(err, TemplateError::Random { token, .. } if token == "a"));
    }

    #[test]
    fn huge_weights_still_expand() {
        let template = GeneratorTemplate {
            name: "lopsided".to_string(),
            root: "{a}".to_string(),
            tokens: BTreeMap::from([(
                "a".to_string(),
                vec![Candidate::new("common", u32::MAX), Candidate::new("rare", 1)],
            )]),
        };
        let mut rng = StdRng::seed_from_u64(1);
        let expansion = template.expand(DEFAULT_MAX_DEPTH, &mut rng).unwrap();
        assert_eq!(expansion.text, "common");
        assert!(expansion.is_complete());
    }

    #[test]
    fn expansion_serializes_issues_by_kind() {
        let expansion = Expansion {
            text: "{ghost} and {deep}".to_string(),
            issues: vec![
                ExpansionIssue::UnknownToken("ghost".to_string()),
                ExpansionIssue::DepthExceeded("deep".to_string()),
            ],
        };
        let json = serde_json::to_string(&expansion).unwrap();
        assert_eq!(
            json,
            r#"{"text":"{ghost} and {deep}","issues":[{"kind":"unknownToken","token":"ghost"},{"kind":"depthExceeded","token":"deep"}]}"#
        );
    }

    #[test]
    fn candidates_accept_strings_or_weighted() {
        let template: GeneratorTemplate = serde_json::from_str(
            r#"{"name": "t", "root": "{a}", "tokens": {"a": ["plain", {"text": "heavy", "weight": 5}]}}"#,
        )
        .unwrap();
        let candidates = template.candidates("a").unwrap();
        assert_eq!(candidates[0], Candidate::new("plain", 1));
        assert_eq!(candidates[1], Candidate::new("heavy", 5));

        let json = serde_json::to_string(&template.tokens).unwrap();
        assert_eq!(json, r#"{"a":["plain",{"text":"heavy","weight":5}]}"#);
    }

    #[test]
    fn lint_reports_problems() {
        let template = GeneratorTemplate {
            name: "messy".to_string(),
            root: "{start} {ghost}".to_string(),
            tokens: BTreeMap::from([
                ("start".to_string(), vec![Candidate::new("{start}!", 1)]),
                ("orphan".to_string(), vec![Candidate::new("never used", 1)]),
            ]),
        };
        let issues = template.lint();
        assert!(issues.contains(&LintIssue::UnknownToken("ghost".to_string())));
        assert!(issues.contains(&LintIssue::Unreachable("orphan".to_string())));
        assert!(issues.contains(&LintIssue::SelfReferential("start".to_string())));
        assert!(issues.iter().any(LintIssue::is_error));
    }

    #[test]
    fn clean_template_lints_clean() {
        assert!(tavern().lint().is_empty());
    }
}
