//! Intent classification - maps free text to an action plan.
//!
//! Two-tier decision: deterministic fast paths for obvious knowledge-base
//! commands (removal patterns checked before addition patterns), then a
//! reasoning call with condensed context, then the conservative
//! `Dispatch(all)` fallback when that call errors or returns an
//! unrecognizable shape. Fast-path classification is fully deterministic.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use wealthdesk_core::bundle::ContextBundle;
use wealthdesk_core::error::ReasoningError;
use wealthdesk_core::plan::{ActionPlan, ProviderName};
use wealthdesk_core::reasoning::Reasoning;
use wealthdesk_reasoning::parse_json_reply;

/// Prefixes that open an obvious knowledge-base addition command.
const ADD_PREFIXES: [&str; 11] = [
    "remember",
    "note:",
    "note that",
    "add to knowledge base",
    "save that",
    "record that",
    "keep in mind",
    "update:",
    "don't forget",
    "log that",
    "mark that",
];

/// Prefixes that open an obvious knowledge-base removal command.
const REMOVE_PREFIXES: [&str; 8] = [
    "remove from knowledge base",
    "delete from knowledge base",
    "remove from kb",
    "delete from kb",
    "remove the note about",
    "delete the note about",
    "take out the part about",
    "remove the entry about",
];

static REMOVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(remove|delete|take out|clear|drop|get rid of)\b.*(knowledge base|kb|from it|from the kb|note about|entry about|info about|information about)",
    )
    .expect("removal pattern must compile")
});

static THIRD_PERSON_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(he|she|they|client|this client)\s+(mentioned|said|told|prefers?|wants?|needs?|is |has |just )")
        .expect("third-person pattern must compile")
});

static PRONOUN_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(he|she|they|client|this client)\s+").expect("pronoun pattern must compile")
});

static REMOVE_SCAFFOLD_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(update the knowledge base and |update the kb and |update kb and )?(remove|delete|take out|clear|drop|get rid of)\s+",
    )
    .expect("removal scaffold prefix must compile")
});

static REMOVE_SCAFFOLD_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(from (the )?(knowledge base|kb|it))\.?$")
        .expect("removal scaffold suffix must compile")
});

/// Instructions for the routing reasoning call.
const ROUTING_INSTRUCTIONS: &str = r#"You are a query router for a wealth advisor's assistant.
Given the advisor's message about a client, classify which specialist providers are needed.

Available providers:
- context: Reads client profile, knowledge base, documents, and chat history. Drafts personalized emails. Use for questions about client background, communication, goals, or when a draft message is needed.
- quant: Runs financial calculations (tax brackets, contribution optimization, projections, comparisons). Use ONLY when math, numbers, or financial modeling is explicitly needed.
- compliance: Checks CRA rules, CIRO suitability, contribution limits, regulatory flags. Use ONLY when the question involves regulatory compliance, contribution limits, or tax rule verification.
- research: Suggests suitable investment products (ETFs, stocks, asset classes, GICs) and asset allocation based on client risk profile, goals, and accounts. Use when the advisor asks about investments, portfolio composition, suggestions, asset allocation, what to buy/sell, or rebalancing.

Rules:
- If the question is a simple lookup (e.g. "show me the knowledge base", "what accounts does this client have"), return NO providers — the system answers directly from the record store.
- If the advisor wants to ADD to the knowledge base ("remember that...", "note that...", "she prefers...", "he mentioned..."), set "rag_update" to true and extract the entries as concise strings in "rag_entries". Do NOT dispatch providers for this.
- If the advisor wants to REMOVE from the knowledge base ("remove the RESP info", "delete the note about..."), set "rag_delete" to true and provide short keyword phrases in "rag_delete_keywords". Do NOT dispatch providers for this.
- Only include providers that are genuinely needed. Most questions need 1-2, not all 4.
- IMPORTANT: When the advisor asks about stocks, ETFs, investment ideas, or asset allocation, ONLY dispatch "research". Do NOT include "quant" (no calculation is needed for lookups) or "compliance" (research already considers suitability). Only add "compliance" when the question explicitly asks about regulatory rules, contribution limits, or tax compliance. Only add "quant" when explicit math or projections are requested.

Respond in JSON only:
{"agents": ["context", "quant", "compliance", "research"], "reasoning": "brief explanation", "direct_answer": false, "rag_update": false, "rag_entries": [], "rag_delete": false, "rag_delete_keywords": []}"#;

/// How much condensed context travels with the routing call.
const MAX_NOTE_CHARS: usize = 300;
const MAX_KNOWLEDGE_LINES: usize = 8;
const MAX_CHAT_LINES: usize = 6;
const MAX_LINE_CHARS: usize = 150;

/// The intent classifier.
pub struct IntentClassifier {
    router: Arc<dyn Reasoning>,
}

impl IntentClassifier {
    pub fn new(router: Arc<dyn Reasoning>) -> Self {
        Self { router }
    }

    /// Classify one request. Never fails - the worst case is the
    /// conservative dispatch-all plan.
    pub async fn classify(&self, text: &str, bundle: &ContextBundle) -> ActionPlan {
        // Fast path 1: removal patterns win over addition patterns.
        if is_removal(text) {
            let keywords = extract_remove_keywords(text);
            if !keywords.is_empty() {
                debug!("Classifier fast path: knowledge removal");
                return ActionPlan::KnowledgeRemove { keywords };
            }
        }

        // Fast path 2: addition patterns. An empty extraction falls through
        // to the reasoning call rather than producing a no-op plan.
        if is_addition(text) {
            let entries = extract_add_entries(text);
            if !entries.is_empty() {
                debug!("Classifier fast path: knowledge addition");
                return ActionPlan::KnowledgeAdd { entries };
            }
        }

        match self.classify_remote(text, bundle).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "Routing call failed; dispatching all providers");
                ActionPlan::dispatch_all()
            }
        }
    }

    /// The reasoning-call tier.
    async fn classify_remote(
        &self,
        text: &str,
        bundle: &ContextBundle,
    ) -> Result<ActionPlan, ReasoningError> {
        let payload = condensed_payload(text, bundle);
        let raw = self.router.complete(ROUTING_INSTRUCTIONS, &payload).await?;
        let value = parse_json_reply(&raw)?;

        let str_list = |key: &str| -> Vec<String> {
            value[key]
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|v| v.as_str())
                        .map(|s| s.to_string())
                        .collect()
                })
                .unwrap_or_default()
        };

        // A mutation verdict forces an empty provider set and suppresses
        // direct-answer; an empty extraction degrades to a direct answer.
        if value["rag_delete"].as_bool().unwrap_or(false) {
            let keywords = str_list("rag_delete_keywords");
            return Ok(if keywords.is_empty() {
                ActionPlan::DirectAnswer
            } else {
                ActionPlan::KnowledgeRemove { keywords }
            });
        }
        if value["rag_update"].as_bool().unwrap_or(false) {
            let entries = str_list("rag_entries");
            return Ok(if entries.is_empty() {
                ActionPlan::DirectAnswer
            } else {
                ActionPlan::KnowledgeAdd { entries }
            });
        }

        // Unknown provider names are dropped, not errors.
        let providers: BTreeSet<ProviderName> = str_list("agents")
            .iter()
            .filter_map(|name| ProviderName::parse(name))
            .collect();

        if value["direct_answer"].as_bool().unwrap_or(false) || providers.is_empty() {
            return Ok(ActionPlan::DirectAnswer);
        }

        Ok(ActionPlan::Dispatch { providers })
    }
}

/// Fast keyword check for obvious deletion commands.
fn is_removal(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    REMOVE_PREFIXES.iter().any(|p| lower.starts_with(p)) || REMOVE_PATTERN.is_match(&lower)
}

/// Fast keyword check for obvious addition commands. Removal wins when both
/// families of cue appear in one sentence.
fn is_addition(text: &str) -> bool {
    if is_removal(text) {
        return false;
    }
    let lower = text.trim().to_lowercase();
    ADD_PREFIXES.iter().any(|p| lower.starts_with(p)) || THIRD_PERSON_PATTERN.is_match(&lower)
}

/// Extract the entry to add: the remainder after a matched prefix, or the
/// sentence with a leading pronoun clause stripped.
fn extract_add_entries(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();

    for prefix in ADD_PREFIXES {
        if lower.starts_with(prefix) {
            // A matched prefix with nothing after it yields no entry; the
            // caller falls through to the reasoning tier.
            let remainder = trimmed[prefix.len()..]
                .trim()
                .trim_start_matches(':')
                .trim();
            return if remainder.is_empty() {
                vec![]
            } else {
                vec![remainder.to_string()]
            };
        }
    }

    let cleaned = PRONOUN_PREFIX.replace(trimmed, "").trim().to_string();
    if cleaned.is_empty() { vec![] } else { vec![cleaned] }
}

/// Extract keyword phrases describing what to delete.
fn extract_remove_keywords(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();

    for prefix in REMOVE_PREFIXES {
        if lower.starts_with(prefix) {
            let remainder = trimmed[prefix.len()..]
                .trim()
                .trim_start_matches(':')
                .trim();
            // Trailing scaffolding ("... from the knowledge base") is not
            // part of the keyword phrase.
            let remainder = REMOVE_SCAFFOLD_SUFFIX.replace(remainder, "");
            let remainder = remainder.trim();
            return if remainder.is_empty() {
                vec![]
            } else {
                vec![remainder.to_string()]
            };
        }
    }

    let cleaned = REMOVE_SCAFFOLD_PREFIX.replace(trimmed, "");
    let cleaned = REMOVE_SCAFFOLD_SUFFIX.replace(&cleaned, "");
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() { vec![] } else { vec![cleaned] }
}

/// Condensed context for the routing call: the raw text plus client
/// name/goals/notes, a bounded number of knowledge entries, and a bounded
/// number of recent turns (oldest first).
fn condensed_payload(text: &str, bundle: &ContextBundle) -> String {
    let truncate = |s: &str, max: usize| -> String {
        if s.chars().count() > max {
            s.chars().take(max).collect()
        } else {
            s.to_string()
        }
    };

    let profile = &bundle.profile;
    let mut payload = format!("Advisor's message: {text}");

    payload.push_str("\n\nClient profile (for resolving what the request refers to):");
    payload.push_str(&format!("\n  Name: {}", profile.name));
    let goals = if profile.goals.is_empty() {
        "None".to_string()
    } else {
        profile.goals.join(", ")
    };
    payload.push_str(&format!("\n  Goals: {goals}"));
    if !profile.advisor_notes.is_empty() {
        payload.push_str(&format!(
            "\n  Advisor notes: {}",
            truncate(&profile.advisor_notes, MAX_NOTE_CHARS)
        ));
    }

    if !bundle.knowledge.is_empty() {
        payload.push_str("\n\nKnowledge base entries:");
        for entry in bundle.knowledge.iter().rev().take(MAX_KNOWLEDGE_LINES) {
            payload.push_str(&format!("\n  - {}", truncate(&entry.content, MAX_LINE_CHARS)));
        }
    }

    if !bundle.recent_chat.is_empty() {
        payload.push_str("\n\nRecent conversation:");
        // recent_chat is most-recent-first; replay oldest first
        for message in bundle.recent_chat.iter().take(MAX_CHAT_LINES).rev() {
            payload.push_str(&format!(
                "\n  [{}]: {}",
                message.role.as_str(),
                truncate(&message.content, MAX_LINE_CHARS)
            ));
        }
    }

    payload
}
