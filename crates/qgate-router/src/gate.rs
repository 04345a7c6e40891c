//! Decision gate: an ordered list of named predicates over the five routing
//! signals. The first failing gate rejects the query; passing all of them
//! routes to RAG.

use qgate_core::config::GateThresholds;
use qgate_core::types::RoutePath;

/// Everything the gate is allowed to look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateInput {
    pub hits: usize,
    pub coverage: f64,
    pub idf: f64,
    pub p_intent: f64,
    pub token_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    /// Passed only because of the strong-IDF override.
    Override,
    Fail,
}

pub struct Gate {
    pub name: &'static str,
    pub check: fn(&GateInput, &GateThresholds) -> Outcome,
}

pub const GATES: &[Gate] = &[
    Gate { name: "non_empty", check: non_empty },
    Gate { name: "lexical_hits", check: lexical_hits },
    Gate { name: "intent_probability", check: intent_probability },
    Gate { name: "short_coverage", check: short_coverage },
    Gate { name: "lexical_support", check: lexical_support },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub path: RoutePath,
    pub short: bool,
    pub rejected_by: Option<&'static str>,
    pub strong_idf: bool,
    pub nonsense: bool,
}

pub fn evaluate(input: &GateInput, thresholds: &GateThresholds) -> Verdict {
    let short = thresholds.is_short(input.token_count);
    let required = thresholds.required_probability(short);
    let nonsense = input.hits == 0 && input.token_count > 0 && input.p_intent >= required;

    let mut strong_idf = false;
    for gate in GATES {
        match (gate.check)(input, thresholds) {
            Outcome::Pass => {}
            Outcome::Override => strong_idf = true,
            Outcome::Fail => {
                return Verdict { path: RoutePath::LlmOnly, short, rejected_by: Some(gate.name), strong_idf: false, nonsense };
            }
        }
    }
    Verdict { path: RoutePath::Rag, short, rejected_by: None, strong_idf, nonsense }
}

fn pass_if(ok: bool) -> Outcome {
    if ok { Outcome::Pass } else { Outcome::Fail }
}

fn non_empty(input: &GateInput, _: &GateThresholds) -> Outcome {
    pass_if(input.token_count > 0)
}

fn lexical_hits(input: &GateInput, t: &GateThresholds) -> Outcome {
    pass_if(input.hits >= t.min_hits.max(1))
}

fn intent_probability(input: &GateInput, t: &GateThresholds) -> Outcome {
    let required = t.required_probability(t.is_short(input.token_count));
    if input.p_intent >= required {
        Outcome::Pass
    } else if input.idf >= t.idf_strong && input.p_intent >= required - t.strong_idf_prob_margin {
        Outcome::Override
    } else {
        Outcome::Fail
    }
}

fn short_coverage(input: &GateInput, t: &GateThresholds) -> Outcome {
    if !t.is_short(input.token_count) {
        return Outcome::Pass;
    }
    pass_if(input.coverage >= t.coverage_floor(input.token_count))
}

fn lexical_support(input: &GateInput, t: &GateThresholds) -> Outcome {
    if t.is_short(input.token_count) {
        return Outcome::Pass;
    }
    pass_if(input.coverage >= t.coverage_min || input.idf >= t.idf_min)
}
