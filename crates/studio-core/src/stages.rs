//! Stage catalogue
//!
//! The fixed evaluation sequence: four gating stages, then the conditional
//! POC build stage. Each stage carries its prompts, the loose schema hint sent
//! to model wrappers, the strict JSON schema sent to structured-output
//! runtimes, and a validator for structured output.

use crate::error::InvocationError;
use crate::types::{StageDecision, StageOutput};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Evaluation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Viability and unit economics
    EconomicJudge,
    /// Demand, alternatives, wedge positioning
    MarketCompetitor,
    /// MVP scope and success metrics
    ProductService,
    /// Feasibility and launch path
    EngineeringManager,
    /// Conditional prototype build
    PocBuilder,
}

impl Stage {
    /// Gating stages in execution order
    pub const GATING: [Stage; 4] = [
        Stage::EconomicJudge,
        Stage::MarketCompetitor,
        Stage::ProductService,
        Stage::EngineeringManager,
    ];

    /// Stable stage name
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Stage::EconomicJudge => "economic_judge",
            Stage::MarketCompetitor => "market_competitor",
            Stage::ProductService => "product_service",
            Stage::EngineeringManager => "engineering_manager",
            Stage::PocBuilder => "poc_builder",
        }
    }

    /// Whether the stage's decision feeds the gate
    #[inline]
    #[must_use]
    pub fn is_gating(self) -> bool {
        !matches!(self, Stage::PocBuilder)
    }

    /// Observability generation name
    #[must_use]
    pub fn generation_name(self) -> String {
        format!("{}_generation", self.name())
    }

    /// System prompt sent to model wrappers
    #[must_use]
    pub fn system_prompt(self) -> &'static str {
        match self {
            Stage::EconomicJudge => {
                "You are Economic Judge Agent. Return strict JSON only. Evaluate viability and unit economics quickly."
            }
            Stage::MarketCompetitor => {
                "You are Market & Competitor Agent. Return strict JSON only. Map demand, alternatives, wedge positioning."
            }
            Stage::ProductService => {
                "You are Product Service Agent. Return strict JSON only. Define MVP scope and measurable success metrics."
            }
            Stage::EngineeringManager => {
                "You are Engineering Manager Agent. Return strict JSON only. Confirm feasibility and launch path on shared infra."
            }
            Stage::PocBuilder => {
                "You are a rapid prototype builder. Return strict JSON with {title, summary, html}. html must be complete single-file HTML."
            }
        }
    }

    /// System prompt sent to structured-output runtimes
    #[must_use]
    pub fn structured_system_prompt(self) -> &'static str {
        match self {
            Stage::EconomicJudge => {
                "You are Economic Judge Agent. Return strict JSON only. Evaluate financial viability and execution risk."
            }
            Stage::MarketCompetitor => {
                "You are Market & Competitor Agent. Return strict JSON only with market score, key competitors, gaps, and wedge."
            }
            Stage::ProductService => {
                "You are Product Service Agent. Return strict JSON only. Define practical MVP scope and measurable outcomes."
            }
            Stage::EngineeringManager => {
                "You are Engineering Manager Agent. Return strict JSON only. Confirm build feasibility, stack and deployment plan."
            }
            Stage::PocBuilder => {
                "You are a rapid prototype builder. Return strict JSON with title, summary, and html. html must be a complete single-file HTML document with inline CSS/JS."
            }
        }
    }

    /// Loose field description sent alongside wrapper prompts
    #[must_use]
    pub fn schema_hint(self) -> Value {
        match self {
            Stage::EconomicJudge => json!({
                "decision": "GO | CONDITIONAL_GO | NO_GO",
                "score": "number 0-100",
                "strengths": "string[]",
                "risks": "string[]",
                "assumptions": "string[]",
            }),
            Stage::MarketCompetitor => json!({
                "decision": "GO | CONDITIONAL_GO | NO_GO",
                "marketScore": "number 0-100",
                "competitors": "string[]",
                "opportunityGaps": "string[]",
                "recommendedWedge": "string",
            }),
            Stage::ProductService => json!({
                "decision": "GO | CONDITIONAL_GO | NO_GO",
                "mvpName": "string",
                "mustHaveFeatures": "string[]",
                "timelineWeeks": "number",
                "successMetrics": "string[]",
            }),
            Stage::EngineeringManager => json!({
                "decision": "GO | CONDITIONAL_GO | NO_GO",
                "canBuildInWeeks": "number",
                "stack": "string[]",
                "deploymentPlan": "string[]",
            }),
            Stage::PocBuilder => json!({
                "title": "string",
                "summary": "string",
                "html": "string containing full HTML document",
            }),
        }
    }

    fn fields(self) -> &'static [Field] {
        match self {
            Stage::EconomicJudge => ECONOMIC_JUDGE_FIELDS,
            Stage::MarketCompetitor => MARKET_COMPETITOR_FIELDS,
            Stage::ProductService => PRODUCT_SERVICE_FIELDS,
            Stage::EngineeringManager => ENGINEERING_MANAGER_FIELDS,
            Stage::PocBuilder => POC_BUILDER_FIELDS,
        }
    }

    /// Strict JSON schema for structured-output runtimes
    #[must_use]
    pub fn json_schema(self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for field in self.fields() {
            let schema = match field.kind {
                FieldKind::Decision => json!({
                    "type": "string",
                    "enum": ["GO", "CONDITIONAL_GO", "NO_GO"],
                }),
                FieldKind::Number(min, max) => json!({
                    "type": "number",
                    "minimum": min,
                    "maximum": max,
                }),
                FieldKind::Text => json!({ "type": "string" }),
                FieldKind::TextList => json!({
                    "type": "array",
                    "items": { "type": "string" },
                }),
            };
            properties.insert(field.name.to_string(), schema);
            required.push(Value::String(field.name.to_string()));
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Validate structured output against the stage schema
    ///
    /// Missing list fields default to empty lists; every other field is
    /// required. Decisions must be one of the three raw values here, unlike
    /// the tolerant normalization applied to wrapper output.
    pub fn validate_structured(self, mut output: StageOutput) -> Result<StageOutput, InvocationError> {
        for field in self.fields() {
            let violation = |detail: String| InvocationError::SchemaViolation {
                stage: self,
                detail,
            };
            match (field.kind, output.get(field.name)) {
                (FieldKind::TextList, None) => {
                    output.insert(field.name.to_string(), Value::Array(Vec::new()));
                }
                (_, None) => return Err(violation(format!("missing field `{}`", field.name))),
                (FieldKind::Decision, Some(value)) => {
                    if value.as_str().and_then(StageDecision::parse_strict).is_none() {
                        return Err(violation(format!("invalid decision {value}")));
                    }
                }
                (FieldKind::Number(min, max), Some(value)) => match value.as_f64() {
                    Some(n) if (min..=max).contains(&n) => {}
                    _ => {
                        return Err(violation(format!(
                            "`{}` must be a number in {min}..={max}, got {value}",
                            field.name
                        )))
                    }
                },
                (FieldKind::Text, Some(value)) => {
                    if !value.is_string() {
                        return Err(violation(format!("`{}` must be a string", field.name)));
                    }
                }
                (FieldKind::TextList, Some(value)) => {
                    let valid = value
                        .as_array()
                        .is_some_and(|items| items.iter().all(Value::is_string));
                    if !valid {
                        return Err(violation(format!(
                            "`{}` must be a list of strings",
                            field.name
                        )));
                    }
                }
            }
        }
        Ok(output)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Decision,
    Number(f64, f64),
    Text,
    TextList,
}

#[derive(Debug, Clone, Copy)]
struct Field {
    name: &'static str,
    kind: FieldKind,
}

impl Field {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

const ECONOMIC_JUDGE_FIELDS: &[Field] = &[
    Field::new("decision", FieldKind::Decision),
    Field::new("score", FieldKind::Number(0.0, 100.0)),
    Field::new("strengths", FieldKind::TextList),
    Field::new("risks", FieldKind::TextList),
    Field::new("assumptions", FieldKind::TextList),
];

const MARKET_COMPETITOR_FIELDS: &[Field] = &[
    Field::new("decision", FieldKind::Decision),
    Field::new("marketScore", FieldKind::Number(0.0, 100.0)),
    Field::new("competitors", FieldKind::TextList),
    Field::new("opportunityGaps", FieldKind::TextList),
    Field::new("recommendedWedge", FieldKind::Text),
];

const PRODUCT_SERVICE_FIELDS: &[Field] = &[
    Field::new("decision", FieldKind::Decision),
    Field::new("mvpName", FieldKind::Text),
    Field::new("mustHaveFeatures", FieldKind::TextList),
    Field::new("timelineWeeks", FieldKind::Number(1.0, 12.0)),
    Field::new("successMetrics", FieldKind::TextList),
];

const ENGINEERING_MANAGER_FIELDS: &[Field] = &[
    Field::new("decision", FieldKind::Decision),
    Field::new("canBuildInWeeks", FieldKind::Number(1.0, 12.0)),
    Field::new("stack", FieldKind::TextList),
    Field::new("deploymentPlan", FieldKind::TextList),
];

const POC_BUILDER_FIELDS: &[Field] = &[
    Field::new("title", FieldKind::Text),
    Field::new("summary", FieldKind::Text),
    Field::new("html", FieldKind::Text),
];
