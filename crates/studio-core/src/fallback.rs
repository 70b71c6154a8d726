//! Heuristic fallback strategy
//!
//! Deterministic, keyword-driven stage output used when no model runtime is
//! configured. Never fails.

use crate::error::InvocationError;
use crate::invoker::{AgentInvoker, InvocationStrategy, StageRequest};
use crate::stages::Stage;
use crate::types::{StageDecision, StageOutput};
use serde_json::{json, Value};

/// Keywords that bias scores upward
pub const SIGNAL_KEYWORDS: [&str; 3] = ["saas", "b2b", "automation"];

/// Economic score at or above which the heuristic answers GO
pub const GO_THRESHOLD: u32 = 75;

const MVP_NAME_IDEA_CHARS: usize = 50;
const TITLE_WORDS: usize = 6;

/// Keyword heuristic invoker
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicInvoker;

impl HeuristicInvoker {
    /// Create new heuristic invoker
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Produce output for a stage
    #[must_use]
    pub fn evaluate(&self, request: &StageRequest) -> StageOutput {
        let value = match request.stage {
            Stage::EconomicJudge => {
                let score = if has_signal(&signal_text(request)) { 77 } else { 63 };
                let decision = if score >= GO_THRESHOLD {
                    StageDecision::Go
                } else {
                    StageDecision::ConditionalGo
                };
                json!({
                    "decision": decision,
                    "score": score,
                    "strengths": ["Clear user pain", "Fast MVP feasibility"],
                    "risks": ["Customer acquisition channel needs validation"],
                    "assumptions": ["Pilot users can be reached in 2 weeks"],
                })
            }
            Stage::MarketCompetitor => {
                let market_score = if has_signal(&signal_text(request)) { 74 } else { 67 };
                json!({
                    "decision": StageDecision::Go,
                    "marketScore": market_score,
                    "competitors": ["Incumbent legacy tools", "No-code DIY workflows"],
                    "opportunityGaps": ["Faster onboarding", "Lower setup complexity"],
                    "recommendedWedge": "One narrow high-frequency use case",
                })
            }
            Stage::ProductService => {
                let head: String = request.idea.chars().take(MVP_NAME_IDEA_CHARS).collect();
                json!({
                    "decision": StageDecision::Go,
                    "mvpName": format!("POC for {head}"),
                    "mustHaveFeatures": ["Simple onboarding", "Primary workflow", "Basic analytics"],
                    "timelineWeeks": 3,
                    "successMetrics": ["Activation > 30%", "Week-1 retention > 20%"],
                })
            }
            Stage::EngineeringManager => json!({
                "decision": StageDecision::Go,
                "canBuildInWeeks": 3,
                "stack": ["Rust service", "Static frontend", "Shared cloud runtime"],
                "deploymentPlan": ["Staging preview", "Production promote", "Rollback toggle"],
            }),
            Stage::PocBuilder => {
                let title = poc_title(&request.idea);
                json!({
                    "title": title,
                    "summary": "Single-page working proof-of-concept generated from idea and validated assumptions.",
                    "html": poc_document(&title, &request.idea),
                })
            }
        };
        match value {
            Value::Object(map) => map,
            _ => StageOutput::new(),
        }
    }
}

#[async_trait::async_trait]
impl AgentInvoker for HeuristicInvoker {
    fn strategy(&self) -> InvocationStrategy {
        InvocationStrategy::Heuristic
    }

    fn model_label(&self) -> &str {
        "heuristic"
    }

    async fn invoke(&self, request: &StageRequest) -> Result<StageOutput, InvocationError> {
        Ok(self.evaluate(request))
    }
}

/// Lowercased text scanned for signal keywords
///
/// The economic judge also reads the appeal argument in appeal mode.
fn signal_text(request: &StageRequest) -> String {
    let mut text = format!("{} {}", request.idea, request.context.target_user);
    if request.stage == Stage::EconomicJudge && request.context.appeal_mode {
        if let Some(appeal) = &request.context.appeal {
            text.push(' ');
            text.push_str(appeal);
        }
    }
    text.to_lowercase()
}

fn has_signal(text: &str) -> bool {
    SIGNAL_KEYWORDS.iter().any(|keyword| text.contains(keyword))
}

fn poc_title(idea: &str) -> String {
    let words: Vec<&str> = idea.split(' ').take(TITLE_WORDS).collect();
    format!("{} POC", words.join(" "))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn poc_document(title: &str, idea: &str) -> String {
    let title = escape_html(title);
    let idea = escape_html(idea);
    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>{title}</title>
    <style>
      body {{ font-family: ui-sans-serif, system-ui, sans-serif; margin: 0; background: #f6f4ed; color: #1f1f1f; }}
      .shell {{ max-width: 900px; margin: 24px auto; padding: 20px; }}
      .hero {{ background: #fff; border: 1px solid #ddd3be; border-radius: 14px; padding: 20px; }}
      button {{ border: 0; background: #1f8a62; color: #fff; padding: 10px 14px; border-radius: 8px; cursor: pointer; }}
      .waitlist {{ display: flex; gap: 8px; margin-top: 12px; }}
      input {{ flex: 1; padding: 10px; border-radius: 8px; border: 1px solid #ddd3be; }}
      #msg {{ margin-top: 10px; color: #176548; font-weight: 600; }}
    </style>
  </head>
  <body>
    <main class="shell">
      <section class="hero">
        <h1>{title}</h1>
        <p>{idea}</p>
        <p>This POC was generated from your idea pipeline and is deployable as a static app.</p>
        <div class="waitlist">
          <input id="email" type="email" placeholder="Email for beta" />
          <button id="join">Join Beta</button>
        </div>
        <p id="msg"></p>
      </section>
    </main>
    <script>
      const email = document.getElementById('email');
      const join = document.getElementById('join');
      const msg = document.getElementById('msg');
      join.addEventListener('click', () => {{
        if (!email.value.includes('@')) {{
          msg.textContent = 'Enter a valid email.';
          return;
        }}
        msg.textContent = 'You are on the beta list.';
      }});
    </script>
  </body>
</html>"#
    )
}
