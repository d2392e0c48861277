use nestwatch_common::types::Scenario;

/// Build the triage prompt for a scenario.
///
/// Triage is the cheap first pass: it only has to decide whether a
/// deeper look is warranted and give a one-line summary.
pub fn build_triage_prompt(scenario: Scenario) -> String {
    TRIAGE_PROMPT.replace("{{SCENARIO_FOCUS}}", scenario_focus(scenario))
}

/// Build the detailed analysis prompt for a scenario.
pub fn build_analysis_prompt(scenario: Scenario) -> String {
    ANALYSIS_PROMPT.replace("{{SCENARIO_FOCUS}}", scenario_focus(scenario))
}

/// Scenario-specific list of situations the model should look for.
fn scenario_focus(scenario: Scenario) -> &'static str {
    match scenario {
        Scenario::Baby => {
            "This is a baby monitor. Watch for: face covered by blanket or toy, \
             unsafe sleeping position (face down), climbing out of the crib, \
             prolonged crying or distress, no visible breathing movement, \
             objects or cords within reach inside the crib."
        }
        Scenario::Pet => {
            "This is a pet monitor. Watch for: signs of physical distress or \
             injury, vomiting, destructive behavior near hazards (cables, \
             stove), the pet being stuck or trapped, eating something it \
             should not."
        }
        Scenario::Elderly => {
            "This is an elderly-care monitor. Watch for: a person on the floor \
             or a fall in progress, prolonged immobility in an unusual place, \
             signs of confusion or distress, use of a stove or appliance left \
             unattended."
        }
    }
}

const TRIAGE_PROMPT: &str = r#"You are a home safety triage assistant reviewing a single camera frame.

{{SCENARIO_FOCUS}}

Reply with ONLY a JSON object in this exact shape:

{"needs_detailed_analysis": true|false, "concern_level": "none|low|medium|high|critical", "summary": "<one sentence>"}

Set needs_detailed_analysis to true only when something in the frame warrants a closer look. Do not add any text outside the JSON object."#;

const ANALYSIS_PROMPT: &str = r#"You are a home safety analyst reviewing a single camera frame in detail.

{{SCENARIO_FOCUS}}

Reply with ONLY a JSON object in this exact shape:

{"concern_level": "none|low|medium|high|critical", "description": "<2-3 sentences describing the scene>", "issues": ["<specific issue>", ...]}

List issues in order of urgency, most urgent first. Use an empty issues array when the scene is safe. Do not add any text outside the JSON object."#;
