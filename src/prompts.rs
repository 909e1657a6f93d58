//! Fixed prompt templates. Kept deliberately small and free of conditional
//! branching, matching the wording used for placeholder-mode generation and
//! synthesis in the system this crate is grounded on.

const BREVITY_HINT: &str =
    "Be parsimonious in your response. Focus on key points without unnecessary elaboration.";

/// The prompt sent to a role for its initial answer.
pub fn individual_answer_prompt(system_prompt: &str, task: &str) -> String {
    format!("{system_prompt}\n\nTask: {task}\n\n{BREVITY_HINT}")
}

/// The prompt sent to a judge comparing two anonymized responses.
pub fn pairwise_comparison_prompt(
    task: &str,
    id_a: &str,
    id_b: &str,
    content_a: &str,
    content_b: &str,
) -> String {
    let much_better_a = format!("[[{id_a}\u{226b}{id_b}]]");
    let much_better_b = format!("[[{id_b}\u{226b}{id_a}]]");
    format!(
        "You are comparing two responses to the following task:\n\n\
        Task: {task}\n\n\
        Response {id_a}:\n{content_a}\n\n\
        Response {id_b}:\n{content_b}\n\n\
        Compare Response {id_a} and Response {id_b} on correctness, completeness, and clarity. \
        Conclude with exactly one of the following tokens on its own line: \
        {much_better_a}, [[{id_a}>{id_b}]], [[{id_a}={id_b}]], [[{id_b}>{id_a}]], {much_better_b}."
    )
}

/// The prompt sent to the chairman for final synthesis.
pub fn chairman_synthesis_prompt(task: &str, stage1_responses: &str, stage2_reviews: &str) -> String {
    format!(
        "You are the chairman of a council of expert models. Synthesize a single, final answer \
        to the task below, informed by each participant's response and by the peer reviews they \
        gave each other.\n\n\
        Task: {task}\n\n\
        Stage 1 responses:\n{stage1_responses}\n\n\
        Stage 2 reviews:\n{stage2_reviews}\n\n\
        Produce a clear, well-reasoned final answer."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairwise_prompt_contains_all_bracket_tokens() {
        let prompt = pairwise_comparison_prompt("task", "A1", "A2", "content a", "content b");
        assert!(prompt.contains("[[A1>A2]]"));
        assert!(prompt.contains("[[A2>A1]]"));
        assert!(prompt.contains("[[A1=A2]]"));
    }

    #[test]
    fn individual_prompt_contains_brevity_hint() {
        let prompt = individual_answer_prompt("system", "task");
        assert!(prompt.contains(BREVITY_HINT));
    }
}
