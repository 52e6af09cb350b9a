//! Prompt construction.
//!
//! All prompts sent to the interviewer model are rendered from Jinja2
//! templates. Keeping them in one place makes the coaching voice easy to
//! tune without touching the turn flow.

use minijinja::{Environment, context};
use once_cell::sync::Lazy;
use prep_core::config::Difficulty;

const SYSTEM_TEMPLATE: &str = "\
You are a professional interview coach simulating a {{ difficulty }} interview for the role of {{ role }}.
Ask concise, focused questions that are easy to understand and answer.
Limit each question to a maximum of 2 sentences or 30 words.
Ask one question at a time. Use formal but simple language.
Focus on both technical and behavioral aspects appropriate to the role.";

const EVALUATION_TEMPLATE: &str = "\
You are a professional interview coach. Evaluate the following answer.

Question: {{ question }}
Answer: {{ answer }}

Penalize verbosity and reward concise, clear responses.
Do not judge grammar or spelling mistakes.

Give ratings (1-5) for:
- Relevance
- Clarity
- Technical Accuracy
- Depth
- Communication

Then give concise feedback (1-2 sentences).
Respond in this format:
Relevance: X
Clarity: X
Technical Accuracy: X
Depth: X
Communication: X
Feedback: <text>";

const MOOD_TEMPLATE: &str = "\
Analyze the tone of the following interviewer message. Choose one mood label from:
- Encouraging 😊
- Challenging 😐
- Supportive 👍
- Disengaged 😒
- Neutral 😶
- Critical 😠

Return only the label and emoji on the first line.
Then provide a brief explanation on the next line.

Message:
\"\"\"{{ message }}\"\"\"";

const IDEAL_ANSWER_TEMPLATE: &str = "\
You are an expert interview coach preparing candidates for a {{ role }} role.

Provide a concise model answer to the following interview question using at most {{ word_count }} words.
Use a professional tone, include real-world logic, and format clearly (e.g., STAR method if applicable).

Interview Question:
\"\"\"{{ question }}\"\"\"";

const IMPROVED_ANSWER_TEMPLATE: &str = "\
You are an expert interview coach. Your task is to improve the following user answer to make it ideal for a job interview.

Interview Question: \"{{ question }}\"

User's Original Answer: \"{{ answer }}\"

Please rewrite the answer to:
- Be clear, concise, and professional
- Highlight relevant skills and achievements
- Use a confident tone
- Stay factually consistent with the user's original input
- Use a maximum of {{ word_count }} words

Respond with the improved (ideal) answer only.";

static TEMPLATES: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.add_template("system", SYSTEM_TEMPLATE)
        .expect("valid system template");
    env.add_template("evaluation", EVALUATION_TEMPLATE)
        .expect("valid evaluation template");
    env.add_template("mood", MOOD_TEMPLATE)
        .expect("valid mood template");
    env.add_template("ideal_answer", IDEAL_ANSWER_TEMPLATE)
        .expect("valid ideal answer template");
    env.add_template("improved_answer", IMPROVED_ANSWER_TEMPLATE)
        .expect("valid improved answer template");
    env
});

fn render(name: &str, ctx: minijinja::Value) -> String {
    TEMPLATES
        .get_template(name)
        .expect("template registered")
        .render(ctx)
        .expect("template renders")
}

/// The coach's system prompt for a practice run.
pub fn system_prompt(job_role: &str, difficulty: Difficulty) -> String {
    render(
        "system",
        context! {
            role => job_role,
            difficulty => difficulty.to_string().to_lowercase(),
        },
    )
}

/// Asks the model to rate an answer on the five metrics.
pub fn evaluation_prompt(question: &str, answer: &str) -> String {
    render(
        "evaluation",
        context! { question => question, answer => answer },
    )
}

/// Asks the model to classify the interviewer's tone.
pub fn mood_prompt(message: &str) -> String {
    render("mood", context! { message => message })
}

/// Asks the model for a model answer within a word budget.
pub fn ideal_answer_prompt(question: &str, job_role: &str, word_count: u32) -> String {
    render(
        "ideal_answer",
        context! {
            question => question,
            role => job_role,
            word_count => word_count,
        },
    )
}

/// Asks the model to rewrite the user's own answer into an ideal one.
pub fn improved_answer_prompt(question: &str, answer: &str, word_count: u32) -> String {
    render(
        "improved_answer",
        context! {
            question => question,
            answer => answer,
            word_count => word_count,
        },
    )
}
