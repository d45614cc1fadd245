// src/context/prompt.rs
// Deterministic prompt composition for the two chat endpoints (spec §4.I).
// Section order, headings, and formatting are fixed so behavioural tests can
// match on them.

use chrono::{DateTime, Utc};

use crate::model::Message;
use super::AssembledContext;

/// Names the assistant persona and pins chat tone guidance (spec §4.I).
pub const CHAT_SYSTEM_PROMPT: &str = "أنت \"ميجو\"، مساعد محادثة ودود يشارك في غرف دردشة جماعية. \
أجب بإيجاز ووضوح بالاعتماد على السياق المتوفر فقط، والتزم بصيغة الإخراج المطلوبة بدقة.";

/// Shorter persona used for reply suggestion — speaks as the user, not as an assistant.
pub const REPLY_SYSTEM_PROMPT: &str =
    "أنت تصوغ ردًا نيابة عن المستخدم على رسالة سابقة في المحادثة، وليس كمساعد. اكتب كما لو كان المستخدم نفسه يكتب.";

pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build_chat_prompt(context: &AssembledContext, question: &str) -> String {
        let mut prompt = String::new();
        prompt.push_str(&context_section(context));

        prompt.push_str("\n## Task\n");
        prompt.push_str(&format!("The user's question: {question}\n"));

        prompt.push_str("\n## Instructions\n");
        if has_any_context(context) {
            prompt.push_str(
                "Answer the question using the context above. Ground your answer in the room summary, \
                 the user's profile, prior AI chats, and recent messages where relevant.\n",
            );
        } else {
            prompt.push_str(
                "No prior context is available for this room or user. Answer the question as best you can \
                 using only the question itself.\n",
            );
        }

        prompt.push_str(&json_output_spec());
        prompt
    }

    pub fn build_reply_prompt(context: &AssembledContext, target: &Message) -> String {
        let mut prompt = String::new();
        prompt.push_str(&context_section(context));

        prompt.push_str("\n## Task\n");
        prompt.push_str("Draft a reply to the starred target message below, on behalf of the user.\n");
        prompt.push_str(&format!(
            "Target message ({}): {}\n",
            target.sender_name.as_deref().unwrap_or("unknown"),
            target.text
        ));

        prompt.push_str("\n## Instructions\n");
        if has_any_context(context) {
            prompt.push_str(
                "Draft a natural reply to the target message, consistent with the room summary, the user's \
                 communication style, and the recent conversation above.\n",
            );
        } else {
            prompt.push_str(
                "No prior context is available. Draft a natural, generic reply to the target message.\n",
            );
        }

        prompt.push_str(&json_output_spec());
        prompt
    }
}

fn has_any_context(context: &AssembledContext) -> bool {
    context.room_summary.is_some()
        || context.user_profile.is_some()
        || !context.prior_chats.is_empty()
        || !context.recent_messages.is_empty()
}

fn context_section(context: &AssembledContext) -> String {
    let mut section = String::from("## Context\n");

    section.push_str("### Room Summary\n");
    section.push_str(context.room_summary.as_deref().unwrap_or("(no room summary yet)"));
    section.push('\n');

    section.push_str("### User Profile\n");
    section.push_str(context.user_profile.as_deref().unwrap_or("(no user profile yet)"));
    section.push('\n');

    section.push_str("### Prior AI Chats (oldest first)\n");
    if context.prior_chats.is_empty() {
        section.push_str("(none)\n");
    } else {
        for chat in context.prior_chats.iter().rev() {
            section.push_str(&format!("- Q: {}\n  A: {}\n", chat.question, chat.answer));
        }
    }

    section.push_str("### Recent Room Messages (newest first)\n");
    if context.recent_messages.is_empty() {
        section.push_str("(none)\n");
    } else {
        for message in &context.recent_messages {
            let star = if context.target_message.as_ref().is_some_and(|t| t.id == message.id) { "* " } else { "" };
            section.push_str(&format!(
                "{star}[{}] {}: {}\n",
                relative_time(message.created_at),
                message.sender_name.as_deref().unwrap_or("unknown"),
                message.text
            ));
        }
    }

    section
}

fn json_output_spec() -> String {
    "\n## Output Format\n\
     Respond with JSON only, no other text, matching exactly:\n\
     {\"answer\": string, \"suggested_answer\": string | null}\n"
        .to_string()
}

fn relative_time(at: DateTime<Utc>) -> String {
    let delta = Utc::now().signed_duration_since(at);
    let seconds = delta.num_seconds();
    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h ago", seconds / 3600)
    } else {
        format!("{}d ago", seconds / 86_400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn empty_context() -> AssembledContext {
        AssembledContext {
            room_summary: None,
            user_profile: None,
            prior_chats: Vec::new(),
            recent_messages: Vec::new(),
            target_message: None,
        }
    }

    #[test]
    fn relative_time_buckets_by_magnitude() {
        let now = Utc::now();
        assert_eq!(relative_time(now), "just now");
        assert_eq!(relative_time(now - ChronoDuration::minutes(5)), "5m ago");
        assert_eq!(relative_time(now - ChronoDuration::hours(2)), "2h ago");
        assert_eq!(relative_time(now - ChronoDuration::days(3)), "3d ago");
    }

    #[test]
    fn chat_prompt_flags_missing_context() {
        let prompt = PromptBuilder::build_chat_prompt(&empty_context(), "what's new?");
        assert!(prompt.contains("No prior context is available"));
        assert!(prompt.contains("what's new?"));
    }

    #[test]
    fn chat_prompt_grounds_in_available_context_when_present() {
        let mut context = empty_context();
        context.room_summary = Some("the room discusses Rust".to_string());
        let prompt = PromptBuilder::build_chat_prompt(&context, "anything new?");
        assert!(prompt.contains("Answer the question using the context above"));
        assert!(prompt.contains("the room discusses Rust"));
    }
}
