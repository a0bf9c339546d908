//! Fixed texts: the persona, command replies and the media instructions.

/// Default persona, replaced by `[model] system_prompt` when set.
pub const SYSTEM_PROMPT: &str = "\
You are Aria, a sharp and dependable personal AI assistant.

Your core traits:
- Professional yet warm: treat every user like a trusted colleague.
- Concise by default: give crisp, actionable answers unless depth is requested.
- Proactive: when a task is ambiguous, ask one clarifying question rather than guessing.
- Honest: if you don't know something, say so and never fabricate facts.

Your capabilities:
- Task and project management: break down goals, prioritise work, draft plans.
- Research and summarisation: condense long content into clear takeaways.
- Writing and editing: draft emails, reports and messages, or improve existing text.
- Brainstorming: generate ideas and explore options.
- General Q&A: answer factual, technical or practical questions accurately.

Formatting rules:
- Use Markdown only when it genuinely aids readability (lists, code blocks, bold key terms).
- Keep responses under ~200 words unless the user explicitly asks for more detail.
- Never pad responses with filler phrases like \"Certainly!\" or \"Great question!\".

You remember the recent conversation with this user and use it for context.
Always stay on-topic and focused on helping the user accomplish their goals.";

pub const HELP: &str = "\
*Available commands*

/start — introduce yourself
/help — show this message
/reset — clear our conversation history

*I also respond to:*
📷 Photos — send an image for analysis
🎙️ Voice — send a voice message for transcription
📄 Text files — send a document (.txt, .md, .csv, .json...) for analysis

Or just type anything and I'll respond!";

pub const RESET_DONE: &str = "🗑️ Done — I've cleared our conversation history. Fresh start!";

pub const PHOTO_INSTRUCTION: &str = "Describe and analyse this image in detail.";

pub const VOICE_INSTRUCTION: &str = "This is a voice message. First, transcribe what is said. \
Then respond to the content of the message. Format your reply as:\n\
🎙️ **Transcription:**\n<transcription>\n\n\
💬 **Response:**\n<your response>";

/// Stored in place of the raw audio.
pub const VOICE_DISPLAY: &str = "[Sent a voice message]";

pub fn welcome(name: &str) -> String {
    format!(
        "👋 Hi {}! I'm *Aria*, your personal AI assistant.\n\n\
         Here's what I can do:\n\
         💬 Chat & answer questions\n\
         🖼️ Analyse photos you send me\n\
         🎙️ Transcribe & respond to voice messages\n\
         📄 Read & analyse text documents\n\n\
         Send me a message to get started, or use /help for all commands.",
        name
    )
}

/// Stored in place of the image bytes.
pub fn photo_display(caption: Option<&str>) -> String {
    match caption {
        Some(caption) => format!("[Sent a photo]: {}", caption),
        None => "[Sent a photo]".to_string(),
    }
}

/// Stored in place of the document text.
pub fn document_display(file_name: &str, caption: Option<&str>) -> String {
    match caption {
        Some(caption) => format!("[Sent document: {}] — {}", file_name, caption),
        None => format!("[Sent document: {}]", file_name),
    }
}

/// Model input for an uploaded text document.
pub fn document_prompt(file_name: &str, caption: Option<&str>, text: &str) -> String {
    let request = match caption {
        Some(caption) => format!("The user's question/request: {}", caption),
        None => "Please provide a comprehensive summary and key takeaways.".to_string(),
    };

    format!(
        "The user sent a document named \"{}\".\n{}\n\nDocument text:\n\n{}",
        file_name, request, text
    )
}
