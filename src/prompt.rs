use crate::chat_api::Message;
use clap::ValueEnum;

const SOURCE_PLACEHOLDER: &str = "{source_text}";

const DETAILED_TEMPLATE: &str = "You are a helpful assistant answering questions about a document \
whose text was extracted with OCR. Use only the document text below as your source. \
If the answer is not in the text, say so plainly.\n\n\
FORMATTING:\n\
- Answer in Markdown.\n\
- Use headings and bullet lists for structured answers.\n\
- Use **bold** for key figures, names and dates.\n\
- Quote short passages from the document when they support the answer.\n\
- OCR may have introduced typos: interpret obvious recognition errors sensibly.\n\n\
DOCUMENT TEXT:\n\
{source_text}";

const BALANCED_TEMPLATE: &str = "You are an assistant that answers questions about the OCR text \
of a PDF document. Base every answer on the text below and mention when the text does not \
contain the answer.\n\n\
Answer in Markdown with short paragraphs, and use lists only when they help.\n\n\
DOCUMENT TEXT:\n\
{source_text}";

const CONCISE_TEMPLATE: &str = "Answer questions about the following OCR-extracted document \
text in at most a few sentences of Markdown. If the text does not contain the answer, \
reply that the document does not say.\n\n\
DOCUMENT TEXT:\n\
{source_text}";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum PromptProfile {
    #[default]
    Detailed,
    Balanced,
    Concise,
}

impl PromptProfile {
    pub fn system_template(self) -> &'static str {
        match self {
            Self::Detailed => DETAILED_TEMPLATE,
            Self::Balanced => BALANCED_TEMPLATE,
            Self::Concise => CONCISE_TEMPLATE,
        }
    }

    pub fn temperature(self) -> f32 {
        match self {
            Self::Detailed => 0.7,
            Self::Balanced => 0.6,
            Self::Concise => 0.5,
        }
    }

    pub fn max_output_tokens(self) -> u32 {
        match self {
            Self::Detailed => 2000,
            Self::Balanced => 1500,
            Self::Concise => 1000,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Detailed => "Detailed",
            Self::Balanced => "Balanced",
            Self::Concise => "Concise",
        }
    }

    /// Interpolates `source_text` verbatim. Placeholder-like sequences inside
    /// the source are not expanded again.
    pub fn system_prompt(self, source_text: &str) -> String {
        let template = self.system_template();
        match template.split_once(SOURCE_PLACEHOLDER) {
            Some((before, after)) => {
                let mut prompt =
                    String::with_capacity(before.len() + source_text.len() + after.len());
                prompt.push_str(before);
                prompt.push_str(source_text);
                prompt.push_str(after);
                prompt
            }
            None => format!("{template}\n\n{source_text}"),
        }
    }

    pub fn build_messages(self, source_text: &str, question: &str) -> Vec<Message> {
        vec![
            Message {
                role: "system".to_string(),
                content: self.system_prompt(source_text),
            },
            Message {
                role: "user".to_string(),
                content: question.to_string(),
            },
        ]
    }
}
