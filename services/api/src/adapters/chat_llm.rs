//! services/api/src/adapters/chat_llm.rs
//!
//! This module contains the adapter for the document chat LLM.
//! It implements the `ChatService` port from the `core` crate.

const SYSTEM_INSTRUCTIONS: &str = r#"You are a careful reading assistant discussing a document with the user.

The document is provided in the first user input, between the DOCUMENT BEGIN and DOCUMENT END lines.

Citing evidence:
- When a claim in your answer is supported by a specific passage of the document, cite that passage with an inline marker of the exact form [start:end], e.g. [120:145].
- start and end are character offsets into the document text (0-based, end exclusive), counting every character exactly as it appears between the BEGIN and END lines.
- Place the marker directly after the sentence it supports.
- Cite only passages you can locate precisely; never fabricate offsets.
- Do not use any other bracket notation in your answers.

Style:
- Answer conversationally and concisely.
- Ground every factual statement about the document in the text itself.
- If the document does not contain the answer, say so instead of guessing."#;

const DOCUMENT_TEMPLATE: &str = "DOCUMENT BEGIN\n{document}\nDOCUMENT END";

use annotation_core::domain::{Message as TranscriptEntry, Role};
use annotation_core::ports::{ChatService, PortError, PortResult, ReplyStream};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures::StreamExt;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatService` using an OpenAI-compatible LLM
/// with chat-completions streaming.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `ChatService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatService for OpenAiChatAdapter {
    /// Opens a streaming reply for the latest user message, given the full
    /// document and prior transcript.
    async fn stream_reply(
        &self,
        document: &str,
        transcript: &[TranscriptEntry],
    ) -> PortResult<ReplyStream> {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(transcript.len() + 2);
        messages.push(ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?,
        ));
        messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(DOCUMENT_TEMPLATE.replace("{document}", document))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?,
        ));
        for entry in transcript {
            let message = match entry.role {
                Role::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(entry.content.as_str())
                        .build()
                        .map_err(|e| PortError::Unexpected(e.to_string()))?,
                ),
                Role::Assistant => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(entry.content.as_str())
                        .build()
                        .map_err(|e| PortError::Unexpected(e.to_string()))?,
                ),
            };
            messages.push(message);
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(1024u32)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let mut upstream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        // Bridge the SDK stream into the port's fragment stream. Markers may
        // arrive split across fragments; the caller handles that by
        // re-extracting over the accumulated prefix.
        let reply = async_stream::stream! {
            while let Some(next) = upstream.next().await {
                match next {
                    Ok(response) => {
                        let fragment = response
                            .choices
                            .first()
                            .and_then(|choice| choice.delta.content.clone());
                        if let Some(fragment) = fragment {
                            if !fragment.is_empty() {
                                yield Ok(fragment);
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(PortError::Unexpected(e.to_string()));
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(reply))
    }
}
