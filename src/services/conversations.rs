use std::sync::Arc;

use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::{
    auth::Principal,
    config::CompletionConfig,
    db::{DbError, DbPool},
    models::{ChatMessage, Conversation, CreateConversationRequest, Message, MessageRole},
    providers::CompletionProvider,
};

/// Messages fed to the title summarizer.
const TITLE_CONTEXT_MESSAGES: usize = 6;
/// Characters kept by the fallback title before the ellipsis.
const FALLBACK_TITLE_CHARS: usize = 30;
/// Hard cap on a model-generated title.
const GENERATED_TITLE_CHARS: usize = 40;

const TITLE_SYSTEM_PROMPT: &str = "You write titles for chat conversations. Reply with a short \
     title for the conversation below, in the conversation's language. Output the title only, \
     at most 20 characters, without quotes or trailing punctuation.";

/// Service layer for conversation operations
#[derive(Clone)]
pub struct ConversationService {
    db: Arc<DbPool>,
    provider: Option<Arc<dyn CompletionProvider>>,
    title_model: String,
}

impl ConversationService {
    pub fn new(
        db: Arc<DbPool>,
        provider: Option<Arc<dyn CompletionProvider>>,
        config: &CompletionConfig,
    ) -> Self {
        Self {
            db,
            provider,
            title_model: config.title_model().to_string(),
        }
    }

    /// The caller's conversations, most recently updated first.
    pub async fn list(&self, principal: &Principal) -> ServiceResult<Vec<Conversation>> {
        Ok(self.db.conversations().list_by_owner(&principal.id).await?)
    }

    pub async fn create(
        &self,
        principal: &Principal,
        request: CreateConversationRequest,
    ) -> ServiceResult<Conversation> {
        let input = request.into_create(principal.id.clone());
        let conversation = self.db.conversations().create(input).await?;
        tracing::debug!(conversation_id = %conversation.id, "Created conversation");
        Ok(conversation)
    }

    /// Owners and admins may read any conversation by id. Everyone else
    /// gets `NotFound`, never `Forbidden`.
    pub async fn get(&self, principal: &Principal, id: Uuid) -> ServiceResult<Conversation> {
        match self.db.conversations().get_by_id(id).await? {
            Some(conversation) if principal.can_read(&conversation.owner_id) => Ok(conversation),
            _ => Err(ServiceError::NotFound),
        }
    }

    /// Like [`ConversationService::get`] but without the admin override.
    pub async fn get_owned(&self, principal: &Principal, id: Uuid) -> ServiceResult<Conversation> {
        match self.db.conversations().get_by_id(id).await? {
            Some(conversation) if principal.owns(&conversation.owner_id) => Ok(conversation),
            _ => Err(ServiceError::NotFound),
        }
    }

    /// Delete a conversation and its messages. Owner only, admins included.
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> ServiceResult<()> {
        self.get_owned(principal, id).await?;

        match self.db.conversations().delete(id).await {
            Ok(()) => {
                tracing::info!(conversation_id = %id, "Deleted conversation");
                Ok(())
            }
            Err(DbError::NotFound) => Err(ServiceError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Give an untitled conversation a title and return it.
    ///
    /// A conversation that already has a non-blank title keeps it and the
    /// summarizer is not called.
    #[tracing::instrument(skip(self, principal), fields(owner_id = %principal.id))]
    pub async fn auto_title(&self, principal: &Principal, id: Uuid) -> ServiceResult<String> {
        let conversation = self.get_owned(principal, id).await?;
        if let Some(title) = conversation.non_blank_title() {
            return Ok(title.to_string());
        }

        let mut messages = self.db.messages().list_by_conversation(id).await?;
        let seed = messages
            .iter()
            .find(|m| m.role == MessageRole::User && m.is_thread_root())
            .or_else(|| messages.first())
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let mut title = fallback_title(seed);
        messages.truncate(TITLE_CONTEXT_MESSAGES);

        if let Some(provider) = &self.provider
            && !messages.is_empty()
            && let Some(generated) = self.summarize(provider.as_ref(), &messages).await
        {
            title = generated;
        }

        match self.db.conversations().set_title(id, &title).await {
            Ok(_) => Ok(title),
            Err(DbError::NotFound) => Err(ServiceError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Ask the model for a title. Any failure keeps the fallback.
    async fn summarize(
        &self,
        provider: &dyn CompletionProvider,
        messages: &[Message],
    ) -> Option<String> {
        let mut context = Vec::with_capacity(messages.len() + 1);
        context.push(ChatMessage::system(TITLE_SYSTEM_PROMPT));
        context.extend(messages.iter().map(ChatMessage::from));

        match provider.chat(&self.title_model, &context).await {
            Ok(text) => clean_generated_title(&text),
            Err(e) => {
                tracing::warn!(error = %e, "Title generation failed, using fallback");
                None
            }
        }
    }
}

/// Deterministic title from message text: whitespace collapsed, cut to
/// 30 characters plus an ellipsis, `Untitled` when empty.
pub fn fallback_title(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "Untitled".to_string();
    }
    if collapsed.chars().count() <= FALLBACK_TITLE_CHARS {
        return collapsed;
    }
    let mut title: String = collapsed.chars().take(FALLBACK_TITLE_CHARS).collect();
    title.push('…');
    title
}

/// Strip one leading `"`/`「` and one trailing `"`/`」`, trim, and cap the
/// length. Blank answers yield `None`.
fn clean_generated_title(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let text = text
        .strip_prefix('"')
        .or_else(|| text.strip_prefix('「'))
        .unwrap_or(text);
    let text = text
        .strip_suffix('"')
        .or_else(|| text.strip_suffix('」'))
        .unwrap_or(text);
    let title: String = text.trim().chars().take(GENERATED_TITLE_CHARS).collect();

    (!title.is_empty()).then_some(title)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Hello world", "Hello world")]
    #[case("  spaced \n\t out  ", "spaced out")]
    #[case("", "Untitled")]
    #[case(" \n ", "Untitled")]
    #[case(
        "abcdefghijklmnopqrstuvwxyz0123456789",
        "abcdefghijklmnopqrstuvwxyz0123…"
    )]
    #[case(
        "ちょうど三十文字ちょうど三十文字ちょうど三十文字ちょうど三十",
        "ちょうど三十文字ちょうど三十文字ちょうど三十文字ちょうど三十"
    )]
    fn test_fallback_title(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(fallback_title(input), expected);
    }

    #[rstest]
    #[case("\"Trip planning\"", Some("Trip planning"))]
    #[case("「旅行の計画」", Some("旅行の計画"))]
    #[case("  Budget review \n", Some("Budget review"))]
    #[case("\"\"", None)]
    #[case("   ", None)]
    fn test_clean_generated_title(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(clean_generated_title(input).as_deref(), expected);
    }

    #[test]
    fn test_generated_title_is_capped() {
        let long = "x".repeat(60);
        assert_eq!(clean_generated_title(&long).unwrap().chars().count(), 40);
    }

    #[cfg(feature = "database-sqlite")]
    mod sqlite {
        use std::sync::Arc;

        use uuid::Uuid;

        use crate::{
            config::CompletionConfig,
            models::{CreateConversationRequest, CreateMessageRequest, MessageRole},
            providers::{
                CompletionProvider,
                test::{TestProvider, TestReply},
            },
            services::{
                ServiceError, Services,
                test_support::{admin, sqlite_db, user},
            },
        };

        async fn services(provider: Option<Arc<TestProvider>>) -> Services {
            let provider = provider.map(|p| p as Arc<dyn CompletionProvider>);
            Services::new(sqlite_db().await, provider, &CompletionConfig::default())
        }

        fn message(conversation_id: Uuid, content: &str) -> CreateMessageRequest {
            CreateMessageRequest {
                conversation_id: Some(conversation_id),
                parent_message_id: None,
                role: Some(MessageRole::User),
                content: Some(content.to_string()),
            }
        }

        #[tokio::test]
        async fn test_admin_reads_but_cannot_delete() {
            let services = services(None).await;
            let owner = user("u1");
            let conv = services
                .conversations
                .create(&owner, CreateConversationRequest::default())
                .await
                .unwrap();

            let ops = admin("u2");
            let fetched = services.conversations.get(&ops, conv.id).await.unwrap();
            assert_eq!(fetched.id, conv.id);

            let err = services.conversations.delete(&ops, conv.id).await;
            assert!(matches!(err, Err(ServiceError::NotFound)));
            assert!(services.conversations.get(&owner, conv.id).await.is_ok());
        }

        #[tokio::test]
        async fn test_non_owner_sees_not_found() {
            let services = services(None).await;
            let conv = services
                .conversations
                .create(&user("u1"), CreateConversationRequest::default())
                .await
                .unwrap();

            let err = services.conversations.get(&user("u3"), conv.id).await;
            assert!(matches!(err, Err(ServiceError::NotFound)));
            let err = services.conversations.get(&user("u1"), Uuid::new_v4()).await;
            assert!(matches!(err, Err(ServiceError::NotFound)));
        }

        #[tokio::test]
        async fn test_delete_removes_messages() {
            let services = services(None).await;
            let owner = user("u1");
            let conv = services
                .conversations
                .create(&owner, CreateConversationRequest::default())
                .await
                .unwrap();
            let msg = services
                .messages
                .create(&owner, message(conv.id, "Hi"))
                .await
                .unwrap();

            services.conversations.delete(&owner, conv.id).await.unwrap();

            let err = services.messages.subtree(&owner, msg.id).await;
            assert!(matches!(err, Err(ServiceError::NotFound)));
            let err = services.conversations.get(&owner, conv.id).await;
            assert!(matches!(err, Err(ServiceError::NotFound)));
        }

        #[tokio::test]
        async fn test_auto_title_without_provider_uses_first_root() {
            let services = services(None).await;
            let owner = user("u1");
            let conv = services
                .conversations
                .create(&owner, CreateConversationRequest::default())
                .await
                .unwrap();
            services
                .messages
                .create(&owner, message(conv.id, "  Plan a   weekend trip to Kyoto  "))
                .await
                .unwrap();

            let title = services
                .conversations
                .auto_title(&owner, conv.id)
                .await
                .unwrap();
            assert_eq!(title, "Plan a weekend trip to Kyoto");

            let stored = services.conversations.get(&owner, conv.id).await.unwrap();
            assert_eq!(stored.title.as_deref(), Some("Plan a weekend trip to Kyoto"));
        }

        #[tokio::test]
        async fn test_auto_title_empty_conversation() {
            let services = services(None).await;
            let owner = user("u1");
            let conv = services
                .conversations
                .create(&owner, CreateConversationRequest::default())
                .await
                .unwrap();

            let title = services
                .conversations
                .auto_title(&owner, conv.id)
                .await
                .unwrap();
            assert_eq!(title, "Untitled");
        }

        #[tokio::test]
        async fn test_auto_title_is_idempotent() {
            let provider = Arc::new(TestProvider::text("\"Kyoto trip\""));
            let services = services(Some(provider.clone())).await;
            let owner = user("u1");
            let conv = services
                .conversations
                .create(&owner, CreateConversationRequest::default())
                .await
                .unwrap();
            services
                .messages
                .create(&owner, message(conv.id, "Plan a trip"))
                .await
                .unwrap();

            let first = services
                .conversations
                .auto_title(&owner, conv.id)
                .await
                .unwrap();
            let second = services
                .conversations
                .auto_title(&owner, conv.id)
                .await
                .unwrap();

            assert_eq!(first, "Kyoto trip");
            assert_eq!(second, "Kyoto trip");
            assert_eq!(provider.call_count(), 1);
        }

        #[tokio::test]
        async fn test_auto_title_keeps_existing_title() {
            let provider = Arc::new(TestProvider::text("Other"));
            let services = services(Some(provider.clone())).await;
            let owner = user("u1");
            let conv = services
                .conversations
                .create(
                    &owner,
                    CreateConversationRequest {
                        title: Some("Mine".into()),
                    },
                )
                .await
                .unwrap();

            let title = services
                .conversations
                .auto_title(&owner, conv.id)
                .await
                .unwrap();
            assert_eq!(title, "Mine");
            assert_eq!(provider.call_count(), 0);
        }

        #[tokio::test]
        async fn test_auto_title_falls_back_on_provider_error() {
            let provider = Arc::new(TestProvider::new(TestReply::Status {
                status: 500,
                request_id: None,
                body: "boom".into(),
            }));
            let services = services(Some(provider.clone())).await;
            let owner = user("u1");
            let conv = services
                .conversations
                .create(&owner, CreateConversationRequest::default())
                .await
                .unwrap();
            services
                .messages
                .create(&owner, message(conv.id, "Hello there"))
                .await
                .unwrap();

            let title = services
                .conversations
                .auto_title(&owner, conv.id)
                .await
                .unwrap();
            assert_eq!(title, "Hello there");
            assert_eq!(provider.call_count(), 1);
        }

        #[tokio::test]
        async fn test_auto_title_owner_only() {
            let services = services(None).await;
            let conv = services
                .conversations
                .create(&user("u1"), CreateConversationRequest::default())
                .await
                .unwrap();

            let err = services.conversations.auto_title(&admin("u2"), conv.id).await;
            assert!(matches!(err, Err(ServiceError::NotFound)));
        }
    }
}
