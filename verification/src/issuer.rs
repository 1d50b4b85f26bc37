//! Challenge issuance: the entry point for a new like request.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use likegate_store::{RequestStore, StoreError};
use likegate_types::{
    ChallengeCode, Clock, CodeSource, ReplyTarget, RequestId, RequesterId, Timestamp,
    VerificationRequest,
};

use crate::link::LinkShortener;
use crate::prompt::{self, PromptFields};
use crate::VerificationError;

/// How long a challenge link stays valid.
pub const DEFAULT_CHALLENGE_TTL: Duration = Duration::from_secs(10 * 60);

/// Code collisions tolerated before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 5;

const MAX_REGION_LEN: usize = 8;
const MAX_UID_LEN: usize = 20;

#[derive(Clone, Debug)]
pub struct IssuerConfig {
    /// Base URL under which `/verify/{code}` is reachable.
    pub public_base_url: String,
    pub challenge_ttl: Duration,
    pub vip_access_url: Option<String>,
    pub how_to_verify_url: Option<String>,
}

impl IssuerConfig {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into(),
            challenge_ttl: DEFAULT_CHALLENGE_TTL,
            vip_access_url: None,
            how_to_verify_url: None,
        }
    }
}

/// A user's like command, as parsed by the chat front-end.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub requester_id: RequesterId,
    #[serde(default)]
    pub display_name: Option<String>,
    pub region: String,
    pub target_uid: String,
    pub reply_target: ReplyTarget,
}

/// What the front-end shows the user after a successful submit.
#[derive(Clone, Debug, Serialize)]
pub struct IssuedChallenge {
    pub request_id: RequestId,
    #[serde(skip)]
    pub code: ChallengeCode,
    pub link: String,
    pub expires_at: Timestamp,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub how_to_verify_url: Option<String>,
}

pub struct ChallengeIssuer {
    store: Arc<dyn RequestStore>,
    clock: Arc<dyn Clock>,
    codes: Arc<dyn CodeSource>,
    shortener: Arc<dyn LinkShortener>,
    config: IssuerConfig,
}

impl ChallengeIssuer {
    pub fn new(
        store: Arc<dyn RequestStore>,
        clock: Arc<dyn Clock>,
        codes: Arc<dyn CodeSource>,
        shortener: Arc<dyn LinkShortener>,
        config: IssuerConfig,
    ) -> Self {
        Self {
            store,
            clock,
            codes,
            shortener,
            config,
        }
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    /// Validate the command, store a fresh unverified request and build its
    /// challenge link and prompt.
    pub async fn submit(
        &self,
        submit: SubmitRequest,
    ) -> Result<IssuedChallenge, VerificationError> {
        let region = validate_region(&submit.region)?;
        let target_uid = validate_uid(&submit.target_uid)?;

        let created_at = self.clock.now();
        let expires_at = created_at.plus(self.config.challenge_ttl);
        let request = self.persist(&submit, &region, &target_uid, created_at, expires_at)?;

        let raw_link = format!(
            "{}/verify/{}",
            self.config.public_base_url.trim_end_matches('/'),
            request.challenge_code
        );
        let link = self
            .shortener
            .shorten(&raw_link)
            .await
            .unwrap_or(raw_link);

        let requester = submit.requester_id.to_string();
        let prompt = prompt::render(&PromptFields {
            display_name: submit.display_name.as_deref().unwrap_or(&requester),
            target_uid: &target_uid,
            region: &region,
            link: &link,
            ttl: self.config.challenge_ttl,
            vip_access_url: self.config.vip_access_url.as_deref(),
        });

        tracing::info!(
            request_id = %request.id,
            requester_id = %submit.requester_id,
            region = %region,
            "challenge issued"
        );

        Ok(IssuedChallenge {
            request_id: request.id,
            code: request.challenge_code,
            link,
            expires_at,
            prompt,
            how_to_verify_url: self.config.how_to_verify_url.clone(),
        })
    }

    fn persist(
        &self,
        submit: &SubmitRequest,
        region: &str,
        target_uid: &str,
        created_at: Timestamp,
        expires_at: Timestamp,
    ) -> Result<VerificationRequest, VerificationError> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = self
                .codes
                .next_code()
                .map_err(|e| VerificationError::CodeGeneration(e.to_string()))?;
            let request = VerificationRequest::new(
                submit.requester_id,
                target_uid,
                region,
                code,
                submit.reply_target,
                created_at,
                expires_at,
            );
            match self.store.create(&request) {
                Ok(()) => return Ok(request),
                Err(StoreError::Duplicate(what)) => {
                    tracing::debug!(attempt, %what, "challenge code collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(VerificationError::CodeGeneration(format!(
            "no unused code after {MAX_CODE_ATTEMPTS} attempts"
        )))
    }
}

fn validate_region(raw: &str) -> Result<String, VerificationError> {
    let region = raw.trim();
    if region.is_empty()
        || region.len() > MAX_REGION_LEN
        || !region.bytes().all(|b| b.is_ascii_alphabetic())
    {
        return Err(VerificationError::Validation(format!(
            "region must be 1-{MAX_REGION_LEN} ASCII letters, got {raw:?}"
        )));
    }
    Ok(region.to_ascii_lowercase())
}

fn validate_uid(raw: &str) -> Result<String, VerificationError> {
    let uid = raw.trim();
    if uid.is_empty() || uid.len() > MAX_UID_LEN || !uid.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VerificationError::Validation(format!(
            "uid must be 1-{MAX_UID_LEN} digits, got {raw:?}"
        )));
    }
    Ok(uid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DirectLinks;
    use async_trait::async_trait;
    use likegate_nullables::{NullClock, NullCodeSource, NullStore};

    const T0: u64 = 1_700_000_000;

    struct FixedShortener;

    #[async_trait]
    impl LinkShortener for FixedShortener {
        async fn shorten(&self, _link: &str) -> Option<String> {
            Some("https://s.example/abc".into())
        }
    }

    fn submit(region: &str, uid: &str) -> SubmitRequest {
        SubmitRequest {
            requester_id: RequesterId::new(42),
            display_name: Some("neo".into()),
            region: region.into(),
            target_uid: uid.into(),
            reply_target: ReplyTarget {
                chat_id: -100,
                message_id: 9,
            },
        }
    }

    fn issuer(
        store: Arc<NullStore>,
        codes: NullCodeSource,
        shortener: Arc<dyn LinkShortener>,
    ) -> ChallengeIssuer {
        ChallengeIssuer::new(
            store,
            Arc::new(NullClock::new(T0)),
            Arc::new(codes),
            shortener,
            IssuerConfig::new("https://gate.example/"),
        )
    }

    #[tokio::test]
    async fn submit_persists_unverified_request() {
        let store = Arc::new(NullStore::new());
        let issuer = issuer(
            store.clone(),
            NullCodeSource::constant("AAAAAAAAAAAA"),
            Arc::new(DirectLinks),
        );
        let issued = issuer.submit(submit("IND", "123456789")).await.unwrap();

        assert_eq!(issued.link, "https://gate.example/verify/AAAAAAAAAAAA");
        assert_eq!(issued.expires_at, Timestamp::new(T0 + 600));
        assert!(issued.prompt.contains("expires in 10 minutes"));

        let stored = store.get(&issued.request_id).unwrap().unwrap();
        assert!(!stored.verified && !stored.processed);
        assert_eq!(stored.region, "ind");
        assert_eq!(stored.target_uid, "123456789");
        assert_eq!(stored.requester_id, RequesterId::new(42));
    }

    #[tokio::test]
    async fn shortened_link_is_used() {
        let store = Arc::new(NullStore::new());
        let issuer = issuer(
            store,
            NullCodeSource::constant("AAAAAAAAAAAA"),
            Arc::new(FixedShortener),
        );
        let issued = issuer.submit(submit("ind", "1")).await.unwrap();
        assert_eq!(issued.link, "https://s.example/abc");
        assert!(issued.prompt.contains("https://s.example/abc"));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_without_write() {
        let store = Arc::new(NullStore::new());
        let issuer = issuer(
            store.clone(),
            NullCodeSource::constant("AAAAAAAAAAAA"),
            Arc::new(DirectLinks),
        );
        for (region, uid) in [
            ("", "1"),
            ("in1", "1"),
            ("ind", ""),
            ("ind", "12a"),
            ("ind", "123456789012345678901"),
        ] {
            let err = issuer.submit(submit(region, uid)).await.unwrap_err();
            assert!(err.is_validation(), "{region}/{uid}");
        }
        assert_eq!(store.request_count(), 0);
    }

    #[tokio::test]
    async fn code_collision_retries_with_next_code() {
        let store = Arc::new(NullStore::new());
        let issuer = issuer(
            store.clone(),
            NullCodeSource::new(&["AAAAAAAAAAAA", "AAAAAAAAAAAA", "BBBBBBBBBBBB"]),
            Arc::new(DirectLinks),
        );
        let first = issuer.submit(submit("ind", "1")).await.unwrap();
        let second = issuer.submit(submit("ind", "2")).await.unwrap();
        assert_eq!(first.code.as_str(), "AAAAAAAAAAAA");
        assert_eq!(second.code.as_str(), "BBBBBBBBBBBB");
    }

    #[tokio::test]
    async fn exhausted_code_space_gives_up() {
        let store = Arc::new(NullStore::new());
        let issuer = issuer(
            store.clone(),
            NullCodeSource::constant("AAAAAAAAAAAA"),
            Arc::new(DirectLinks),
        );
        issuer.submit(submit("ind", "1")).await.unwrap();
        assert!(matches!(
            issuer.submit(submit("ind", "2")).await,
            Err(VerificationError::CodeGeneration(_))
        ));
        assert_eq!(store.request_count(), 1);
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let store = Arc::new(NullStore::new());
        store.fail_writes(true);
        let issuer = issuer(
            store,
            NullCodeSource::constant("AAAAAAAAAAAA"),
            Arc::new(DirectLinks),
        );
        assert!(matches!(
            issuer.submit(submit("ind", "1")).await,
            Err(VerificationError::Store(_))
        ));
    }
}
