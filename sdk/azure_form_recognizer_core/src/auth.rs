use crate::error::{FormRecognizerError, FormRecognizerResult};
use azure_core::credentials::TokenCredential;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// Environment variable holding a Form Recognizer subscription key.
pub const KEY_ENV_VAR: &str = "AZURE_FORM_RECOGNIZER_KEY";

/// Header carrying a Cognitive Services subscription key.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// OAuth scope requested when authenticating with a token credential.
pub const COGNITIVE_SERVICES_SCOPE: &str = "https://cognitiveservices.azure.com/.default";

/// Credential types supported by the Azure Form Recognizer SDK.
#[derive(Clone)]
pub enum FormRecognizerCredential {
    /// Cognitive Services subscription key, sent as `Ocp-Apim-Subscription-Key`.
    SubscriptionKey(SecretString),

    /// Microsoft Entra ID token credential from `azure_identity`.
    TokenCredential(Arc<dyn TokenCredential>),
}

/// An authentication header ready to attach to a request.
#[derive(Clone)]
pub struct AuthHeader {
    /// Header name.
    pub name: &'static str,
    /// Header value.
    pub value: String,
}

impl std::fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHeader")
            .field("name", &self.name)
            .field("value", &"****")
            .finish()
    }
}

impl FormRecognizerCredential {
    /// Create a credential from the `AZURE_FORM_RECOGNIZER_KEY` environment variable.
    /// Falls back to the Azure CLI credential if the variable is not set.
    pub fn from_env() -> FormRecognizerResult<Self> {
        match std::env::var(KEY_ENV_VAR) {
            Ok(key) if !key.is_empty() => Ok(Self::SubscriptionKey(SecretString::from(key))),
            _ => Self::azure_cli(),
        }
    }

    /// Create a subscription key credential.
    pub fn subscription_key(key: impl Into<String>) -> Self {
        Self::SubscriptionKey(SecretString::from(key.into()))
    }

    /// Wrap any `azure_core` token credential.
    pub fn token_credential(credential: Arc<dyn TokenCredential>) -> Self {
        Self::TokenCredential(credential)
    }

    /// Authenticate with the account logged in to the Azure CLI.
    pub fn azure_cli() -> FormRecognizerResult<Self> {
        let credential = azure_identity::AzureCliCredential::new(None)
            .map_err(|e| FormRecognizerError::Auth(format!("Azure CLI credential: {e}")))?;
        Ok(Self::TokenCredential(credential))
    }

    /// Resolve the credential to the header that authenticates a request.
    pub async fn resolve(&self) -> FormRecognizerResult<AuthHeader> {
        match self {
            Self::SubscriptionKey(key) => Ok(AuthHeader {
                name: SUBSCRIPTION_KEY_HEADER,
                value: key.expose_secret().to_string(),
            }),
            Self::TokenCredential(credential) => {
                let token = credential
                    .get_token(&[COGNITIVE_SERVICES_SCOPE], None)
                    .await
                    .map_err(|e| FormRecognizerError::Auth(e.to_string()))?;
                Ok(AuthHeader {
                    name: "Authorization",
                    value: format!("Bearer {}", token.token.secret()),
                })
            }
        }
    }
}

impl std::fmt::Debug for FormRecognizerCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubscriptionKey(_) => write!(f, "FormRecognizerCredential::SubscriptionKey(****)"),
            Self::TokenCredential(_) => write!(f, "FormRecognizerCredential::TokenCredential"),
        }
    }
}
