//! Resource guarded by HMAC-signed payloads.

use tracing::{info, info_span, warn, Instrument, Span};

use crate::credential::Credential;
use crate::web::handler::{Handler, HandlerResponse, InboundRequest};
use crate::web::policy::{authorize, VerificationResult};

/// A route whose POST and PUT hooks only run for requests that pass the
/// HMAC policy. GET bypasses the policy unless
/// [`require_signature_on_get`](Self::require_signature_on_get) is set.
#[derive(Debug)]
pub struct HmacResource {
    credential: Credential,
    handler: Handler,
    require_signature_on_get: bool,
    span: Span,
}

impl HmacResource {
    pub fn new(credential: Credential, handler: Handler) -> Self {
        Self {
            credential,
            handler,
            require_signature_on_get: false,
            span: info_span!("hmac_resource"),
        }
    }

    /// Run GET requests through the HMAC policy as well.
    pub fn require_signature_on_get(mut self, required: bool) -> Self {
        self.require_signature_on_get = required;
        self
    }

    /// Span all of this resource's log events are recorded in.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub async fn get(&self, req: InboundRequest) -> HandlerResponse {
        if self.require_signature_on_get && !self.check(&req) {
            return HandlerResponse::auth_failed();
        }
        self.handler.get(req).instrument(self.span.clone()).await
    }

    pub async fn post(&self, req: InboundRequest) -> HandlerResponse {
        if !self.check(&req) {
            return HandlerResponse::auth_failed();
        }
        self.handler.post(req).instrument(self.span.clone()).await
    }

    pub async fn put(&self, req: InboundRequest) -> HandlerResponse {
        if !self.check(&req) {
            return HandlerResponse::auth_failed();
        }
        self.handler.put(req).instrument(self.span.clone()).await
    }

    fn check(&self, req: &InboundRequest) -> bool {
        let _entered = self.span.enter();
        let result = authorize(&self.credential, &req.raw_body, req.signature());
        match result {
            VerificationResult::Rejected => {
                warn!(method = %req.method, "hmac_request_rejected");
                false
            }
            VerificationResult::Verified | VerificationResult::ExemptNoSecretConfigured => {
                info!(method = %req.method, verification = ?result, "hmac_request_accepted");
                true
            }
        }
    }
}
